//! Nullable infrastructure for deterministic testing.
//!
//! The overlay's external dependencies are abstracted behind capability
//! traits; this crate provides test-friendly implementations that return
//! scripted values, can be inspected after the fact, and never touch the
//! network.
//!
//! Usage: swap real implementations for nullables in tests.

pub mod network;

pub use network::{NullConnectionFactory, NullRemoteNode};
