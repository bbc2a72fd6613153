//! Fundamental types for the meridian overlay.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: node identities, network contacts, geographic locations, view
//! membership enums, and service registrations.

pub mod contact;
pub mod entry;
pub mod id;
pub mod location;
pub mod service;

pub use contact::{NetworkContact, NodeProfile};
pub use entry::{NeighboursFilter, NodeDbEntry, NodeInfo, RelationType, RoleType};
pub use id::NodeId;
pub use location::{Distance, GpsLocation};
pub use service::{ServiceProfile, ServiceType};
