//! TCP transport for the meridian overlay.
//!
//! Carries length-prefixed request/response messages between nodes. The
//! server role accepts connections and runs one session loop per connection;
//! the client role dials a peer and drives the same framing from the other
//! side. On top of the raw sessions sit the typed [`RequestDispatcher`]
//! adapters and the [`RemoteNode`] proxy.

pub mod dispatcher;
pub mod error;
pub mod framing;
pub mod remote;
pub mod server;
pub mod session;
pub mod shutdown;

pub use dispatcher::{RequestDispatcher, SessionDispatcher};
pub use error::NetworkError;
pub use framing::{MAX_MESSAGE_SIZE, MESSAGE_HEADER_SIZE, WIRE_VERSION};
pub use remote::{ConnectionFactory, RemoteNode, RemoteNodeClient, TcpConnectionFactory};
pub use server::{TcpServer, THREAD_POOL_SIZE};
pub use session::Session;
pub use shutdown::ShutdownController;
