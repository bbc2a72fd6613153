//! A request/response session over one TCP stream.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

use meridian_messages::Message;
use meridian_types::NetworkContact;

use crate::error::NetworkError;
use crate::framing;

/// Timeout for an outbound TCP connection attempt (per endpoint).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for reading one message. Keeps a dead or stalled peer from
/// blocking the engine indefinitely.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// One framed message stream to a peer, either accepted or dialled.
#[derive(Debug)]
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Session {
    /// Wrap an accepted connection.
    pub fn from_stream(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }

    /// Dial a peer contact, trying IPv4 before IPv6.
    pub async fn connect(contact: &NetworkContact) -> Result<Self, NetworkError> {
        for addr in contact.endpoints() {
            match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    tracing::debug!(peer = %addr, "connected");
                    return Ok(Self { stream, peer: addr });
                }
                Ok(Err(e)) => {
                    tracing::debug!(peer = %addr, error = %e, "connect failed");
                }
                Err(_) => {
                    tracing::debug!(peer = %addr, "connect timed out");
                }
            }
        }
        Err(NetworkError::Unreachable(contact.to_string()))
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Serialize and send one message.
    pub async fn send(&mut self, message: &Message) -> Result<(), NetworkError> {
        let body = bincode::serialize(message)?;
        framing::write_frame(&mut self.stream, &body).await
    }

    /// Receive one message. Returns `None` when the peer closed cleanly.
    pub async fn receive(&mut self) -> Result<Option<Message>, NetworkError> {
        let body = match tokio::time::timeout(READ_TIMEOUT, framing::read_frame(&mut self.stream))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(NetworkError::ReadTimeout),
        };
        match body {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}
