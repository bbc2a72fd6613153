//! Typed request/response dispatch.
//!
//! The same narrow trait is implemented on both ends of a session: the server
//! side maps a call onto the local node's operation surface, the client side
//! serializes the call, sends it, and awaits exactly one response.

use async_trait::async_trait;
use tokio::sync::Mutex;

use meridian_messages::{Call, Message, Request, Response};

use crate::error::NetworkError;
use crate::session::Session;

/// Maps one typed call to one typed response.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn dispatch(&self, call: Call) -> Result<Response, NetworkError>;
}

/// Client-side dispatcher: drives a dialled [`Session`].
///
/// Tags every call with the protocol version, sends it, and unwraps the
/// response envelope. A missing body or a non-response envelope fails with
/// [`NetworkError::InvalidResponse`].
pub struct SessionDispatcher {
    session: Mutex<Session>,
}

impl SessionDispatcher {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

#[async_trait]
impl RequestDispatcher for SessionDispatcher {
    async fn dispatch(&self, call: Call) -> Result<Response, NetworkError> {
        let mut session = self.session.lock().await;
        session.send(&Message::Request(Request::new(call))).await?;
        match session.receive().await? {
            Some(Message::Response(response)) => Ok(response),
            Some(Message::Request(_)) | None => Err(NetworkError::InvalidResponse),
        }
    }
}
