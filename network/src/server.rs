//! The accepting side of the transport.
//!
//! Binds a listener, accepts connections, and hands each one to its own
//! session loop task: read message → dispatch → send response, until the
//! peer closes, shutdown is requested, or an error occurs. Per-session
//! failures terminate that session only.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use meridian_messages::Message;

use crate::dispatcher::RequestDispatcher;
use crate::error::NetworkError;
use crate::session::Session;
use crate::shutdown::ShutdownController;

/// Number of runtime worker threads servicing the accept loop and session
/// tasks. A single worker is sufficient for the protocol's request rates.
pub const THREAD_POOL_SIZE: usize = 1;

/// Listening transport endpoint.
pub struct TcpServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TcpServer {
    /// Bind `addr` and start accepting. Each accepted connection runs an
    /// independent session loop against `dispatcher`.
    pub async fn bind(
        addr: SocketAddr,
        dispatcher: Arc<dyn RequestDispatcher>,
        shutdown: Arc<ShutdownController>,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::debug!(%local_addr, "start accepting connections");

        let mut accept_shutdown = shutdown.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = accept_shutdown.recv() => {
                        tracing::info!(%local_addr, "acceptor shutting down");
                        break;
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                tracing::debug!(%peer, "connection accepted");
                                let dispatcher = Arc::clone(&dispatcher);
                                let session_shutdown = shutdown.subscribe();
                                tokio::spawn(async move {
                                    let session = Session::from_stream(stream, peer);
                                    match serve_session(session, dispatcher, session_shutdown).await {
                                        Ok(()) => tracing::debug!(%peer, "session closed"),
                                        Err(e) => tracing::error!(%peer, error = %e, "session failed"),
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "failed to accept connection");
                            }
                        }
                    }
                }
            }
        });

        Ok(Self { local_addr, handle })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop to finish (after shutdown was triggered).
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// One session loop: strictly FIFO request/response until the peer closes,
/// shutdown is signalled, or a protocol error drops the session.
async fn serve_session(
    mut session: Session,
    dispatcher: Arc<dyn RequestDispatcher>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), NetworkError> {
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.recv() => return Ok(()),
            received = session.receive() => received?,
        };

        let request = match message {
            Some(Message::Request(request)) => request,
            Some(Message::Response(_)) => return Err(NetworkError::UnexpectedMessage),
            None => return Ok(()),
        };

        tracing::trace!(peer = %session.peer_addr(), "serving request");
        let response = dispatcher.dispatch(request.call).await?;
        session.send(&Message::Response(response)).await?;
    }
}
