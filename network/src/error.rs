use thiserror::Error;

use crate::framing::MAX_MESSAGE_SIZE;

/// Errors raised by the transport layer.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message body of {0} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit")]
    MessageTooLarge(usize),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("no reachable endpoint for {0}")]
    Unreachable(String),

    #[error("read timed out")]
    ReadTimeout,

    #[error("got invalid response from remote node")]
    InvalidResponse,

    #[error("peer sent an unexpected message kind")]
    UnexpectedMessage,

    #[error("request dispatch failed: {0}")]
    Dispatch(String),
}
