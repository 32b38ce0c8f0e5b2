//! Error types for the chat client.

use std::io;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered `login` with something other than `login ok`
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// The server closed the connection
    #[error("Server closed the connection")]
    Disconnected,

    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connect(#[from] io::Error),

    /// Reading or writing a line failed
    #[error("Connection error: {0}")]
    Transport(#[from] LinesCodecError),
}
