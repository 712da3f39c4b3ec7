//! Errors raised by the relay core

use crate::client::ClientId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A line that does not form a message at all
    #[error("Message parsing error: {0}")]
    MessageParse(String),

    /// Raised when a nickname is claimed by a different session
    #[error("Nickname already in use: {0}")]
    NicknameInUse(String),

    /// The session's writer has gone away
    #[error("Outbound queue closed for session {0}")]
    QueueClosed(ClientId),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
