// Transfer error taxonomy. Stored on a finished task's status, so every
// variant is cloneable and comparable.

use std::io;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("could not connect: {0}")]
    Connect(String),

    #[error("operation timed out")]
    Timeout,

    #[error("server returned HTTP {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("response reported no content length")]
    NoContentLength,

    #[error("write to destination failed: {0}")]
    Write(String),

    #[error("transfer cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransferError::Timeout
        } else if err.is_connect() {
            TransferError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            TransferError::HttpStatus(status.as_u16())
        } else {
            TransferError::Network(err.to_string())
        }
    }
}

impl From<io::Error> for TransferError {
    fn from(err: io::Error) -> Self {
        TransferError::Write(err.to_string())
    }
}
