use thiserror::Error;

/// Errors produced by foundation-type parsing and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid node id: {0}")]
    InvalidId(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),
}
