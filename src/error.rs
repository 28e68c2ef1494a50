//! Error types for parsing and formatting.

use thiserror::Error;

/// Result type alias for address and header operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The input does not match the grammar of `construct`.
    #[error("syntax error in {construct} at position {position}")]
    Parse {
        construct: &'static str,
        position: usize,
    },
    /// The address is missing or is not an `addr-spec`.
    #[error("invalid address: {address:?}")]
    InvalidAddress { address: String },
    #[error("group name must not be empty")]
    EmptyGroupName,
    #[error("unknown charset {charset}")]
    UnknownCharset { charset: String },
    #[error("charset {charset} cannot be used for encoding")]
    UnsupportedCharset { charset: String },
    #[error("unknown encoding method {method:?}")]
    InvalidMethod { method: String },
}
