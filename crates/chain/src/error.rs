//! Error types for chain access.

use thiserror::Error;

/// Result type for chain operations.
pub type ChainResult<T> = std::result::Result<T, ChainError>;

/// Chain access errors.
///
/// Every remote read is independently fallible; callers decide whether a
/// failure aborts their work or merely shrinks it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// The request never produced a JSON-RPC response
    #[error("transport error: {0}")]
    Transport(String),

    /// The response arrived but the envelope or payload was malformed
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Return data could not be decoded as the expected ABI shape
    #[error("ABI decode error: {0}")]
    AbiDecode(String),

    /// No connection is available for the operation
    #[error("not connected")]
    Disconnected,
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
