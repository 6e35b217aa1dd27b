//! Error types for the discovery pipeline.

use crate::state::DiscoveryState;
use thiserror::Error;
use vaultscan_chain::ChainError;

/// Result type for discovery operations.
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

/// Discovery pipeline errors.
///
/// Individual derived-read failures are not errors at this level; they
/// shrink the closure and are reported through the discovery summary.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// No live connection to run against
    #[error("no chain connection available")]
    NotConnected,

    /// The connection was replaced while discovery was in flight; all work
    /// tied to the old connection is abandoned
    #[error("connection replaced during discovery")]
    ConnectionReplaced,

    /// An internal transition was attempted out of order
    #[error("invalid discovery state transition: {from} -> {to}")]
    InvalidTransition {
        /// State the transition expected
        from: DiscoveryState,
        /// State the transition targeted
        to: DiscoveryState,
    },

    /// A chain-level failure outside the per-read tolerance policy
    #[error(transparent)]
    Chain(#[from] ChainError),
}
