//! NAXOS error types.
//!
//! Every cryptographic failure is terminal for the session it occurs in.
//! Messages never carry secret material.

/// Result type alias using [`NaxosError`].
pub type Result<T> = std::result::Result<T, NaxosError>;

/// Errors from group validation, key generation and session derivation.
#[derive(Debug, thiserror::Error)]
pub enum NaxosError {
    #[error("Invalid group parameters: {0}")]
    InvalidGroup(String),

    #[error("Secure random source unavailable: {0}")]
    Entropy(String),

    #[error("Value out of range: {0}")]
    Range(String),

    #[error("Session keys do not match")]
    KeyMismatch,

    /// The peer's message names a different identity or static key than the one pinned.
    #[error("Unexpected peer: {0}")]
    PeerMismatch(String),

    #[error("Invalid session state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Raised by message channel adapters, never by the protocol core.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
