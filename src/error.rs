//! Error types for the toolkit
//!
//! Provides unified error handling using thiserror.
//!
//! Cache misses, rate-limit denials, and expired sessions are not errors:
//! those outcomes are returned as `Option` / `Verdict` / `bool` values by the
//! components themselves. This enum covers the genuinely exceptional cases.

use std::time::Duration;

use thiserror::Error;

// == Toolkit Error Enum ==
/// Unified error type for the toolkit.
#[derive(Error, Debug)]
pub enum Error {
    /// A component was constructed with invalid parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No pooled connection became free within the acquire timeout
    #[error("Connection pool exhausted after waiting {0:?}")]
    PoolExhausted(Duration),

    /// The pool has been shut down via `close_all`
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The user-supplied connection factory failed to produce a connection
    #[error("Connection setup failed: {0}")]
    Connection(#[from] anyhow::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the toolkit.
pub type Result<T> = std::result::Result<T, Error>;
