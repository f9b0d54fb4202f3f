//! Connection Traits Module
//!
//! The seams between the pool and whatever database client it manages. The
//! pool owns lifecycle and bounds; the factory owns how a connection is
//! actually established, and the connection itself knows how to probe its
//! own liveness.

use async_trait::async_trait;

// == Managed Connection ==
/// A connection the pool can hand out and health-check.
pub trait ManagedConnection: Send + 'static {
    /// Minimal liveness probe, run when the connection returns to the pool.
    ///
    /// A `false` result discards the connection instead of re-pooling it.
    fn is_valid(&mut self) -> bool;

    /// Tears the connection down before it is discarded. Default: drop.
    fn close(&mut self) {}
}

// == Connection Factory ==
/// Creates new connections for the pool.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: ManagedConnection;

    /// Establishes one new connection.
    async fn connect(&self) -> anyhow::Result<Self::Connection>;
}
