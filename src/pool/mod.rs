//! Connection Pool Module
//!
//! Bounded pooling of database connections: a user-supplied factory
//! establishes them, the pool hands them out via scoped guards and
//! health-checks them on return.

mod connection;
#[allow(clippy::module_inception)]
mod pool;

// Re-export public types
pub use connection::{ConnectionFactory, ManagedConnection};
pub use pool::{ConnectionPool, PoolGuard, PoolStatus};
