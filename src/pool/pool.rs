//! Connection Pool Module
//!
//! Bounded pool of pre-warmed connections. `acquire` hands out an idle
//! connection, creates a fresh one below the cap, or waits up to a timeout
//! for one to come back. Connections are health-checked when their guard
//! drops; a broken connection is discarded and its slot freed for a
//! replacement.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::pool::{ConnectionFactory, ManagedConnection};

// == Pool State ==
/// Mutable pool state behind one synchronous lock, so the guard's release
/// path in `Drop` never awaits.
#[derive(Debug)]
struct PoolState<C> {
    /// Connections waiting to be handed out
    idle: Vec<C>,
    /// Live connections, idle or checked out
    created: usize,
}

struct PoolShared<F: ConnectionFactory> {
    factory: F,
    state: Mutex<PoolState<F::Connection>>,
    /// Bounds concurrently checked-out connections
    semaphore: Arc<Semaphore>,
    max_connections: usize,
    acquire_timeout: Duration,
    closed: AtomicBool,
}

// == Connection Pool ==
/// Bounded connection pool with scoped acquisition.
///
/// Cloning is cheap and shares the pool.
pub struct ConnectionPool<F: ConnectionFactory> {
    shared: Arc<PoolShared<F>>,
}

impl<F: ConnectionFactory> Clone for ConnectionPool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Snapshot of the pool's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections waiting in the pool
    pub idle: usize,
    /// Live connections, idle or checked out
    pub created: usize,
    /// Configured cap
    pub max_connections: usize,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    // == Constructor ==
    /// Creates the pool and eagerly establishes `min_connections` so the
    /// first requests skip connection setup.
    ///
    /// # Errors
    /// `Error::InvalidConfig` for a zero cap, a zero timeout, or a warm set
    /// larger than the cap; `Error::Connection` when pre-warming fails.
    pub async fn new(factory: F, config: &PoolConfig) -> Result<Self> {
        if config.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "Pool capacity must be > 0".to_string(),
            ));
        }
        if config.min_connections > config.max_connections {
            return Err(Error::InvalidConfig(
                "Pre-warmed connections cannot exceed the pool capacity".to_string(),
            ));
        }
        if config.acquire_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "Pool acquire timeout must be > 0".to_string(),
            ));
        }

        let mut idle = Vec::with_capacity(config.min_connections);
        for _ in 0..config.min_connections {
            idle.push(factory.connect().await.map_err(Error::Connection)?);
        }

        info!(
            warmed = idle.len(),
            max = config.max_connections,
            "Connection pool initialized"
        );

        Ok(Self {
            shared: Arc::new(PoolShared {
                factory,
                state: Mutex::new(PoolState {
                    created: idle.len(),
                    idle,
                }),
                semaphore: Arc::new(Semaphore::new(config.max_connections)),
                max_connections: config.max_connections,
                acquire_timeout: config.acquire_timeout,
                closed: AtomicBool::new(false),
            }),
        })
    }

    // == Acquire ==
    /// Acquires a connection, waiting up to the configured timeout.
    pub async fn acquire(&self) -> Result<PoolGuard<F>> {
        self.acquire_with_timeout(self.shared.acquire_timeout).await
    }

    // == Acquire With Timeout ==
    /// Acquires a connection, waiting up to `timeout` for a free slot.
    ///
    /// # Errors
    /// `Error::PoolExhausted` when no connection frees up in time (a
    /// transient, retryable condition) and `Error::PoolClosed` after
    /// `close_all`.
    pub async fn acquire_with_timeout(&self, timeout: Duration) -> Result<PoolGuard<F>> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::PoolClosed);
        }

        let permit = tokio::time::timeout(
            timeout,
            Arc::clone(&self.shared.semaphore).acquire_owned(),
        )
        .await
        .map_err(|_| Error::PoolExhausted(timeout))?
        .map_err(|_| Error::PoolClosed)?;

        let idle = self.shared.state.lock().idle.pop();
        let conn = match idle {
            Some(conn) => conn,
            None => {
                // Holding the permit caps live connections, so creating one
                // here cannot overshoot max_connections
                let conn = self
                    .shared
                    .factory
                    .connect()
                    .await
                    .map_err(Error::Connection)?;
                self.shared.state.lock().created += 1;
                debug!("Created pool connection on demand");
                conn
            }
        };

        Ok(PoolGuard {
            conn: Some(conn),
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    // == Close All ==
    /// Shuts the pool down: closes idle connections and fails every current
    /// and future `acquire`. Checked-out connections are discarded when
    /// their guards drop.
    pub fn close_all(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.semaphore.close();

        let mut state = self.shared.state.lock();
        let mut conns: Vec<F::Connection> = state.idle.drain(..).collect();
        state.created -= conns.len();
        drop(state);

        for conn in conns.iter_mut() {
            conn.close();
        }
        info!(closed = conns.len(), "Connection pool closed");
    }

    // == Status ==
    /// Returns a snapshot of pool occupancy.
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        PoolStatus {
            idle: state.idle.len(),
            created: state.created,
            max_connections: self.shared.max_connections,
        }
    }
}

// == Pool Guard ==
/// Scoped connection handle.
///
/// Dropping the guard returns the connection to the pool on every exit
/// path. The release runs the connection's liveness probe first: a broken
/// connection is closed and its slot freed instead of being re-pooled.
pub struct PoolGuard<F: ConnectionFactory> {
    conn: Option<F::Connection>,
    shared: Arc<PoolShared<F>>,
    _permit: OwnedSemaphorePermit,
}

impl<F: ConnectionFactory> Deref for PoolGuard<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<F: ConnectionFactory> DerefMut for PoolGuard<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<F: ConnectionFactory> Drop for PoolGuard<F> {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        if self.shared.closed.load(Ordering::SeqCst) {
            conn.close();
            self.shared.state.lock().created -= 1;
            return;
        }

        if conn.is_valid() {
            self.shared.state.lock().idle.push(conn);
        } else {
            warn!("Discarding pool connection that failed its health check");
            conn.close();
            self.shared.state.lock().created -= 1;
        }
        // The held permit drops last, freeing the slot
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// In-memory stand-in for a database connection.
    struct TestConn {
        healthy: bool,
    }

    impl ManagedConnection for TestConn {
        fn is_valid(&mut self) -> bool {
            self.healthy
        }
    }

    #[derive(Default)]
    struct TestFactory {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionFactory for TestFactory {
        type Connection = TestConn;

        async fn connect(&self) -> anyhow::Result<TestConn> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(TestConn { healthy: true })
        }
    }

    fn config(max: usize, min: usize) -> PoolConfig {
        PoolConfig {
            max_connections: max,
            min_connections: min,
            acquire_timeout: Duration::from_millis(100),
        }
    }

    async fn pool(max: usize, min: usize) -> ConnectionPool<TestFactory> {
        ConnectionPool::new(TestFactory::default(), &config(max, min))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_rejects_zero_capacity() {
        let result = ConnectionPool::new(TestFactory::default(), &config(0, 0)).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_new_rejects_min_above_max() {
        let result = ConnectionPool::new(TestFactory::default(), &config(2, 5)).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_pre_warms_min_connections() {
        let pool = pool(10, 3).await;

        let status = pool.status();
        assert_eq!(status.idle, 3);
        assert_eq!(status.created, 3);
        assert_eq!(status.max_connections, 10);
        assert_eq!(pool.shared.factory.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_acquire_reuses_idle_connection() {
        let pool = pool(10, 1).await;

        {
            let _guard = pool.acquire().await.unwrap();
        }
        let _guard = pool.acquire().await.unwrap();

        // Both acquisitions were served by the single pre-warmed connection
        assert_eq!(pool.shared.factory.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_acquire_creates_below_cap() {
        let pool = pool(2, 0).await;

        let _a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();

        assert_eq!(pool.status().created, 2);
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let pool = pool(1, 0).await;

        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire_with_timeout(Duration::from_millis(20)).await;

        assert!(matches!(result, Err(Error::PoolExhausted(_))));
    }

    #[tokio::test]
    async fn test_release_unblocks_waiter() {
        let pool = pool(1, 0).await;

        let guard = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.acquire_with_timeout(Duration::from_secs(2)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_broken_connection_is_discarded_on_release() {
        let pool = pool(5, 1).await;

        {
            let mut guard = pool.acquire().await.unwrap();
            guard.healthy = false;
        }

        let status = pool.status();
        assert_eq!(status.idle, 0);
        assert_eq!(status.created, 0);

        // The next acquire transparently creates a replacement
        let _guard = pool.acquire().await.unwrap();
        assert_eq!(pool.shared.factory.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_close_all_fails_future_acquires() {
        let pool = pool(5, 2).await;

        pool.close_all();

        assert!(matches!(pool.acquire().await, Err(Error::PoolClosed)));
        assert_eq!(pool.status().created, 0);
    }

    #[tokio::test]
    async fn test_guard_dropped_after_close_is_discarded() {
        let pool = pool(5, 0).await;

        let guard = pool.acquire().await.unwrap();
        pool.close_all();
        drop(guard);

        assert_eq!(pool.status().created, 0);
        assert_eq!(pool.status().idle, 0);
    }
}
