//! Connection pool.
//!
//! Opens its minimum number of connections up front and fails
//! if the server refuses any of them.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::connection::{connect, Connection};
use crate::error::Error;
use crate::params::ConnectParams;

/// Pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// Connections waiting in the pool.
    pub idle: usize,
    /// Connections handed out with [`SimplePool::get`].
    pub checked_out: usize,
    /// Total number of connections managed by the pool.
    pub total: usize,
    /// Minimum pool size.
    pub min: usize,
    /// Maximum pool size.
    pub max: usize,
    /// The pool has been closed.
    pub closed: bool,
}

struct Inner {
    idle: VecDeque<Connection>,
    checked_out: usize,
    closed: bool,
}

impl Inner {
    fn total(&self) -> usize {
        self.idle.len() + self.checked_out
    }
}

/// Fixed-size connection pool.
pub struct SimplePool {
    inner: Mutex<Inner>,
    params: ConnectParams,
    min: usize,
    max: usize,
}

impl SimplePool {
    /// Create a pool and open `min` connections right away.
    pub async fn new(min: usize, max: usize, params: ConnectParams) -> Result<Self, Error> {
        if min > max {
            return Err(Error::PoolSize { min, max });
        }

        let mut idle = VecDeque::with_capacity(min);

        for _ in 0..min {
            match connect(&params).await {
                Ok(conn) => idle.push_back(conn),
                Err(err) => {
                    debug!(
                        "pool failed after {} of {} connections: {}",
                        idle.len(),
                        min,
                        err
                    );
                    for conn in idle.drain(..) {
                        conn.close().await;
                    }
                    return Err(err);
                }
            }
        }

        info!(
            "pool for \"{}\" ready [min: {}, max: {}]",
            params.user(),
            min,
            max
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                idle,
                checked_out: 0,
                closed: false,
            }),
            params,
            min,
            max,
        })
    }

    /// Get a connection from the pool, opening a new one if
    /// there is room.
    pub async fn get(&self) -> Result<Connection, Error> {
        {
            let mut guard = self.inner.lock();

            if guard.closed {
                return Err(Error::PoolClosed);
            }

            if let Some(conn) = guard.idle.pop_front() {
                guard.checked_out += 1;
                return Ok(conn);
            }

            if guard.total() >= self.max {
                return Err(Error::PoolExhausted);
            }

            // Reserve the slot while we connect.
            guard.checked_out += 1;
            debug!(
                "pool growing to {} of {} connections",
                guard.total(),
                self.max
            );
        }

        match connect(&self.params).await {
            Ok(conn) => Ok(conn),
            Err(err) => {
                self.inner.lock().checked_out -= 1;
                Err(err)
            }
        }
    }

    /// Return a connection to the pool.
    pub async fn put(&self, conn: Connection) {
        let discard = {
            let mut guard = self.inner.lock();
            guard.checked_out = guard.checked_out.saturating_sub(1);

            if guard.closed || conn.is_closed() {
                Some(conn)
            } else {
                guard.idle.push_back(conn);
                None
            }
        };

        if let Some(conn) = discard {
            conn.close().await;
        }
    }

    /// Close every idle connection. The pool can't be used afterwards.
    pub async fn close_all(&self) {
        let idle = {
            let mut guard = self.inner.lock();
            guard.closed = true;
            std::mem::take(&mut guard.idle)
        };

        let closed = idle.len();
        for conn in idle {
            conn.close().await;
        }

        debug!("pool closed {} connections", closed);
    }

    /// Pool state.
    pub fn state(&self) -> State {
        let guard = self.inner.lock();
        State {
            idle: guard.idle.len(),
            checked_out: guard.checked_out,
            total: guard.total(),
            min: self.min,
            max: self.max,
            closed: guard.closed,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::FailureKind;

    #[tokio::test]
    async fn test_min_larger_than_max() {
        let err = SimplePool::new(10, 5, ConnectParams::new("test_user"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::PoolSize { min: 10, max: 5 }));
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let pool = SimplePool::new(0, 0, ConnectParams::new("test_user"))
            .await
            .unwrap();

        let state = pool.state();
        assert_eq!(state.total, 0);
        assert!(!state.closed);

        assert!(matches!(pool.get().await, Err(Error::PoolExhausted)));

        pool.close_all().await;
        assert!(pool.state().closed);
        assert!(matches!(pool.get().await, Err(Error::PoolClosed)));
    }

    #[tokio::test]
    async fn test_first_connection_error_is_returned() {
        let params = ConnectParams::new("test_user")
            .host("127.0.0.1")
            .port("0000");
        let err = SimplePool::new(2, 4, params).await.err().unwrap();
        assert_eq!(err.kind(), FailureKind::InvalidPort);
    }

    #[tokio::test]
    async fn test_failed_get_releases_slot() {
        let params = ConnectParams::new("test_user")
            .host("127.0.0.1")
            .port("0000");
        let pool = SimplePool::new(0, 1, params).await.unwrap();

        assert!(pool.get().await.is_err());
        assert_eq!(pool.state().checked_out, 0);
    }
}
