// Connection Pool - lazily dialed, liveness-checked, idle-bounded

mod guard;
mod reaper;

pub use guard::PooledConnection;

use crate::domain::{Command, PoolPolicy, Reply};
use crate::port::{Dialer, StoreConnection, StoreError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Point-in-time view of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub active: usize,
    pub max_idle: usize,
    pub max_active: Option<usize>,
}

struct IdleConnection {
    conn: Box<dyn StoreConnection>,
    since: Instant,
}

struct IdleSet {
    // Most recently released first, oldest at the back
    connections: VecDeque<IdleConnection>,
    closed: bool,
}

impl IdleSet {
    /// Remove connections idle for at least `timeout`; zero disables eviction
    fn drain_stale(&mut self, timeout: Duration) -> Vec<Box<dyn StoreConnection>> {
        let mut stale = Vec::new();
        if timeout.is_zero() {
            return stale;
        }
        let now = Instant::now();
        while let Some(oldest) = self.connections.back() {
            if now.duration_since(oldest.since) < timeout {
                break;
            }
            if let Some(expired) = self.connections.pop_back() {
                stale.push(expired.conn);
            }
        }
        stale
    }
}

pub(crate) struct PoolShared {
    dialer: Arc<dyn Dialer>,
    policy: PoolPolicy,
    idle: Mutex<IdleSet>,
    active: AtomicUsize,
    limiter: Option<Arc<Semaphore>>,
}

impl PoolShared {
    fn checked_out(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    /// Take a connection back from a caller
    fn put(&self, conn: Box<dyn StoreConnection>, broken: bool) {
        self.active.fetch_sub(1, Ordering::SeqCst);

        let mut overflow = Vec::new();
        {
            let mut idle = self.idle.lock();
            if broken || idle.closed {
                overflow.push(conn);
            } else {
                idle.connections.push_front(IdleConnection {
                    conn,
                    since: Instant::now(),
                });
                while idle.connections.len() > self.policy.max_idle {
                    if let Some(oldest) = idle.connections.pop_back() {
                        overflow.push(oldest.conn);
                    }
                }
                overflow.extend(idle.drain_stale(self.policy.idle_timeout));
            }
        }

        if broken {
            debug!("Closing connection after transport error");
        }
        close_detached(overflow);
    }

    fn pop_idle(&self) -> Option<IdleConnection> {
        self.idle.lock().connections.pop_front()
    }

    fn take_stale(&self) -> Vec<Box<dyn StoreConnection>> {
        self.idle.lock().drain_stale(self.policy.idle_timeout)
    }
}

async fn close_all(connections: Vec<Box<dyn StoreConnection>>) {
    for mut conn in connections {
        conn.close().await;
    }
}

/// Close connections from a synchronous context (release runs in `Drop`).
///
/// Outside a runtime the connections are dropped, which still releases the
/// socket but skips the graceful shutdown.
fn close_detached(connections: Vec<Box<dyn StoreConnection>>) {
    if connections.is_empty() {
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(close_all(connections));
        }
        Err(_) => drop(connections),
    }
}

fn is_pong(reply: &Reply) -> bool {
    matches!(reply, Reply::Simple(s) if s == "PONG")
}

/// Bounded pool of ready-to-use store connections.
///
/// Connections are dialed on demand through the `Dialer`. Idle connections
/// are pinged before reuse and closed once older than the idle timeout.
/// `max_idle` caps how many are kept for reuse, not how many callers may hold
/// one at the same time; that is `max_active`, unbounded by default.
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

impl ConnectionPool {
    pub fn new(dialer: Arc<dyn Dialer>, policy: PoolPolicy) -> Self {
        info!(
            max_idle = policy.max_idle,
            max_active = ?policy.max_active,
            idle_timeout_secs = policy.idle_timeout.as_secs(),
            "Connection pool created"
        );
        let limiter = policy.max_active.map(|n| Arc::new(Semaphore::new(n)));
        Self {
            shared: Arc::new(PoolShared {
                dialer,
                policy,
                idle: Mutex::new(IdleSet {
                    connections: VecDeque::new(),
                    closed: false,
                }),
                active: AtomicUsize::new(0),
                limiter,
            }),
        }
    }

    pub fn policy(&self) -> &PoolPolicy {
        &self.shared.policy
    }

    /// Borrow a ready-to-use connection.
    ///
    /// Reuses the most recently released idle connection that answers PING,
    /// closing any that don't, and dials a new one when none is left.
    ///
    /// # Errors
    /// Dial failures (network, TLS, AUTH, SELECT) are returned unchanged and
    /// never retried here. `PoolExhausted` when `max_active` connections are
    /// already checked out, `PoolClosed` after `close()`.
    pub async fn acquire(&self) -> Result<PooledConnection, StoreError> {
        if self.is_closed() {
            return Err(StoreError::PoolClosed);
        }

        let permit = match &self.shared.limiter {
            Some(limiter) => Some(limiter.clone().try_acquire_owned().map_err(|_| {
                StoreError::PoolExhausted {
                    max_active: self.shared.policy.max_active.unwrap_or_default(),
                }
            })?),
            None => None,
        };

        close_all(self.shared.take_stale()).await;

        while let Some(idle) = self.shared.pop_idle() {
            let mut conn = idle.conn;
            match conn.execute(Command::ping()).await {
                Ok(reply) if is_pong(&reply) => {
                    return Ok(PooledConnection::new(conn, self.shared.clone(), permit))
                }
                Ok(reply) => {
                    warn!(reply = ?reply, "Idle connection answered PING out of sync, discarding");
                    conn.close().await;
                }
                Err(e) => {
                    warn!(error = %e, "Idle connection failed liveness check, discarding");
                    conn.close().await;
                }
            }
        }

        let conn = self.shared.dialer.dial().await.map_err(|e| {
            warn!(error = %e, "Failed to dial store connection");
            e
        })?;
        debug!("Dialed new store connection");
        Ok(PooledConnection::new(conn, self.shared.clone(), permit))
    }

    /// Close idle connections older than the idle timeout; returns how many.
    pub async fn evict_idle(&self) -> usize {
        let stale = self.shared.take_stale();
        let evicted = stale.len();
        close_all(stale).await;
        if evicted > 0 {
            debug!(evicted, idle = self.stats().idle, "Evicted expired idle connections");
        }
        evicted
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.shared.idle.lock().connections.len(),
            active: self.shared.active.load(Ordering::SeqCst),
            max_idle: self.shared.policy.max_idle,
            max_active: self.shared.policy.max_active,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.idle.lock().closed
    }

    /// Close every idle connection and refuse further acquisitions.
    ///
    /// Connections still checked out are closed when released.
    pub async fn close(&self) {
        let drained: Vec<_> = {
            let mut idle = self.shared.idle.lock();
            idle.closed = true;
            idle.connections.drain(..).map(|ic| ic.conn).collect()
        };
        let count = drained.len();
        close_all(drained).await;
        info!(closed_idle = count, "Connection pool closed");
    }
}
