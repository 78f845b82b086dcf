// Store Connection Ports (implemented by the transport adapter)

use crate::domain::{Command, Reply};
use async_trait::async_trait;
use thiserror::Error;

/// Operational errors raised while dialing or talking to the store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Database select failed: {0}")]
    SelectDatabase(String),

    #[error("Connection pool exhausted ({max_active} active)")]
    PoolExhausted { max_active: usize },

    #[error("Connection pool closed")]
    PoolClosed,
}

impl StoreError {
    /// Whether the connection that produced this error can no longer be trusted.
    ///
    /// Server error replies leave the stream in sync; transport and framing
    /// errors do not.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_) | StoreError::Tls(_) | StoreError::Protocol(_)
        )
    }
}

/// One physical, ready-to-use connection to the store
#[async_trait]
pub trait StoreConnection: Send {
    /// Send one command and wait for its reply.
    ///
    /// Error replies from the server are returned as `StoreError::Server`.
    async fn execute(&mut self, command: Command) -> Result<Reply, StoreError>;

    /// Close the underlying transport (best effort).
    ///
    /// The pool calls this on every connection it retires. A connection that
    /// is only dropped releases its socket without a graceful shutdown.
    async fn close(&mut self);
}

/// Dial strategy: produces fully prepared connections (auth + database applied)
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> Result<Box<dyn StoreConnection>, StoreError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Shared view of one mock connection, kept by the dialer for inspection
    #[derive(Clone, Default)]
    pub struct MockConnectionHandle {
        dead: Arc<AtomicBool>,
        stalled: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
        shut_down: Arc<AtomicBool>,
        ping_reply: Arc<Mutex<Option<Reply>>>,
        commands: Arc<Mutex<Vec<String>>>,
    }

    impl MockConnectionHandle {
        /// Make every subsequent command fail with a broken pipe
        pub fn kill(&self) {
            self.dead.store(true, Ordering::SeqCst);
        }

        /// Make every subsequent command wait forever for its reply
        pub fn stall(&self) {
            self.stalled.store(true, Ordering::SeqCst);
        }

        /// Answer PING with `reply` instead of PONG
        pub fn answer_ping_with(&self, reply: Reply) {
            *self.ping_reply.lock() = Some(reply);
        }

        /// Closed by `close()` or by being dropped
        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        /// Closed through `close()`
        pub fn was_shut_down(&self) -> bool {
            self.shut_down.load(Ordering::SeqCst)
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().clone()
        }
    }

    /// Mock connection: answers PING with PONG and anything else with OK
    pub struct MockConnection {
        handle: MockConnectionHandle,
    }

    impl Drop for MockConnection {
        fn drop(&mut self) {
            self.handle.closed.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StoreConnection for MockConnection {
        async fn execute(&mut self, command: Command) -> Result<Reply, StoreError> {
            if self.handle.dead.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "mock connection killed",
                )));
            }
            self.handle.commands.lock().push(command.name().to_string());
            if self.handle.stalled.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            match command.name() {
                "PING" => Ok(self
                    .handle
                    .ping_reply
                    .lock()
                    .clone()
                    .unwrap_or_else(|| Reply::Simple("PONG".to_string()))),
                _ => Ok(Reply::ok()),
            }
        }

        async fn close(&mut self) {
            self.handle.shut_down.store(true, Ordering::SeqCst);
            self.handle.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Mock dialer that records every connection it hands out
    #[derive(Default)]
    pub struct MockDialer {
        dials: AtomicUsize,
        fail_with_auth: AtomicBool,
        handles: Mutex<Vec<MockConnectionHandle>>,
    }

    impl MockDialer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent dials fail as if AUTH was rejected
        pub fn reject_auth(&self, reject: bool) {
            self.fail_with_auth.store(reject, Ordering::SeqCst);
        }

        /// Number of dial attempts (successful or not)
        pub fn dial_count(&self) -> usize {
            self.dials.load(Ordering::SeqCst)
        }

        pub fn handle(&self, index: usize) -> MockConnectionHandle {
            self.handles.lock()[index].clone()
        }

        pub fn kill_all(&self) {
            for handle in self.handles.lock().iter() {
                handle.kill();
            }
        }
    }

    #[async_trait]
    impl Dialer for MockDialer {
        async fn dial(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            if self.fail_with_auth.load(Ordering::SeqCst) {
                return Err(StoreError::Auth("WRONGPASS invalid password".to_string()));
            }
            let handle = MockConnectionHandle::default();
            self.handles.lock().push(handle.clone());
            Ok(Box::new(MockConnection { handle }))
        }
    }
}
