// Checked-out connection guard

use super::PoolShared;
use crate::domain::{Command, Reply};
use crate::port::{StoreConnection, StoreError};
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;

/// A connection borrowed from the pool.
///
/// Dropping it releases the connection back to the idle set, unless a
/// transport or protocol error was observed on it, or a command was cancelled
/// before its reply was read. Such connections are closed instead.
pub struct PooledConnection {
    conn: Option<Box<dyn StoreConnection>>,
    shared: Arc<PoolShared>,
    broken: bool,
    _permit: Option<OwnedSemaphorePermit>,
}

impl PooledConnection {
    pub(super) fn new(
        conn: Box<dyn StoreConnection>,
        shared: Arc<PoolShared>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        shared.checked_out();
        Self {
            conn: Some(conn),
            shared,
            broken: false,
            _permit: permit,
        }
    }

    /// Send one command on the borrowed connection.
    ///
    /// Cancel-safe in the sense that matters to the pool: if the future is
    /// dropped mid-command, the connection is marked broken and never reused.
    pub async fn execute(&mut self, command: Command) -> Result<Reply, StoreError> {
        if self.broken {
            return Err(StoreError::Protocol(
                "connection is out of sync; release it and acquire another".to_string(),
            ));
        }
        let conn = self.conn.as_mut().ok_or(StoreError::PoolClosed)?;
        // Cleared only once the reply has been read in full
        self.broken = true;
        let result = conn.execute(command).await;
        self.broken = matches!(&result, Err(e) if e.is_connection_fatal());
        result
    }

    /// Whether the connection will be closed instead of reused
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Return the connection to the pool (same as dropping it)
    pub fn release(self) {}

    /// Close the connection instead of returning it to the pool
    pub fn discard(mut self) {
        self.broken = true;
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.shared.put(conn, self.broken);
        }
    }
}
