// Background idle reaper

use super::ConnectionPool;
use crate::application::shutdown::ShutdownToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

impl ConnectionPool {
    /// Periodically evict expired idle connections, so the idle set shrinks
    /// even when nobody acquires.
    ///
    /// Stops on shutdown, when the pool is closed, or once the pool is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, mut shutdown: ShutdownToken) -> JoinHandle<()> {
        let pool = Arc::downgrade(self);
        let period = self.policy().reap_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.wait() => break,
                }

                let Some(pool) = pool.upgrade() else { break };
                if pool.is_closed() {
                    break;
                }
                pool.evict_idle().await;
            }
            debug!("Idle reaper stopped");
        })
    }
}
