//! Background idle-session eviction.

use super::lock::SessionLocks;
use flowcall_core::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Evicts sessions idle for longer than `ttl`, every `period`.
pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    locks: Option<Arc<SessionLocks>>,
    ttl: Duration,
    period: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration, period: Duration) -> Self {
        Self {
            store,
            locks: None,
            ttl,
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// Also prunes idle per-session locks after each sweep.
    pub fn with_locks(mut self, locks: Arc<SessionLocks>) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Runs one sweep immediately.
    pub async fn sweep_once(&self) -> usize {
        let evicted = self.store.sweep(self.ttl).await;
        if evicted > 0 {
            tracing::info!(target: "session_sweep", "Evicted {} idle sessions", evicted);
        } else {
            tracing::debug!(target: "session_sweep", "Tick - nothing to evict");
        }
        if let Some(locks) = &self.locks {
            locks.prune().await;
        }
        evicted
    }

    /// Spawns the sweep loop on the current runtime.
    ///
    /// The loop runs until the returned handle is shut down or dropped.
    pub fn start(self) -> SweeperHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            tracing::info!(
                target: "session_sweep",
                "Sweeper started ({:?} interval, {:?} ttl)",
                self.period,
                self.ttl
            );

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                }
            }
            tracing::info!(target: "session_sweep", "Sweeper stopped");
        });

        SweeperHandle {
            token,
            task: Some(task),
        }
    }
}

/// Controls a running [`SessionSweeper`].
pub struct SweeperHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stops the loop and waits for it to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(target: "session_sweep", "Sweeper task failed: {}", e);
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
