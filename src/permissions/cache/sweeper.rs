/*!
 * Cache Sweeper
 *
 * Background task that drops stale permission cache entries once per TTL,
 * independently of lookups.
 *
 * Shutdown follows the graceful-with-fallback pattern: prefer
 * `shutdown().await`; if the handle is dropped without it, the task is
 * aborted and a warning is logged.
 */

use super::PermissionCache;
use crate::core::limits::MIN_SWEEP_PERIOD;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Control messages for the sweeper task
#[derive(Debug, Clone)]
pub enum SweeperCommand {
    /// Sweep now instead of waiting for the next tick
    Trigger,
    /// Shutdown the sweeper task
    Shutdown,
}

/// Handle to the sweeper background task
pub struct CacheSweeper {
    command_tx: mpsc::UnboundedSender<SweeperCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Tracks whether graceful shutdown was initiated (lock-free)
    shutdown_initiated: Arc<AtomicBool>,
}

impl CacheSweeper {
    /// Sweep every TTL
    pub fn spawn(cache: Arc<PermissionCache>) -> Self {
        let period = cache.ttl();
        Self::spawn_with_period(cache, period)
    }

    /// `period` is clamped to `MIN_SWEEP_PERIOD`
    pub fn spawn_with_period(cache: Arc<PermissionCache>, period: Duration) -> Self {
        let period = period.max(MIN_SWEEP_PERIOD);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shutdown_initiated = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(async move {
            run_sweep_loop(cache, period, command_rx).await;
        });

        info!(period_ms = period.as_millis() as u64, "Permission cache sweeper spawned");

        Self {
            command_tx,
            handle: Some(handle),
            shutdown_initiated,
        }
    }

    /// Trigger an immediate sweep
    pub fn trigger(&self) {
        let _ = self.command_tx.send(SweeperCommand::Trigger);
    }

    /// Shutdown the sweeper gracefully, waiting for the task to finish
    pub async fn shutdown(mut self) {
        self.shutdown_initiated.store(true, Ordering::SeqCst);
        let _ = self.command_tx.send(SweeperCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache sweeper shutdown error");
            } else {
                info!("Cache sweeper shutdown complete");
            }
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        if self.shutdown_initiated.load(Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.take() {
            warn!("Cache sweeper dropped without shutdown(), aborting task");
            handle.abort();
        }
    }
}

async fn run_sweep_loop(
    cache: Arc<PermissionCache>,
    period: Duration,
    mut command_rx: mpsc::UnboundedReceiver<SweeperCommand>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                cache.sweep();
            }
            command = command_rx.recv() => match command {
                Some(SweeperCommand::Trigger) => {
                    debug!("Manual cache sweep");
                    cache.sweep();
                }
                Some(SweeperCommand::Shutdown) | None => break,
            },
        }
    }
}
