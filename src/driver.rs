//! Real-time Driver
//!
//! Advances a shared engine on wall-clock time. A background task ticks on a
//! fixed resolution, feeds the elapsed milliseconds into the engine's virtual
//! clock and publishes a snapshot on a `watch` channel after every tick that
//! moved anything. The engine lock is never held across an await point.
//!
//! A panic raised while advancing (a task body or a subscriber callback) is
//! caught, counted and logged; the driver keeps ticking.

use crate::api::{SharedEngine, lock};
use crate::state::Snapshot;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Wall-clock interval between engine advances
    pub resolution_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { resolution_ms: 100 }
    }
}

#[derive(Debug, Default)]
pub struct DriverStats {
    pub ticks: AtomicU64,
    pub firings: AtomicU64,
    pub published: AtomicU64,
    /// Ticks abandoned because advancing panicked
    pub panics: AtomicU64,
}

pub struct RealtimeDriver {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
    snapshots: watch::Receiver<Snapshot>,
    stats: Arc<DriverStats>,
}

impl RealtimeDriver {
    /// Spawn the driver on the current tokio runtime
    pub fn spawn(engine: SharedEngine, config: DriverConfig) -> Self {
        let initial = lock(&engine).snapshot();
        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();
        let stats = Arc::new(DriverStats::default());

        let worker_cancel = cancel.clone();
        let worker_stats = stats.clone();
        let handle = tokio::spawn(async move {
            Self::worker(engine, config, tx, worker_cancel, worker_stats).await;
        });

        Self {
            handle,
            cancel,
            snapshots: rx,
            stats,
        }
    }

    /// Receiver that always holds the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Token that stops the driver when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    /// Stop the worker and wait for it to finish
    pub async fn shutdown(self) -> Arc<DriverStats> {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Driver task ended abnormally");
        }
        self.stats
    }

    async fn worker(
        engine: SharedEngine,
        config: DriverConfig,
        tx: watch::Sender<Snapshot>,
        cancel: CancellationToken,
        stats: Arc<DriverStats>,
    ) {
        let resolution = Duration::from_millis(config.resolution_ms.max(1));
        let mut interval = tokio::time::interval(resolution);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();

        info!(resolution_ms = config.resolution_ms, "Real-time driver started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let now = Instant::now();
                    let delta_ms = now.duration_since(last).as_millis() as u64;
                    if delta_ms == 0 {
                        continue;
                    }
                    // Carry the sub-millisecond remainder into the next tick
                    last += Duration::from_millis(delta_ms);

                    let outcome = {
                        let mut engine = lock(&engine);
                        panic::catch_unwind(AssertUnwindSafe(|| {
                            let summary = engine.advance(delta_ms);
                            let moved = summary.fired + summary.failed > 0;
                            let snapshot = moved.then(|| engine.snapshot());
                            (summary, snapshot)
                        }))
                    };

                    stats.ticks.fetch_add(1, Ordering::Relaxed);
                    let Ok((summary, snapshot)) = outcome else {
                        stats.panics.fetch_add(1, Ordering::Relaxed);
                        warn!(delta_ms, "Engine panicked while advancing, tick dropped");
                        continue;
                    };
                    stats.firings.fetch_add(summary.fired + summary.failed, Ordering::Relaxed);

                    if let Some(snapshot) = snapshot {
                        if tx.send(snapshot).is_err() {
                            debug!("All snapshot receivers dropped");
                        }
                        stats.published.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        info!(
            ticks = stats.ticks.load(Ordering::Relaxed),
            firings = stats.firings.load(Ordering::Relaxed),
            panics = stats.panics.load(Ordering::Relaxed),
            "Real-time driver stopped"
        );
    }
}
