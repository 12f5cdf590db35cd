//! Replay Feed - replays a recorded dataset into the record store.
//!
//! Simulates live ingestion: one frame is inserted per interval until the
//! dataset is exhausted, a frame limit is hit, or the owner cancels.
//!
//! # Lifecycle
//!
//! ```text
//!   ReplayFeed::spawn() ──► ReplayHandle
//!        │                      │ cancel()  ──► watch<bool> = true
//!        ▼                      │ join()    ◄── oneshot<ReplayStats>
//!   [insert frame] ─► sleep(interval) ─► [insert frame] ─► ... ─► report
//! ```
//!
//! The feed only waits through its [`TrackingContext`], so under a virtual
//! clock a full replay completes without real delays.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};
use trackview_env::{EnvError, TrackingContext};

use crate::dataset::Dataset;
use crate::error::ReplayError;
use crate::store::RecordStore;

/// Task name used for spawning and logging.
pub const FEED_TASK: &str = "replay-feed";

/// Configuration for a replay run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Delay between consecutive frames (default: 10 ms)
    pub interval: Duration,

    /// Stop after this many frames (default: whole dataset)
    pub max_frames: Option<usize>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_frames: None,
        }
    }
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplayStats {
    pub frames_replayed: usize,
    pub rows_inserted: usize,
    /// True if the run stopped because of a cancel request
    pub cancelled: bool,
    /// Context wall-clock time when the run started (ms since epoch)
    pub started_at_ms: u64,
    /// Context wall-clock time when the run ended (ms since epoch)
    pub finished_at_ms: u64,
}

/// Replays a dataset into a store at a fixed rate.
pub struct ReplayFeed<Ctx: TrackingContext> {
    context: Arc<Ctx>,
    dataset: Arc<Dataset>,
    store: Arc<RecordStore>,
    config: ReplayConfig,
}

impl<Ctx: TrackingContext> ReplayFeed<Ctx> {
    pub fn new(
        context: Arc<Ctx>,
        dataset: Arc<Dataset>,
        store: Arc<RecordStore>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            context,
            dataset,
            store,
            config,
        }
    }

    /// Runs the replay to completion or until `cancel` turns true (or its
    /// sender is dropped).
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> ReplayStats {
        let limit = self
            .config
            .max_frames
            .map_or(self.dataset.len(), |m| m.min(self.dataset.len()));
        let mut stats = ReplayStats {
            started_at_ms: self.wall_ms(),
            ..Default::default()
        };

        info!(
            frames = limit,
            wall_ms = stats.started_at_ms,
            interval_ms = self.config.interval.as_millis() as u64,
            "replay started"
        );

        for (idx, frame) in self.dataset.frames().iter().take(limit).enumerate() {
            if *cancel.borrow() {
                stats.cancelled = true;
                break;
            }

            stats.rows_inserted += self.store.insert_frame(frame).await;
            stats.frames_replayed += 1;

            if idx % 100 == 0 {
                debug!(
                    frame = idx,
                    rows = stats.rows_inserted,
                    t_ms = self.context.now().as_millis() as u64,
                    "replay progress"
                );
            }

            if idx + 1 < limit && self.pause(&mut cancel).await {
                stats.cancelled = true;
                break;
            }
        }

        stats.finished_at_ms = self.wall_ms();
        info!(
            frames = stats.frames_replayed,
            rows = stats.rows_inserted,
            cancelled = stats.cancelled,
            "replay finished"
        );
        stats
    }

    /// Context wall-clock time in milliseconds since the Unix epoch.
    fn wall_ms(&self) -> u64 {
        self.context
            .system_time()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }

    /// Waits one interval. Returns true if cancellation arrived first.
    async fn pause(&self, cancel: &mut watch::Receiver<bool>) -> bool {
        let mut sleep = self.context.sleep(self.config.interval);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = cancel.changed() => match changed {
                    Ok(()) if *cancel.borrow() => return true,
                    Ok(()) => continue,
                    Err(_) => return true,
                },
            }
        }
    }

    /// Spawns the replay on the context and returns its owning handle.
    pub fn spawn(self) -> ReplayHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();
        let context = Arc::clone(&self.context);

        context.spawn(FEED_TASK, async move {
            let stats = self.run(cancel_rx).await;
            let _ = done_tx.send(stats);
        });

        ReplayHandle { cancel_tx, done_rx }
    }
}

/// Owner of a running replay. Dropping it cancels the replay.
pub struct ReplayHandle {
    cancel_tx: watch::Sender<bool>,
    done_rx: oneshot::Receiver<ReplayStats>,
}

impl ReplayHandle {
    /// Requests the replay to stop after the frame in progress.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Waits for the replay to finish.
    ///
    /// Fails with [`EnvError::Cancelled`] if the task was dropped before it
    /// could report (e.g. runtime shutdown).
    pub async fn join(self) -> Result<ReplayStats, ReplayError> {
        let ReplayHandle { cancel_tx, done_rx } = self;
        let stats = done_rx.await.map_err(|_| EnvError::cancelled(FEED_TASK))?;
        drop(cancel_tx);
        Ok(stats)
    }

    /// Waits at most `limit` of wall time; on expiry the replay is cancelled
    /// and [`EnvError::Timeout`] is returned.
    pub async fn join_within(self, limit: Duration) -> Result<ReplayStats, ReplayError> {
        let ReplayHandle { cancel_tx, done_rx } = self;
        match tokio::time::timeout(limit, done_rx).await {
            Ok(done) => done.map_err(|_| EnvError::cancelled(FEED_TASK).into()),
            Err(_) => {
                let _ = cancel_tx.send(true);
                Err(EnvError::Timeout(limit.as_millis() as u64).into())
            }
        }
    }

    /// Cancels and waits.
    pub async fn cancel_and_join(self) -> Result<ReplayStats, ReplayError> {
        self.cancel();
        self.join().await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::synth::{synthesize, SynthConfig};
    use trackview_env::TokioContext;

    fn dataset(frames: usize) -> Arc<Dataset> {
        Arc::new(synthesize(&SynthConfig {
            frames,
            humans: 3,
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_full_replay_under_virtual_clock() {
        let ctx = SimContext::shared();
        let store = RecordStore::shared();
        let feed = ReplayFeed::new(ctx.clone(), dataset(50), store.clone(), ReplayConfig::default());

        let stats = feed.spawn().join().await.unwrap();

        assert_eq!(stats.frames_replayed, 50);
        assert_eq!(stats.rows_inserted, 150);
        assert!(!stats.cancelled);
        assert_eq!(store.len().await, 150);
        // Sleeps only between frames
        assert_eq!(ctx.now(), Duration::from_millis(10 * 49));
        assert_eq!(stats.started_at_ms, 1_662_896_400_000);
        assert_eq!(stats.finished_at_ms, 1_662_896_400_000 + 490);
    }

    #[tokio::test]
    async fn test_max_frames_limits_replay() {
        let ctx = SimContext::shared();
        let store = RecordStore::shared();
        let config = ReplayConfig {
            max_frames: Some(5),
            ..Default::default()
        };
        let stats = ReplayFeed::new(ctx, dataset(50), store.clone(), config)
            .spawn()
            .join()
            .await
            .unwrap();

        assert_eq!(stats.frames_replayed, 5);
        assert_eq!(store.len().await, 15);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let store = RecordStore::shared();
        let feed = ReplayFeed::new(SimContext::shared(), dataset(10), store.clone(), ReplayConfig::default());

        let (tx, rx) = watch::channel(true);
        let stats = feed.run(rx).await;
        drop(tx);

        assert!(stats.cancelled);
        assert_eq!(stats.frames_replayed, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let store = RecordStore::shared();
        let config = ReplayConfig {
            interval: Duration::from_secs(3600),
            max_frames: None,
        };
        let handle = ReplayFeed::new(TokioContext::shared(), dataset(10), store.clone(), config).spawn();

        while store.len().await == 0 {
            tokio::task::yield_now().await;
        }

        let stats = handle.cancel_and_join().await.unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.frames_replayed, 1);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_join_within_times_out() {
        let config = ReplayConfig {
            interval: Duration::from_secs(3600),
            max_frames: None,
        };
        let handle =
            ReplayFeed::new(TokioContext::shared(), dataset(3), RecordStore::shared(), config).spawn();

        let err = handle.join_within(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, ReplayError::Env(EnvError::Timeout(20))));
    }

    #[tokio::test]
    async fn test_join_within_returns_finished_stats() {
        let handle = ReplayFeed::new(
            SimContext::shared(),
            dataset(4),
            RecordStore::shared(),
            ReplayConfig::default(),
        )
        .spawn();

        let stats = handle.join_within(Duration::from_secs(5)).await.unwrap();
        assert_eq!(stats.frames_replayed, 4);
    }

    #[tokio::test]
    async fn test_replayed_rows_are_queryable() {
        let data = dataset(20);
        let (from, to) = data.time_range().unwrap();
        let store = RecordStore::shared();
        ReplayFeed::new(SimContext::shared(), data, store.clone(), ReplayConfig::default())
            .spawn()
            .join()
            .await
            .unwrap();

        let records = store.records_in_range(from, to).await;
        assert_eq!(records.len(), 60);
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(records.iter().all(|r| r.human_id < 3));
    }
}
