//! Simulation context implementing TrackingContext for deterministic tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use trackview_env::TrackingContext;

/// Context backed by a virtual clock.
///
/// `sleep` advances the clock and returns immediately, so a replay that would
/// take minutes of wall time finishes in microseconds with the same frame
/// order.
pub struct SimContext {
    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<AtomicU64>,

    /// Epoch offset (virtual time 0 maps to this wall-clock time)
    epoch: SystemTime,
}

impl SimContext {
    /// Creates a context whose virtual time 0 is 2022-09-11 11:40:00 UTC,
    /// the start of the reference recording.
    pub fn new() -> Self {
        Self::with_epoch(UNIX_EPOCH + Duration::from_millis(1_662_896_400_000))
    }

    /// Creates a context with an explicit epoch.
    pub fn with_epoch(epoch: SystemTime) -> Self {
        Self {
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
            epoch,
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        self.virtual_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.load(Ordering::SeqCst)
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            epoch: self.epoch,
        }
    }
}

#[async_trait]
impl TrackingContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(task = name, virtual_ns = self.time_ns(), "spawning simulated task");
        tokio::spawn(future);
    }
}
