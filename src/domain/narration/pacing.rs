use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Source of delays, swapped out in tests so pacing does not hit the wall clock
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Timer backed by the tokio runtime
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Keeps a fixed gap between consecutive calls to the synthesis service.
///
/// One throttle lives for one request. The first call goes through
/// immediately, every later call waits `delay` first.
pub struct Throttle {
    timer: Arc<dyn Timer>,
    delay: Duration,
    calls: usize,
}

impl Throttle {
    pub fn new(timer: Arc<dyn Timer>, delay: Duration) -> Self {
        Self {
            timer,
            delay,
            calls: 0,
        }
    }

    /// Wait until the next call is allowed
    pub async fn ready(&mut self) {
        if self.calls > 0 && !self.delay.is_zero() {
            tracing::debug!(delay_ms = self.delay.as_millis(), "Pacing synthesis call");
            self.timer.sleep(self.delay).await;
        }
        self.calls += 1;
    }
}
