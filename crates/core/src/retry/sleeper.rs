use std::time::Duration;

use async_trait::async_trait;

/// Waits between attempts.
///
/// Production code uses [`TokioSleeper`]; tests substitute implementations that record
/// the requested durations and return immediately.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
