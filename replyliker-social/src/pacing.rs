//! Randomized pauses between remote calls.
//!
//! The remote service flags bursts, so every paginated read and every like is
//! separated by a uniformly random delay. [`Pacer`] is the seam tests use to
//! skip real waiting.
use async_trait::async_trait;
use rand::Rng;
use rand::rngs::OsRng;
use replyliker_config::PacingSettings;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait before the next remote call.
    async fn pause(&self);
}

#[derive(Debug, Error)]
#[error("pacing window is inverted: min {min:?} > max {max:?}")]
pub struct InvalidPacingWindow {
    pub min: Duration,
    pub max: Duration,
}

/// Sleeps a uniformly random duration in `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct RandomPacer {
    min: Duration,
    max: Duration,
}

impl RandomPacer {
    /// ```
    /// use replyliker_social::pacing::RandomPacer;
    /// use std::time::Duration;
    ///
    /// let pacer = RandomPacer::new(Duration::from_millis(1700), Duration::from_millis(2500)).unwrap();
    /// let d = pacer.next_delay();
    /// assert!(d >= Duration::from_millis(1700) && d <= Duration::from_millis(2500));
    /// assert!(RandomPacer::new(Duration::from_secs(2), Duration::from_secs(1)).is_err());
    /// ```
    pub fn new(min: Duration, max: Duration) -> Result<Self, InvalidPacingWindow> {
        if min > max {
            return Err(InvalidPacingWindow { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn from_settings(settings: &PacingSettings) -> Result<Self, InvalidPacingWindow> {
        Self::new(
            Duration::from_millis(settings.min_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
        )
    }

    pub fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(OsRng.gen_range(min..=max))
    }
}

#[async_trait]
impl Pacer for RandomPacer {
    async fn pause(&self) {
        let delay = self.next_delay();
        tracing::trace!(delay_ms = delay.as_millis() as u64, "pacing.pause");
        sleep(delay).await;
    }
}
