//! Suspension points of a playback session

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

/// Performs the waits of a session: the gap before each event, the drain
/// tick and the pause after each transmitted command.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock waits on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Clock that only accumulates the requested waits. Each sleep still yields
/// to the runtime once so stop signals get a chance to fire.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    elapsed: Arc<Mutex<Duration>>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time slept so far.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Clock for SimulatedClock {
    async fn sleep(&self, duration: Duration) {
        {
            let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
            *elapsed += duration;
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_clock_accumulates() {
        let clock = SimulatedClock::new();
        let probe = clock.clone();
        clock.sleep(Duration::from_millis(250)).await;
        clock.sleep(Duration::from_millis(50)).await;
        assert_eq!(probe.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_waits() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_millis(40)).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
