//! Minimum spacing between transmissions.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Lets one caller through at a time, at least `interval` after the
/// previous one.
///
/// Waiting callers queue on the gate in arrival order.
#[derive(Debug)]
pub struct MinIntervalGate {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl MinIntervalGate {
    /// Create a gate with the given spacing.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Configured spacing.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for this caller's turn and record it as the latest pass.
    pub async fn pass(&self) {
        let mut last = self.last.lock().await;

        if let Some(previous) = *last
            && let Some(ready) = previous.checked_add(self.interval)
            && ready > Instant::now()
        {
            trace!(
                wait_ms = ready.saturating_duration_since(Instant::now()).as_millis(),
                "Rate limit gate waiting"
            );
            tokio::time::sleep_until(ready).await;
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_pass_is_immediate() {
        let gate = MinIntervalGate::new(Duration::from_secs(2));
        let start = Instant::now();
        gate.pass().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn passes_are_spaced() {
        let gate = MinIntervalGate::new(Duration::from_secs(2));
        let start = Instant::now();
        gate.pass().await;
        gate.pass().await;
        gate.pass().await;
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_counts_towards_interval() {
        let gate = MinIntervalGate::new(Duration::from_secs(2));
        gate.pass().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        gate.pass().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let gate = Arc::new(MinIntervalGate::new(Duration::from_millis(500)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    gate.pass().await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap().duration_since(start));
        }
        times.sort();
        assert_eq!(
            times,
            [
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_millis(1000)
            ]
        );
    }
}
