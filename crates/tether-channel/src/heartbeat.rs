//! Ping schedule for an open connection.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Fires once per period, starting one period after it is armed.
///
/// A zero period disables the heartbeat; `tick` then never completes.
pub(crate) struct Heartbeat {
    interval: Option<Interval>,
}

impl Heartbeat {
    pub(crate) fn start(period: Duration) -> Self {
        if period.is_zero() {
            return Self { interval: None };
        }
        let interval = Instant::now().checked_add(period).map(|first| {
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Self { interval }
    }

    pub(crate) async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            },
            None => std::future::pending().await,
        }
    }
}
