use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_STAGGER: Duration = Duration::from_millis(2500);

/// Delay queue for batch dispatch: job `i` is released `i * interval` after
/// the batch starts. Release times are cumulative and monotonic, so dispatch
/// order always follows job order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSchedule {
    interval: Duration,
}

impl DispatchSchedule {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn delay_for(&self, index: usize) -> Duration {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        self.interval.saturating_mul(index)
    }

    pub fn release_at(&self, start: Instant, index: usize) -> Instant {
        start + self.delay_for(index)
    }

    pub async fn wait_turn(&self, start: Instant, index: usize) {
        if index == 0 || self.interval.is_zero() {
            return;
        }
        tokio::time::sleep_until(self.release_at(start, index)).await;
    }
}

impl Default for DispatchSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_STAGGER)
    }
}
