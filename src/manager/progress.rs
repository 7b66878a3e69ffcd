//! Progress persistence throttling.

use crate::attachment::percent_of;
use std::time::{Duration, Instant};

/// What to do with a progress observation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Tick {
    /// Persist and announce a higher percent
    Persist(u8),
    /// Announce byte progress of an indeterminate transfer
    Heartbeat,
}

/// Decides which progress observations reach the record store
///
/// At most one tick is produced per `interval`. A determinate transfer only
/// ticks when the percent increased since the last persisted value.
pub(super) struct ProgressThrottle {
    interval: Duration,
    total: Option<u64>,
    last_tick: Option<Instant>,
    last_percent: Option<u8>,
}

impl ProgressThrottle {
    pub(super) fn new(interval: Duration, total: Option<u64>, initial: Option<u8>) -> Self {
        Self {
            interval,
            total,
            last_tick: None,
            last_percent: initial,
        }
    }

    /// Observe that `bytes` have been written so far
    pub(super) fn observe(&mut self, bytes: u64, now: Instant) -> Option<Tick> {
        if let Some(last_tick) = self.last_tick
            && now.duration_since(last_tick) < self.interval
        {
            return None;
        }

        let tick = match percent_of(bytes, self.total) {
            Some(percent) if self.last_percent.is_some_and(|last| percent <= last) => return None,
            Some(percent) => {
                self.last_percent = Some(percent);
                Tick::Persist(percent)
            }
            None => Tick::Heartbeat,
        };

        self.last_tick = Some(now);
        Some(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_increase_is_persisted() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(500), Some(100), Some(0));
        let now = Instant::now();

        assert_eq!(throttle.observe(0, now), None);
        assert_eq!(throttle.observe(10, now), Some(Tick::Persist(10)));
    }

    #[test]
    fn test_ticks_are_spaced_by_interval() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(500), Some(100), Some(0));
        let start = Instant::now();

        assert_eq!(throttle.observe(10, start), Some(Tick::Persist(10)));
        assert_eq!(throttle.observe(20, start + Duration::from_millis(100)), None);
        assert_eq!(
            throttle.observe(30, start + Duration::from_millis(600)),
            Some(Tick::Persist(30))
        );
    }

    #[test]
    fn test_never_reports_decrease_or_completion() {
        let mut throttle = ProgressThrottle::new(Duration::ZERO, Some(100), Some(0));
        let now = Instant::now();

        assert_eq!(throttle.observe(50, now), Some(Tick::Persist(50)));
        assert_eq!(throttle.observe(40, now), None);
        assert_eq!(throttle.observe(100, now), Some(Tick::Persist(99)));
        assert_eq!(throttle.observe(120, now), None);
    }

    #[test]
    fn test_unknown_total_only_heartbeats() {
        let mut throttle = ProgressThrottle::new(Duration::from_secs(1), None, None);
        let start = Instant::now();

        assert_eq!(throttle.observe(4096, start), Some(Tick::Heartbeat));
        assert_eq!(throttle.observe(8192, start), None);
        assert_eq!(
            throttle.observe(8192, start + Duration::from_secs(2)),
            Some(Tick::Heartbeat)
        );
    }
}
