use std::time::{Duration, Instant};

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Cooperative interval timer for the single-threaded run loop.
///
/// `start` and `stop` are idempotent: starting a running ticker keeps its
/// schedule, so a restart can never produce two pending ticks.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms.max(1)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Arm the timer; the first tick fires immediately
    pub fn start(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// True when a tick is due; schedules the next one
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                // Skip missed intervals instead of bursting
                let mut next = due + self.interval;
                while next <= now {
                    next += self.interval;
                }
                self.next_due = Some(next);
                true
            }
            _ => false,
        }
    }

    /// Time to wait before the next tick (zero when due or stopped)
    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::from_millis(DEFAULT_TICK_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration() {
        let ticker = Ticker::default();
        assert_eq!(ticker.interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_stopped_ticker_never_fires() {
        let mut ticker = Ticker::from_millis(100);
        assert!(!ticker.is_running());
        assert!(!ticker.poll(Instant::now()));
    }

    #[test]
    fn test_start_is_idempotent() {
        let base = Instant::now();
        let mut ticker = Ticker::from_millis(100);
        ticker.start(base);
        assert!(ticker.poll(base));

        // A second start must not re-arm an immediate tick
        ticker.start(base);
        assert!(!ticker.poll(base + Duration::from_millis(50)));
        assert!(ticker.poll(base + Duration::from_millis(100)));
    }

    #[test]
    fn test_stop_then_restart() {
        let base = Instant::now();
        let mut ticker = Ticker::from_millis(100);
        ticker.start(base);
        ticker.stop();
        ticker.stop();
        assert!(!ticker.is_running());
        assert!(!ticker.poll(base + Duration::from_secs(1)));

        ticker.start(base + Duration::from_secs(2));
        assert!(ticker.poll(base + Duration::from_secs(2)));
        assert!(!ticker.poll(base + Duration::from_secs(2)));
    }

    #[test]
    fn test_missed_intervals_fire_once() {
        let base = Instant::now();
        let mut ticker = Ticker::from_millis(100);
        ticker.start(base);
        assert!(ticker.poll(base));
        assert!(ticker.poll(base + Duration::from_millis(950)));
        assert!(!ticker.poll(base + Duration::from_millis(960)));
        assert_eq!(
            ticker.time_until_next(base + Duration::from_millis(960)),
            Duration::from_millis(40)
        );
    }
}
