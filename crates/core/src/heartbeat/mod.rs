use std::time::{Duration, Instant};

/// Fixed-rate tick source polled from the UI loop.
///
/// There is no backpressure: a poll that arrives after several periods have
/// elapsed fires once and re-anchors on `now`, so missed ticks never burst.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forgets the schedule; the next poll fires immediately.
    pub fn reset(&mut self) {
        self.next_due = None;
    }

    /// Returns true when a tick is due at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = match self.next_due {
            Some(due) if now < due => return false,
            Some(due) => due,
            None => now,
        };
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        true
    }

    /// Time left until the next tick, zero when one is already due.
    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(40);

    #[test]
    fn fires_once_per_period() {
        let start = Instant::now();
        let mut heartbeat = Heartbeat::new(PERIOD);
        assert!(heartbeat.poll(start));
        assert!(!heartbeat.poll(start + Duration::from_millis(39)));
        assert!(heartbeat.poll(start + PERIOD));
        assert!(!heartbeat.poll(start + PERIOD));
        assert!(heartbeat.poll(start + PERIOD * 2 + Duration::from_millis(5)));
        assert_eq!(
            heartbeat.time_until_next(start + PERIOD * 2 + Duration::from_millis(5)),
            PERIOD - Duration::from_millis(5)
        );
    }

    #[test]
    fn late_polls_do_not_burst() {
        let start = Instant::now();
        let mut heartbeat = Heartbeat::new(PERIOD);
        heartbeat.poll(start);

        let late = start + PERIOD * 10;
        assert!(heartbeat.poll(late));
        assert!(!heartbeat.poll(late + Duration::from_millis(1)));
        assert!(heartbeat.poll(late + PERIOD));
    }

    #[test]
    fn reset_fires_immediately() {
        let start = Instant::now();
        let mut heartbeat = Heartbeat::new(PERIOD);
        heartbeat.poll(start);
        heartbeat.reset();
        assert_eq!(heartbeat.time_until_next(start), Duration::ZERO);
        assert!(heartbeat.poll(start + Duration::from_millis(1)));
    }
}
