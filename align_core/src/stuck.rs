//! Detects an actuator that keeps missing its commanded position.

use std::time::Duration;

/// Outcome of one position check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckVerdict {
    /// Position matches the command.
    Clear,
    /// Mismatch within budget; re-send the target.
    Stuck,
    /// Mismatch has outlasted the budget.
    Reinitialize,
}

#[derive(Debug, Clone)]
pub struct StuckGuard {
    timeout: Duration,
    since: Option<Duration>,
}

impl StuckGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            since: None,
        }
    }

    /// Feed one observation. `now` is the caller's monotonic elapsed time.
    ///
    /// Escalation clears the timer so the next mismatch starts a fresh budget.
    pub fn on_expected_position(&mut self, matched: bool, now: Duration) -> StuckVerdict {
        if matched {
            self.since = None;
            return StuckVerdict::Clear;
        }
        let since = *self.since.get_or_insert(now);
        if now.saturating_sub(since) > self.timeout {
            self.since = None;
            StuckVerdict::Reinitialize
        } else {
            StuckVerdict::Stuck
        }
    }

    pub fn stuck_since(&self) -> Option<Duration> {
        self.since
    }

    pub fn clear(&mut self) {
        self.since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn first_mismatch_starts_timer() {
        let mut g = StuckGuard::new(secs(200));
        assert_eq!(g.on_expected_position(false, secs(10)), StuckVerdict::Stuck);
        assert_eq!(g.stuck_since(), Some(secs(10)));
        assert_eq!(g.on_expected_position(false, secs(150)), StuckVerdict::Stuck);
        assert_eq!(g.stuck_since(), Some(secs(10)));
    }

    #[test]
    fn escalates_only_past_timeout() {
        let mut g = StuckGuard::new(secs(200));
        g.on_expected_position(false, secs(0));
        assert_eq!(g.on_expected_position(false, secs(200)), StuckVerdict::Stuck);
        assert_eq!(
            g.on_expected_position(false, secs(201)),
            StuckVerdict::Reinitialize
        );
        assert_eq!(g.stuck_since(), None);
    }

    #[test]
    fn match_clears_timer() {
        let mut g = StuckGuard::new(secs(5));
        g.on_expected_position(false, secs(0));
        assert_eq!(g.on_expected_position(true, secs(4)), StuckVerdict::Clear);
        assert_eq!(g.on_expected_position(false, secs(100)), StuckVerdict::Stuck);
        assert_eq!(g.stuck_since(), Some(secs(100)));
    }
}
