//! Time management: turn a UCI time control into soft and hard deadlines.
//!
//! The soft limit is checked between iterations and scaled by how stable
//! the best move has been; the hard limit is enforced inside the search
//! and by a watchdog thread.

use std::time::Instant;

/// Assumed game length when `movestogo` is absent.
const DEFAULT_MOVES_TO_GO: u64 = 30;

/// Soft-limit scale factors (percent) indexed by how many consecutive
/// iterations kept the same best move. An unsettled search gets extra
/// time; a locked-in move gives some back.
const STABILITY_PERCENT: [u64; 5] = [240, 120, 100, 90, 80];

/// Time control parsed from a `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// Search until `stop`.
    #[default]
    Infinite,
    /// Bounded by depth or nodes only; no clock.
    FixedLimit,
    /// Exactly this long, in milliseconds.
    MoveTime(u64),
    /// Remaining clock, increment and optional moves to the next control.
    Fischer {
        remaining_ms: u64,
        increment_ms: u64,
        movestogo: Option<u64>,
    },
}

impl TimeControl {
    /// Compute `(soft_ms, hard_ms)` budgets, or `None` for clockless modes.
    #[must_use]
    pub fn allocate(self, overhead_ms: u64) -> Option<(u64, u64)> {
        match self {
            TimeControl::Infinite | TimeControl::FixedLimit => None,
            TimeControl::MoveTime(ms) => {
                let budget = ms.saturating_sub(overhead_ms).max(1);
                Some((budget, budget))
            }
            TimeControl::Fischer {
                remaining_ms,
                increment_ms,
                movestogo,
            } => {
                let usable = remaining_ms.saturating_sub(overhead_ms).max(1);
                let mtg = movestogo.unwrap_or(DEFAULT_MOVES_TO_GO).max(1);
                let base = usable / mtg + increment_ms * 3 / 4;
                let soft = base.clamp(1, usable);
                let hard = (usable / 2).min(base.saturating_mul(5)).max(soft).max(1);
                Some((soft, hard))
            }
        }
    }
}

/// Deadlines for one search, shared read-only across the worker pool.
#[derive(Debug)]
pub struct TimeManager {
    start: Instant,
    soft_ms: Option<u64>,
    hard_ms: Option<u64>,
}

impl TimeManager {
    #[must_use]
    pub fn new(tc: TimeControl, overhead_ms: u64) -> Self {
        let (soft_ms, hard_ms) = match tc.allocate(overhead_ms) {
            Some((soft, hard)) => (Some(soft), Some(hard)),
            None => (None, None),
        };
        TimeManager {
            start: Instant::now(),
            soft_ms,
            hard_ms,
        }
    }

    /// A manager with no deadlines (`go infinite`, `go depth`, tests).
    #[must_use]
    pub fn unlimited() -> Self {
        TimeManager::new(TimeControl::Infinite, 0)
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn has_deadline(&self) -> bool {
        self.soft_ms.is_some()
    }

    #[must_use]
    pub fn hard_deadline_ms(&self) -> Option<u64> {
        self.hard_ms
    }

    /// Between-iteration check: do not start another depth once the scaled
    /// soft budget is spent.
    #[must_use]
    pub fn soft_exceeded(&self, stability: u32) -> bool {
        let Some(soft) = self.soft_ms else {
            return false;
        };
        let factor = STABILITY_PERCENT[(stability as usize).min(STABILITY_PERCENT.len() - 1)];
        let scaled = (soft.saturating_mul(factor) / 100).max(1);
        let hard = self.hard_ms.unwrap_or(u64::MAX);
        self.elapsed_ms() >= scaled.min(hard)
    }

    /// In-search check: abort immediately once the hard budget is spent.
    #[must_use]
    pub fn hard_exceeded(&self) -> bool {
        self.hard_ms
            .is_some_and(|hard| self.elapsed_ms() >= hard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_has_no_deadlines() {
        let tm = TimeManager::unlimited();
        assert!(!tm.has_deadline());
        assert!(!tm.soft_exceeded(0));
        assert!(!tm.hard_exceeded());
    }

    #[test]
    fn movetime_uses_the_budget_directly() {
        let (soft, hard) = TimeControl::MoveTime(500).allocate(10).unwrap();
        assert_eq!(soft, 490);
        assert_eq!(hard, 490);
    }

    #[test]
    fn movetime_never_drops_to_zero() {
        let (soft, hard) = TimeControl::MoveTime(5).allocate(50).unwrap();
        assert_eq!(soft, 1);
        assert_eq!(hard, 1);
    }

    #[test]
    fn fischer_allocation_is_sane() {
        let tc = TimeControl::Fischer {
            remaining_ms: 60_000,
            increment_ms: 1_000,
            movestogo: None,
        };
        let (soft, hard) = tc.allocate(10).unwrap();
        // base = 59990/30 + 750
        assert!(soft > 2_000 && soft < 4_000);
        assert!(hard >= soft);
        assert!(hard <= 30_000);
    }

    #[test]
    fn fischer_respects_movestogo() {
        let tc = TimeControl::Fischer {
            remaining_ms: 60_000,
            increment_ms: 0,
            movestogo: Some(10),
        };
        let (soft, _) = tc.allocate(0).unwrap();
        assert_eq!(soft, 6_000);
    }

    #[test]
    fn hard_limit_caps_at_half_remaining() {
        let tc = TimeControl::Fischer {
            remaining_ms: 1_000,
            increment_ms: 0,
            movestogo: Some(1),
        };
        let (soft, hard) = tc.allocate(0).unwrap();
        assert!(hard <= 1_000);
        assert!(soft <= hard);
    }

    #[test]
    fn stability_shrinks_the_soft_budget() {
        // Factors are monotonically non-increasing after the first entry.
        for pair in STABILITY_PERCENT.windows(2).skip(1) {
            assert!(pair[0] >= pair[1]);
        }
        assert!(STABILITY_PERCENT[0] > STABILITY_PERCENT[4]);
    }
}
