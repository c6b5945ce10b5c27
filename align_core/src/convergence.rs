//! Convergence test over the best remote power of recent scan cycles.

use std::collections::VecDeque;

use crate::config::ConvergenceCfg;

/// Number of scan-cycle optima kept.
pub const WINDOW: usize = 3;

#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    cfg: ConvergenceCfg,
    // (local, remote) at each cycle optimum, oldest first
    window: VecDeque<(f64, f64)>,
}

impl ConvergenceTracker {
    pub fn new(cfg: ConvergenceCfg) -> Self {
        Self {
            cfg,
            window: VecDeque::with_capacity(WINDOW),
        }
    }

    pub fn record_best(&mut self, local_dbm: f64, remote_dbm: f64) {
        if self.window.len() == WINDOW {
            self.window.pop_front();
        }
        self.window.push_back((local_dbm, remote_dbm));
    }

    /// Converged when the last three optima agree within `spread_db` above
    /// `floor_dbm`, or the latest optimum alone beats `strong_signal_dbm`.
    pub fn has_converged(&self) -> bool {
        let Some(&(_, latest)) = self.window.back() else {
            return false;
        };
        if latest > self.cfg.strong_signal_dbm {
            return true;
        }
        if self.window.len() < WINDOW {
            return false;
        }
        let (min, max) = self
            .window
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, r)| {
                (lo.min(r), hi.max(r))
            });
        max - min < self.cfg.spread_db && max > self.cfg.floor_dbm
    }

    /// Remote optima, oldest first.
    pub fn window(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().map(|&(_, r)| r)
    }

    pub fn latest(&self) -> Option<(f64, f64)> {
        self.window.back().copied()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
