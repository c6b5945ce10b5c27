//! Alignment state machine.
//!
//! One `step` per driver tick: the caller supplies the current readings and a
//! monotonic `now`, and gets back the physical target to command plus the
//! state to publish to the peer. No I/O, no clock reads, no failure paths.

use std::time::Duration;

use crate::backlash::BacklashCompensator;
use crate::config::{ConvergenceCfg, IdleCfg, PeerCfg, SafetyCfg, ScanCfg};
use crate::convergence::ConvergenceTracker;
use crate::error::{BuildError, Result};
use crate::peer::PeerSynchronizer;
use crate::power::is_dark;
use crate::scan::{MeasurementAverager, ScanPattern};
use crate::status::AlignmentState;
use crate::stuck::{StuckGuard, StuckVerdict};
use crate::types::{Command, Position, ScanSample, Tick};

#[derive(Debug, Clone)]
pub struct AlignmentController {
    scan_cfg: ScanCfg,
    idle_cfg: IdleCfg,
    safety: SafetyCfg,

    state: AlignmentState,
    backlash: BacklashCompensator,
    pattern: ScanPattern,
    averager: MeasurementAverager,
    tracker: ConvergenceTracker,
    peer: PeerSynchronizer,
    stuck: StuckGuard,

    // Set once the first target has been issued; gates the arrival check.
    moved: bool,
    center: Position,
    index: usize,
    best_index: usize,
    cycle_start: Duration,

    idle_avg: MeasurementAverager,
    idle_best: Option<f64>,
    idle_cycles: u32,
    idle_since: Duration,
}

impl AlignmentController {
    pub fn builder() -> AlignmentControllerBuilder {
        AlignmentControllerBuilder::default()
    }

    /// Evaluate one tick.
    pub fn step(&mut self, tick: &Tick) -> Command {
        self.peer.observe(tick.peer_position);

        if self.state == AlignmentState::WaitSignal {
            if !is_dark(tick.local_dbm) || !is_dark(tick.remote_dbm) {
                tracing::info!(
                    local_dbm = tick.local_dbm,
                    remote_dbm = tick.remote_dbm,
                    "signal recovered"
                );
                self.transition(AlignmentState::InitBacklash);
            }
            return self.command(tick.position, None);
        }
        if is_dark(tick.local_dbm) && is_dark(tick.remote_dbm) {
            tracing::warn!(state = %self.state, "signal lost on both ends");
            self.transition(AlignmentState::WaitSignal);
            return self.command(tick.position, None);
        }

        if self.moved && self.state != AlignmentState::InitBacklash {
            let matched = self.backlash.inverse(tick.position) == self.backlash.logical();
            match self.stuck.on_expected_position(matched, tick.now) {
                StuckVerdict::Clear => {}
                StuckVerdict::Stuck => {
                    let nudged = self.backlash.logical().offset(self.safety.nudge_steps, 0);
                    self.backlash.reset_position(nudged);
                    tracing::debug!(
                        observed = %tick.position,
                        target = %self.backlash.physical(),
                        "position not reached, re-sending"
                    );
                    return self.command(self.backlash.physical(), None);
                }
                StuckVerdict::Reinitialize => {
                    tracing::warn!(
                        state = %self.state,
                        observed = %tick.position,
                        timeout_ms = self.safety.stuck_timeout_ms,
                        "actuator stuck, reinitializing"
                    );
                    self.transition(AlignmentState::InitBacklash);
                    return self.command(tick.position, None);
                }
            }
        }

        let mut sample = None;
        let target = match self.state {
            AlignmentState::InitBacklash => self.init_backlash(tick),
            AlignmentState::AwaitPeerIdle => {
                if self.peer.is_peer_idle(tick.peer_state) {
                    self.transition(AlignmentState::MonitorStart);
                }
                self.hold(tick)
            }
            AlignmentState::MonitorStart => {
                let elapsed = tick.now.saturating_sub(self.cycle_start);
                if elapsed > Duration::from_millis(self.safety.cycle_timeout_ms) {
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "alignment timed out");
                    self.enter_idle(tick.now);
                } else {
                    self.transition(AlignmentState::InitScan);
                }
                self.hold(tick)
            }
            AlignmentState::InitScan => {
                let step = if tick.remote_dbm < self.scan_cfg.weak_signal_dbm {
                    self.scan_cfg.coarse_step
                } else {
                    self.scan_cfg.fine_step
                };
                self.start_scan(ScanPattern::octagon(step));
                self.hold(tick)
            }
            AlignmentState::ScanMeasure => {
                sample = self.measure(tick);
                self.hold(tick)
            }
            AlignmentState::ScanMove => self.scan_move(),
            AlignmentState::EvaluateConvergence => self.evaluate(tick),
            AlignmentState::IdleMonitor => {
                self.idle(tick);
                self.hold(tick)
            }
            AlignmentState::WaitSignal => tick.position,
        };
        self.command(target, sample)
    }

    fn init_backlash(&mut self, tick: &Tick) -> Position {
        let first = self.backlash.initialize(tick.position);
        self.averager.reset();
        self.idle_avg.reset();
        self.tracker.clear();
        self.stuck.clear();
        self.index = 0;
        self.best_index = 0;
        self.idle_best = None;
        self.idle_cycles = 0;
        self.cycle_start = tick.now;
        self.moved = true;
        tracing::info!(from = %tick.position, to = %first, "backlash initialized");
        self.transition(AlignmentState::AwaitPeerIdle);
        self.backlash.physical()
    }

    fn start_scan(&mut self, pattern: ScanPattern) {
        self.center = self.backlash.logical();
        tracing::info!(
            center = %self.center,
            step = pattern.step(),
            points = pattern.len(),
            "scan started"
        );
        self.pattern = pattern;
        self.averager.reset();
        self.index = 0;
        self.transition(AlignmentState::ScanMeasure);
    }

    fn measure(&mut self, tick: &Tick) -> Option<ScanSample> {
        self.averager
            .accumulate(self.index, tick.local_dbm, tick.remote_dbm);
        let (local_dbm, remote_dbm) = self.averager.average(self.index)?;
        let sample = ScanSample {
            index: self.index,
            position: self.center + self.pattern.offset(self.index).unwrap_or_default(),
            local_dbm,
            remote_dbm,
        };
        tracing::info!(
            index = sample.index,
            x = sample.position.x,
            y = sample.position.y,
            local_dbm,
            remote_dbm,
            "scan point"
        );
        self.transition(AlignmentState::ScanMove);
        Some(sample)
    }

    fn scan_move(&mut self) -> Position {
        self.index += 1;
        if let Some(offset) = self.pattern.offset(self.index) {
            self.transition(AlignmentState::ScanMeasure);
            return self.backlash.forward(self.center + offset);
        }

        if let Some((best, local_dbm, remote_dbm)) = self.averager.best_remote() {
            self.best_index = best;
            self.tracker.record_best(local_dbm, remote_dbm);
            tracing::info!(index = best, local_dbm, remote_dbm, "scan cycle optimum");
        } else {
            self.best_index = 0;
        }
        let offset = self.pattern.offset(self.best_index).unwrap_or_default();
        self.transition(AlignmentState::EvaluateConvergence);
        self.backlash.forward(self.center + offset)
    }

    fn evaluate(&mut self, tick: &Tick) -> Position {
        if self.tracker.has_converged() {
            tracing::info!(window = ?self.convergence_window(), "converged");
            self.enter_idle(tick.now);
            return self.hold(tick);
        }
        // Overshoot past the best point so the next pattern is centred beyond it.
        // Every cycle passes back through MonitorStart for the timeout check.
        let offset = self.pattern.offset(self.best_index).unwrap_or_default();
        self.transition(AlignmentState::MonitorStart);
        self.backlash.forward(self.center + offset + offset)
    }

    fn enter_idle(&mut self, now: Duration) {
        self.idle_avg.reset();
        self.idle_cycles = 0;
        self.idle_since = now;
        self.cycle_start = now;
        self.transition(AlignmentState::IdleMonitor);
    }

    fn idle(&mut self, tick: &Tick) {
        self.idle_avg.accumulate(0, tick.local_dbm, tick.remote_dbm);
        let Some((_, avg)) = self.idle_avg.average(0) else {
            return;
        };
        self.idle_avg.reset();
        self.idle_cycles = self.idle_cycles.saturating_add(1);

        let regressed = self
            .idle_best
            .is_some_and(|best| avg < best - self.idle_cfg.regression_db);
        let weak_too_long = self.idle_cfg.weak_horizon_ms > 0
            && tick.now.saturating_sub(self.idle_since)
                > Duration::from_millis(self.idle_cfg.weak_horizon_ms)
            && avg < self.scan_cfg.weak_signal_dbm;
        tracing::debug!(avg, best = ?self.idle_best, cycles = self.idle_cycles, "idle average");

        if regressed || weak_too_long {
            tracing::info!(avg, best = ?self.idle_best, weak_too_long, "link degraded, realigning");
            self.idle_best = None;
            self.averager.reset();
            self.cycle_start = tick.now;
            self.transition(AlignmentState::AwaitPeerIdle);
            return;
        }
        if self.idle_best.is_none_or(|best| avg > best) {
            self.idle_best = Some(avg);
        }

        let reprobe = self.idle_cfg.reprobe_cycles > 0
            && self.idle_cycles >= self.idle_cfg.reprobe_cycles
            && tick.peer_state == AlignmentState::IdleMonitor.code();
        if reprobe {
            self.idle_cycles = 0;
            self.cycle_start = tick.now;
            self.start_scan(ScanPattern::cross(self.scan_cfg.fine_step));
        }
    }

    fn hold(&self, tick: &Tick) -> Position {
        if self.moved {
            self.backlash.physical()
        } else {
            tick.position
        }
    }

    fn transition(&mut self, to: AlignmentState) {
        if self.state != to {
            tracing::debug!(from = %self.state, to = %to, "state");
        }
        self.state = to;
    }

    fn command(&self, target: Position, sample: Option<ScanSample>) -> Command {
        Command {
            target,
            logical: self.backlash.inverse(target),
            state: self.state,
            sample,
        }
    }

    pub fn state(&self) -> AlignmentState {
        self.state
    }

    /// Best idle average since the link last converged.
    pub fn idle_best(&self) -> Option<f64> {
        self.idle_best
    }

    /// `(local, remote)` at the optimum of the last completed scan cycle.
    pub fn last_cycle_best(&self) -> Option<(f64, f64)> {
        self.tracker.latest()
    }

    pub fn convergence_window(&self) -> Vec<f64> {
        self.tracker.window().collect()
    }

    pub fn scan_center(&self) -> Position {
        self.center
    }

    pub fn scan_index(&self) -> usize {
        self.index
    }

    pub fn pattern(&self) -> &ScanPattern {
        &self.pattern
    }

    pub fn backlash(&self) -> &BacklashCompensator {
        &self.backlash
    }

    pub fn stuck_since(&self) -> Option<Duration> {
        self.stuck.stuck_since()
    }
}

/// Builder for `AlignmentController`. Missing sections use their defaults;
/// everything is validated on `build()`.
#[derive(Debug, Default)]
pub struct AlignmentControllerBuilder {
    scan: Option<ScanCfg>,
    convergence: Option<ConvergenceCfg>,
    idle: Option<IdleCfg>,
    safety: Option<SafetyCfg>,
    peer: Option<PeerCfg>,
}

impl AlignmentControllerBuilder {
    pub fn with_scan(mut self, scan: ScanCfg) -> Self {
        self.scan = Some(scan);
        self
    }
    pub fn with_convergence(mut self, convergence: ConvergenceCfg) -> Self {
        self.convergence = Some(convergence);
        self
    }
    pub fn with_idle(mut self, idle: IdleCfg) -> Self {
        self.idle = Some(idle);
        self
    }
    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.safety = Some(safety);
        self
    }
    pub fn with_peer(mut self, peer: PeerCfg) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn build(self) -> Result<AlignmentController> {
        let scan = self.scan.unwrap_or_default();
        let convergence = self.convergence.unwrap_or_default();
        let idle = self.idle.unwrap_or_default();
        let safety = self.safety.unwrap_or_default();
        let peer = self.peer.unwrap_or_default();

        let invalid = |msg| Err(eyre::Report::new(BuildError::InvalidConfig(msg)));
        if scan.backlash_steps < 0 {
            return invalid("backlash_steps must be >= 0");
        }
        if scan.coarse_step <= 0 || scan.fine_step <= 0 {
            return invalid("scan steps must be > 0");
        }
        if scan.samples_per_point == 0 {
            return invalid("samples_per_point must be >= 1");
        }
        if !scan.weak_signal_dbm.is_finite() {
            return invalid("weak_signal_dbm must be finite");
        }
        if !(convergence.spread_db.is_finite() && convergence.spread_db > 0.0) {
            return invalid("spread_db must be > 0");
        }
        if !(convergence.floor_dbm.is_finite() && convergence.strong_signal_dbm.is_finite()) {
            return invalid("convergence thresholds must be finite");
        }
        if idle.samples == 0 {
            return invalid("idle samples must be >= 1");
        }
        if !(idle.regression_db.is_finite() && idle.regression_db > 0.0) {
            return invalid("regression_db must be > 0");
        }
        if safety.stuck_timeout_ms == 0 {
            return invalid("stuck_timeout_ms must be >= 1");
        }
        if safety.nudge_steps == 0 {
            return invalid("nudge_steps must be non-zero");
        }
        if safety.cycle_timeout_ms == 0 {
            return invalid("cycle_timeout_ms must be >= 1");
        }
        if peer.busy_min > peer.busy_max {
            return invalid("busy_min must be <= busy_max");
        }

        Ok(AlignmentController {
            state: AlignmentState::InitBacklash,
            backlash: BacklashCompensator::new(scan.backlash_steps),
            pattern: ScanPattern::octagon(scan.coarse_step),
            averager: MeasurementAverager::new(scan.samples_per_point),
            tracker: ConvergenceTracker::new(convergence),
            peer: PeerSynchronizer::new(peer),
            stuck: StuckGuard::new(Duration::from_millis(safety.stuck_timeout_ms)),
            moved: false,
            center: Position::default(),
            index: 0,
            best_index: 0,
            cycle_start: Duration::ZERO,
            idle_avg: MeasurementAverager::new(idle.samples),
            idle_best: None,
            idle_cycles: 0,
            idle_since: Duration::ZERO,
            scan_cfg: scan,
            idle_cfg: idle,
            safety,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(position: Position, remote_dbm: f64, peer_state: i32, now_s: u64) -> Tick {
        Tick {
            position,
            local_dbm: remote_dbm,
            remote_dbm,
            peer_state,
            peer_position: None,
            now: Duration::from_secs(now_s),
        }
    }

    #[test]
    fn starts_in_init_backlash_and_seeds_forward() {
        let mut c = AlignmentController::builder().build().unwrap();
        assert_eq!(c.state(), AlignmentState::InitBacklash);
        let cmd = c.step(&tick(Position::new(0, 0), -20.0, -1, 0));
        assert_eq!(cmd.target, Position::new(130, 130));
        assert_eq!(cmd.logical, Position::new(130, 130));
        assert_eq!(cmd.state, AlignmentState::AwaitPeerIdle);
    }

    #[test]
    fn walks_to_scan_measure_when_peer_idle() {
        let mut c = AlignmentController::builder().build().unwrap();
        let mut pos = c.step(&tick(Position::new(0, 0), -20.0, 5, 0)).target;
        let mut states = Vec::new();
        for s in 1..=3 {
            let cmd = c.step(&tick(pos, -20.0, 5, s));
            pos = cmd.target;
            states.push(cmd.state);
        }
        assert_eq!(
            states,
            vec![
                AlignmentState::MonitorStart,
                AlignmentState::InitScan,
                AlignmentState::ScanMeasure
            ]
        );
        assert_eq!(c.scan_center(), Position::new(130, 130));
        // -20 is not below the weak threshold: fine step
        assert_eq!(c.pattern().step(), 50);
    }

    #[test]
    fn weak_link_uses_coarse_step() {
        let mut c = AlignmentController::builder().build().unwrap();
        let mut pos = c.step(&tick(Position::new(0, 0), -30.0, 5, 0)).target;
        for s in 1..=3 {
            pos = c.step(&tick(pos, -30.0, 5, s)).target;
        }
        assert_eq!(c.pattern().step(), 100);
    }

    #[test]
    fn rejects_invalid_sections() {
        let err = AlignmentController::builder()
            .with_safety(SafetyCfg {
                nudge_steps: 0,
                ..SafetyCfg::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }
}
