//! `From` implementations bridging `align_config` types to `align_core` types.

use crate::config::{ConvergenceCfg, DriverCfg, IdleCfg, PeerCfg, SafetyCfg, ScanCfg};

// ── ScanCfg ──────────────────────────────────────────────────────────────────

impl From<&align_config::ScanCfg> for ScanCfg {
    fn from(c: &align_config::ScanCfg) -> Self {
        Self {
            backlash_steps: c.backlash_steps,
            coarse_step: c.coarse_step,
            fine_step: c.fine_step,
            weak_signal_dbm: c.weak_signal_dbm,
            samples_per_point: c.samples_per_point,
        }
    }
}

// ── ConvergenceCfg ───────────────────────────────────────────────────────────

impl From<&align_config::ConvergenceCfg> for ConvergenceCfg {
    fn from(c: &align_config::ConvergenceCfg) -> Self {
        Self {
            spread_db: c.spread_db,
            floor_dbm: c.floor_dbm,
            strong_signal_dbm: c.strong_signal_dbm,
        }
    }
}

// ── IdleCfg ──────────────────────────────────────────────────────────────────

impl From<&align_config::IdleCfg> for IdleCfg {
    fn from(c: &align_config::IdleCfg) -> Self {
        Self {
            samples: c.samples,
            regression_db: c.regression_db,
            weak_horizon_ms: c.weak_horizon_ms,
            reprobe_cycles: c.reprobe_cycles,
        }
    }
}

// ── SafetyCfg ────────────────────────────────────────────────────────────────

impl From<&align_config::Safety> for SafetyCfg {
    fn from(c: &align_config::Safety) -> Self {
        Self {
            stuck_timeout_ms: c.stuck_timeout_ms,
            nudge_steps: c.nudge_steps,
            cycle_timeout_ms: c.cycle_timeout_ms,
        }
    }
}

// ── PeerCfg ──────────────────────────────────────────────────────────────────

impl From<&align_config::PeerCfg> for PeerCfg {
    fn from(c: &align_config::PeerCfg) -> Self {
        Self {
            busy_min: c.busy_min,
            busy_max: c.busy_max,
            motion_check: c.motion_check,
        }
    }
}

// ── DriverCfg ────────────────────────────────────────────────────────────────

impl From<&align_config::DriverCfg> for DriverCfg {
    fn from(c: &align_config::DriverCfg) -> Self {
        Self {
            tick_ms: c.tick_ms,
            peer_wait_ms: c.peer_wait_ms,
            peer_poll_hz: c.peer_poll_hz,
            peer_stale_ms: c.peer_stale_ms,
            settle_timeout_ms: c.settle_timeout_ms,
            move_retry_ms: c.move_retry_ms,
            arrival_poll_ms: c.arrival_poll_ms,
        }
    }
}
