//! Runtime configuration for the alignment controller and driver loop.
//!
//! These are separate from the TOML-deserialized schema in `align_config`;
//! see `conversions` for the bridge. Durations are milliseconds.

/// Scan geometry and per-point averaging.
#[derive(Debug, Clone)]
pub struct ScanCfg {
    /// Drivetrain slack in actuator steps.
    pub backlash_steps: i32,
    /// Pattern step while the remote power is below `weak_signal_dbm`.
    pub coarse_step: i32,
    /// Pattern step once the link is at least `weak_signal_dbm`.
    pub fine_step: i32,
    pub weak_signal_dbm: f64,
    /// Readings averaged at each scan point.
    pub samples_per_point: u32,
}

impl Default for ScanCfg {
    fn default() -> Self {
        Self {
            backlash_steps: 130,
            coarse_step: 100,
            fine_step: 50,
            weak_signal_dbm: -20.0,
            samples_per_point: 5,
        }
    }
}

/// Thresholds for `ConvergenceTracker`.
#[derive(Debug, Clone)]
pub struct ConvergenceCfg {
    /// Max spread of the last three cycle optima (dB).
    pub spread_db: f64,
    /// The spread test only counts above this level (dBm).
    pub floor_dbm: f64,
    /// A single optimum above this converges on its own (dBm).
    pub strong_signal_dbm: f64,
}

impl Default for ConvergenceCfg {
    fn default() -> Self {
        Self {
            spread_db: 1.0,
            floor_dbm: -10.0,
            strong_signal_dbm: -4.0,
        }
    }
}

/// Post-convergence monitoring.
#[derive(Debug, Clone)]
pub struct IdleCfg {
    /// Remote readings per idle average.
    pub samples: u32,
    /// Drop below the best idle average that restarts alignment (dB).
    pub regression_db: f64,
    /// Idle this long while still below the weak threshold restarts alignment.
    /// 0 disables.
    pub weak_horizon_ms: u64,
    /// Idle averages before a cross re-probe is allowed. 0 disables.
    pub reprobe_cycles: u32,
}

impl Default for IdleCfg {
    fn default() -> Self {
        Self {
            samples: 100,
            regression_db: 3.0,
            weak_horizon_ms: 3_600_000,
            reprobe_cycles: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SafetyCfg {
    /// Budget for reaching a commanded position before a full reinitialize.
    pub stuck_timeout_ms: u64,
    /// X-axis nudge applied to an unreached target.
    pub nudge_steps: i32,
    /// Alignment cycles older than this skip straight to idle monitoring.
    pub cycle_timeout_ms: u64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            stuck_timeout_ms: 200_000,
            nudge_steps: 2,
            cycle_timeout_ms: 2_000_000,
        }
    }
}

/// Peer state codes treated as "busy aligning".
#[derive(Debug, Clone)]
pub struct PeerCfg {
    pub busy_min: i32,
    pub busy_max: i32,
    /// Also treat a peer whose position keeps changing as busy.
    pub motion_check: bool,
}

impl Default for PeerCfg {
    fn default() -> Self {
        Self {
            busy_min: 0,
            busy_max: 4,
            motion_check: false,
        }
    }
}

/// Pacing of the driver loop in `runner`.
#[derive(Debug, Clone)]
pub struct DriverCfg {
    pub tick_ms: u64,
    /// Pause used instead of `tick_ms` while waiting for the peer.
    pub peer_wait_ms: u64,
    pub peer_poll_hz: u32,
    /// Ticks are skipped when the last good peer status is older than this.
    pub peer_stale_ms: u64,
    /// Arrival wait gives up once the position has not changed for this long.
    pub settle_timeout_ms: u64,
    pub move_retry_ms: u64,
    pub arrival_poll_ms: u64,
}

impl Default for DriverCfg {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            peer_wait_ms: 15_000,
            peer_poll_hz: 2,
            peer_stale_ms: 30_000,
            settle_timeout_ms: 30_000,
            move_retry_ms: 500,
            arrival_poll_ms: 100,
        }
    }
}
