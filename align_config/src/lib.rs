#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the alignment daemon.
//!
//! - `Config` and its sections are deserialized from TOML; every section is
//!   optional and falls back to the defaults documented on each field.
//! - `Config::validate` rejects values the controller cannot run with.
use serde::Deserialize;

/// Sensor noise floor; power thresholds below this are meaningless.
const FLOOR_DBM: f64 = -40.0;
/// Upper bound for any configured power threshold.
const CEILING_DBM: f64 = 10.0;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanCfg {
    /// Drivetrain slack in actuator steps
    pub backlash_steps: i32,
    /// Scan step used while the link is weak
    pub coarse_step: i32,
    /// Scan step used once the remote power reaches `weak_signal_dbm`
    pub fine_step: i32,
    /// Remote power below which the coarse step is used (dBm)
    pub weak_signal_dbm: f64,
    /// Samples averaged at every scan point
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConvergenceCfg {
    /// Max spread of the last three cycle optima to call the search converged (dB)
    pub spread_db: f64,
    /// The spread test only applies above this level (dBm)
    pub floor_dbm: f64,
    /// A single cycle optimum above this level converges immediately (dBm)
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IdleCfg {
    /// Remote samples averaged per idle evaluation
    pub samples: u32,
    /// Restart alignment when the idle average drops this far below the best (dB)
    pub regression_db: f64,
    /// Restart alignment when idle this long and still below the weak threshold (ms).
    /// 0 disables.
    pub weak_horizon_ms: u64,
    /// Idle evaluations before a cross re-probe is allowed. 0 disables re-probing.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Time the actuator may miss its commanded position before reinitializing
    pub stuck_timeout_ms: u64,
    /// X-axis nudge applied when re-sending an unreached target
    pub nudge_steps: i32,
    /// Alignment attempts older than this go straight to idle monitoring
    pub cycle_timeout_ms: u64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            stuck_timeout_ms: 200_000,
            nudge_steps: 2,
            cycle_timeout_ms: 2_000_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PeerCfg {
    /// Lowest state code that marks the peer as actively aligning
    pub busy_min: i32,
    /// Highest state code that marks the peer as actively aligning
    pub busy_max: i32,
    /// Also treat the peer as busy while its reported position keeps changing
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriverCfg {
    /// Pause between control ticks
    pub tick_ms: u64,
    /// Pause between ticks while waiting for the peer to go idle
    pub peer_wait_ms: u64,
    /// Background poll rate for the remote unit's status
    pub peer_poll_hz: u32,
    /// Skip ticks when the last good peer status is older than this
    pub peer_stale_ms: u64,
    /// Give up waiting for arrival after the position stops changing for this long
    pub settle_timeout_ms: u64,
    /// Pause between failed move attempts
    pub move_retry_ms: u64,
    /// Poll interval while waiting for the actuator to arrive
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceCfg {
    /// Host of the peer unit's RPC endpoint; required for hardware runs
    pub remote_host: Option<String>,
    pub port: u16,
    pub path: String,
    /// Request timeout for remote calls
    pub timeout_ms: u64,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            remote_host: None,
            port: 80,
            path: "/ubus".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RecordCfg {
    /// Append-only scan record (`index x y local_dbm remote_dbm`)
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanCfg,
    pub convergence: ConvergenceCfg,
    pub idle: IdleCfg,
    pub safety: Safety,
    pub peer: PeerCfg,
    pub driver: DriverCfg,
    pub device: DeviceCfg,
    pub record: RecordCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn dbm_in_range(v: f64) -> bool {
    v.is_finite() && (FLOOR_DBM..=CEILING_DBM).contains(&v)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Scan
        if !(0..=10_000).contains(&self.scan.backlash_steps) {
            eyre::bail!("scan.backlash_steps must be in [0, 10000]");
        }
        if self.scan.coarse_step <= 0 {
            eyre::bail!("scan.coarse_step must be > 0");
        }
        if self.scan.fine_step <= 0 {
            eyre::bail!("scan.fine_step must be > 0");
        }
        if self.scan.fine_step > self.scan.coarse_step {
            eyre::bail!("scan.fine_step must be <= scan.coarse_step");
        }
        if !dbm_in_range(self.scan.weak_signal_dbm) {
            eyre::bail!("scan.weak_signal_dbm must be in [-40, 10]");
        }
        if !(1..=1000).contains(&self.scan.samples_per_point) {
            eyre::bail!("scan.samples_per_point must be in [1, 1000]");
        }

        // Convergence
        if !(self.convergence.spread_db.is_finite() && self.convergence.spread_db > 0.0) {
            eyre::bail!("convergence.spread_db must be > 0");
        }
        if !dbm_in_range(self.convergence.floor_dbm) {
            eyre::bail!("convergence.floor_dbm must be in [-40, 10]");
        }
        if !dbm_in_range(self.convergence.strong_signal_dbm) {
            eyre::bail!("convergence.strong_signal_dbm must be in [-40, 10]");
        }

        // Idle
        if self.idle.samples == 0 {
            eyre::bail!("idle.samples must be >= 1");
        }
        if !(self.idle.regression_db.is_finite() && self.idle.regression_db > 0.0) {
            eyre::bail!("idle.regression_db must be > 0");
        }

        // Safety
        if self.safety.stuck_timeout_ms == 0 {
            eyre::bail!("safety.stuck_timeout_ms must be >= 1");
        }
        if self.safety.stuck_timeout_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("safety.stuck_timeout_ms is unreasonably large (>24h)");
        }
        if self.safety.nudge_steps == 0 {
            eyre::bail!("safety.nudge_steps must be non-zero");
        }
        if self.safety.cycle_timeout_ms == 0 {
            eyre::bail!("safety.cycle_timeout_ms must be >= 1");
        }

        // Peer
        if self.peer.busy_min > self.peer.busy_max {
            eyre::bail!("peer.busy_min must be <= peer.busy_max");
        }

        // Driver
        if self.driver.tick_ms == 0 {
            eyre::bail!("driver.tick_ms must be >= 1");
        }
        if self.driver.peer_poll_hz == 0 {
            eyre::bail!("driver.peer_poll_hz must be > 0");
        }
        if self.driver.peer_stale_ms == 0 {
            eyre::bail!("driver.peer_stale_ms must be >= 1");
        }
        if self.driver.settle_timeout_ms == 0 {
            eyre::bail!("driver.settle_timeout_ms must be >= 1");
        }
        if self.driver.arrival_poll_ms == 0 {
            eyre::bail!("driver.arrival_poll_ms must be >= 1");
        }

        // Device
        if self.device.timeout_ms == 0 {
            eyre::bail!("device.timeout_ms must be >= 1");
        }
        if !self.device.path.starts_with('/') {
            eyre::bail!("device.path must start with '/'");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of: never, daily, hourly");
        }

        Ok(())
    }
}
