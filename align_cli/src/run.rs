//! Command implementations: backend assembly, the alignment run, self-check,
//! and scan-record reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use align_config::Config;
use align_core::error::{LinkError, Result as CoreResult};
use align_core::hw_error::map_unit_error;
use align_core::record::best_sample;
use align_core::{
    DriverCfg, PeerPolling, Position, RunSummary, Runner, ScanRecord, ScanSample,
    controller_from_config, read_scan_record, rx_power_to_dbm,
};
use align_hardware::{SimConfig, SimulatedLink};
use align_traits::clock::MonotonicClock;
use align_traits::{Unit, UnitStatus};
use eyre::WrapErr;

/// Test hook: when set, every peer status poll of the simulated link times out.
const SIM_OFFLINE_ENV: &str = "ALIGN_TEST_SIM_OFFLINE";
/// Test hook: state code reported by the simulated peer.
const SIM_PEER_STATE_ENV: &str = "ALIGN_TEST_SIM_PEER_STATE";

pub fn config_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(LinkError::Config(msg.into()))
}

#[derive(Debug)]
pub struct RunArgs {
    pub sim: bool,
    pub ticks: Option<u64>,
    pub record: Option<PathBuf>,
    pub direct: bool,
}

/// Simulated link matching the configured drivetrain.
pub fn sim_link(cfg: &Config) -> SimulatedLink {
    let mut sim = SimConfig {
        backlash: cfg.scan.backlash_steps,
        ..SimConfig::default()
    };
    if let Some(state) = std::env::var(SIM_PEER_STATE_ENV)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
    {
        sim.peer_state = state;
    }
    let link = SimulatedLink::new(sim);
    if std::env::var_os(SIM_OFFLINE_ENV).is_some() {
        link.fail_remote_status(u32::MAX);
    }
    link
}

pub fn run_align(cfg: &Config, args: &RunArgs, shutdown: Arc<AtomicBool>) -> CoreResult<RunSummary> {
    if args.sim {
        let link = sim_link(cfg);
        // Simulated calls never block; no need for a sampler thread.
        return drive(cfg, args, link.local(), link.remote(), PeerPolling::Direct, shutdown);
    }

    #[cfg(feature = "hardware")]
    {
        let (local, remote) = koruza_units(cfg)?;
        let polling = if args.direct {
            PeerPolling::Direct
        } else {
            PeerPolling::Background(cfg.driver.peer_poll_hz)
        };
        drive(cfg, args, local, remote, polling, shutdown)
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = shutdown;
        Err(config_error(
            "built without the `hardware` feature; pass --sim or rebuild with --features hardware",
        ))
    }
}

#[cfg(feature = "hardware")]
fn koruza_units(
    cfg: &Config,
) -> CoreResult<(align_hardware::KoruzaUnit, align_hardware::KoruzaUnit)> {
    let host = cfg
        .device
        .remote_host
        .as_deref()
        .ok_or_else(|| config_error("device.remote_host is required for hardware runs"))?;
    let timeout = std::time::Duration::from_millis(cfg.device.timeout_ms);
    Ok((
        align_hardware::KoruzaUnit::local(),
        align_hardware::KoruzaUnit::remote(host, cfg.device.port, &cfg.device.path, timeout),
    ))
}

fn drive<L, R>(
    cfg: &Config,
    args: &RunArgs,
    local: L,
    remote: R,
    polling: PeerPolling,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary>
where
    L: Unit,
    R: Unit + Send + 'static,
{
    let controller = controller_from_config(cfg)?;
    let driver: DriverCfg = (&cfg.driver).into();
    let mut runner = Runner::new(
        local,
        remote,
        controller,
        driver,
        MonotonicClock::new(),
        polling,
    )
    .with_shutdown(shutdown);

    let record_path = args
        .record
        .clone()
        .or_else(|| cfg.record.path.as_ref().map(PathBuf::from));
    if let Some(path) = record_path {
        runner = runner.with_record(ScanRecord::open(&path)?);
    }
    if let Some(n) = args.ticks {
        runner = runner.with_max_ticks(n);
    }
    tracing::info!(sim = args.sim, ?polling, "alignment run start");
    runner.run()
}

/// What `self-check` observed on both units.
#[derive(Debug)]
pub struct CheckReport {
    pub local: UnitStatus,
    pub peer: UnitStatus,
}

pub fn self_check(cfg: &Config, sim: bool) -> CoreResult<CheckReport> {
    // Catches controller-level limits the schema validation does not cover.
    controller_from_config(cfg)?;

    if sim {
        let link = sim_link(cfg);
        return poll_both(link.local(), link.remote());
    }
    #[cfg(feature = "hardware")]
    {
        let (local, remote) = koruza_units(cfg)?;
        poll_both(local, remote)
    }
    #[cfg(not(feature = "hardware"))]
    {
        Err(config_error(
            "built without the `hardware` feature; pass --sim or rebuild with --features hardware",
        ))
    }
}

fn poll_both(mut local: impl Unit, mut peer: impl Unit) -> CoreResult<CheckReport> {
    let local = local
        .status()
        .map_err(|e| eyre::Report::new(map_unit_error(&*e)))
        .wrap_err("poll local unit")?;
    let peer = peer
        .status()
        .map_err(|e| eyre::Report::new(map_unit_error(&*e)))
        .wrap_err("poll peer unit")?;
    Ok(CheckReport { local, peer })
}

pub fn status_json(s: &UnitStatus) -> serde_json::Value {
    serde_json::json!({
        "x": s.x,
        "y": s.y,
        "rx_dbm": rx_power_to_dbm(s.rx_power_raw),
        "state": s.alignment_state,
        "peer_address": s.peer_address,
    })
}

/// Sample count and best remote point of a scan record.
#[derive(Debug)]
pub struct ScanReport {
    pub samples: usize,
    pub best: Option<ScanSample>,
}

pub fn scan_report(path: &Path) -> CoreResult<ScanReport> {
    let samples = read_scan_record(path)?;
    Ok(ScanReport {
        samples: samples.len(),
        best: best_sample(&samples).copied(),
    })
}

pub fn summary_json(s: &RunSummary) -> serde_json::Value {
    let position = s.final_position.map(|Position { x, y }| serde_json::json!({ "x": x, "y": y }));
    serde_json::json!({
        "ticks": s.ticks,
        "steps": s.steps,
        "moves": s.moves,
        "samples": s.samples,
        "stale_skips": s.stale_skips,
        "final_state": s.final_state.name(),
        "final_position": position,
    })
}
