#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Alignment core (hardware-agnostic).
//!
//! Steers one end of a free-space optical link toward the position that
//! maximizes the power received by the *peer*, while staying out of the
//! peer's way. All device access goes through `align_traits::Unit`.
//!
//! ## Architecture
//!
//! - **Backlash**: logical/physical position mapping (`backlash` module)
//! - **Search**: scan patterns and per-point averaging (`scan` module)
//! - **Convergence**: window of recent cycle optima (`convergence` module)
//! - **Peer**: busy-state interpretation (`peer` module)
//! - **Safety**: stuck actuator detection (`stuck` module)
//! - **Control**: the state machine (`controller` module), pure and tick-driven
//! - **Driver**: device polling, retries, scan record (`runner`, `sampler`, `record`)
//!
//! The controller never reads a clock: the driver passes monotonic elapsed
//! time in every `Tick`, so the state machine can be tested tick by tick.

pub mod backlash;
pub mod config;
pub mod controller;
pub mod convergence;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod peer;
pub mod power;
pub mod record;
pub mod runner;
pub mod sampler;
pub mod scan;
pub mod status;
pub mod stuck;
pub mod types;
pub mod util;

pub use backlash::{BacklashCompensator, Direction};
pub use config::{ConvergenceCfg, DriverCfg, IdleCfg, PeerCfg, SafetyCfg, ScanCfg};
pub use controller::{AlignmentController, AlignmentControllerBuilder};
pub use convergence::ConvergenceTracker;
pub use error::{BuildError, LinkError};
pub use peer::PeerSynchronizer;
pub use power::{NOISE_FLOOR_DBM, mw_to_dbm, rx_power_to_dbm};
pub use record::{ScanRecord, read_scan_record};
pub use runner::{PeerPolling, RunSummary, Runner};
pub use scan::{MeasurementAverager, ScanPattern};
pub use status::AlignmentState;
pub use stuck::{StuckGuard, StuckVerdict};
pub use types::{Command, Position, ScanSample, Tick};

/// Build a controller from a validated file config.
pub fn controller_from_config(cfg: &align_config::Config) -> error::Result<AlignmentController> {
    AlignmentController::builder()
        .with_scan((&cfg.scan).into())
        .with_convergence((&cfg.convergence).into())
        .with_idle((&cfg.idle).into())
        .with_safety((&cfg.safety).into())
        .with_peer((&cfg.peer).into())
        .build()
}
