//! Device seams for the alignment stack.
//!
//! A `Unit` is one endpoint of the optical link as seen through its
//! device-local RPC interface. Errors cross this boundary boxed; the core
//! maps them to typed errors.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type UnitResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Snapshot returned by `Unit::status`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitStatus {
    /// Actuator position, X axis (steps).
    pub x: i32,
    /// Actuator position, Y axis (steps).
    pub y: i32,
    /// Received optical power in units of 0.1 uW, as reported by the SFP module.
    pub rx_power_raw: u32,
    /// Address of the paired endpoint, if the unit knows it.
    pub peer_address: Option<String>,
    /// Alignment state code last published by this unit.
    pub alignment_state: i32,
}

pub trait Unit {
    fn status(&mut self) -> UnitResult<UnitStatus>;

    /// Command an absolute actuator position. `z` is always 0 for pan/tilt heads.
    fn move_motor(&mut self, x: i32, y: i32) -> UnitResult<()>;

    /// Publish this endpoint's alignment state so the peer can read it back
    /// through its own `status` call.
    fn set_alignment_state(&mut self, state: i32, variables: &[(&str, f64)]) -> UnitResult<()>;
}

impl<U: Unit + ?Sized> Unit for Box<U> {
    fn status(&mut self) -> UnitResult<UnitStatus> {
        (**self).status()
    }

    fn move_motor(&mut self, x: i32, y: i32) -> UnitResult<()> {
        (**self).move_motor(x, y)
    }

    fn set_alignment_state(&mut self, state: i32, variables: &[(&str, f64)]) -> UnitResult<()> {
        (**self).set_alignment_state(state, variables)
    }
}
