//! Value types exchanged between the driver loop and the controller.

use std::ops::{Add, Sub};
use std::time::Duration;

use crate::status::AlignmentState;

/// Actuator position in steps. Unbounded here; the actuator driver clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by `(dx, dy)`, saturating at the i32 range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl Add for Position {
    type Output = Position;
    fn add(self, rhs: Position) -> Position {
        self.offset(rhs.x, rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;
    fn sub(self, rhs: Position) -> Position {
        Position {
            x: self.x.saturating_sub(rhs.x),
            y: self.y.saturating_sub(rhs.y),
        }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Everything the controller needs to evaluate one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Observed physical actuator position.
    pub position: Position,
    /// Power received locally (dBm, floor-clamped).
    pub local_dbm: f64,
    /// Power received by the peer (dBm, floor-clamped).
    pub remote_dbm: f64,
    /// State code last published by the peer.
    pub peer_state: i32,
    /// Peer actuator position, when the peer status carried one.
    pub peer_position: Option<Position>,
    /// Monotonic time since the driver loop started.
    pub now: Duration,
}

/// One averaged scan-point measurement, destined for the scan record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSample {
    pub index: usize,
    /// Logical (backlash-free) position the average was taken at.
    pub position: Position,
    pub local_dbm: f64,
    pub remote_dbm: f64,
}

/// Controller output for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    /// Physical position to command; equal to the observed position when
    /// no move is wanted.
    pub target: Position,
    /// Backlash-free position the target corresponds to.
    pub logical: Position,
    /// State to publish to the peer.
    pub state: AlignmentState,
    /// Scan-point average completed on this tick, if any.
    pub sample: Option<ScanSample>,
}
