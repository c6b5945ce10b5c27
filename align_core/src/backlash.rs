//! Drivetrain backlash compensation.
//!
//! Each axis remembers the direction of its last logical move. While an axis
//! is travelling in reverse the load lags the motor by the drivetrain slack,
//! so the physical command sits `backlash` steps below the logical target.
//! The direction flag is directional memory only; it is never recomputed from
//! observed positions.

use crate::types::Position;

/// Last travel direction of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// 0 for forward, 1 for reverse.
    #[inline]
    pub const fn flag(self) -> i32 {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }

    /// Next direction after a signed logical delta; a zero delta keeps it.
    #[inline]
    fn after(self, delta: i64) -> Self {
        match delta.signum() {
            -1 => Direction::Reverse,
            1 => Direction::Forward,
            _ => self,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacklashCompensator {
    backlash: i32,
    logical: Position,
    x_dir: Direction,
    y_dir: Direction,
}

impl BacklashCompensator {
    pub fn new(backlash: i32) -> Self {
        Self {
            backlash,
            logical: Position::default(),
            x_dir: Direction::Forward,
            y_dir: Direction::Forward,
        }
    }

    pub fn backlash(&self) -> i32 {
        self.backlash
    }

    /// Seed from the observed position: the first target always lies
    /// `backlash` steps forward on both axes so the search starts with the
    /// slack taken up. Returns that target (logical and physical coincide).
    pub fn initialize(&mut self, current_physical: Position) -> Position {
        self.x_dir = Direction::Forward;
        self.y_dir = Direction::Forward;
        self.logical = current_physical.offset(self.backlash, self.backlash);
        self.logical
    }

    /// Convert a logical target into the physical command, updating the
    /// per-axis direction memory against the previous logical target.
    pub fn forward(&mut self, logical_target: Position) -> Position {
        let dx = i64::from(logical_target.x) - i64::from(self.logical.x);
        let dy = i64::from(logical_target.y) - i64::from(self.logical.y);
        self.x_dir = self.x_dir.after(dx);
        self.y_dir = self.y_dir.after(dy);
        self.logical = logical_target;
        self.physical()
    }

    /// Map an observed physical position back into logical coordinates
    /// using the current direction memory.
    pub fn inverse(&self, physical_observed: Position) -> Position {
        physical_observed.offset(
            self.x_dir.flag() * self.backlash,
            self.y_dir.flag() * self.backlash,
        )
    }

    /// Overwrite the stored logical target without touching direction memory.
    pub fn reset_position(&mut self, logical: Position) {
        self.logical = logical;
    }

    /// Last logical target.
    pub fn logical(&self) -> Position {
        self.logical
    }

    /// Physical command for the last logical target.
    pub fn physical(&self) -> Position {
        self.logical.offset(
            -(self.x_dir.flag() * self.backlash),
            -(self.y_dir.flag() * self.backlash),
        )
    }

    pub fn directions(&self) -> (Direction, Direction) {
        (self.x_dir, self.y_dir)
    }
}
