//! Test and helper mocks for align_core

use align_traits::{Unit, UnitResult, UnitStatus};

/// A unit whose every call fails; stands in for an unreachable peer.
pub struct OfflineUnit;

impl Unit for OfflineUnit {
    fn status(&mut self) -> UnitResult<UnitStatus> {
        Err(Box::new(std::io::Error::other("offline unit")))
    }
    fn move_motor(&mut self, _x: i32, _y: i32) -> UnitResult<()> {
        Err(Box::new(std::io::Error::other("offline unit")))
    }
    fn set_alignment_state(&mut self, _state: i32, _variables: &[(&str, f64)]) -> UnitResult<()> {
        Err(Box::new(std::io::Error::other("offline unit")))
    }
}

/// A unit that reports a fixed status and accepts every command.
#[derive(Debug, Clone, Default)]
pub struct FixedUnit {
    pub status: UnitStatus,
}

impl Unit for FixedUnit {
    fn status(&mut self) -> UnitResult<UnitStatus> {
        Ok(self.status.clone())
    }
    fn move_motor(&mut self, x: i32, y: i32) -> UnitResult<()> {
        self.status.x = x;
        self.status.y = y;
        Ok(())
    }
    fn set_alignment_state(&mut self, state: i32, _variables: &[(&str, f64)]) -> UnitResult<()> {
        self.status.alignment_state = state;
        Ok(())
    }
}
