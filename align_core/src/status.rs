//! Alignment state machine states and their published codes.

/// Controller state. The integer code is what gets published to the peer;
/// the actively-searching states occupy `0..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignmentState {
    InitBacklash,
    AwaitPeerIdle,
    MonitorStart,
    InitScan,
    ScanMove,
    ScanMeasure,
    EvaluateConvergence,
    IdleMonitor,
    WaitSignal,
}

impl AlignmentState {
    pub const ALL: [AlignmentState; 9] = [
        AlignmentState::InitBacklash,
        AlignmentState::AwaitPeerIdle,
        AlignmentState::MonitorStart,
        AlignmentState::InitScan,
        AlignmentState::ScanMove,
        AlignmentState::ScanMeasure,
        AlignmentState::EvaluateConvergence,
        AlignmentState::IdleMonitor,
        AlignmentState::WaitSignal,
    ];

    pub const fn code(self) -> i32 {
        match self {
            AlignmentState::InitBacklash => -2,
            AlignmentState::AwaitPeerIdle => -1,
            AlignmentState::MonitorStart => 0,
            AlignmentState::InitScan => 1,
            AlignmentState::ScanMove => 2,
            AlignmentState::ScanMeasure => 3,
            AlignmentState::EvaluateConvergence => 4,
            AlignmentState::IdleMonitor => 5,
            AlignmentState::WaitSignal => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub const fn name(self) -> &'static str {
        match self {
            AlignmentState::InitBacklash => "init_backlash",
            AlignmentState::AwaitPeerIdle => "await_peer_idle",
            AlignmentState::MonitorStart => "monitor_start",
            AlignmentState::InitScan => "init_scan",
            AlignmentState::ScanMove => "scan_move",
            AlignmentState::ScanMeasure => "scan_measure",
            AlignmentState::EvaluateConvergence => "evaluate_convergence",
            AlignmentState::IdleMonitor => "idle_monitor",
            AlignmentState::WaitSignal => "wait_signal",
        }
    }
}

impl core::fmt::Display for AlignmentState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_are_unique() {
        for s in AlignmentState::ALL {
            assert_eq!(AlignmentState::from_code(s.code()), Some(s));
        }
        assert_eq!(AlignmentState::from_code(42), None);
    }

    #[test]
    fn searching_states_fill_busy_range() {
        let busy: Vec<_> = AlignmentState::ALL
            .into_iter()
            .filter(|s| (0..=4).contains(&s.code()))
            .collect();
        assert_eq!(busy.len(), 5);
        assert!(!busy.contains(&AlignmentState::IdleMonitor));
        assert!(!busy.contains(&AlignmentState::AwaitPeerIdle));
    }
}
