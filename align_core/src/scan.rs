//! Scan patterns and per-point measurement averaging.

use crate::types::Position;

/// Ordered probe offsets around a scan center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPattern {
    step: i32,
    offsets: Vec<Position>,
}

impl ScanPattern {
    /// Center plus the eight compass points at `step`.
    pub fn build(step: i32) -> Self {
        Self::octagon(step)
    }

    pub fn octagon(step: i32) -> Self {
        let s = step;
        let offsets = [
            (0, 0),
            (-s, -s),
            (-s, 0),
            (-s, s),
            (0, s),
            (s, s),
            (s, 0),
            (s, -s),
            (0, -s),
        ]
        .into_iter()
        .map(Position::from)
        .collect();
        Self { step, offsets }
    }

    /// Reduced re-probe: center plus the four axis neighbours.
    pub fn cross(step: i32) -> Self {
        let s = step;
        let offsets = [(0, 0), (-s, 0), (0, s), (s, 0), (0, -s)]
            .into_iter()
            .map(Position::from)
            .collect();
        Self { step, offsets }
    }

    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offset(&self, index: usize) -> Option<Position> {
        self.offsets.get(index).copied()
    }

    pub fn offsets(&self) -> &[Position] {
        &self.offsets
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    local_sum: f64,
    remote_sum: f64,
    count: u32,
}

/// Running sums of local/remote power per scan-point index.
#[derive(Debug, Clone)]
pub struct MeasurementAverager {
    samples: u32,
    slots: Vec<Slot>,
}

impl MeasurementAverager {
    /// `samples` readings complete a point; clamped to at least 1.
    pub fn new(samples: u32) -> Self {
        Self {
            samples: samples.max(1),
            slots: Vec::with_capacity(9),
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn accumulate(&mut self, index: usize, local_dbm: f64, remote_dbm: f64) {
        if self.slots.len() <= index {
            self.slots.resize(index + 1, Slot::default());
        }
        let slot = &mut self.slots[index];
        slot.local_sum += local_dbm;
        slot.remote_sum += remote_dbm;
        slot.count = slot.count.saturating_add(1);
    }

    pub fn count(&self, index: usize) -> u32 {
        self.slots.get(index).map_or(0, |s| s.count)
    }

    pub fn is_complete(&self, index: usize) -> bool {
        self.count(index) >= self.samples
    }

    /// `(local, remote)` averages, `None` until the point is complete.
    pub fn average(&self, index: usize) -> Option<(f64, f64)> {
        let slot = self.slots.get(index)?;
        if slot.count < self.samples {
            return None;
        }
        let n = f64::from(slot.count);
        Some((slot.local_sum / n, slot.remote_sum / n))
    }

    /// Index with the highest remote average among completed points.
    /// Ties go to the lowest index.
    pub fn best_remote(&self) -> Option<(usize, f64, f64)> {
        let mut best: Option<(usize, f64, f64)> = None;
        for index in 0..self.slots.len() {
            if let Some((local, remote)) = self.average(index)
                && best.is_none_or(|(_, _, r)| remote > r)
            {
                best = Some((index, local, remote));
            }
        }
        best
    }

    pub fn reset(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn octagon_order_step_50() {
        let p = ScanPattern::build(50);
        let got: Vec<(i32, i32)> = p.offsets().iter().map(|o| (o.x, o.y)).collect();
        assert_eq!(
            got,
            vec![
                (0, 0),
                (-50, -50),
                (-50, 0),
                (-50, 50),
                (0, 50),
                (50, 50),
                (50, 0),
                (50, -50),
                (0, -50),
            ]
        );
    }

    #[rstest]
    #[case(ScanPattern::octagon(100), 9)]
    #[case(ScanPattern::cross(50), 5)]
    fn pattern_sizes(#[case] p: ScanPattern, #[case] len: usize) {
        assert_eq!(p.len(), len);
        assert_eq!(p.offset(0), Some(Position::new(0, 0)));
        assert_eq!(p.offset(len), None);
    }

    #[test]
    fn cross_has_only_axis_offsets() {
        let p = ScanPattern::cross(20);
        assert!(p.offsets().iter().all(|o| o.x == 0 || o.y == 0));
    }

    #[test]
    fn average_available_only_when_complete() {
        let mut a = MeasurementAverager::new(3);
        a.accumulate(2, -10.0, -20.0);
        a.accumulate(2, -12.0, -22.0);
        assert!(!a.is_complete(2));
        assert_eq!(a.average(2), None);
        a.accumulate(2, -14.0, -24.0);
        assert!(a.is_complete(2));
        assert_eq!(a.average(2), Some((-12.0, -22.0)));
        assert_eq!(a.count(0), 0);
    }

    #[test]
    fn best_remote_prefers_first_maximum() {
        let mut a = MeasurementAverager::new(1);
        a.accumulate(0, -5.0, -15.0);
        a.accumulate(1, -5.0, -9.0);
        a.accumulate(2, -5.0, -9.0);
        a.accumulate(3, -5.0, -30.0);
        assert_eq!(a.best_remote(), Some((1, -5.0, -9.0)));
    }

    #[test]
    fn reset_clears_everything() {
        let mut a = MeasurementAverager::new(1);
        a.accumulate(4, 0.0, 0.0);
        a.reset();
        assert_eq!(a.count(4), 0);
        assert_eq!(a.best_remote(), None);
    }
}
