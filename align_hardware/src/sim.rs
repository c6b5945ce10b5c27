//! Deterministic two-endpoint link simulator.
//!
//! Each actuator axis drives its load through a drivetrain with slack: the
//! load follows the motor directly while pushed forward, and trails it by the
//! full backlash while pulled back. Units report *motor* positions, as the
//! real heads do. Received power follows a Gaussian beam profile in the
//! combined pointing error of both ends.

use std::sync::{Arc, Mutex, MutexGuard};

use align_traits::{Unit, UnitResult, UnitStatus};

use crate::error::UnitError;

/// 10·log10(e²): dB lost per unit of r²/w².
const DB_PER_NORMALIZED_R2: f64 = 8.685_889_638_065_035;
/// Device power units per milliwatt (0.1 uW).
const RAW_UNITS_PER_MW: f64 = 10_000.0;

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Drivetrain slack on every axis, in steps.
    pub backlash: i32,
    /// 1/e² beam radius, in steps of pointing error.
    pub beam_width: f64,
    /// Received power at perfect alignment (dBm).
    pub peak_dbm: f64,
    /// Local load position of best pointing.
    pub local_optimum: (i32, i32),
    /// Remote load position of best pointing.
    pub remote_optimum: (i32, i32),
    /// Initial motor (and load) position of the local head.
    pub local_start: (i32, i32),
    pub remote_start: (i32, i32),
    /// Constant offset of the remote receiver relative to the local one (dB).
    pub remote_offset_db: f64,
    /// State code the remote unit reports until changed.
    pub peer_state: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            backlash: 130,
            beam_width: 500.0,
            peak_dbm: -6.0,
            local_optimum: (600, -400),
            remote_optimum: (0, 0),
            local_start: (0, 0),
            remote_start: (0, 0),
            remote_offset_db: 0.0,
            peer_state: 5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    motor: i32,
    load: i32,
}

impl Axis {
    fn at(p: i32) -> Self {
        Self { motor: p, load: p }
    }

    fn drive(&mut self, target: i32, backlash: i32) {
        self.motor = target;
        if target > self.load {
            self.load = target;
        } else if target < self.load.saturating_sub(backlash) {
            self.load = target.saturating_add(backlash);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Head {
    x: Axis,
    y: Axis,
    jammed: bool,
    state: i32,
    failing_moves: u32,
    failing_status: u32,
}

impl Head {
    fn new((x, y): (i32, i32), state: i32) -> Self {
        Self {
            x: Axis::at(x),
            y: Axis::at(y),
            jammed: false,
            state,
            failing_moves: 0,
            failing_status: 0,
        }
    }

    fn error_sq(&self, (ox, oy): (i32, i32)) -> f64 {
        let dx = f64::from(self.x.load) - f64::from(ox);
        let dy = f64::from(self.y.load) - f64::from(oy);
        dx * dx + dy * dy
    }
}

#[derive(Debug)]
struct LinkModel {
    cfg: SimConfig,
    local: Head,
    remote: Head,
    blackout: bool,
}

impl LinkModel {
    fn received_dbm(&self) -> f64 {
        let r2 = self.local.error_sq(self.cfg.local_optimum)
            + self.remote.error_sq(self.cfg.remote_optimum);
        let w2 = self.cfg.beam_width * self.cfg.beam_width;
        self.cfg.peak_dbm - DB_PER_NORMALIZED_R2 * r2 / w2
    }

    fn raw_power(&self, offset_db: f64) -> u32 {
        if self.blackout {
            return 0;
        }
        let mw = 10f64.powf((self.received_dbm() + offset_db) / 10.0);
        (mw * RAW_UNITS_PER_MW).round().clamp(0.0, f64::from(u32::MAX)) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Local,
    Remote,
}

/// Shared link model; hand out `local()`/`remote()` handles to the runner
/// and keep this to inject faults.
#[derive(Debug, Clone)]
pub struct SimulatedLink {
    inner: Arc<Mutex<LinkModel>>,
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimulatedLink {
    pub fn new(cfg: SimConfig) -> Self {
        let model = LinkModel {
            local: Head::new(cfg.local_start, -2),
            remote: Head::new(cfg.remote_start, cfg.peer_state),
            blackout: false,
            cfg,
        };
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    pub fn local(&self) -> SimUnit {
        SimUnit {
            inner: self.inner.clone(),
            end: End::Local,
        }
    }

    pub fn remote(&self) -> SimUnit {
        SimUnit {
            inner: self.inner.clone(),
            end: End::Remote,
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut LinkModel) -> T) -> T {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    /// A jammed local head accepts moves but never changes position.
    pub fn jam_local(&self, jammed: bool) {
        self.with(|m| m.local.jammed = jammed);
    }

    /// Both receivers read zero while blacked out.
    pub fn set_blackout(&self, on: bool) {
        self.with(|m| m.blackout = on);
    }

    pub fn set_peer_state(&self, state: i32) {
        self.with(|m| m.remote.state = state);
    }

    /// Fail the next `n` local move commands with a transport error.
    pub fn fail_local_moves(&self, n: u32) {
        self.with(|m| m.local.failing_moves = n);
    }

    /// Fail the next `n` remote status calls with a timeout.
    pub fn fail_remote_status(&self, n: u32) {
        self.with(|m| m.remote.failing_status = n);
    }

    /// Move the remote head (as if the peer were aligning).
    pub fn move_remote(&self, x: i32, y: i32) {
        self.with(|m| {
            let b = m.cfg.backlash;
            m.remote.x.drive(x, b);
            m.remote.y.drive(y, b);
        });
    }

    pub fn local_motor(&self) -> (i32, i32) {
        self.with(|m| (m.local.x.motor, m.local.y.motor))
    }

    pub fn local_load(&self) -> (i32, i32) {
        self.with(|m| (m.local.x.load, m.local.y.load))
    }

    pub fn local_state(&self) -> i32 {
        self.with(|m| m.local.state)
    }

    /// Unclamped received power (dBm), ignoring blackout.
    pub fn received_dbm(&self) -> f64 {
        self.with(|m| m.received_dbm())
    }
}

/// One end of a `SimulatedLink`.
#[derive(Debug, Clone)]
pub struct SimUnit {
    inner: Arc<Mutex<LinkModel>>,
    end: End,
}

impl SimUnit {
    fn model(&self) -> Result<MutexGuard<'_, LinkModel>, UnitError> {
        self.inner
            .lock()
            .map_err(|_| UnitError::Transport("simulator lock poisoned".into()))
    }
}

impl Unit for SimUnit {
    fn status(&mut self) -> UnitResult<UnitStatus> {
        let mut m = self.model()?;
        let offset = match self.end {
            End::Local => 0.0,
            End::Remote => m.cfg.remote_offset_db,
        };
        let raw = m.raw_power(offset);
        let head = match self.end {
            End::Local => &mut m.local,
            End::Remote => &mut m.remote,
        };
        if head.failing_status > 0 {
            head.failing_status -= 1;
            return Err(Box::new(UnitError::Timeout));
        }
        Ok(UnitStatus {
            x: head.x.motor,
            y: head.y.motor,
            rx_power_raw: raw,
            peer_address: None,
            alignment_state: head.state,
        })
    }

    fn move_motor(&mut self, x: i32, y: i32) -> UnitResult<()> {
        let mut m = self.model()?;
        let backlash = m.cfg.backlash;
        let head = match self.end {
            End::Local => &mut m.local,
            End::Remote => &mut m.remote,
        };
        if head.failing_moves > 0 {
            head.failing_moves -= 1;
            return Err(Box::new(UnitError::Transport("connection refused".into())));
        }
        if !head.jammed {
            head.x.drive(x, backlash);
            head.y.drive(y, backlash);
        }
        tracing::trace!(end = ?self.end, x, y, jammed = head.jammed, "sim move");
        Ok(())
    }

    fn set_alignment_state(&mut self, state: i32, _variables: &[(&str, f64)]) -> UnitResult<()> {
        let mut m = self.model()?;
        match self.end {
            End::Local => m.local.state = state,
            End::Remote => m.remote.state = state,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_trails_motor_on_reversal() {
        let mut a = Axis::at(0);
        a.drive(130, 130);
        assert_eq!((a.motor, a.load), (130, 130));
        a.drive(-50, 130);
        assert_eq!((a.motor, a.load), (-50, 80));
        // inside the slack: load does not move
        a.drive(0, 130);
        assert_eq!((a.motor, a.load), (0, 80));
        a.drive(100, 130);
        assert_eq!((a.motor, a.load), (100, 100));
    }

    #[test]
    fn power_peaks_at_optimum() {
        let link = SimulatedLink::new(SimConfig {
            local_optimum: (10, 10),
            ..SimConfig::default()
        });
        let far = link.received_dbm();
        link.local().move_motor(10, 10).unwrap();
        assert!((link.received_dbm() + 6.0).abs() < 1e-9);
        assert!(far < link.received_dbm());
    }

    #[test]
    fn blackout_reads_zero() {
        let link = SimulatedLink::default();
        link.set_blackout(true);
        assert_eq!(link.local().status().unwrap().rx_power_raw, 0);
        assert_eq!(link.remote().status().unwrap().rx_power_raw, 0);
    }
}
