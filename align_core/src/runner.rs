use crate::config::DriverCfg;
use crate::controller::AlignmentController;
use crate::error::{LinkError, Result as CoreResult};
use crate::hw_error::map_unit_error;
use crate::power::rx_power_to_dbm;
use crate::record::ScanRecord;
use crate::sampler::PeerSampler;
use crate::status::AlignmentState;
use crate::types::{Command, Position, Tick};
use crate::util::duration_ms;
use align_traits::clock::Clock;
use align_traits::{Unit, UnitStatus};
use eyre::WrapErr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How the peer unit's status should be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerPolling {
    /// Poll inside the control loop, once per tick
    Direct,
    /// Poll on a background thread at the given Hz
    Background(u32),
}

enum PeerFeed {
    Direct {
        unit: Box<dyn Unit + Send>,
        latest: Option<UnitStatus>,
        last_ok: Option<Duration>,
    },
    Background(PeerSampler),
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Loop iterations, including skipped ones.
    pub ticks: u64,
    /// Iterations that reached the controller.
    pub steps: u64,
    pub moves: u64,
    pub samples: u64,
    /// Iterations skipped because the peer status was missing or stale.
    pub stale_skips: u64,
    pub final_state: AlignmentState,
    pub final_position: Option<Position>,
}

/// Driver loop around `AlignmentController`: reads both units, steps the
/// controller, records scan samples, publishes the local state and moves the
/// actuator. Transport failures are logged and retried indefinitely.
pub struct Runner<L: Unit, C: Clock> {
    local: L,
    peer: PeerFeed,
    controller: AlignmentController,
    cfg: DriverCfg,
    clock: C,
    epoch: Instant,
    record: Option<ScanRecord>,
    shutdown: Arc<AtomicBool>,
    max_ticks: Option<u64>,
    summary: RunSummary,
}

impl<L, C> Runner<L, C>
where
    L: Unit,
    C: Clock + Clone + Send + Sync + 'static,
{
    pub fn new<R>(
        local: L,
        remote: R,
        controller: AlignmentController,
        cfg: DriverCfg,
        clock: C,
        polling: PeerPolling,
    ) -> Self
    where
        R: Unit + Send + 'static,
    {
        let peer = match polling {
            PeerPolling::Direct => PeerFeed::Direct {
                unit: Box::new(remote),
                latest: None,
                last_ok: None,
            },
            PeerPolling::Background(hz) => {
                PeerFeed::Background(PeerSampler::spawn(remote, hz, clock.clone()))
            }
        };
        let epoch = clock.now();
        let state = controller.state();
        Self {
            local,
            peer,
            controller,
            cfg,
            clock,
            epoch,
            record: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            max_ticks: None,
            summary: RunSummary {
                ticks: 0,
                steps: 0,
                moves: 0,
                samples: 0,
                stale_skips: 0,
                final_state: state,
                final_position: None,
            },
        }
    }

    pub fn with_record(mut self, record: ScanRecord) -> Self {
        self.record = Some(record);
        self
    }

    /// Stop at the next tick boundary once `flag` is set.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn controller(&self) -> &AlignmentController {
        &self.controller
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn now(&self) -> Duration {
        self.clock.elapsed_since(self.epoch)
    }

    /// Run until shutdown or the tick limit. Only scan-record I/O failures
    /// end the loop with an error.
    pub fn run(&mut self) -> CoreResult<RunSummary> {
        let limit = self.max_ticks;
        self.drive(limit)
    }

    /// Run `ticks` more iterations (or until shutdown), ignoring the tick limit.
    pub fn run_ticks(&mut self, ticks: u64) -> CoreResult<RunSummary> {
        let limit = self.summary.ticks.saturating_add(ticks);
        self.drive(Some(limit))
    }

    fn drive(&mut self, limit: Option<u64>) -> CoreResult<RunSummary> {
        tracing::info!(
            tick_ms = self.cfg.tick_ms,
            limit = ?limit,
            record = ?self.record.as_ref().map(|r| r.path().display().to_string()),
            "alignment loop start"
        );
        while !self.stopping() && limit.is_none_or(|max| self.summary.ticks < max) {
            self.summary.ticks += 1;
            let pause = self.tick_once()?;
            if !self.stopping() {
                self.clock.sleep(pause);
            }
        }
        self.summary.final_state = self.controller.state();
        tracing::info!(
            ticks = self.summary.ticks,
            steps = self.summary.steps,
            moves = self.summary.moves,
            state = %self.summary.final_state,
            "alignment loop stopped"
        );
        Ok(self.summary.clone())
    }

    /// One loop iteration; returns how long to pause afterwards.
    fn tick_once(&mut self) -> CoreResult<Duration> {
        let tick_pause = Duration::from_millis(self.cfg.tick_ms);

        let Some(peer) = self.peer_status() else {
            self.summary.stale_skips += 1;
            tracing::warn!(
                stale_ms = self.cfg.peer_stale_ms,
                "no recent peer status, skipping tick"
            );
            return Ok(tick_pause);
        };

        let local = match self.local.status() {
            Ok(s) => s,
            Err(e) => {
                log_unit_failure(&map_unit_error(&*e), "local status");
                return Ok(tick_pause);
            }
        };

        let position = Position::new(local.x, local.y);
        let tick = Tick {
            position,
            local_dbm: rx_power_to_dbm(local.rx_power_raw),
            remote_dbm: rx_power_to_dbm(peer.rx_power_raw),
            peer_state: peer.alignment_state,
            peer_position: Some(Position::new(peer.x, peer.y)),
            now: self.now(),
        };
        let cmd = self.controller.step(&tick);
        self.summary.steps += 1;
        self.summary.final_position = Some(position);
        tracing::trace!(?tick, ?cmd, "tick");

        if let Some(sample) = cmd.sample {
            self.summary.samples += 1;
            if let Some(rec) = self.record.as_mut() {
                rec.append(&sample).wrap_err("append scan record")?;
            }
        }

        self.publish(&tick, &cmd);

        if cmd.target != position && self.move_to(cmd.target) {
            self.summary.moves += 1;
            self.await_arrival(cmd.target);
        }

        Ok(if cmd.state == AlignmentState::AwaitPeerIdle {
            Duration::from_millis(self.cfg.peer_wait_ms)
        } else {
            tick_pause
        })
    }

    /// Latest peer status, or `None` when nothing fresh enough has arrived.
    fn peer_status(&mut self) -> Option<UnitStatus> {
        let stale = self.cfg.peer_stale_ms;
        let now = self.now();
        match &mut self.peer {
            PeerFeed::Direct {
                unit,
                latest,
                last_ok,
            } => {
                match unit.status() {
                    Ok(s) => {
                        *latest = Some(s);
                        *last_ok = Some(now);
                    }
                    Err(e) => {
                        log_unit_failure(&map_unit_error(&*e), "peer status");
                    }
                }
                let age = duration_ms(now.saturating_sub((*last_ok)?));
                if age > stale {
                    return None;
                }
                latest.clone()
            }
            PeerFeed::Background(sampler) => {
                let now_ms = self.clock.ms_since(sampler.epoch());
                let age = sampler.stalled_for(now_ms)?;
                if age > stale {
                    return None;
                }
                sampler.latest().cloned()
            }
        }
    }

    fn publish(&mut self, tick: &Tick, cmd: &Command) {
        let vars = [
            ("local_dbm", tick.local_dbm),
            ("remote_dbm", tick.remote_dbm),
            ("x", f64::from(cmd.logical.x)),
            ("y", f64::from(cmd.logical.y)),
        ];
        if let Err(e) = self.local.set_alignment_state(cmd.state.code(), &vars) {
            log_unit_failure(&map_unit_error(&*e), "publish state");
        }
    }

    /// Issue the move, retrying until it is accepted. Returns false only if
    /// shutdown interrupted the retries.
    fn move_to(&mut self, target: Position) -> bool {
        let mut attempts: u64 = 0;
        loop {
            match self.local.move_motor(target.x, target.y) {
                Ok(()) => {
                    tracing::debug!(%target, attempts, "move issued");
                    return true;
                }
                Err(e) => {
                    attempts += 1;
                    tracing::debug!(%target, attempts, "move rejected");
                    log_unit_failure(&map_unit_error(&*e), "move");
                }
            }
            if self.stopping() {
                return false;
            }
            self.clock.sleep(Duration::from_millis(self.cfg.move_retry_ms));
        }
    }

    /// Poll until the actuator reports `target`, or until its position has
    /// not changed for `settle_timeout_ms`.
    fn await_arrival(&mut self, target: Position) {
        let poll = Duration::from_millis(self.cfg.arrival_poll_ms);
        let settle = Duration::from_millis(self.cfg.settle_timeout_ms);
        let mut last: Option<Position> = None;
        let mut last_change = self.now();
        loop {
            match self.local.status() {
                Ok(s) => {
                    let pos = Position::new(s.x, s.y);
                    if pos == target {
                        return;
                    }
                    if last != Some(pos) {
                        last = Some(pos);
                        last_change = self.now();
                    }
                }
                Err(e) => {
                    log_unit_failure(&map_unit_error(&*e), "arrival poll");
                }
            }
            if self.now().saturating_sub(last_change) > settle {
                tracing::warn!(%target, observed = ?last, "motors stuck");
                return;
            }
            if self.stopping() {
                return;
            }
            self.clock.sleep(poll);
        }
    }
}

/// Every unit call is retried; only the log level tells a flaky link apart
/// from a misconfigured host.
fn log_unit_failure(err: &LinkError, op: &'static str) {
    if err.is_transient() {
        tracing::warn!(error = %err, op, "unit call failed, retrying");
    } else {
        tracing::error!(error = %err, op, "unit call failed, retrying");
    }
}
