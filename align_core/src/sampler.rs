//! Background polling of the peer unit.
//!
//! Spawns a thread that owns the remote `Unit`, pushes the latest status via a
//! bounded channel, and tracks the last-ok timestamp for staleness checks.
//! A remote call may block up to the transport timeout, so it never runs on
//! the control loop.
//!
//! Each `PeerSampler` spawns exactly one thread, which is shut down and joined
//! when the sampler is dropped.
use align_traits::clock::Clock;
use align_traits::{Unit, UnitStatus};
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sentinel stored in `last_ok` until the first successful poll.
const NEVER: u64 = u64::MAX;

pub struct PeerSampler {
    rx: xch::Receiver<UnitStatus>,
    latest: Option<UnitStatus>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl PeerSampler {
    pub fn spawn<U, C>(mut unit: U, hz: u32, clock: C) -> Self
    where
        U: Unit + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(1);
        let evict = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(NEVER));
        let last_ok_clone = last_ok.clone();
        let period = Duration::from_millis(crate::util::period_ms(hz));
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("peer sampler received shutdown signal");
                    break;
                }

                match unit.status() {
                    Ok(status) => {
                        // The slot holds the newest status only: evict an
                        // unread one before publishing.
                        let published = match tx.try_send(status) {
                            Ok(()) => true,
                            Err(xch::TrySendError::Full(status)) => {
                                let _ = evict.try_recv();
                                tx.try_send(status).is_ok()
                            }
                            Err(xch::TrySendError::Disconnected(_)) => {
                                tracing::debug!("peer sampler consumer disconnected, exiting thread");
                                break;
                            }
                        };
                        if published {
                            last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                        }
                    }
                    Err(e) => {
                        let err = crate::hw_error::map_unit_error(&*e);
                        tracing::warn!(error = %err, "peer status poll failed");
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("peer sampler thread exiting cleanly");
        });

        Self {
            rx,
            latest: None,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Newest status received so far; sticky between polls.
    pub fn latest(&mut self) -> Option<&UnitStatus> {
        if let Some(s) = self.rx.try_iter().last() {
            self.latest = Some(s);
        }
        self.latest.as_ref()
    }

    /// Milliseconds since the last successful poll, measured on the sampler's
    /// clock; `None` before the first one.
    pub fn stalled_for(&self, now_ms: u64) -> Option<u64> {
        match self.last_ok.load(Ordering::Relaxed) {
            NEVER => None,
            ok => Some(now_ms.saturating_sub(ok)),
        }
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Drop for PeerSampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between polls, or after an in-flight remote call
        // returns (bounded by the transport timeout).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("peer sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "peer sampler thread panicked during shutdown");
                }
            }
        }
    }
}
