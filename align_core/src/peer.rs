//! Peer coordination: only one endpoint searches at a time.

use crate::config::PeerCfg;
use crate::types::Position;

#[derive(Debug, Clone)]
pub struct PeerSynchronizer {
    cfg: PeerCfg,
    last_position: Option<Position>,
    moving: bool,
}

impl PeerSynchronizer {
    pub fn new(cfg: PeerCfg) -> Self {
        Self {
            cfg,
            last_position: None,
            moving: false,
        }
    }

    /// Record the peer's reported position for this tick. Only consulted when
    /// `motion_check` is enabled.
    pub fn observe(&mut self, position: Option<Position>) {
        if let Some(p) = position {
            self.moving = self.last_position.is_some_and(|last| last != p);
            self.last_position = Some(p);
        }
    }

    pub fn is_busy_state(&self, peer_state: i32) -> bool {
        (self.cfg.busy_min..=self.cfg.busy_max).contains(&peer_state)
    }

    pub fn is_peer_idle(&self, peer_state: i32) -> bool {
        if self.is_busy_state(peer_state) {
            return false;
        }
        !(self.cfg.motion_check && self.moving)
    }
}
