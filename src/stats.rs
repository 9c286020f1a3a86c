//! Call counters shared between the controller, the bridge and observers.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Live counters for one controller.
#[derive(Debug, Default)]
pub struct ControllerStats {
    rings: AtomicU64,
    answers: AtomicU64,
    calls: AtomicU64,
    failed_spawns: AtomicU64,
    carrier_losses: AtomicU64,
    forced_kills: AtomicU64,
    resets: AtomicU64,
    active_calls: AtomicUsize,
}

/// Point-in-time copy of [`ControllerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub rings: u64,
    pub answers: u64,
    /// Calls whose program was spawned.
    pub calls: u64,
    pub failed_spawns: u64,
    /// Calls ended by DCD loss or a textual `NO CARRIER`.
    pub carrier_losses: u64,
    pub forced_kills: u64,
    pub resets: u64,
    /// Calls currently bridged; 0 or 1.
    pub active_calls: usize,
}

impl ControllerStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rings: self.rings.load(Ordering::Relaxed),
            answers: self.answers.load(Ordering::Relaxed),
            calls: self.calls.load(Ordering::Relaxed),
            failed_spawns: self.failed_spawns.load(Ordering::Relaxed),
            carrier_losses: self.carrier_losses.load(Ordering::Relaxed),
            forced_kills: self.forced_kills.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            active_calls: self.active_calls.load(Ordering::Acquire),
        }
    }

    pub(crate) fn record_ring(&self) {
        self.rings.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_answer(&self) {
        self.answers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_spawn(&self) {
        self.failed_spawns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_carrier_loss(&self) {
        self.carrier_losses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forced_kill(&self) {
        self.forced_kills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a new call; the returned guard marks it finished when dropped.
    pub(crate) fn call_started(self: &Arc<Self>) -> ActiveCall {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.active_calls.fetch_add(1, Ordering::AcqRel);
        ActiveCall {
            stats: Arc::clone(self),
        }
    }
}

/// Held by a live call session.
#[derive(Debug)]
pub(crate) struct ActiveCall {
    stats: Arc<ControllerStats>,
}

impl Drop for ActiveCall {
    fn drop(&mut self) {
        self.stats.active_calls.fetch_sub(1, Ordering::AcqRel);
    }
}
