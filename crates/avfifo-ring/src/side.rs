//! State shared between one ring side and its outstanding handles.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use avfifo_chunk::MemoryChunk;
use avfifo_message::ReleaseGuard;
use tracing::trace;

use crate::flags::{FlagArena, FlagToken};
use crate::layout::ControlBlock;
use crate::notify::ActivityObserver;

pub(crate) enum Role {
    Producer,
    Consumer,
}

/// One side's view of the ring, shared with its in-flight handles.
///
/// The owning side's thread is the only mutator of `internal`; handles on
/// any thread read it when they release and republish. All cross-side
/// traffic goes through the control block atomics.
pub(crate) struct SideState {
    pub(crate) ctrl: ControlBlock,
    pub(crate) data: MemoryChunk,
    pub(crate) flags: FlagArena,
    pub(crate) internal: AtomicU32,
    observer: OnceLock<Arc<dyn ActivityObserver>>,
    role: Role,
}

impl SideState {
    pub(crate) fn new(ctrl: ControlBlock, role: Role) -> crate::Result<Self> {
        let data = ctrl.data()?;
        Ok(Self {
            ctrl,
            data,
            flags: FlagArena::new(),
            internal: AtomicU32::new(0),
            observer: OnceLock::new(),
            role,
        })
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.ctrl.capacity()
    }

    /// The external offset this side publishes: `wr` for the producer,
    /// `rd` for the consumer.
    pub(crate) fn external(&self) -> &AtomicU32 {
        match self.role {
            Role::Producer => self.ctrl.wr(),
            Role::Consumer => self.ctrl.rd(),
        }
    }

    /// The peer's external offset, read with acquire ordering by callers.
    pub(crate) fn peer_external(&self) -> &AtomicU32 {
        match self.role {
            Role::Producer => self.ctrl.rd(),
            Role::Consumer => self.ctrl.wr(),
        }
    }

    /// Register the observer fired when this side's external offset
    /// advances. One registration per side; returns false if already set.
    pub(crate) fn observe(&self, observer: Arc<dyn ActivityObserver>) -> bool {
        self.observer.set(observer).is_ok()
    }

    /// Advance the external offset to the publication horizon: the oldest
    /// live flag's offset, or this side's internal offset when nothing is
    /// in flight.
    ///
    /// Forward-only compare-exchange loop so releases racing from several
    /// threads converge; the observer fires once per successful advance.
    pub(crate) fn publish(&self) {
        let capacity = self.capacity();
        let external = self.external();
        let mut current = external.load(Ordering::Relaxed);
        loop {
            // Acquire pairs with the release stores in the reserving side's
            // advance of `internal`: publishing up to an offset read here
            // also publishes every plain write made before that advance,
            // the synthesized padding header after a wraparound included.
            let internal = self.internal.load(Ordering::Acquire);
            let target = self
                .flags
                .oldest_live_offset(current, capacity)
                .unwrap_or(internal);
            if target == current {
                return;
            }
            match external.compare_exchange(
                current,
                target,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    trace!(from = current, to = target, "external offset published");
                    if let Some(observer) = self.observer.get() {
                        observer.on_activity();
                    }
                    current = target;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Keeps one in-flight region alive until dropped.
///
/// Backs both write reservations and popped messages. Dropping releases the
/// flag and republishes the external offset, which is what makes the region
/// visible (write side) or reclaimable (read side).
pub(crate) struct RegionGuard {
    state: Arc<SideState>,
    token: FlagToken,
}

impl RegionGuard {
    pub(crate) fn new(state: Arc<SideState>, token: FlagToken) -> Self {
        Self { state, token }
    }
}

impl ReleaseGuard for RegionGuard {
    fn is_live(&self) -> bool {
        self.state.flags.is_live(self.token)
    }
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        // A false release means the flag was revoked by a flush; the offsets
        // have already been rewritten and must not be republished from here.
        if self.state.flags.release(self.token) {
            self.state.publish();
        }
    }
}
