//! In-flight region protection.
//!
//! Every outstanding zero-copy handle (a write reservation or a popped
//! message) holds a flag recording its region's start offset and a liveness
//! bit. The external offset may only advance up to the oldest still-live
//! flag's offset, never past it, so a slow holder's memory is never
//! recycled under it.
//!
//! Flags live in a fixed arena of generation-tagged slots. A slot word
//! encodes `generation << 1 | live`; tokens carry the word they acquired,
//! so a release after a forced revocation (consumer flush) fails the
//! compare-exchange instead of corrupting a reused slot.

use std::sync::atomic::{AtomicU32, Ordering};

/// Maximum simultaneously outstanding handles per side. Acquisition failure
/// is reported as backpressure, not an error.
pub const MAX_IN_FLIGHT: usize = 16;

const LIVE: u32 = 1;

/// Proof of a held slot: index plus the exact live word stored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FlagToken {
    index: usize,
    word: u32,
}

struct FlagSlot {
    state: AtomicU32,
    offset: AtomicU32,
}

/// Fixed arena of in-flight flags for one ring side.
pub(crate) struct FlagArena {
    slots: [FlagSlot; MAX_IN_FLIGHT],
}

impl FlagArena {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| FlagSlot {
                state: AtomicU32::new(0),
                offset: AtomicU32::new(0),
            }),
        }
    }

    /// Claim a free slot for a region starting at `offset`.
    ///
    /// Only the owning side's thread acquires; releases may race from any
    /// thread, which can only make more slots free.
    pub(crate) fn acquire(&self, offset: u32) -> Option<FlagToken> {
        for (index, slot) in self.slots.iter().enumerate() {
            let word = slot.state.load(Ordering::Relaxed);
            if word & LIVE != 0 {
                continue;
            }
            slot.offset.store(offset, Ordering::Relaxed);
            let live = word | LIVE;
            if slot
                .state
                .compare_exchange(word, live, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(FlagToken { index, word: live });
            }
        }
        None
    }

    /// Release a held slot, bumping its generation.
    ///
    /// Returns false when the slot was already revoked out from under the
    /// token (consumer flush); the caller must not publish in that case.
    pub(crate) fn release(&self, token: FlagToken) -> bool {
        let next = token.word.wrapping_add(LIVE);
        self.slots[token.index]
            .state
            .compare_exchange(token.word, next, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Whether the token still protects its region.
    pub(crate) fn is_live(&self, token: FlagToken) -> bool {
        self.slots[token.index].state.load(Ordering::Acquire) == token.word
    }

    /// Forcibly revoke every live flag. Outstanding tokens observe this as
    /// `is_live() == false` and their releases become no-ops.
    pub(crate) fn revoke_all(&self) {
        for slot in &self.slots {
            loop {
                let word = slot.state.load(Ordering::Relaxed);
                if word & LIVE == 0 {
                    break;
                }
                let next = word.wrapping_add(LIVE);
                if slot
                    .state
                    .compare_exchange(word, next, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    break;
                }
            }
        }
    }

    /// True if any flag is currently live.
    pub(crate) fn any_live(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.state.load(Ordering::Acquire) & LIVE != 0)
    }

    /// True if a slot is available for acquisition.
    pub(crate) fn has_free_slot(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.state.load(Ordering::Acquire) & LIVE == 0)
    }

    /// Offset of the live flag closest after `base` in circular order, if
    /// any. This is the publication horizon: the external offset may
    /// advance to it but not past it.
    pub(crate) fn oldest_live_offset(&self, base: u32, capacity: u32) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None;
        for slot in &self.slots {
            if slot.state.load(Ordering::Acquire) & LIVE == 0 {
                continue;
            }
            let offset = slot.offset.load(Ordering::Relaxed);
            let distance = (offset + capacity - base) % capacity;
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, offset));
            }
        }
        best.map(|(_, offset)| offset)
    }
}
