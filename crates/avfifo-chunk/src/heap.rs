use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chunk::ChunkBacking;

/// Process-local heap region.
///
/// Suitable for in-process pipes where producer and consumer are threads of
/// the same process. Allocated zeroed once; never reallocated or resized.
/// The buffer is built from u64 words so the base is 8-byte aligned and the
/// ring control block's atomic fields can live at the front.
pub struct HeapBacking {
    buf: UnsafeCell<Box<[u64]>>,
    len: usize,
    valid: AtomicBool,
}

// SAFETY: the buffer is only accessed through MemoryChunk, whose callers
// follow the single-producer/single-consumer offset protocol. The box is
// never reallocated, so the base pointer stays stable.
unsafe impl Send for HeapBacking {}
unsafe impl Sync for HeapBacking {}

impl HeapBacking {
    /// Allocate a zeroed region of `len` bytes.
    pub fn allocate(len: usize) -> Arc<Self> {
        let words = len.div_ceil(8);
        Arc::new(Self {
            buf: UnsafeCell::new(vec![0u64; words].into_boxed_slice()),
            len,
            valid: AtomicBool::new(true),
        })
    }
}

impl ChunkBacking for HeapBacking {
    fn base(&self) -> *mut u8 {
        // SAFETY: only the pointer is taken; no reference to the box escapes.
        unsafe { (*self.buf.get()).as_mut_ptr().cast() }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn revoke(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_zeroed_and_aligned() {
        let backing = HeapBacking::allocate(33);
        assert_eq!(backing.len(), 33);
        assert!(backing.is_valid());
        assert_eq!(backing.base().align_offset(8), 0);

        let mut out = vec![0xFFu8; 33];
        // SAFETY: freshly allocated, no other accessor.
        unsafe {
            std::ptr::copy_nonoverlapping(backing.base(), out.as_mut_ptr(), 33);
        }
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn revoke_is_sticky() {
        let backing = HeapBacking::allocate(8);
        backing.revoke();
        assert!(!backing.is_valid());
        backing.revoke();
        assert!(!backing.is_valid());
    }
}
