use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use crate::error::{ChunkError, Result};
use crate::heap::HeapBacking;

/// Storage behind a [`MemoryChunk`].
///
/// Implementations expose a stable base pointer for the lifetime of the
/// backing object and a validity bit that may flip to false asynchronously
/// when the region is revoked. The two fifo sides mutate disjoint byte
/// ranges plus the atomic offset fields, so the backing itself carries no
/// synchronization beyond the validity bit.
pub trait ChunkBacking: Send + Sync {
    /// Base address of the region. Stable while the backing is alive.
    fn base(&self) -> *mut u8;

    /// Total length of the region in bytes.
    fn len(&self) -> usize;

    /// Whether the region may still be accessed.
    fn is_valid(&self) -> bool;

    /// Revoke the region. All subsequent accesses through any chunk view
    /// fail; outstanding zero-copy readers observe the flip on their next
    /// availability check.
    fn revoke(&self);
}

/// A bounds-checked view over a shared [`ChunkBacking`].
///
/// Cloning a chunk clones the view, not the memory. Sub-views created with
/// [`MemoryChunk::slice`] keep the backing alive and never escape the parent
/// bounds. All accessors re-check validity so a revoked region is observed
/// as a failed access rather than a dangling read.
#[derive(Clone)]
pub struct MemoryChunk {
    backing: Arc<dyn ChunkBacking>,
    offset: usize,
    len: usize,
}

impl MemoryChunk {
    /// View the whole backing region.
    pub fn new(backing: Arc<dyn ChunkBacking>) -> Self {
        let len = backing.len();
        Self {
            backing,
            offset: 0,
            len,
        }
    }

    /// Allocate a zeroed heap-backed chunk. Convenience for in-process
    /// pipes and tests.
    pub fn heap(len: usize) -> Self {
        Self::new(HeapBacking::allocate(len))
    }

    /// Size of the view in bytes.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Whether the backing region may still be accessed.
    pub fn valid(&self) -> bool {
        self.backing.is_valid()
    }

    /// Revoke the backing region (all views, not just this one).
    pub fn revoke(&self) {
        self.backing.revoke();
    }

    /// A sub-view of `len` bytes starting at `offset` within this view.
    pub fn slice(&self, offset: usize, len: usize) -> Result<MemoryChunk> {
        if !self.in_bounds(offset, len) {
            return Err(ChunkError::OutOfBounds {
                offset,
                len,
                size: self.len,
            });
        }
        Ok(Self {
            backing: Arc::clone(&self.backing),
            offset: self.offset + offset,
            len,
        })
    }

    /// Copy `out.len()` bytes starting at `offset` into `out`.
    ///
    /// Returns false if the range is out of bounds or the region has been
    /// revoked; `out` is untouched in that case.
    pub fn read_at(&self, offset: usize, out: &mut [u8]) -> bool {
        if !self.in_bounds(offset, out.len()) || !self.backing.is_valid() {
            return false;
        }
        // SAFETY: bounds checked above; the backing pointer is stable and
        // the byte range is owned by the caller per the fifo offset protocol.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.backing.base().add(self.offset + offset),
                out.as_mut_ptr(),
                out.len(),
            );
        }
        true
    }

    /// Copy `src` into the region starting at `offset`.
    ///
    /// Returns false if the range is out of bounds or the region has been
    /// revoked; nothing is written in that case.
    pub fn write_at(&self, offset: usize, src: &[u8]) -> bool {
        if !self.in_bounds(offset, src.len()) || !self.backing.is_valid() {
            return false;
        }
        // SAFETY: bounds checked above; the fifo offset protocol guarantees
        // the producer is the only party writing this byte range.
        unsafe {
            std::ptr::copy_nonoverlapping(
                src.as_ptr(),
                self.backing.base().add(self.offset + offset),
                src.len(),
            );
        }
        true
    }

    /// Read a little-endian u32 at `offset`.
    pub fn read_u32_at(&self, offset: usize) -> Option<u32> {
        let mut raw = [0u8; 4];
        if self.read_at(offset, &mut raw) {
            Some(u32::from_le_bytes(raw))
        } else {
            None
        }
    }

    /// Write a little-endian u32 at `offset`.
    pub fn write_u32_at(&self, offset: usize, value: u32) -> bool {
        self.write_at(offset, &value.to_le_bytes())
    }

    /// Interpret four bytes at `offset` as an [`AtomicU32`].
    ///
    /// Used for the fifo control block fields that both sides load and
    /// store with acquire/release ordering. The offset must be 4-aligned
    /// relative to the backing base.
    pub fn atomic_u32_at(&self, offset: usize) -> Option<&AtomicU32> {
        if !self.in_bounds(offset, 4) {
            return None;
        }
        let addr = self.offset + offset;
        // SAFETY: in bounds, 4-byte aligned (checked below), and AtomicU32
        // tolerates concurrent access by construction. The reference borrows
        // from `self`, which keeps the backing alive.
        unsafe {
            let ptr = self.backing.base().add(addr);
            if ptr.align_offset(std::mem::align_of::<AtomicU32>()) != 0 {
                return None;
            }
            Some(&*ptr.cast::<AtomicU32>())
        }
    }

    /// Borrow `len` bytes at `offset` without copying.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that no other party writes this byte range
    /// for the lifetime of the returned slice. The fifo enforces this with
    /// in-flight flags: a popped message's region is not recycled until the
    /// protecting flag is released. The caller must also have checked
    /// validity; a revoked heap region stays allocated while any view is
    /// alive, but its content is no longer meaningful.
    pub unsafe fn bytes_unchecked(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(self.in_bounds(offset, len));
        std::slice::from_raw_parts(self.backing.base().add(self.offset + offset), len)
    }

    fn in_bounds(&self, offset: usize, len: usize) -> bool {
        offset.checked_add(len).is_some_and(|end| end <= self.len)
    }
}

impl std::fmt::Debug for MemoryChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChunk")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("valid", &self.valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_roundtrip() {
        let chunk = MemoryChunk::heap(64);
        assert!(chunk.write_at(8, b"hello"));

        let mut out = [0u8; 5];
        assert!(chunk.read_at(8, &mut out));
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn out_of_bounds_rejected() {
        let chunk = MemoryChunk::heap(16);
        assert!(!chunk.write_at(12, b"toolong"));

        let mut out = [0u8; 8];
        assert!(!chunk.read_at(12, &mut out));
        assert_eq!(out, [0u8; 8]);
    }

    #[test]
    fn slice_respects_parent_bounds() {
        let chunk = MemoryChunk::heap(32);
        let sub = chunk.slice(16, 8).unwrap();
        assert_eq!(sub.size(), 8);

        assert!(sub.write_at(0, b"abcd"));
        let mut out = [0u8; 4];
        assert!(chunk.read_at(16, &mut out));
        assert_eq!(&out, b"abcd");

        assert!(matches!(
            chunk.slice(30, 4),
            Err(ChunkError::OutOfBounds { .. })
        ));
        assert!(matches!(
            sub.slice(4, 8),
            Err(ChunkError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn revoke_fails_all_access() {
        let chunk = MemoryChunk::heap(16);
        let sub = chunk.slice(0, 8).unwrap();

        assert!(chunk.valid());
        chunk.revoke();
        assert!(!chunk.valid());
        assert!(!sub.valid());

        assert!(!chunk.write_at(0, b"x"));
        let mut out = [0u8; 1];
        assert!(!sub.read_at(0, &mut out));
    }

    #[test]
    fn u32_accessors() {
        let chunk = MemoryChunk::heap(16);
        assert!(chunk.write_u32_at(4, 0xDEAD_BEEF));
        assert_eq!(chunk.read_u32_at(4), Some(0xDEAD_BEEF));
        assert_eq!(chunk.read_u32_at(16), None);
    }

    #[test]
    fn atomic_field_is_shared_across_views() {
        use std::sync::atomic::Ordering;

        let chunk = MemoryChunk::heap(16);
        let a = chunk.atomic_u32_at(0).unwrap();
        a.store(7, Ordering::Release);

        let view = chunk.slice(0, 8).unwrap();
        let b = view.atomic_u32_at(0).unwrap();
        assert_eq!(b.load(Ordering::Acquire), 7);
    }

    #[test]
    fn atomic_out_of_bounds_rejected() {
        let chunk = MemoryChunk::heap(8);
        assert!(chunk.atomic_u32_at(6).is_none());
    }
}
