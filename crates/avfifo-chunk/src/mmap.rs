use std::cell::UnsafeCell;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::chunk::ChunkBacking;
use crate::error::{ChunkError, Result};

/// File-backed shared mapping.
///
/// Both sides of a cross-process pipe open the same file and map the same
/// length; the fifo control block inside the mapping carries the handshake
/// (magic, capacity). The mapping is never remapped, so the base pointer
/// stays stable for the lifetime of the backing.
pub struct FileBacking {
    map: UnsafeCell<MmapMut>,
    len: usize,
    valid: AtomicBool,
}

// SAFETY: as with HeapBacking, all access goes through MemoryChunk under the
// single-producer/single-consumer offset protocol, and the mapping is never
// moved or resized.
unsafe impl Send for FileBacking {}
unsafe impl Sync for FileBacking {}

impl FileBacking {
    /// Create or open `path`, size it to `len` bytes, and map it writable.
    ///
    /// An existing file keeps its content, so the side opening with
    /// `init = false` at the fifo layer sees the offsets its peer wrote.
    pub fn open(path: impl AsRef<Path>, len: usize) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| ChunkError::Map {
                path: path.to_path_buf(),
                source,
            })?;
        file.set_len(len as u64)?;

        // SAFETY: the file was just opened read/write and sized to `len`.
        let map = unsafe {
            MmapOptions::new()
                .len(len)
                .map_mut(&file)
                .map_err(|source| ChunkError::Map {
                    path: path.to_path_buf(),
                    source,
                })?
        };
        debug!(?path, len, "mapped chunk file");

        Ok(Arc::new(Self {
            map: UnsafeCell::new(map),
            len,
            valid: AtomicBool::new(true),
        }))
    }
}

impl ChunkBacking for FileBacking {
    fn base(&self) -> *mut u8 {
        // SAFETY: only the pointer is taken; the mapping is never remapped.
        unsafe { (*self.map.get()).as_mut_ptr() }
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
    use crate::chunk::MemoryChunk;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("avfifo-chunk-{tag}-{}", std::process::id()))
    }

    #[test]
    fn mapped_content_is_shared_between_views() {
        let path = temp_path("shared");
        let backing = FileBacking::open(&path, 64).unwrap();

        let writer = MemoryChunk::new(Arc::clone(&backing) as Arc<dyn ChunkBacking>);
        let reader = MemoryChunk::new(backing);

        assert!(writer.write_at(10, b"frame"));
        let mut out = [0u8; 5];
        assert!(reader.read_at(10, &mut out));
        assert_eq!(&out, b"frame");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn reopen_sees_previous_content() {
        let path = temp_path("reopen");
        {
            let backing = FileBacking::open(&path, 32).unwrap();
            let chunk = MemoryChunk::new(backing);
            assert!(chunk.write_u32_at(0, 0xA5A5_0001));
        }

        let backing = FileBacking::open(&path, 32).unwrap();
        let chunk = MemoryChunk::new(backing);
        assert_eq!(chunk.read_u32_at(0), Some(0xA5A5_0001));

        let _ = std::fs::remove_file(&path);
    }
}
