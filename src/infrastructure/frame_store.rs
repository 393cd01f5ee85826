//! Frame Store
//!
//! Maps a name to a fixed-size, cross-process byte buffer (spec.md §4.1).
//! Backed by the `shared_memory` crate's `flink`-addressed segments; none
//! of the five example repos needed cross-process shared memory before
//! this, so the dependency is new (noted in DESIGN.md).

use std::path::{Path, PathBuf};

use shared_memory::{Shmem, ShmemConf, ShmemError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameStoreError {
    #[error("shared memory error: {0}")]
    Shmem(#[from] ShmemError),
}

/// A directory of named shared-memory slabs. Each camera/detector-client
/// owns one `FrameStore` instance (they all agree on `base_dir`, which is
/// `AppConfig::cache_dir()`'s shared-memory sibling).
#[derive(Debug, Clone)]
pub struct FrameStore {
    base_dir: PathBuf,
}

impl FrameStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn flink_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Creates a new slab of `size` bytes, returning a writable view.
    pub fn create(&self, name: &str, size: usize) -> Result<FrameHandle, FrameStoreError> {
        if let Some(parent) = self.flink_path(name).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let shmem = ShmemConf::new().size(size).flink(self.flink_path(name)).create()?;
        Ok(FrameHandle { shmem })
    }

    /// Opens an existing slab for reading/writing. Returns `None` if the
    /// segment is not resident (consistent with spec.md §4.1's "`None` if
    /// not resident").
    pub fn get(&self, name: &str, size: usize) -> Option<FrameHandle> {
        ShmemConf::new()
            .size(size)
            .flink(self.flink_path(name))
            .open()
            .ok()
            .map(|shmem| FrameHandle { shmem })
    }

    /// Removes a slab's backing file. Safe to call even if no process has
    /// it open; harmless if it's already gone.
    pub fn delete(&self, name: &str) {
        let _ = std::fs::remove_file(self.flink_path(name));
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// A scoped handle onto one slab. Spec.md §4.1 requires that a consumer's
/// failure to call `close` must not leak; `FrameHandle`'s `Drop` closes
/// the underlying mapping unconditionally, so ordinary Rust scoping gives
/// this for free — `close()` is provided only to make the release point
/// explicit at call sites that mirror the spec's operation list.
pub struct FrameHandle {
    shmem: Shmem,
}

impl FrameHandle {
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.shmem.as_ptr(), self.shmem.len()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.shmem.as_ptr(), self.shmem.len()) }
    }

    pub fn len(&self) -> usize {
        self.shmem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit release point; equivalent to dropping the handle.
    pub fn close(self) {
        drop(self)
    }
}

// `Shmem` is `Send` but not `Sync` upstream; the capture thread and the
// processing loop each own a distinct `FrameHandle` rather than sharing
// one across threads, so this is never contended.
unsafe impl Send for FrameHandle {}
