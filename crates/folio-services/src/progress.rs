//! Append-only record of keys uploaded but not yet owned by a persisted project.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use folio_core::models::AssetKey;

#[derive(Debug, Default)]
struct Inner {
    order: Vec<AssetKey>,
    seen: HashSet<AssetKey>,
}

/// Shared between the calling task and every gallery upload of one creation.
///
/// Appends are atomic and deduplicated; `drain` hands each key out exactly once.
#[derive(Debug, Default)]
pub struct UploadedKeys {
    inner: Mutex<Inner>,
}

impl UploadedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking uploader must not hide keys from cleanup.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a key. Returns false if it was already recorded.
    pub fn push(&self, key: AssetKey) -> bool {
        let mut inner = self.lock();
        if !inner.seen.insert(key.clone()) {
            return false;
        }
        inner.order.push(key);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    /// Keys in the order they were recorded.
    pub fn snapshot(&self) -> Vec<AssetKey> {
        self.lock().order.clone()
    }

    /// Take every recorded key, leaving the record empty.
    ///
    /// Drained keys stay in the seen-set, so a late push of the same key is ignored
    /// while a late push of a new key is kept for a later drain.
    pub fn drain(&self) -> Vec<AssetKey> {
        std::mem::take(&mut self.lock().order)
    }
}
