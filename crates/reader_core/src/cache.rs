//! Library modification cache backing `if-modified-since` checks.
//!
//! # Invariants
//! - Best effort: a missing or expired entry means "modified".
//! - Entries expire after the configured TTL.
//! - Every write prunes expired entries, so the map holds live readers only.

use crate::model::reader::ReaderId;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Per-reader last-modification timestamps (epoch ms).
pub trait LibraryCache {
    /// Records that the reader's library changed now.
    fn touch(&self, reader_id: ReaderId);
    fn last_modified(&self, reader_id: ReaderId) -> Option<i64>;
}

impl<C: LibraryCache + ?Sized> LibraryCache for Arc<C> {
    fn touch(&self, reader_id: ReaderId) {
        (**self).touch(reader_id);
    }

    fn last_modified(&self, reader_id: ReaderId) -> Option<i64> {
        (**self).last_modified(reader_id)
    }
}

/// In-process cache with a fixed TTL.
#[derive(Debug)]
pub struct MemoryLibraryCache {
    ttl: Duration,
    entries: Mutex<HashMap<ReaderId, CacheEntry>>,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    modified_at: i64,
    stored_at: Instant,
}

impl MemoryLibraryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_secs(ttl_secs: u64) -> Self {
        Self::new(Duration::from_secs(ttl_secs))
    }

    /// Records an explicit modification timestamp.
    pub fn record(&self, reader_id: ReaderId, modified_at: i64) {
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        entries.insert(
            reader_id,
            CacheEntry {
                modified_at,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included until the next write.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ReaderId, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LibraryCache for MemoryLibraryCache {
    fn touch(&self, reader_id: ReaderId) {
        self.record(reader_id, Utc::now().timestamp_millis());
    }

    fn last_modified(&self, reader_id: ReaderId) -> Option<i64> {
        let mut entries = self.entries();
        let entry = *entries.get(&reader_id)?;
        if entry.stored_at.elapsed() >= self.ttl {
            entries.remove(&reader_id);
            return None;
        }
        Some(entry.modified_at)
    }
}

#[cfg(test)]
mod tests {
    use super::{LibraryCache, MemoryLibraryCache};
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn unknown_reader_has_no_timestamp() {
        let cache = MemoryLibraryCache::from_secs(3600);
        assert_eq!(cache.last_modified(Uuid::new_v4()), None);
    }

    #[test]
    fn touch_records_current_time() {
        let cache = MemoryLibraryCache::from_secs(3600);
        let reader = Uuid::new_v4();
        let before = chrono::Utc::now().timestamp_millis();
        cache.touch(reader);
        let recorded = cache.last_modified(reader).unwrap();
        assert!(recorded >= before);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = MemoryLibraryCache::new(Duration::ZERO);
        let reader = Uuid::new_v4();
        cache.record(reader, 42);
        assert_eq!(cache.last_modified(reader), None);
    }

    #[test]
    fn writes_prune_expired_entries() {
        let cache = MemoryLibraryCache::new(Duration::ZERO);
        for _ in 0..3 {
            cache.touch(Uuid::new_v4());
        }
        assert_eq!(cache.len(), 1);

        let live = MemoryLibraryCache::from_secs(3600);
        live.touch(Uuid::new_v4());
        live.touch(Uuid::new_v4());
        assert_eq!(live.len(), 2);
    }
}
