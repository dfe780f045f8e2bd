//! Self-write suppression.
//!
//! Handlers that write files under the watched root mark the target path
//! here first. The next change the watcher observes for that path is then
//! swallowed instead of dispatched, which keeps a handler's own output from
//! re-entering the pipeline.
//!
//! Suppression is single-shot and time-bounded: a consumed entry is removed,
//! and entries older than the TTL are purged before every scan cycle so a
//! stale mark cannot hide a later external edit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default lifetime of a suppression entry.
pub const DEFAULT_SUPPRESSION_TTL: Duration = Duration::from_secs(2);

/// Time-bounded set of paths whose next change must be discarded.
///
/// Cloning yields another handle to the same ledger.
#[derive(Debug, Clone)]
pub struct SuppressionLedger {
    entries: Arc<DashMap<PathBuf, Instant>>,
    ttl: Duration,
}

impl SuppressionLedger {
    /// Create a ledger with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SUPPRESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mark a path whose next change should be ignored.
    ///
    /// Re-marking resets the entry's timestamp.
    pub fn mark(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        crate::debug_event!("ledger", "marked", "{}", path.display());
        self.entries.insert(path, Instant::now());
    }

    /// Consume the entry for `path`.
    ///
    /// Returns true only when an unexpired entry existed. The entry is
    /// removed either way.
    pub fn should_suppress(&self, path: &Path) -> bool {
        self.should_suppress_at(path, Instant::now())
    }

    fn should_suppress_at(&self, path: &Path, now: Instant) -> bool {
        match self.entries.remove(path) {
            Some((_, inserted_at)) => !self.is_expired(inserted_at, now),
            None => false,
        }
    }

    /// Drop every entry older than the TTL.
    pub fn purge_expired(&self, now: Instant) {
        self.entries
            .retain(|_, inserted_at| !self.is_expired(*inserted_at, now));
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, inserted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted_at) > self.ttl
    }
}

impl Default for SuppressionLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_then_suppress_once() {
        let ledger = SuppressionLedger::new();
        let path = PathBuf::from("/watch/optimized_cat.jpg");

        ledger.mark(&path);

        assert!(ledger.should_suppress(&path));
        // Consumed by the first check
        assert!(!ledger.should_suppress(&path));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unknown_path_not_suppressed() {
        let ledger = SuppressionLedger::new();
        assert!(!ledger.should_suppress(Path::new("/watch/other.txt")));
    }

    #[test]
    fn test_purge_removes_expired_entries() {
        let ledger = SuppressionLedger::new();
        let path = PathBuf::from("/watch/a.txt");
        ledger.mark(&path);

        let later = Instant::now() + ledger.ttl() + Duration::from_secs(1);
        ledger.purge_expired(later);

        assert!(!ledger.contains(&path));
        assert!(!ledger.should_suppress(&path));
    }

    #[test]
    fn test_purge_keeps_fresh_entries() {
        let ledger = SuppressionLedger::new();
        let path = PathBuf::from("/watch/a.txt");
        ledger.mark(&path);

        ledger.purge_expired(Instant::now());

        assert!(ledger.contains(&path));
    }

    #[test]
    fn test_expired_entry_is_dropped_without_suppressing() {
        let ledger = SuppressionLedger::with_ttl(Duration::from_millis(10));
        let path = PathBuf::from("/watch/a.txt");
        ledger.mark(&path);

        let later = Instant::now() + Duration::from_secs(1);
        assert!(!ledger.should_suppress_at(&path, later));
        assert!(!ledger.contains(&path));
    }

    #[test]
    fn test_clones_share_entries() {
        let ledger = SuppressionLedger::new();
        let handle = ledger.clone();
        let path = PathBuf::from("/watch/archive");

        handle.mark(&path);

        assert_eq!(ledger.len(), 1);
        assert!(ledger.should_suppress(&path));
        assert!(handle.is_empty());
    }
}
