//! Snapshot diffing.

use super::event::{ChangeEvent, ChangeKind};
use super::snapshot::Snapshot;
use super::suppression::SuppressionLedger;

/// Compare two snapshots and classify every changed path.
///
/// Deletions come first, then creations and modifications, each group in
/// path order. Candidates whose path is consumed from the ledger are dropped.
/// Unchanged paths never consult the ledger.
pub fn diff(
    previous: &Snapshot,
    current: &Snapshot,
    ledger: &SuppressionLedger,
) -> Vec<ChangeEvent> {
    let deleted = previous
        .iter()
        .filter(|(path, _)| !current.contains(path))
        .map(|(path, _)| ChangeEvent::deleted(path));

    let written = current
        .iter()
        .filter_map(|(path, mtime)| match previous.get(path) {
            None => Some(ChangeEvent::created(path)),
            Some(old) if old != mtime => Some(ChangeEvent::modified(path)),
            Some(_) => None,
        });

    deleted
        .chain(written)
        .filter(|event| {
            if ledger.should_suppress(&event.path) {
                crate::log_event!("watcher", "ignored", "{}", event);
                false
            } else {
                true
            }
        })
        .collect()
}

/// Count events by kind, for the per-cycle summary line.
pub(crate) fn tally(events: &[ChangeEvent]) -> (usize, usize, usize) {
    events.iter().fold((0, 0, 0), |(c, m, d), e| match e.kind {
        ChangeKind::Created => (c + 1, m, d),
        ChangeKind::Modified => (c, m + 1, d),
        ChangeKind::Deleted => (c, m, d + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn snap(entries: &[(&str, i64)]) -> Snapshot {
        entries
            .iter()
            .map(|(p, m)| (PathBuf::from(p), *m))
            .collect()
    }

    #[test]
    fn test_identical_snapshots_yield_nothing() {
        let ledger = SuppressionLedger::new();
        let s = snap(&[("/w/a.txt", 10), ("/w/b.txt", 20)]);

        assert!(diff(&s, &s.clone(), &ledger).is_empty());
    }

    #[test]
    fn test_new_path_is_created() {
        let ledger = SuppressionLedger::new();
        let previous = snap(&[("/w/a.txt", 10)]);
        let current = snap(&[("/w/a.txt", 10), ("/w/b.txt", 5)]);

        let events = diff(&previous, &current, &ledger);
        assert_eq!(events, vec![ChangeEvent::created("/w/b.txt")]);
    }

    #[test]
    fn test_missing_path_is_deleted() {
        let ledger = SuppressionLedger::new();
        let previous = snap(&[("/w/a.txt", 10), ("/w/b.txt", 5)]);
        let current = snap(&[("/w/b.txt", 5)]);

        let events = diff(&previous, &current, &ledger);
        assert_eq!(events, vec![ChangeEvent::deleted("/w/a.txt")]);
    }

    #[test]
    fn test_mtime_change_is_modified() {
        let ledger = SuppressionLedger::new();
        let previous = snap(&[("/w/a.txt", 10), ("/w/b.txt", 5)]);
        let current = snap(&[("/w/a.txt", 11), ("/w/b.txt", 5)]);

        let events = diff(&previous, &current, &ledger);
        assert_eq!(events, vec![ChangeEvent::modified("/w/a.txt")]);
    }

    #[test]
    fn test_deletions_come_first() {
        let ledger = SuppressionLedger::new();
        let previous = snap(&[("/w/z.txt", 1), ("/w/m.txt", 1)]);
        let current = snap(&[("/w/a.txt", 1), ("/w/m.txt", 2)]);

        let events = diff(&previous, &current, &ledger);
        assert_eq!(
            events,
            vec![
                ChangeEvent::deleted("/w/z.txt"),
                ChangeEvent::created("/w/a.txt"),
                ChangeEvent::modified("/w/m.txt"),
            ]
        );
    }

    #[test]
    fn test_suppressed_path_is_swallowed_once() {
        let ledger = SuppressionLedger::new();
        ledger.mark("/w/optimized_a.jpg");

        let previous = snap(&[]);
        let current = snap(&[("/w/optimized_a.jpg", 3), ("/w/a.jpg", 3)]);

        let events = diff(&previous, &current, &ledger);
        assert_eq!(events, vec![ChangeEvent::created("/w/a.jpg")]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_suppression_applies_to_deletions() {
        let ledger = SuppressionLedger::new();
        ledger.mark("/w/b.zip");

        let previous = snap(&[("/w/b.zip", 3)]);
        let current = snap(&[]);

        assert!(diff(&previous, &current, &ledger).is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unchanged_paths_keep_their_marks() {
        let ledger = SuppressionLedger::new();
        ledger.mark("/w/a.txt");

        let s = snap(&[("/w/a.txt", 1)]);
        assert!(diff(&s, &s, &ledger).is_empty());
        assert!(ledger.contains(std::path::Path::new("/w/a.txt")));
    }

    #[test]
    fn test_tally_counts_kinds() {
        let events = vec![
            ChangeEvent::created("/a"),
            ChangeEvent::created("/b"),
            ChangeEvent::deleted("/c"),
        ];
        assert_eq!(tally(&events), (2, 0, 1));
    }
}
