//! Snapshot difference detection

use dropsy_types::{ChangeKind, ChangeSet, Snapshot};
use tracing::debug;

/// Engine computing the change set between two snapshots
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

impl DiffEngine {
    /// Compare `prev` with `now`
    ///
    /// On a first run every record of `now` is added and nothing is modified or
    /// deleted. Otherwise a record is modified when its modification time differs;
    /// a size change alone goes unnoticed.
    pub fn detect_changes(prev: &Snapshot, now: &Snapshot, first_run: bool) -> ChangeSet {
        let mut changes = ChangeSet::default();

        if first_run {
            changes.added = now.iter().map(|r| r.tagged(ChangeKind::Added)).collect();
            debug!("First run: {} files added", changes.added.len());
            return changes;
        }

        for record in now.iter() {
            match prev.get(&record.path) {
                None => changes.added.push(record.tagged(ChangeKind::Added)),
                Some(old) if old.mtime != record.mtime => {
                    changes.modified.push(record.tagged(ChangeKind::Modified));
                }
                Some(_) => {}
            }
        }

        changes.deleted = prev
            .iter()
            .filter(|record| !now.contains(&record.path))
            .map(|record| record.tagged(ChangeKind::Deleted))
            .collect();

        debug!(
            "Detected {} added, {} modified, {} deleted",
            changes.added.len(),
            changes.modified.len(),
            changes.deleted.len()
        );
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropsy_types::FileRecord;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn snapshot(entries: &[(&str, i64)]) -> Snapshot {
        entries
            .iter()
            .map(|(path, mtime)| FileRecord::new(*path, 1, *mtime))
            .collect()
    }

    fn paths(records: &[FileRecord]) -> Vec<PathBuf> {
        records.iter().map(|r| r.path.clone()).collect()
    }

    #[test]
    fn test_modified_only() {
        let prev = snapshot(&[("/x.txt", 100)]);
        let now = snapshot(&[("/x.txt", 200)]);

        let changes = DiffEngine::detect_changes(&prev, &now, false);
        assert!(changes.added.is_empty());
        assert!(changes.deleted.is_empty());
        assert_eq!(paths(&changes.modified), vec![PathBuf::from("/x.txt")]);
        assert_eq!(changes.modified[0].change, ChangeKind::Modified);
    }

    #[test]
    fn test_deleted_only() {
        let prev = snapshot(&[("/x.txt", 100), ("/y.txt", 100)]);
        let now = snapshot(&[("/y.txt", 100)]);

        let changes = DiffEngine::detect_changes(&prev, &now, false);
        assert_eq!(changes.total(), 1);
        assert_eq!(paths(&changes.deleted), vec![PathBuf::from("/x.txt")]);
    }

    #[test]
    fn test_size_change_is_not_a_modification() {
        let prev: Snapshot = vec![FileRecord::new("/x", 10, 100)].into_iter().collect();
        let now: Snapshot = vec![FileRecord::new("/x", 99, 100)].into_iter().collect();

        assert!(DiffEngine::detect_changes(&prev, &now, false).is_empty());
    }

    #[test]
    fn test_first_run_adds_everything() {
        let prev = snapshot(&[("/x.txt", 100), ("/gone", 1)]);
        let now = snapshot(&[("/x.txt", 200), ("/new", 1)]);

        let changes = DiffEngine::detect_changes(&prev, &now, true);
        assert_eq!(changes.added.len(), 2);
        assert!(changes.modified.is_empty());
        assert!(changes.deleted.is_empty());
        assert!(changes.added.iter().all(|r| r.change == ChangeKind::Added));
    }

    fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        prop::collection::btree_map("[a-e]{1,2}", 0i64..4, 0..12).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(name, mtime)| FileRecord::new(format!("/{}", name), 0, mtime))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_diff_partitions_paths(prev in arb_snapshot(), now in arb_snapshot()) {
            let changes = DiffEngine::detect_changes(&prev, &now, false);

            let prev_paths: BTreeSet<_> = prev.iter().map(|r| r.path.clone()).collect();
            let now_paths: BTreeSet<_> = now.iter().map(|r| r.path.clone()).collect();
            let added: BTreeSet<_> = paths(&changes.added).into_iter().collect();
            let modified: BTreeSet<_> = paths(&changes.modified).into_iter().collect();
            let deleted: BTreeSet<_> = paths(&changes.deleted).into_iter().collect();

            let expected_added: BTreeSet<PathBuf> = now_paths.difference(&prev_paths).cloned().collect();
            let expected_deleted: BTreeSet<PathBuf> = prev_paths.difference(&now_paths).cloned().collect();

            prop_assert_eq!(&added, &expected_added);
            prop_assert_eq!(&deleted, &expected_deleted);
            for path in &modified {
                prop_assert!(prev_paths.contains(path) && now_paths.contains(path));
                prop_assert_ne!(prev.get(path).map(|r| r.mtime), now.get(path).map(|r| r.mtime));
            }
            prop_assert!(added.is_disjoint(&modified));
            prop_assert!(modified.is_disjoint(&deleted));
            prop_assert!(added.is_disjoint(&deleted));
        }

        #[test]
        fn test_first_run_ignores_prev(prev in arb_snapshot(), now in arb_snapshot()) {
            let changes = DiffEngine::detect_changes(&prev, &now, true);
            prop_assert_eq!(changes.added.len(), now.len());
            prop_assert!(changes.modified.is_empty() && changes.deleted.is_empty());
        }
    }
}
