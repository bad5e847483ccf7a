//! Change observers

use dropsy_types::{ChangeKind, Error, FileRecord, Result};
use std::fmt;
use std::sync::Arc;

/// Observer invoked with the tagged record before its job is dispatched
pub type Callback = Arc<dyn Fn(&FileRecord) + Send + Sync>;

/// One optional observer per change kind
#[derive(Clone, Default)]
pub struct Hooks {
    added: Option<Callback>,
    modified: Option<Callback>,
    deleted: Option<Callback>,
}

impl Hooks {
    /// Register the observer for `kind`, replacing any earlier one
    pub fn set(&mut self, kind: ChangeKind, callback: Callback) -> Result<()> {
        let slot = match kind {
            ChangeKind::Added => &mut self.added,
            ChangeKind::Modified => &mut self.modified,
            ChangeKind::Deleted => &mut self.deleted,
            ChangeKind::None => {
                return Err(Error::config("Callbacks need an added, modified or deleted kind"))
            }
        };
        *slot = Some(callback);
        Ok(())
    }

    /// Invoke the observer matching the record's tag, if any
    pub fn fire(&self, record: &FileRecord) {
        let slot = match record.change {
            ChangeKind::Added => &self.added,
            ChangeKind::Modified => &self.modified,
            ChangeKind::Deleted => &self.deleted,
            ChangeKind::None => return,
        };
        if let Some(callback) = slot {
            callback(record);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("added", &self.added.is_some())
            .field("modified", &self.modified.is_some())
            .field("deleted", &self.deleted.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (
            count,
            Arc::new(move |_: &FileRecord| {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_fire_matches_kind() {
        let mut hooks = Hooks::default();
        let (added, callback) = counter();
        hooks.set(ChangeKind::Added, callback).unwrap();

        hooks.fire(&FileRecord::new("/a", 0, 0).tagged(ChangeKind::Added));
        hooks.fire(&FileRecord::new("/b", 0, 0).tagged(ChangeKind::Deleted));
        hooks.fire(&FileRecord::new("/c", 0, 0));

        assert_eq!(added.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_later_registration_replaces_earlier() {
        let mut hooks = Hooks::default();
        let (first, callback) = counter();
        hooks.set(ChangeKind::Modified, callback).unwrap();
        let (second, callback) = counter();
        hooks.set(ChangeKind::Modified, callback).unwrap();

        hooks.fire(&FileRecord::new("/a", 0, 0).tagged(ChangeKind::Modified));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_none_kind_is_rejected() {
        let (_, callback) = counter();
        assert!(Hooks::default().set(ChangeKind::None, callback).is_err());
    }
}
