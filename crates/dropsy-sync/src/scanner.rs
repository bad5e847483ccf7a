//! Recursive tree scanning

use dropsy_types::{Error, FileRecord, Snapshot};
use filetime::FileTime;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().as_encoded_bytes().first() == Some(&b'.')
}

/// Scan one root into a snapshot
///
/// Hidden entries and symbolic links are skipped, as is anything that cannot be
/// opened or stat'ed. Only regular files end up in the snapshot.
pub fn scan_root<P: AsRef<Path>>(root: P) -> Snapshot {
    let root = root.as_ref();
    let mut snapshot = Snapshot::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                debug!("Skipping: {}", Error::scan(path, err.to_string()));
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() || !file_type.is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!("Skipping: {}", Error::scan(entry.path(), err.to_string()));
                continue;
            }
        };

        let mtime = FileTime::from_last_modification_time(&metadata).unix_seconds();
        snapshot.insert(FileRecord::new(entry.path(), metadata.len(), mtime));
    }

    debug!("Scanned {} files in '{}'", snapshot.len(), root.display());
    snapshot
}

/// Scan every root and union the results
pub fn scan<P: AsRef<Path>>(roots: &[P]) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for root in roots {
        snapshot.merge(scan_root(root));
    }
    snapshot
}
