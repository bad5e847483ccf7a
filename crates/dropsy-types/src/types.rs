//! Core data types for Dropsy
//!
//! This module provides the snapshot model shared by the scanner, the diff engine,
//! the state store and the watch controller, together with the identity types that
//! describe where a watched tree is mirrored to.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// Modification time in seconds since the Unix epoch
pub type ModTime = i64;

/// Exit status reported by a transfer job (`0` means success)
pub type ExitStatus = i32;

/// Kind of change a record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChangeKind {
    /// Record at rest, not part of a change set
    #[default]
    None,
    /// File appeared since the previous snapshot
    Added,
    /// File modification time changed since the previous snapshot
    Modified,
    /// File disappeared since the previous snapshot
    Deleted,
}

impl ChangeKind {
    /// Dispatch phases in the order they must run
    pub const PHASES: [ChangeKind; 3] = [ChangeKind::Added, ChangeKind::Modified, ChangeKind::Deleted];

    /// Short label used in per-file log lines
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Added => "add",
            Self::Modified => "mod",
            Self::Deleted => "del",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Metadata of one regular file in a watched tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileRecord {
    /// Absolute path of the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time in epoch seconds
    pub mtime: ModTime,
    /// Change tag, only set inside a [`ChangeSet`]
    pub change: ChangeKind,
}

impl FileRecord {
    /// Create an untagged record
    pub fn new<P: Into<PathBuf>>(path: P, size: u64, mtime: ModTime) -> Self {
        Self {
            path: path.into(),
            size,
            mtime,
            change: ChangeKind::None,
        }
    }

    /// Return a copy of this record tagged with `kind`
    pub fn tagged(&self, kind: ChangeKind) -> Self {
        Self {
            change: kind,
            ..self.clone()
        }
    }
}

/// Point-in-time collection of file records, unique by path
///
/// Records are keyed by path, so inserting a record for a path that is already
/// present replaces the earlier one. Records stored in a snapshot are always at
/// rest (`ChangeKind::None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: BTreeMap<PathBuf, FileRecord>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the record it replaced
    pub fn insert(&mut self, mut record: FileRecord) -> Option<FileRecord> {
        record.change = ChangeKind::None;
        self.records.insert(record.path.clone(), record)
    }

    /// Look up a record by path
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.records.get(path)
    }

    /// Check whether a path is present
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in path order
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Absorb every record of `other`; records of `other` win on equal paths
    pub fn merge(&mut self, other: Snapshot) {
        self.records.extend(other.records);
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl IntoIterator for Snapshot {
    type Item = FileRecord;
    type IntoIter = btree_map::IntoValues<PathBuf, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}

/// Three-way partition of the differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Records tagged [`ChangeKind::Added`]
    pub added: Vec<FileRecord>,
    /// Records tagged [`ChangeKind::Modified`]
    pub modified: Vec<FileRecord>,
    /// Records tagged [`ChangeKind::Deleted`]
    pub deleted: Vec<FileRecord>,
}

impl ChangeSet {
    /// Records belonging to one dispatch phase
    pub fn phase(&self, kind: ChangeKind) -> &[FileRecord] {
        match kind {
            ChangeKind::Added => &self.added,
            ChangeKind::Modified => &self.modified,
            ChangeKind::Deleted => &self.deleted,
            ChangeKind::None => &[],
        }
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Identity of a mirrored tree, used to name its state file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetIdentity {
    /// Remote user name
    pub username: String,
    /// Remote host name
    pub hostname: String,
    /// Absolute local path of the watched tree
    pub absolute_path: PathBuf,
}

impl TargetIdentity {
    /// Create a new identity
    pub fn new<U, H, P>(username: U, hostname: H, absolute_path: P) -> Self
    where
        U: Into<String>,
        H: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            username: username.into(),
            hostname: hostname.into(),
            absolute_path: absolute_path.into(),
        }
    }

    /// Lower-case hex expansion of `username:hostname:absolute_path`
    pub fn fingerprint(&self) -> String {
        let mut bytes = Vec::with_capacity(
            self.username.len() + self.hostname.len() + self.absolute_path.as_os_str().len() + 2,
        );
        bytes.extend_from_slice(self.username.as_bytes());
        bytes.push(b':');
        bytes.extend_from_slice(self.hostname.as_bytes());
        bytes.push(b':');
        bytes.extend_from_slice(&path_bytes(&self.absolute_path));
        hex::encode(bytes)
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Parsed `username@hostname:directory` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Remote user name
    pub username: String,
    /// Remote host name
    pub hostname: String,
    /// Local directory to watch, as given
    pub directory: PathBuf,
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let (username, rest) = text
            .split_once('@')
            .ok_or_else(|| Error::config(format!("Target '{}' is missing '@'", text)))?;
        let (hostname, directory) = rest
            .split_once(':')
            .ok_or_else(|| Error::config(format!("Target '{}' is missing ':'", text)))?;

        if username.is_empty() {
            return Err(Error::config(format!("Target '{}' has an empty user name", text)));
        }
        if hostname.is_empty() {
            return Err(Error::config(format!("Target '{}' has an empty host name", text)));
        }
        if directory.is_empty() {
            return Err(Error::config(format!("Target '{}' has an empty directory", text)));
        }

        Ok(Self {
            username: username.to_string(),
            hostname: hostname.to_string(),
            directory: PathBuf::from(directory),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.hostname, self.directory.display())
    }
}
