//! Persistent snapshot state
//!
//! The state file of a target holds one line per file:
//! `<absolute-path>\t<mtime>\t<size>`. Lines starting with `#` are comments and
//! lines without both separators are ignored. Paths are stored as their raw
//! bytes, so names that are not valid UTF-8 survive a reload.

use dropsy_types::{Error, FileRecord, Result, Snapshot, TargetIdentity, PROGRAM_NAME};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Store of per-target state files
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    state_dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `state_dir`
    pub fn new<P: Into<PathBuf>>(state_dir: P) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Store rooted at `<home>/.dropsy`
    pub fn in_home() -> Result<Self> {
        Ok(Self::new(Self::default_dir()?))
    }

    /// Default state directory, `<home>/.dropsy`
    pub fn default_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(format!(".{}", PROGRAM_NAME)))
            .ok_or_else(|| Error::config("Cannot determine the home directory"))
    }

    /// Directory holding the state files
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the state file for `identity`, creating the state directory if needed
    pub async fn state_path_for(&self, identity: &TargetIdentity) -> Result<PathBuf> {
        fs::create_dir_all(&self.state_dir)
            .await
            .map_err(|e| Error::store(&self.state_dir, e.to_string()))?;
        Ok(self.state_dir.join(identity.fingerprint()))
    }

    /// Load a state file; `None` means it does not exist yet
    ///
    /// Only a missing file counts as a first run. Any other read failure is an
    /// [`Error::Store`] and stops the monitor with exit code 16.
    pub async fn load(path: &Path) -> Result<Option<Snapshot>> {
        let contents = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at '{}'", path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::store(path, e.to_string())),
        };

        let snapshot = parse_state(&contents);
        info!("Loaded {} records from '{}'", snapshot.len(), path.display());
        Ok(Some(snapshot))
    }

    /// Overwrite a state file with `snapshot`
    pub async fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
        fs::write(path, render_state(snapshot))
            .await
            .map_err(|e| Error::store(path, e.to_string()))?;

        debug!("Saved {} records to '{}'", snapshot.len(), path.display());
        Ok(())
    }
}

fn parse_state(contents: &[u8]) -> Snapshot {
    contents
        .split(|byte| *byte == b'\n')
        .filter(|line| line.first() != Some(&b'#'))
        .filter_map(|line| {
            let mut fields = line.splitn(3, |byte| *byte == b'\t');
            let path = fields.next()?;
            let mtime = fields.next()?;
            let size = fields.next()?;
            Some(FileRecord::new(
                path_from_bytes(path),
                u64::try_from(leading_int(size)).unwrap_or(0),
                leading_int(mtime),
            ))
        })
        .collect()
}

fn render_state(snapshot: &Snapshot) -> Vec<u8> {
    let mut out = Vec::new();
    for record in snapshot.iter() {
        out.extend_from_slice(&path_to_bytes(&record.path));
        out.extend_from_slice(format!("\t{}\t{}\n", record.mtime, record.size).as_bytes());
    }
    out
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Parse an optionally signed run of leading digits, ignoring leading blanks; 0 if none
fn leading_int(field: &[u8]) -> i64 {
    let start = field
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(field.len());
    let trimmed = &field[start..];
    let (negative, digits) = match trimmed.first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let value = digits
        .iter()
        .take_while(|byte| byte.is_ascii_digit())
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        });

    if negative {
        -value
    } else {
        value
    }
}
