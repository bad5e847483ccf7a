use async_trait::async_trait;
use dropsy_sync::SnapshotStore;
use dropsy_types::{Credentials, ExitStatus, Result, TargetIdentity, Transport};
use filetime::{set_file_mtime, FileTime};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// User name used by the fixtures
pub const USER: &str = "bob";
/// Host name used by the fixtures
pub const HOST: &str = "backup.local";

/// Shared, ordered log of transport and hook events
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// In-memory transport with scripted outcomes
///
/// Every call appends `start <op> <path>` and `end <op> <path>` to the event log,
/// where `<op>` is `add` or `del`.
#[derive(Debug)]
pub struct ScriptedTransport {
    log: EventLog,
    failures: HashMap<PathBuf, ExitStatus>,
    delay: Duration,
    accept: bool,
    running: AtomicUsize,
    peak: AtomicUsize,
    released: AtomicUsize,
}

impl ScriptedTransport {
    /// Transport that accepts the credentials and succeeds on every job
    pub fn new() -> Self {
        Self::with_log(Arc::new(Mutex::new(Vec::new())))
    }

    /// Same as [`ScriptedTransport::new`] but writing into an existing log
    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            failures: HashMap::new(),
            delay: Duration::from_millis(5),
            accept: true,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// Make jobs for `path` exit with `status`
    pub fn failing<P: Into<PathBuf>>(mut self, path: P, status: ExitStatus) -> Self {
        self.failures.insert(path.into(), status);
        self
    }

    /// Make every job take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Reject the credentials
    pub fn rejecting(mut self) -> Self {
        self.accept = false;
        self
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Paths passed to the transport for `op`, in start order
    pub fn calls(&self, op: &str) -> Vec<PathBuf> {
        let prefix = format!("start {} ", op);
        self.events()
            .iter()
            .filter_map(|event| event.strip_prefix(&prefix).map(PathBuf::from))
            .collect()
    }

    /// Highest number of jobs observed running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of times the transport was released
    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    async fn job(&self, op: &str, path: &Path) -> ExitStatus {
        self.log
            .lock()
            .unwrap()
            .push(format!("start {} {}", op, path.display()));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.log
            .lock()
            .unwrap()
            .push(format!("end {} {}", op, path.display()));
        self.failures.get(path).copied().unwrap_or(0)
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<bool> {
        Ok(self.accept)
    }

    async fn remote_add(&self, path: &Path) -> Result<ExitStatus> {
        Ok(self.job("add", path).await)
    }

    async fn remote_delete(&self, path: &Path) -> Result<ExitStatus> {
        Ok(self.job("del", path).await)
    }

    async fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fixture credentials
pub fn credentials() -> Credentials {
    Credentials::new(USER, HOST, "s3cret")
}

/// Write `size` bytes to `root/name` and pin its modification time
pub fn write_file(root: &Path, name: &str, size: usize, mtime: i64) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, vec![b'x'; size]).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
    path.canonicalize().unwrap()
}

/// State file path the controller will use for a single watched root
pub async fn state_file_for(state_dir: &Path, root: &Path) -> PathBuf {
    let identity = TargetIdentity::new(USER, HOST, root.canonicalize().unwrap());
    SnapshotStore::new(state_dir).state_path_for(&identity).await.unwrap()
}
