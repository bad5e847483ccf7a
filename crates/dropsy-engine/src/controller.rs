//! Watch controller
//!
//! The controller owns the monitor configuration and drives the cycle:
//! scan every root, diff against the last committed snapshot, dispatch the
//! added, modified and deleted phases through the [`JobPool`], then persist the
//! new snapshot when something changed and every job succeeded.

use crate::{Callback, Hooks, JobPool};
use dropsy_config::Config;
use dropsy_sync::{scanner, DiffEngine, SnapshotStore};
use dropsy_types::{
    ChangeKind, Credentials, Error, FileRecord, Parallelism, PollInterval, Result, Snapshot,
    TargetIdentity, Transport, DIRS_MAX,
};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Status recorded for a job whose transport call returned an error
const TRANSPORT_ERROR_STATUS: i32 = -1;

/// Settings of one monitor, fixed at initialization
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directories to watch, in the order given
    pub directories: Vec<PathBuf>,
    /// Remote credentials
    pub credentials: Credentials,
    /// Maximum concurrent jobs
    pub parallelism: Parallelism,
    /// Delay between cycles
    pub poll_interval: PollInterval,
    /// State directory override; `~/.dropsy` when unset
    pub state_dir: Option<PathBuf>,
    /// Maximum number of directories accepted
    pub max_directories: usize,
}

impl MonitorConfig {
    /// Single-cycle configuration with default parallelism
    pub fn new(directories: Vec<PathBuf>, credentials: Credentials) -> Self {
        Self {
            directories,
            credentials,
            parallelism: Parallelism::default(),
            poll_interval: PollInterval::ONCE,
            state_dir: None,
            max_directories: DIRS_MAX,
        }
    }

    /// Configuration taking its watch settings from a loaded [`Config`]
    pub fn from_config(config: &Config, directories: Vec<PathBuf>, credentials: Credentials) -> Self {
        Self {
            directories,
            credentials,
            parallelism: config.watch.parallelism(),
            poll_interval: config.watch.poll_interval(),
            state_dir: config.watch.state_dir.clone(),
            max_directories: config.watch.max_directories,
        }
    }

    /// Set the parallelism limit
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, poll_interval: PollInterval) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the state directory
    pub fn with_state_dir<P: Into<PathBuf>>(mut self, state_dir: P) -> Self {
        self.state_dir = Some(state_dir.into());
        self
    }
}

/// Lifecycle state of a [`WatchController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Created, `init` not yet called
    Uninitialized,
    /// Validated and authenticated, no cycle run yet
    Initialized,
    /// At least one cycle has run
    Watching,
    /// Shut down; credentials are gone
    Stopped,
}

/// Summary of one watch cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Whether the cycle ran without a previous snapshot
    pub first_run: bool,
    /// Number of added files dispatched
    pub added: usize,
    /// Number of modified files dispatched
    pub modified: usize,
    /// Number of deleted files dispatched
    pub deleted: usize,
    /// Whether the state file was rewritten
    pub persisted: bool,
}

impl CycleReport {
    /// Total number of dispatched changes
    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

/// Drives scan, diff, dispatch and persist cycles for a set of directories
pub struct WatchController {
    config: MonitorConfig,
    transport: Arc<dyn Transport>,
    state: MonitorState,
    pool: JobPool,
    hooks: Hooks,
    token: CancellationToken,
    roots: Vec<PathBuf>,
    state_path: Option<PathBuf>,
    previous: Option<Snapshot>,
    cycles: u64,
}

impl WatchController {
    /// Create an uninitialized controller
    pub fn new(config: MonitorConfig, transport: Arc<dyn Transport>) -> Self {
        let pool = JobPool::new(config.parallelism);
        Self {
            config,
            transport,
            state: MonitorState::Uninitialized,
            pool,
            hooks: Hooks::default(),
            token: CancellationToken::new(),
            roots: Vec::new(),
            state_path: None,
            previous: None,
            cycles: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Monitor credentials
    pub fn credentials(&self) -> &Credentials {
        &self.config.credentials
    }

    /// Path of the state file, known once initialized
    pub fn state_path(&self) -> Option<&PathBuf> {
        self.state_path.as_ref()
    }

    /// Token that stops [`WatchController::run`] at the next cycle boundary
    pub fn stop_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Register the observer for one change kind
    pub fn set_callback(&mut self, kind: ChangeKind, callback: Callback) -> Result<()> {
        self.hooks.set(kind, callback)
    }

    /// Validate the directories, resolve the state file, load the previous
    /// snapshot and authenticate
    pub async fn init(&mut self) -> Result<()> {
        match self.state {
            MonitorState::Uninitialized => {}
            MonitorState::Stopped => return Err(Error::Uninitialized),
            MonitorState::Initialized | MonitorState::Watching => {
                return Err(Error::other("Monitor is already initialized"))
            }
        }

        let limit = self.config.max_directories.min(DIRS_MAX);
        if self.config.directories.is_empty() {
            return Err(Error::config("No directories to watch"));
        }
        if self.config.directories.len() > limit {
            return Err(Error::config(format!(
                "Too many directories: {} (maximum {})",
                self.config.directories.len(),
                limit
            )));
        }

        let mut roots = Vec::with_capacity(self.config.directories.len());
        for directory in &self.config.directories {
            let metadata = tokio::fs::metadata(directory).await.map_err(|_| {
                Error::config(format!("Directory '{}' does not exist", directory.display()))
            })?;
            if !metadata.is_dir() {
                return Err(Error::config(format!(
                    "'{}' is not a directory",
                    directory.display()
                )));
            }
            roots.push(tokio::fs::canonicalize(directory).await?);
        }

        let identity = TargetIdentity::new(
            self.config.credentials.username.clone(),
            self.config.credentials.hostname.clone(),
            joined_roots(&roots),
        );
        let store = match &self.config.state_dir {
            Some(dir) => SnapshotStore::new(dir.clone()),
            None => SnapshotStore::in_home()?,
        };
        let state_path = store.state_path_for(&identity).await?;
        debug!("State file: {}", state_path.display());

        self.previous = SnapshotStore::load(&state_path).await?;

        let accepted = self.transport.authenticate(&self.config.credentials).await?;
        if !accepted {
            return Err(Error::Authentication {
                username: self.config.credentials.username.clone(),
                hostname: self.config.credentials.hostname.clone(),
            });
        }

        info!(
            "Watching {} director{} for {}@{} with {} jobs",
            roots.len(),
            if roots.len() == 1 { "y" } else { "ies" },
            self.config.credentials.username,
            self.config.credentials.hostname,
            self.pool.limit()
        );

        self.roots = roots;
        self.state_path = Some(state_path);
        self.state = MonitorState::Initialized;
        Ok(())
    }

    /// Run a single cycle
    pub async fn watch_once(&mut self) -> Result<CycleReport> {
        let state_path = match (self.state, &self.state_path) {
            (MonitorState::Initialized | MonitorState::Watching, Some(path)) => path.clone(),
            _ => return Err(Error::Uninitialized),
        };
        self.state = MonitorState::Watching;

        let roots = self.roots.clone();
        let now = tokio::task::spawn_blocking(move || scanner::scan(&roots))
            .await
            .map_err(|e| Error::other(format!("Scan task failed: {}", e)))?;

        let first_run = self.cycles == 0 && self.previous.is_none();
        let changes = match &self.previous {
            Some(prev) => DiffEngine::detect_changes(prev, &now, first_run),
            None => DiffEngine::detect_changes(&Snapshot::new(), &now, first_run),
        };

        for kind in ChangeKind::PHASES {
            self.dispatch(kind, changes.phase(kind), first_run).await?;
        }

        let mut report = CycleReport {
            first_run,
            added: changes.added.len(),
            modified: changes.modified.len(),
            deleted: changes.deleted.len(),
            persisted: false,
        };

        if report.total() > 0 {
            SnapshotStore::save(&state_path, &now).await?;
            report.persisted = true;
            info!("total of {} actions", report.total());
        }

        self.previous = Some(now);
        self.cycles += 1;
        Ok(report)
    }

    async fn dispatch(&self, kind: ChangeKind, items: &[FileRecord], first_run: bool) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let label = if first_run { "init" } else { kind.label() };
        let hooks = &self.hooks;
        let transport = &self.transport;

        let outcome = self
            .pool
            .run_category(kind, items, |record| {
                hooks.fire(&record);
                info!("{} file : {}", label, record.path.display());

                let transport = Arc::clone(transport);
                async move {
                    let result = match record.change {
                        ChangeKind::Deleted => transport.remote_delete(&record.path).await,
                        _ => transport.remote_add(&record.path).await,
                    };
                    result.unwrap_or_else(|e| {
                        warn!("Transport error for '{}': {}", record.path.display(), e);
                        TRANSPORT_ERROR_STATUS
                    })
                }
            })
            .await?;

        outcome.into_result().map(|_| ())
    }

    /// Run cycles until the poll interval says stop or the stop token fires
    ///
    /// A fatal error shuts the controller down before it is returned.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            if self.token.is_cancelled() {
                info!("Stop requested");
                return Ok(());
            }

            if let Err(e) = self.watch_once().await {
                error!("Watch cycle failed: {}", e);
                self.shutdown().await;
                return Err(e);
            }

            let interval = self.config.poll_interval;
            if !interval.is_polling() {
                return Ok(());
            }

            tokio::select! {
                () = self.token.cancelled() => {
                    info!("Stop requested");
                    return Ok(());
                }
                () = tokio::time::sleep(interval.as_duration()) => {}
            }
        }
    }

    /// Zero the password, release the transport and stop
    pub async fn shutdown(&mut self) {
        if self.state == MonitorState::Stopped {
            return;
        }

        self.config.credentials.clear();
        self.transport.release().await;
        self.previous = None;
        self.state = MonitorState::Stopped;
        debug!("Monitor stopped");
    }
}

/// Identity path of a root set: the roots joined with `:`
fn joined_roots(roots: &[PathBuf]) -> PathBuf {
    let mut joined = OsString::new();
    for (i, root) in roots.iter().enumerate() {
        if i > 0 {
            joined.push(":");
        }
        joined.push(root.as_os_str());
    }
    PathBuf::from(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dropsy_types::ExitStatus;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        reject: bool,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<bool> {
            Ok(!self.reject)
        }

        async fn remote_add(&self, path: &Path) -> Result<ExitStatus> {
            self.calls.lock().unwrap().push(format!("add {}", path.display()));
            Ok(0)
        }

        async fn remote_delete(&self, path: &Path) -> Result<ExitStatus> {
            self.calls.lock().unwrap().push(format!("del {}", path.display()));
            Ok(0)
        }
    }

    fn config(dirs: Vec<PathBuf>, state_dir: &Path) -> MonitorConfig {
        MonitorConfig::new(dirs, Credentials::new("bob", "host", "pw")).with_state_dir(state_dir)
    }

    #[test]
    fn test_joined_roots() {
        let roots = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        assert_eq!(joined_roots(&roots), PathBuf::from("/a:/b"));
        assert_eq!(joined_roots(&roots[..1]), PathBuf::from("/a"));
    }

    #[tokio::test]
    async fn test_cycle_before_init_is_uninitialized() {
        let temp_dir = TempDir::new().unwrap();
        let mut controller = WatchController::new(
            config(vec![temp_dir.path().to_path_buf()], temp_dir.path()),
            Arc::new(Recorder::default()),
        );

        let error = controller.watch_once().await.unwrap_err();
        assert_eq!(error.exit_code(), 1);
        assert_eq!(controller.state(), MonitorState::Uninitialized);
    }

    #[tokio::test]
    async fn test_init_rejects_missing_and_non_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        for dir in [temp_dir.path().join("missing"), file] {
            let mut controller = WatchController::new(
                config(vec![dir], temp_dir.path()),
                Arc::new(Recorder::default()),
            );
            let error = controller.init().await.unwrap_err();
            assert_eq!(error.kind(), dropsy_types::ErrorKind::Config);
        }
    }

    #[tokio::test]
    async fn test_init_rejects_too_many_directories() {
        let temp_dir = TempDir::new().unwrap();
        let dirs = vec![temp_dir.path().to_path_buf(); DIRS_MAX + 1];
        let mut controller =
            WatchController::new(config(dirs, temp_dir.path()), Arc::new(Recorder::default()));

        assert!(matches!(controller.init().await, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let temp_dir = TempDir::new().unwrap();
        let transport = Recorder {
            reject: true,
            ..Recorder::default()
        };
        let mut controller = WatchController::new(
            config(vec![temp_dir.path().to_path_buf()], temp_dir.path()),
            Arc::new(transport),
        );

        let error = controller.init().await.unwrap_err();
        assert!(matches!(error, Error::Authentication { .. }));
        assert_eq!(error.exit_code(), 128);
    }

    #[tokio::test]
    async fn test_shutdown_clears_password_and_blocks_cycles() {
        let watched = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let mut controller = WatchController::new(
            config(vec![watched.path().to_path_buf()], state.path()),
            Arc::new(Recorder::default()),
        );
        controller.init().await.unwrap();

        controller.shutdown().await;

        assert_eq!(controller.state(), MonitorState::Stopped);
        assert!(controller.credentials().is_cleared());
        assert!(matches!(controller.watch_once().await, Err(Error::Uninitialized)));
        assert!(matches!(controller.init().await, Err(Error::Uninitialized)));
    }

    #[tokio::test]
    async fn test_run_stops_when_token_is_cancelled_during_sleep() {
        let watched = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let mut controller = WatchController::new(
            config(vec![watched.path().to_path_buf()], state.path())
                .with_poll_interval(PollInterval::from_secs(3600)),
            Arc::new(Recorder::default()),
        );
        controller.init().await.unwrap();

        let token = controller.stop_token();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            token.cancel();
        });

        tokio::time::timeout(std::time::Duration::from_secs(10), controller.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(controller.state(), MonitorState::Watching);
    }

    #[tokio::test]
    async fn test_second_cycle_is_not_a_first_run() {
        let watched = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let mut controller = WatchController::new(
            config(vec![watched.path().to_path_buf()], state.path()),
            recorder.clone(),
        );
        controller.init().await.unwrap();

        let first = controller.watch_once().await.unwrap();
        assert!(first.first_run);
        assert_eq!(first.total(), 0);
        assert!(!first.persisted);

        std::fs::write(watched.path().join("new.txt"), b"n").unwrap();
        let second = controller.watch_once().await.unwrap();
        assert!(!second.first_run);
        assert_eq!(second.added, 1);
        assert!(second.persisted);
        assert_eq!(recorder.calls.lock().unwrap().len(), 1);
    }
}
