//! Transport backed by external commands
//!
//! Every job spawns one child process built from an argv template. The
//! placeholders `{path}`, `{user}` and `{host}` are substituted per job, and the
//! password reaches the child only through [`PASSWORD_ENV`].

use async_trait::async_trait;
use dropsy_config::TransportConfig;
use dropsy_types::{Credentials, Error, ExitStatus, Result, Transport};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::debug;

/// Environment variable carrying the password to child processes
pub const PASSWORD_ENV: &str = "DROPSY_PASSWORD";

/// Status reported for a child terminated by a signal
const SIGNALED_STATUS: ExitStatus = -1;

/// Transport running one external command per job
#[derive(Debug)]
pub struct CommandTransport {
    username: String,
    hostname: String,
    add_command: Vec<String>,
    delete_command: Vec<String>,
    auth_command: Vec<String>,
    credentials: RwLock<Option<Credentials>>,
}

impl CommandTransport {
    /// Create a transport for `username@hostname` from the configured templates
    pub fn new<U: Into<String>, H: Into<String>>(
        config: &TransportConfig,
        username: U,
        hostname: H,
    ) -> Self {
        Self {
            username: username.into(),
            hostname: hostname.into(),
            add_command: config.add_command.clone(),
            delete_command: config.delete_command.clone(),
            auth_command: config.auth_command.clone(),
            credentials: RwLock::new(None),
        }
    }

    /// Expand a template for one job
    fn render(&self, template: &[String], path: Option<&Path>) -> Vec<String> {
        let path = path.map(|p| p.display().to_string()).unwrap_or_default();
        template
            .iter()
            .map(|arg| {
                arg.replace("{path}", &path)
                    .replace("{user}", &self.username)
                    .replace("{host}", &self.hostname)
            })
            .collect()
    }

    async fn run(&self, template: &[String], path: Option<&Path>) -> Result<ExitStatus> {
        let argv = self.render(template, path);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::config("Transport command is empty"))?;

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(credentials) = self.credentials.read().await.as_ref() {
            command.env(PASSWORD_ENV, credentials.password());
        }

        debug!("Running {:?}", argv);
        let status = command.status().await.map_err(|e| Error::Io {
            message: format!("Failed to run '{}': {}", program, e),
        })?;

        Ok(status.code().unwrap_or(SIGNALED_STATUS))
    }
}

#[async_trait]
impl Transport for CommandTransport {
    async fn authenticate(&self, credentials: &Credentials) -> Result<bool> {
        *self.credentials.write().await = Some(credentials.clone());

        if self.auth_command.is_empty() {
            return Ok(true);
        }

        Ok(self.run(&self.auth_command, None).await? == 0)
    }

    async fn remote_add(&self, path: &Path) -> Result<ExitStatus> {
        self.run(&self.add_command, Some(path)).await
    }

    async fn remote_delete(&self, path: &Path) -> Result<ExitStatus> {
        self.run(&self.delete_command, Some(path)).await
    }

    async fn release(&self) {
        // Dropping the credentials zeroes the password
        self.credentials.write().await.take();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn transport(add: Vec<String>, delete: Vec<String>, auth: Vec<String>) -> CommandTransport {
        let config = TransportConfig {
            add_command: add,
            delete_command: delete,
            auth_command: auth,
        };
        CommandTransport::new(&config, "alice", "backup.local")
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let transport = CommandTransport::new(&TransportConfig::default(), "alice", "backup.local");
        let argv = transport.render(&TransportConfig::default().add_command, Some(Path::new("/srv/x")));

        assert_eq!(argv, vec!["scp", "-q", "-p", "/srv/x", "alice@backup.local:/srv/x"]);
    }

    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let transport = transport(sh("exit 0"), sh("exit 7"), vec![]);

        assert_eq!(transport.remote_add(Path::new("/x")).await.unwrap(), 0);
        assert_eq!(transport.remote_delete(Path::new("/x")).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_signaled_child_is_a_failure() {
        let transport = transport(sh("kill -9 $$"), sh("exit 0"), vec![]);
        assert_ne!(transport.remote_add(Path::new("/x")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_password_is_passed_through_environment() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("seen");
        let script = format!("printf '%s' \"${}\" > {}", PASSWORD_ENV, out.display());
        let transport = transport(sh(&script), sh("exit 0"), vec![]);

        let credentials = Credentials::new("alice", "backup.local", "hunter2");
        assert!(transport.authenticate(&credentials).await.unwrap());
        transport.remote_add(Path::new("/x")).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn test_auth_command_decides() {
        let credentials = Credentials::new("alice", "backup.local", "pw");
        let rejecting = transport(sh("exit 0"), sh("exit 0"), sh("exit 1"));
        let accepting = transport(sh("exit 0"), sh("exit 0"), sh("test \"$DROPSY_PASSWORD\" = pw"));

        assert!(!rejecting.authenticate(&credentials).await.unwrap());
        assert!(accepting.authenticate(&credentials).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let transport = transport(vec!["/definitely/not/a/program".to_string()], sh("exit 0"), vec![]);
        assert!(transport.remote_add(Path::new("/x")).await.is_err());
    }

    #[tokio::test]
    async fn test_release_forgets_credentials() {
        let transport = transport(sh("exit 0"), sh("exit 0"), vec![]);
        transport
            .authenticate(&Credentials::new("alice", "backup.local", "pw"))
            .await
            .unwrap();

        transport.release().await;
        assert!(transport.credentials.read().await.is_none());
    }
}
