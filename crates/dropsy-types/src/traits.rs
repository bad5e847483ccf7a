//! Core traits for Dropsy operations
//!
//! The transport is the collaborator that actually moves bytes to the remote side.
//! The engine only ever talks to it through [`Transport`].

use crate::{ExitStatus, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

/// Credentials for one remote endpoint
///
/// The password is wiped when the credentials are cleared or dropped.
#[derive(Clone)]
pub struct Credentials {
    /// Remote user name
    pub username: String,
    /// Remote host name
    pub hostname: String,
    password: String,
}

impl Credentials {
    /// Create a new credential set
    pub fn new<U: Into<String>, H: Into<String>, P: Into<String>>(
        username: U,
        hostname: H,
        password: P,
    ) -> Self {
        Self {
            username: username.into(),
            hostname: hostname.into(),
            password: password.into(),
        }
    }

    /// The password in clear text
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Overwrite the password with zeros and empty it
    pub fn clear(&mut self) {
        self.password.zeroize();
    }

    /// Whether the password has been cleared
    pub fn is_cleared(&self) -> bool {
        self.password.is_empty()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("hostname", &self.hostname)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Remote side of the synchronization
///
/// `remote_add` and `remote_delete` report an exit status; `0` is success and any
/// other value fails the dispatch phase. An `Err` is treated like a non-zero status.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Check the credentials against the remote endpoint
    async fn authenticate(&self, credentials: &Credentials) -> Result<bool>;

    /// Upload (or re-upload) a local file
    async fn remote_add(&self, path: &Path) -> Result<ExitStatus>;

    /// Remove the remote copy of a local file
    async fn remote_delete(&self, path: &Path) -> Result<ExitStatus>;

    /// Drop any credentials or connections held by the transport
    async fn release(&self) {}
}
