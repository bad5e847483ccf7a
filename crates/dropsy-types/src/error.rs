//! Error types and handling for Dropsy
//!
//! This module provides the structured error type shared by every Dropsy crate,
//! its kind classification, and the mapping from errors to process exit codes.

use std::path::PathBuf;

/// Exit code for generic fatal errors
pub const EXIT_FATAL: i32 = 1 << 7;

/// Exit code when a watch cycle is requested from a monitor that is not initialized
pub const EXIT_UNINITIALIZED: i32 = 1;

/// Exit code when the state file cannot be written
pub const EXIT_STORE: i32 = 1 << 4;

/// Exit code when a transfer job fails
pub const EXIT_TRANSFER: i32 = 1;

/// Main error type for Dropsy operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Invalid target, directory or setting
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// A directory or file could not be read while scanning
    #[error("Scan error at '{path}': {message}")]
    Scan {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying error message
        message: String,
    },

    /// The state file could not be read or written
    #[error("State file error at '{path}': {message}")]
    Store {
        /// Path to the state file
        path: PathBuf,
        /// Underlying error message
        message: String,
    },

    /// One or more transfer jobs exited with a non-zero status
    #[error("Transfer failed for {failed} of {total} jobs (first: '{path}', status {status})")]
    Transfer {
        /// Path of the first failed job
        path: PathBuf,
        /// Exit status of the first failed job
        status: i32,
        /// Number of failed jobs in the phase
        failed: usize,
        /// Number of jobs in the phase
        total: usize,
    },

    /// The remote endpoint rejected the credentials
    #[error("Authentication failed for {username}@{hostname}")]
    Authentication {
        /// Remote user name
        username: String,
        /// Remote host name
        hostname: String,
    },

    /// A watch cycle was requested from a monitor that is not initialized
    #[error("Monitor is not initialized")]
    Uninitialized,

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Configuration errors
    Config,
    /// Scan errors
    Scan,
    /// State file errors
    Store,
    /// Transfer job failures
    Transfer,
    /// Authentication failures
    Authentication,
    /// Monitor lifecycle misuse
    Uninitialized,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::Scan { .. } => ErrorKind::Scan,
            Self::Store { .. } => ErrorKind::Store,
            Self::Transfer { .. } => ErrorKind::Transfer,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Uninitialized => ErrorKind::Uninitialized,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Uninitialized => EXIT_UNINITIALIZED,
            Self::Store { .. } => EXIT_STORE,
            Self::Transfer { .. } => EXIT_TRANSFER,
            _ => EXIT_FATAL,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new state file error
    pub fn store<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Store {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new scan error
    pub fn scan<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Scan {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_message_errors_are_fatal_with_generic_code(message in ".*") {
            let errors = vec![
                Error::Io { message: message.clone() },
                Error::Config { message: message.clone() },
                Error::Other { message: message.clone() },
            ];

            for error in errors {
                prop_assert_eq!(error.exit_code(), EXIT_FATAL);
                prop_assert!(error.to_string().contains(&message));
            }
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::Uninitialized.exit_code(), 1);
        assert_eq!(Error::store("/tmp/state", "disk full").exit_code(), 16);
        assert_eq!(Error::config("bad target").exit_code(), 128);
        assert_eq!(
            Error::Transfer {
                path: PathBuf::from("/a"),
                status: 3,
                failed: 1,
                total: 2,
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_scan_error_kind() {
        let error = Error::scan("/gone", "No such file or directory");
        assert_eq!(error.kind(), ErrorKind::Scan);
        assert_eq!(error.exit_code(), EXIT_FATAL);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "state file");
        let error = Error::from(io_error);

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("state file"));
    }

    #[test]
    fn test_transfer_error_message() {
        let error = Error::Transfer {
            path: PathBuf::from("/data/b.txt"),
            status: 2,
            failed: 1,
            total: 3,
        };

        let message = error.to_string();
        assert!(message.contains("1 of 3"));
        assert!(message.contains("/data/b.txt"));
    }
}
