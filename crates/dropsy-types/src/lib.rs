//! Core type system and error handling for Dropsy
//!
//! This crate provides the foundational types shared by every Dropsy crate:
//!
//! - **Error handling**: one structured error type with kind and exit-code mapping
//! - **Snapshot model**: file records, snapshots and change sets
//! - **Identity**: targets, target identities and their state-file fingerprints
//! - **Traits**: the async [`Transport`] collaborator
//!
//! # Features
//!
//! - `serde`: Enable serialization support for the plain data types
//!
//! # Examples
//!
//! ```rust
//! use dropsy_types::{FileRecord, Result, Snapshot};
//!
//! fn example_snapshot() -> Result<Snapshot> {
//!     let mut snapshot = Snapshot::new();
//!     snapshot.insert(FileRecord::new("/srv/data/notes.txt", 10, 100));
//!     Ok(snapshot)
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{Parallelism, PollInterval, DIRS_MAX, PROGRAM_NAME};
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use traits::*;
pub use types::*;
