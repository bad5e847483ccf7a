//! Tree scanning, snapshot diffing and state persistence for Dropsy
//!
//! This crate holds the synchronous half of a watch cycle:
//!
//! - **Scanning**: walk watched trees into a [`Snapshot`](dropsy_types::Snapshot)
//! - **Diffing**: split two snapshots into added, modified and deleted records
//! - **State store**: load and save the last committed snapshot of a target
//!
//! # Examples
//!
//! ```rust,no_run
//! use dropsy_sync::{scanner, DiffEngine};
//! use dropsy_types::Snapshot;
//!
//! let now = scanner::scan(&["/srv/data"]);
//! let changes = DiffEngine::detect_changes(&Snapshot::new(), &now, true);
//! println!("{} files to upload", changes.added.len());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod diff;
pub mod scanner;
pub mod store;

pub use diff::DiffEngine;
pub use scanner::{scan, scan_root};
pub use store::SnapshotStore;
