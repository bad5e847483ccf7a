//! Watch controller and concurrent dispatch engine for Dropsy
//!
//! This crate turns snapshots and change sets into remote operations:
//!
//! - **Job pool**: bounded parallel dispatch with an all-or-nothing barrier per phase
//! - **Watch controller**: the scan, diff, dispatch and persist cycle plus the poll loop
//! - **Hooks**: per-change-kind observers invoked before each job is dispatched
//! - **Command transport**: a [`Transport`](dropsy_types::Transport) that runs one
//!   child process per job
//!
//! # Examples
//!
//! ```rust,no_run
//! use dropsy_config::TransportConfig;
//! use dropsy_engine::{CommandTransport, MonitorConfig, WatchController};
//! use dropsy_types::Credentials;
//! use std::sync::Arc;
//!
//! # async fn example() -> dropsy_types::Result<()> {
//! let credentials = Credentials::new("alice", "backup.local", "secret");
//! let transport = CommandTransport::new(&TransportConfig::default(), "alice", "backup.local");
//! let config = MonitorConfig::new(vec!["/srv/data".into()], credentials);
//!
//! let mut controller = WatchController::new(config, Arc::new(transport));
//! controller.init().await?;
//! let report = controller.watch_once().await?;
//! println!("{} changes", report.total());
//! controller.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod controller;
pub mod hooks;
pub mod pool;
pub mod transport;

pub use controller::{CycleReport, MonitorConfig, MonitorState, WatchController};
pub use hooks::{Callback, Hooks};
pub use pool::{JobFailure, JobPool, PhaseOutcome};
pub use transport::{CommandTransport, PASSWORD_ENV};
