//! labtrail-core library.
//!
//! The collaboration and audit layer attached to laboratory samples: label
//! inheritance from parent orders, assignee reconciliation, the sample
//! lifecycle, and the activity timeline projected from domain events.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::LabError`] for workflow operations, `anyhow::Result`
//!   for config loading.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Scheduling**: single-threaded. [`workspace::SampleWorkspace`] relies on
//!   `Cell`/`RefCell` and is meant for a current-thread runtime.

pub mod api;
pub mod assignees;
pub mod config;
pub mod error;
pub mod event;
pub mod inflight;
pub mod labels;
pub mod lifecycle;
pub mod model;
pub mod timeline;
pub mod workspace;

pub use error::{ErrorCode, LabError};
