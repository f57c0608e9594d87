//! Vigil - dependency-aware Nagios plugin scheduler
//!
//! This library runs one pass over a configured set of plugin checks,
//! tracks their status transitions between runs, merges the state of
//! federated peers and renders a change report for the operator.

pub mod check;
pub mod config;
pub mod dependency;
pub mod error;
pub mod federation;
pub mod notify;
pub mod report;
pub mod run;
pub mod scheduler;
pub mod state;
pub mod status;

// Re-export main types
pub use check::{CheckResult, CheckRunner};
pub use config::{CheckSpec, Config};
pub use dependency::DependencyGraph;
pub use error::{ConfigError, DependencyError, FederationError, NotifyError, StateError};
pub use federation::Federation;
pub use notify::{Notifier, SmtpNotifier};
pub use report::Report;
pub use run::{RunOptions, run};
pub use scheduler::Scheduler;
pub use state::{CheckState, FileStateStore, MemoryStateStore, State, StateStore};
pub use status::StatusCode;

/// Re-export common error types
pub use anyhow;

/// Vigil result type using anyhow for error handling
pub type Result<T> = anyhow::Result<T>;

/// Name of the state file inside the configured state directory
pub const STATE_FILE_NAME: &str = "state.json";
