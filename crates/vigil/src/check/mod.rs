/// Check execution module - runs a single plugin and normalizes its outcome
///
/// This module is responsible for:
/// - Spawning the plugin with a deadline
/// - Stripping performance data from its output
/// - Mapping its exit code to a status
pub mod runner;
pub mod types;

pub use runner::{CheckRunner, TIMEOUT_OUTPUT};
pub use types::CheckResult;
