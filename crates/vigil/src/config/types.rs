//! Configuration types for Vigil.
//!
//! Keys are PascalCase so that existing JSON configs keep loading.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default per-check plugin timeout in seconds
pub const DEFAULT_CHECK_TIMEOUT_S: u64 = 10;

/// Default number of plugins allowed to run at once
pub const DEFAULT_CHECK_CONCURRENCY: usize = 2;

/// Default staleness threshold in seconds (one hour)
pub const DEFAULT_STALE_THRESHOLD_S: u64 = 3600;

/// One configured check. Its name is the key in [`Config::checks`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckSpec {
    /// Path of the plugin executable
    pub plugin: String,

    /// Arguments handed to the plugin, in order
    #[serde(default)]
    pub args: Vec<String>,

    /// Checks that must resolve non-CRITICAL before this one runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Extra attempts when the plugin does not report OK
    #[serde(default)]
    pub retries: u32,

    /// Seconds to wait between attempts
    #[serde(default)]
    pub retry_interval: u64,

    /// Minimum seconds between two executions, 0 runs every time
    #[serde(default)]
    pub run_interval: u64,

    /// Upper bound of the random delay before running, in seconds
    #[serde(default)]
    pub random_spread: u64,
}

/// Configuration of one Vigil invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Recipient of the report
    pub email_to: String,

    /// Sender of the report
    pub email_from: String,

    /// SMTP relay as host:port, defaults to the local host on port 25
    #[serde(rename = "SMTPServer", default)]
    pub smtp_server: Option<String>,

    /// Directory holding the state file
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Per-check plugin timeout in seconds
    #[serde(rename = "CheckTimeoutS", default = "default_check_timeout")]
    pub check_timeout_s: u64,

    /// Number of plugins allowed to run at once
    #[serde(default = "default_check_concurrency")]
    pub check_concurrency: usize,

    /// Age in seconds after which a result is reported as stale
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold: u64,

    /// Peer endpoints serving their state over HTTP
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub federated: Vec<String>,

    /// Configured checks keyed by name
    #[serde(default)]
    pub checks: BTreeMap<String, CheckSpec>,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_check_timeout() -> u64 {
    DEFAULT_CHECK_TIMEOUT_S
}

fn default_check_concurrency() -> usize {
    DEFAULT_CHECK_CONCURRENCY
}

fn default_stale_threshold() -> u64 {
    DEFAULT_STALE_THRESHOLD_S
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email_to: String::new(),
            email_from: String::new(),
            smtp_server: None,
            state_dir: default_state_dir(),
            check_timeout_s: DEFAULT_CHECK_TIMEOUT_S,
            check_concurrency: DEFAULT_CHECK_CONCURRENCY,
            stale_threshold: DEFAULT_STALE_THRESHOLD_S,
            federated: Vec::new(),
            checks: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Create a new configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    pub(crate) config: Config,
}
