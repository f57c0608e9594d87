//! Check status history.
//!
//! The state remembers, per check, the current and the previous status and
//! when the current one was recorded. It is loaded before a run, updated by
//! a single collector while checks complete, extended with federated peers
//! and persisted at the end of the run.

mod store;

pub use store::{FileStateStore, MemoryStateStore, StateStore};

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::check::CheckResult;
use crate::check::types::now_epoch;
use crate::config::Config;
use crate::error::StateError;
use crate::status::StatusCode;

/// Persisted mapping of check name to its state
pub type Checks = BTreeMap<String, CheckState>;

fn default_prev_status() -> StatusCode {
    StatusCode::Unknown
}

fn is_zero(epoch: &i64) -> bool {
    *epoch == 0
}

/// Status history of one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckState {
    pub status: StatusCode,

    /// Status right before the last update
    #[serde(default = "default_prev_status")]
    pub prev_status: StatusCode,

    /// When the status was recorded, unix seconds
    #[serde(default, skip_serializing_if = "is_zero")]
    pub epoch: i64,

    /// Output of the current run only, never persisted
    #[serde(skip)]
    pub output: String,

    #[serde(skip)]
    pub federated: bool,
}

impl CheckState {
    pub fn new(status: StatusCode, prev_status: StatusCode, epoch: i64) -> Self {
        Self { status, prev_status, epoch, output: String::new(), federated: false }
    }

    pub fn changed(&self) -> bool {
        self.status != self.prev_status
    }
}

/// Status of all checks known to this instance
#[derive(Debug, Clone)]
pub struct State {
    checks: Checks,
    stale_epoch: i64,
}

impl State {
    /// Create an empty state; results older than `stale_threshold` are stale
    pub fn new(stale_threshold: Duration) -> Self {
        let threshold = i64::try_from(stale_threshold.as_secs()).unwrap_or(i64::MAX);
        Self::with_stale_epoch(now_epoch().saturating_sub(threshold))
    }

    /// Create an empty state with an explicit staleness cutoff
    pub fn with_stale_epoch(stale_epoch: i64) -> Self {
        Self { checks: Checks::new(), stale_epoch }
    }

    /// Load the persisted state, dropping checks no longer configured
    pub async fn load(store: &dyn StateStore, config: &Config) -> Result<Self, StateError> {
        let mut state = Self::new(config.stale_threshold());

        if let Some(checks) = store.load().await? {
            state.checks = checks;
        }

        state.checks.retain(|name, _| {
            let configured = config.checks.contains_key(name);
            if !configured {
                info!("State of {} is obsolete (removed)", name);
            }
            configured
        });

        Ok(state)
    }

    /// Persist status, previous status and epoch of every check
    pub async fn persist(&self, store: &dyn StateStore) -> Result<(), StateError> {
        store.persist(&self.checks).await
    }

    /// Record a result, remembering the status it replaces
    pub fn update(&mut self, result: CheckResult) {
        let prev_status = self
            .checks
            .get(&result.name)
            .map(|cs| cs.status)
            .unwrap_or(StatusCode::Unknown);

        let cs = CheckState {
            status: result.status,
            prev_status,
            epoch: result.epoch,
            output: result.output,
            federated: result.federated,
        };

        debug!("{}: {:?}", result.name, cs);
        self.checks.insert(result.name, cs);
    }

    /// Merge the state of another instance
    ///
    /// Check names must be unique across a federation. Every remote name is
    /// validated before anything is inserted, so a collision leaves the
    /// local state untouched.
    pub fn merge(&mut self, remote: Checks) -> Result<(), StateError> {
        if let Some(name) = remote.keys().find(|name| self.checks.contains_key(*name)) {
            return Err(StateError::DuplicateCheck(name.clone()));
        }

        for (name, mut cs) in remote {
            cs.federated = true;
            self.checks.insert(name, cs);
        }

        Ok(())
    }

    /// Decode a peer's wire payload and merge it
    pub fn merge_from_slice(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        let remote: Checks = serde_json::from_slice(bytes)?;
        self.merge(remote)
    }

    /// Time since the check was last recorded
    pub fn age(&self, name: &str) -> Option<Duration> {
        self.checks
            .get(name)
            .map(|cs| Duration::from_secs(u64::try_from(now_epoch().saturating_sub(cs.epoch)).unwrap_or(0)))
    }

    pub fn get(&self, name: &str) -> Option<&CheckState> {
        self.checks.get(name)
    }

    /// Iterate over all checks ordered by name
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CheckState)> {
        self.checks.iter()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn stale_epoch(&self) -> i64 {
        self.stale_epoch
    }

    pub fn is_stale(&self, cs: &CheckState) -> bool {
        cs.epoch < self.stale_epoch
    }

    pub fn checks(&self) -> &Checks {
        &self.checks
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, cs) in &self.checks {
            writeln!(f, "{}: {} (was {}) at {}", name, cs.status, cs.prev_status, cs.epoch)?;
        }
        Ok(())
    }
}
