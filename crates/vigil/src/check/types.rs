use crate::status::StatusCode;

/// Current time as unix seconds
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Outcome of one check execution, skip, throttle or federation event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Name of the check this result belongs to
    pub name: String,

    /// Plugin output without performance data
    pub output: String,

    /// Completion time as unix seconds
    pub epoch: i64,

    /// Status reported by the plugin
    pub status: StatusCode,

    /// Produced by merging a peer instead of local execution
    pub federated: bool,
}

impl CheckResult {
    /// Create a local result stamped with the current time
    pub fn new(name: impl Into<String>, status: StatusCode, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            epoch: now_epoch(),
            status,
            federated: false,
        }
    }

    /// Mark the result as coming from a federated peer
    pub fn federated(mut self) -> Self {
        self.federated = true;
        self
    }

    /// Override the completion time
    pub fn at_epoch(mut self, epoch: i64) -> Self {
        self.epoch = epoch;
        self
    }
}
