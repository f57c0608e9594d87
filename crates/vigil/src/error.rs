use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while waiting on or signalling check dependencies
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("dependency '{0}' is not OK!")]
    NotSatisfied(String),
    #[error("waited for too long for dependency '{0}': deadline has elapsed")]
    TimedOut(String),
    #[error("dependency outcome of '{0}' was already signalled")]
    AlreadySignaled(String),
    #[error("no dependency signal registered for '{0}'")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("can't decode state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("can't merge state due to duplicate check name '{0}'")]
    DuplicateCheck(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("can't parse config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("Check '{check}' depends on non existent check '{dependency}'")]
    UnknownDependency { check: String, dependency: String },
    #[error("Check '{0}' depends on itself")]
    SelfDependency(String),
    #[error("CheckConcurrency must be at least 1")]
    ZeroConcurrency,
    #[error("Invalid federated endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    State(#[from] StateError),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("SMTP server rejected '{command}': {reply}")]
    Smtp { command: String, reply: String },
    #[error("SMTP conversation timed out")]
    Timeout,
}
