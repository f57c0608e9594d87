//! Dependency signalling between checks.
//!
//! Every configured check owns one fire-once outcome. Dependents wait until
//! each of their prerequisites resolved, failing fast when one resolved
//! not-OK.

use std::collections::HashMap;

use tokio::sync::watch;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::error::DependencyError;

/// Final outcome a check publishes to its dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    NotOk,
}

/// Per-check completion signals
#[derive(Debug)]
pub struct DependencyGraph {
    signals: HashMap<String, watch::Sender<Option<Outcome>>>,
}

impl DependencyGraph {
    /// Register one unresolved signal per check name
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signals = names
            .into_iter()
            .map(|name| (name.into(), watch::Sender::new(None)))
            .collect();

        Self { signals }
    }

    /// Publish that `name` resolved OK (or WARNING/UNKNOWN)
    pub fn signal_ok(&self, name: &str) -> Result<(), DependencyError> {
        self.signal(name, Outcome::Ok)
    }

    /// Publish that `name` resolved not-OK
    pub fn signal_not_ok(&self, name: &str) -> Result<(), DependencyError> {
        self.signal(name, Outcome::NotOk)
    }

    fn signal(&self, name: &str, outcome: Outcome) -> Result<(), DependencyError> {
        let sender = self
            .signals
            .get(name)
            .ok_or_else(|| DependencyError::Unknown(name.to_string()))?;

        // First fire wins, a second one is a bug in the caller
        let fired = sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        });

        if !fired {
            return Err(DependencyError::AlreadySignaled(name.to_string()));
        }

        debug!("Dependency {} resolved {:?}", name, outcome);
        Ok(())
    }

    /// Current outcome of `name`, if it resolved already
    pub fn outcome(&self, name: &str) -> Option<Outcome> {
        self.signals.get(name).and_then(|sender| *sender.borrow())
    }

    /// Wait for all dependencies to be resolved
    ///
    /// Names without a registered signal are skipped; configuration sanity
    /// checks report those to the operator.
    pub async fn wait_for<S: AsRef<str>>(
        &self,
        deadline: Instant,
        dependencies: &[S],
    ) -> Result<(), DependencyError> {
        for dependency in dependencies {
            let dependency = dependency.as_ref();
            let Some(sender) = self.signals.get(dependency) else {
                continue;
            };

            let mut receiver = sender.subscribe();
            let outcome = match timeout_at(deadline, receiver.wait_for(Option::is_some)).await {
                Ok(Ok(outcome)) => *outcome,
                // The sender lives as long as the graph, so this only happens on teardown
                Ok(Err(_)) | Err(_) => {
                    return Err(DependencyError::TimedOut(dependency.to_string()));
                }
            };

            if outcome == Some(Outcome::NotOk) {
                return Err(DependencyError::NotSatisfied(dependency.to_string()));
            }
        }

        Ok(())
    }
}
