use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, error, info};

use crate::check::{CheckResult, CheckRunner};
use crate::config::{CheckSpec, Config};
use crate::dependency::DependencyGraph;
use crate::state::State;
use crate::status::StatusCode;

/// Results buffered between the check tasks and the collector
const RESULT_CHANNEL_CAPACITY: usize = 100;

/// Scheduler - runs every configured check once and collects the results
pub struct Scheduler {
    config: Arc<Config>,
    runner: CheckRunner,
}

impl Scheduler {
    /// Create a new scheduler for the given configuration
    pub fn new(config: Arc<Config>) -> Self {
        let runner = CheckRunner::new(config.check_timeout());
        Self { config, runner }
    }

    /// Run all checks until `deadline` and apply their results to `state`
    ///
    /// Every check produces exactly one result. Results are applied by a
    /// single collector task which owns the state for the duration of the run.
    pub async fn run(&self, deadline: Instant, state: State) -> crate::Result<State> {
        let deps = Arc::new(DependencyGraph::new(self.config.checks.keys().cloned()));
        let limiter = Arc::new(Semaphore::new(self.config.check_concurrency.max(1)));

        // Throttling reads the previous state, so decide before handing it over
        let mut reused = Vec::new();
        let mut executed = Vec::new();
        for (name, spec) in &self.config.checks {
            match throttled_result(&state, name, spec) {
                Some(result) => reused.push(result),
                None => executed.push((name.clone(), spec.clone())),
            }
        }

        let (result_tx, result_rx) = mpsc::channel::<CheckResult>(RESULT_CHANNEL_CAPACITY);
        let collector = tokio::spawn(collect(state, result_rx));

        for result in reused {
            signal_outcome(&deps, &result);
            if result_tx.send(result).await.is_err() {
                error!("Result collector stopped early");
            }
        }

        let mut tasks = JoinSet::new();
        let mut task_names = HashMap::new();
        for (name, spec) in executed {
            let unit = CheckUnit {
                name: name.clone(),
                spec,
                runner: self.runner.clone(),
                deps: deps.clone(),
                limiter: limiter.clone(),
            };
            let result_tx = result_tx.clone();

            let handle = tasks.spawn(async move {
                let result = unit.execute(deadline).await;
                if let Err(e) = result_tx.send(result).await {
                    error!("Failed to send check result: {}", e);
                }
            });
            task_names.insert(handle.id(), name);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let Err(e) = joined else {
                continue;
            };
            let name = task_names.remove(&e.id()).unwrap_or_default();
            error!("Check task for {} failed: {}", name, e);

            let result = CheckRunner::skip(&name, format!("Check task failed: {}", e));
            let _ = deps.signal_not_ok(&name);
            if result_tx.send(result).await.is_err() {
                error!("Result collector stopped early");
            }
        }

        info!("All checks completed!");
        drop(result_tx);

        let state = collector.await?;
        info!("All results collected!");

        Ok(state)
    }
}

/// Apply results one at a time, this is the only writer of the state during a run
async fn collect(mut state: State, mut result_rx: mpsc::Receiver<CheckResult>) -> State {
    while let Some(result) = result_rx.recv().await {
        state.update(result);
    }
    state
}

/// Reuse the previous result when the check ran more recently than its interval
fn throttled_result(state: &State, name: &str, spec: &CheckSpec) -> Option<CheckResult> {
    if spec.run_interval == 0 {
        return None;
    }

    let Some(last) = state.get(name) else {
        debug!("No previous state for {}, running it despite its interval", name);
        return None;
    };
    let age = state.age(name)?;
    if age.as_secs() >= spec.run_interval {
        return None;
    }

    info!(
        "Skipping {}: interval not yet reached ({}s < {}s)",
        name,
        age.as_secs(),
        spec.run_interval
    );

    Some(CheckResult {
        name: name.to_string(),
        output: last.output.clone(),
        epoch: last.epoch,
        status: last.status,
        federated: last.federated,
    })
}

/// Publish a final result to dependents: only CRITICAL blocks them
fn signal_outcome(deps: &DependencyGraph, result: &CheckResult) {
    let signalled = if result.status == StatusCode::Critical {
        deps.signal_not_ok(&result.name)
    } else {
        deps.signal_ok(&result.name)
    };

    if let Err(e) = signalled {
        error!("{}", e);
    }
}

/// Everything one check task needs
struct CheckUnit {
    name: String,
    spec: CheckSpec,
    runner: CheckRunner,
    deps: Arc<DependencyGraph>,
    limiter: Arc<Semaphore>,
}

impl CheckUnit {
    async fn execute(self, deadline: Instant) -> CheckResult {
        if let Err(e) = self.deps.wait_for(deadline, &self.spec.depends_on).await {
            info!("Skipping {}: {}", self.name, e);
            let result = CheckRunner::skip(&self.name, e.to_string());
            if let Err(e) = self.deps.signal_not_ok(&self.name) {
                error!("{}", e);
            }
            return result;
        }

        if self.spec.random_spread > 0 {
            let delay = random_delay(self.spec.random_spread);
            info!("Sleeping {:?} before running {}", delay, self.name);
            if timeout_at(deadline, sleep(delay)).await.is_err() {
                return self.finish(CheckRunner::timed_out(&self.name), None);
            }
        }

        let mut retries_left = self.spec.retries;
        loop {
            let Ok(Ok(permit)) = timeout_at(deadline, self.limiter.clone().acquire_owned()).await
            else {
                return self.finish(CheckRunner::timed_out(&self.name), None);
            };

            let check_deadline = self.runner.check_deadline(deadline);
            let result = self.runner.run(check_deadline, &self.name, &self.spec).await;

            if result.status.is_ok() || retries_left == 0 {
                return self.finish(result, Some(permit));
            }

            drop(permit);
            retries_left -= 1;

            let pause = self.spec.retry_interval();
            if timeout_at(deadline, sleep(pause)).await.is_err() {
                return self.finish(CheckRunner::timed_out(&self.name), None);
            }
            info!("Retrying {} after {:?} ({} retries left)", self.name, pause, retries_left);
        }
    }

    /// Signal dependents, then release the slot
    fn finish(&self, result: CheckResult, permit: Option<OwnedSemaphorePermit>) -> CheckResult {
        signal_outcome(&self.deps, &result);
        drop(permit);
        result
    }
}

/// Uniform delay in `[0, spread_seconds)`
fn random_delay(spread_seconds: u64) -> Duration {
    let millis = rand::thread_rng().gen_range(0..spread_seconds * 1000);
    Duration::from_millis(millis)
}
