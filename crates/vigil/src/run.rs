//! One complete Vigil pass: load, execute, federate, persist, report.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::federation::{Federation, record_unavailable};
use crate::notify::{Notifier, notify_error};
use crate::report::Report;
use crate::scheduler::Scheduler;
use crate::state::{State, StateStore};

/// Per-invocation switches from the command line
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Everything, including federation, must finish by then
    pub deadline: Instant,
    /// Send the report when unhandled alerts remain, even without changes
    pub renotify: bool,
    /// Send the report unconditionally
    pub force: bool,
}

/// Run all checks once and notify the operator when needed
///
/// Configuration and persistence problems are mailed to the operator but do
/// not stop the run.
pub async fn run(
    config: Arc<Config>,
    options: RunOptions,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
) -> crate::Result<Report> {
    debug!("{}", config);

    if let Err(e) = config.sanity_check() {
        error!("Configuration problem: {}", e);
        notify_error(notifier, &e).await;
    }

    let state = match State::load(store, &config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Unable to load state: {}", e);
            notify_error(notifier, &e).await;
            State::new(config.stale_threshold())
        }
    };

    // Kept so a failed scheduler still leaves something to persist and report
    let previous = state.clone();
    let scheduler = Scheduler::new(config.clone());
    let mut state = match scheduler.run(options.deadline, state).await {
        Ok(state) => state,
        Err(e) => {
            error!("Unable to run checks: {:#}", e);
            notify_error(notifier, &e).await;
            previous
        }
    };

    if !config.federated.is_empty() {
        match Federation::new() {
            Ok(federation) => {
                federation.merge_all(options.deadline, &config.federated, &mut state).await
            }
            Err(e) => {
                error!("Unable to create federation client: {:#}", e);
                record_unavailable(&config.federated, &format!("{:#}", e), &mut state);
            }
        }
    }

    if let Err(e) = state.persist(store).await {
        error!("Unable to persist state: {}", e);
        notify_error(notifier, &e).await;
    }

    let report = Report::build(&state, options.renotify, options.force);
    info!("{}", report.subject);

    if report.notify {
        if let Err(e) = notifier.notify(&report.subject, &report.body).await {
            error!("Unable to send report: {}", e);
        }
    } else {
        info!("Nothing changed, not sending the report");
    }

    Ok(report)
}
