//! End-to-end tests of a complete pass

mod common;

use std::sync::Arc;

use common::{RecordingNotifier, deadline_in, init_tracing, shell};
use vigil::check::types::now_epoch;
use vigil::state::Checks;
use vigil::{CheckState, Config, MemoryStateStore, RunOptions, StatusCode, run};

fn options(renotify: bool, force: bool) -> RunOptions {
    RunOptions { deadline: deadline_in(30), renotify, force }
}

#[tokio::test]
async fn test_first_run_reports_and_persists() {
    init_tracing();
    let config = Arc::new(
        Config::builder()
            .check("A", shell("echo 'A OK | perf=1'; exit 0"))
            .check("B", shell("echo 'B down'; exit 2").with_depends_on(["A"]))
            .check("C", shell("exit 0").with_depends_on(["B"]))
            .build(),
    );
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let report = run(config, options(false, false), &store, &notifier).await.unwrap();

    assert!(report.notify);
    assert_eq!(report.subject, "VIGIL Report [C:1 W:0 U:1 S:0 OK:1]");
    assert!(report.body.contains("UNKNOWN->CRITICAL: B: B down"));
    assert!(report.body.contains("UNKNOWN: C: dependency 'B' is not OK!"));
    assert!(report.body.contains("UNKNOWN->OK: A: A OK\n"));
    assert_eq!(notifier.subjects(), vec![report.subject.clone()]);

    let persisted = store.snapshot().unwrap();
    assert_eq!(persisted.len(), 3);
    assert_eq!(persisted["B"].status, StatusCode::Critical);
    assert_eq!(persisted["B"].prev_status, StatusCode::Unknown);
}

#[tokio::test]
async fn test_unchanged_run_stays_quiet_unless_renotify() {
    let config = Arc::new(Config::builder().check("Disk", shell("exit 1")).build());

    let mut checks = Checks::new();
    checks.insert("Disk".to_string(), CheckState::new(StatusCode::Warning, StatusCode::Warning, now_epoch()));

    let store = MemoryStateStore::with_checks(checks.clone());
    let notifier = RecordingNotifier::default();
    let report = run(config.clone(), options(false, false), &store, &notifier).await.unwrap();
    assert!(!report.notify);
    assert!(notifier.subjects().is_empty());

    let store = MemoryStateStore::with_checks(checks);
    let report = run(config, options(true, false), &store, &notifier).await.unwrap();
    assert!(report.notify);
    assert_eq!(notifier.subjects().len(), 1);
}

#[tokio::test]
async fn test_stale_ok_check() {
    let config = Arc::new(
        Config::builder()
            .stale_threshold(3600)
            .check("Weekly", shell("exit 0").with_run_interval(30 * 24 * 3600))
            .build(),
    );

    let mut checks = Checks::new();
    checks.insert("Weekly".to_string(), CheckState::new(StatusCode::Ok, StatusCode::Ok, now_epoch() - 7200));

    let store = MemoryStateStore::with_checks(checks);
    let notifier = RecordingNotifier::default();
    let report = run(config, options(true, false), &store, &notifier).await.unwrap();

    assert_eq!(report.counts.stale, 1);
    assert_eq!(report.counts.ok, 1);
    assert_eq!(report.counts.unhandled(), 0);
    assert!(report.body.contains("There are no unhandled alerts..."));
    assert!(report.body.contains("OK: Weekly: "));
    assert!(!report.notify);
}

#[tokio::test]
async fn test_configuration_problem_is_notified_and_run_continues() {
    let config = Arc::new(
        Config::builder()
            .check("App", shell("exit 0").with_depends_on(["Missing"]))
            .build(),
    );
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let report = run(config, options(false, false), &store, &notifier).await.unwrap();

    let subjects = notifier.subjects();
    assert_eq!(
        subjects[0],
        "VIGIL: An error occurred: Check 'App' depends on non existent check 'Missing'"
    );
    assert_eq!(report.counts.ok, 1);
    assert_eq!(subjects.len(), 2);
}

#[tokio::test]
async fn test_unreachable_peer_still_persists_and_reports() {
    // Bind then drop to get a port nobody listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let endpoint = format!("http://127.0.0.1:{}/state.json", port);

    let config = Arc::new(
        Config::builder()
            .federated(endpoint.clone())
            .check("Local", shell("exit 0"))
            .build(),
    );
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let report = run(config, options(false, false), &store, &notifier).await.unwrap();

    let persisted = store.snapshot().unwrap();
    assert_eq!(persisted["Local"].status, StatusCode::Ok);
    assert_eq!(report.counts.critical, 1);
    assert!(report.body.contains(&format!("CRITICAL: Federated endpoint {}", endpoint)));
}
