//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vigil::{CheckSpec, Notifier, NotifyError};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Plugin running a shell snippet
pub fn shell(script: &str) -> CheckSpec {
    CheckSpec::new("/bin/sh").with_args(["-c", script])
}

/// Plugin that records every invocation in `counter` and exits with `code`
pub fn counting_plugin(counter: &Path, code: i32) -> CheckSpec {
    shell(&format!("echo run >> '{}'; echo 'exit {}'; exit {}", counter.display(), code, code))
}

/// Number of times a counting plugin ran
pub fn invocations(counter: &Path) -> usize {
    std::fs::read_to_string(counter).map(|s| s.lines().count()).unwrap_or(0)
}

pub fn counter(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{}.count", name))
}

pub fn deadline_in(seconds: u64) -> Instant {
    Instant::now() + Duration::from_secs(seconds)
}

/// Notifier collecting everything it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(subject, _)| subject.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((subject.to_string(), body.to_string()));
        Ok(())
    }
}
