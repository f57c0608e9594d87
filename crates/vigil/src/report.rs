//! Report rendering.
//!
//! The report lists status changes, unhandled (non-OK) checks and stale
//! checks, and decides whether the operator needs to be notified.

use std::fmt::Write;
use std::time::Duration;

use crate::check::types::now_epoch;
use crate::state::{CheckState, State};
use crate::status::StatusCode;

/// Rendered report plus the decision whether to send it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
    pub notify: bool,
    pub counts: Counts,
}

/// Per-severity counters shown in the subject
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub critical: usize,
    pub warning: usize,
    pub unknown: usize,
    pub stale: usize,
    /// Includes stale OK checks, unlike the other severities
    pub ok: usize,
}

impl Counts {
    pub fn unhandled(&self) -> usize {
        self.critical + self.warning + self.unknown
    }
}

/// Which entries a section shows and how
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Changed,
    Unhandled,
    Stale,
}

impl Report {
    /// Render the state after all local and federated results were applied
    pub fn build(state: &State, renotify: bool, force: bool) -> Self {
        let mut body = String::new();
        let mut counts = Counts::default();

        body.push_str("This is the recent Vigil report!\n\n");

        body.push_str("# Alerts with status changed:\n\n");
        let mut changed = false;
        for status in StatusCode::REPORT_ORDER {
            changed |= report_by(&mut body, state, Section::Changed, |cs| {
                cs.status == status && cs.changed()
            }) > 0;
        }
        if !changed {
            body.push_str("There were no status changes...\n\n");
        }

        body.push_str("# Unhandled alerts:\n\n");
        counts.critical = report_by(&mut body, state, Section::Unhandled, |cs| {
            cs.status == StatusCode::Critical
        });
        counts.warning = report_by(&mut body, state, Section::Unhandled, |cs| {
            cs.status == StatusCode::Warning
        });
        counts.unknown = report_by(&mut body, state, Section::Unhandled, |cs| {
            cs.status == StatusCode::Unknown
        });
        counts.ok = state.iter().filter(|(_, cs)| cs.status.is_ok()).count();
        let has_unhandled = counts.unhandled() > 0;
        if !has_unhandled {
            body.push_str("There are no unhandled alerts...\n\n");
        }

        body.push_str("# Stale alerts:\n\n");
        counts.stale = report_by(&mut body, state, Section::Stale, |cs| state.is_stale(cs));
        if counts.stale == 0 {
            body.push_str("There are no stale alerts...\n\n");
        }

        body.push_str("Have a nice day!\n");

        let subject = format!(
            "VIGIL Report [C:{} W:{} U:{} S:{} OK:{}]",
            counts.critical, counts.warning, counts.unknown, counts.stale, counts.ok
        );

        let notify = force || changed || (renotify && has_unhandled);
        Self { subject, body, notify, counts }
    }
}

/// Append matching entries, returning how many were listed
fn report_by<F>(body: &mut String, state: &State, section: Section, filter: F) -> usize
where
    F: Fn(&CheckState) -> bool,
{
    let now = now_epoch();
    let mut count = 0;

    for (name, cs) in state.iter() {
        if !filter(cs) {
            continue;
        }
        // Stale entries only show up in the stale section
        if section != Section::Stale && state.is_stale(cs) {
            continue;
        }
        count += 1;

        if section == Section::Changed && cs.changed() {
            let _ = write!(body, "{}->", cs.prev_status);
        }
        let _ = write!(body, "{}: {}: {}", cs.status, name, cs.output);

        if section == Section::Stale {
            let ago = Duration::from_secs((now - cs.epoch).max(0) as u64);
            let _ = write!(body, " (last checked {} ago)", humantime::format_duration(ago));
        }

        body.push('\n');
    }

    if count > 0 {
        body.push('\n');
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckResult;

    fn state_with(entries: &[(&str, StatusCode, StatusCode, i64)]) -> State {
        let mut state = State::new(Duration::from_secs(3600));
        for (name, prev, status, age) in entries {
            let epoch = now_epoch() - age;
            state.update(CheckResult::new(*name, *prev, "").at_epoch(epoch));
            state.update(CheckResult::new(*name, *status, format!("{} output", name)).at_epoch(epoch));
        }
        state
    }

    #[test]
    fn test_empty_state() {
        let report = Report::build(&State::new(Duration::from_secs(3600)), false, false);
        assert_eq!(report.subject, "VIGIL Report [C:0 W:0 U:0 S:0 OK:0]");
        assert!(report.body.contains("There were no status changes..."));
        assert!(report.body.contains("There are no unhandled alerts..."));
        assert!(report.body.contains("There are no stale alerts..."));
        assert!(!report.notify);
        assert!(Report::build(&State::new(Duration::from_secs(3600)), false, true).notify);
    }

    #[test]
    fn test_changed_grouped_by_severity() {
        let state = state_with(&[
            ("Check A", StatusCode::Critical, StatusCode::Ok, 10),
            ("Check B", StatusCode::Ok, StatusCode::Critical, 10),
            ("Check C", StatusCode::Ok, StatusCode::Warning, 10),
        ]);
        let report = Report::build(&state, false, false);

        let critical = report.body.find("OK->CRITICAL: Check B: Check B output").unwrap();
        let warning = report.body.find("OK->WARNING: Check C: Check C output").unwrap();
        let ok = report.body.find("CRITICAL->OK: Check A: Check A output").unwrap();
        assert!(critical < warning && warning < ok);
        assert!(report.notify);
        assert_eq!(report.subject, "VIGIL Report [C:1 W:1 U:0 S:0 OK:1]");
    }

    #[test]
    fn test_unchanged_unhandled_needs_renotify() {
        let state = state_with(&[("Check Disk", StatusCode::Warning, StatusCode::Warning, 10)]);

        let report = Report::build(&state, false, false);
        assert!(!report.notify);
        assert!(report.body.contains("WARNING: Check Disk: Check Disk output\n"));
        assert_eq!(report.counts.warning, 1);

        assert!(Report::build(&state, true, false).notify);
    }

    #[test]
    fn test_stale_ok_counted_but_not_unhandled() {
        let state = state_with(&[
            ("Check Old", StatusCode::Ok, StatusCode::Ok, 7200),
            ("Check Old Critical", StatusCode::Critical, StatusCode::Critical, 7200),
        ]);
        let report = Report::build(&state, true, false);

        assert!(report.body.contains("OK: Check Old: Check Old output (last checked 2h"));
        assert_eq!(report.counts.stale, 2);
        assert_eq!(report.counts.ok, 1);
        assert_eq!(report.counts.critical, 0);
        assert!(report.body.contains("There are no unhandled alerts..."));
        assert!(!report.notify);
        assert_eq!(report.subject, "VIGIL Report [C:0 W:0 U:0 S:2 OK:1]");
    }
}
