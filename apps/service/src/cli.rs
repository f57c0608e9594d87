use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::Instant;

pub const DEFAULT_CONFIG: &str = "/etc/vigil.toml";

/// Stand-in for a timeout too large to represent
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Run every configured check once and mail a report when something changed
#[derive(Parser, Debug)]
#[command(name = "vigil", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Configuration file, TOML or JSON by extension
    #[arg(long, default_value = DEFAULT_CONFIG)]
    pub cfg: PathBuf,

    /// Deadline for the whole pass, in minutes
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,

    /// Send the report again while unhandled alerts remain
    #[arg(long, default_value_t = false)]
    pub renotify: bool,

    /// Always send the report
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Print version information and exit
    #[arg(long, default_value_t = false)]
    pub version: bool,
}

impl Cli {
    /// End of the pass, `--timeout` minutes after `start`
    pub fn deadline(&self, start: Instant) -> Instant {
        let timeout = Duration::from_secs(self.timeout.saturating_mul(60));
        start
            .checked_add(timeout)
            .or_else(|| start.checked_add(FAR_FUTURE))
            .unwrap_or(start)
    }
}

pub fn version_banner() -> String {
    format!(
        "vigil {}\n{}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["vigil"]).unwrap();
        assert_eq!(cli.cfg, PathBuf::from(DEFAULT_CONFIG));
        assert_eq!(cli.timeout, 5);
        assert!(!cli.renotify && !cli.force && !cli.version);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "vigil",
            "--cfg",
            "/tmp/vigil.json",
            "--timeout",
            "2",
            "--renotify",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.cfg, PathBuf::from("/tmp/vigil.json"));
        assert_eq!(cli.timeout, 2);
        assert!(cli.renotify && cli.force);
    }

    #[test]
    fn test_deadline() {
        let start = Instant::now();
        let cli = Cli::try_parse_from(["vigil", "--timeout", "2"]).unwrap();
        assert_eq!(cli.deadline(start), start + Duration::from_secs(120));

        let cli = Cli::try_parse_from(["vigil", "--timeout", &u64::MAX.to_string()]).unwrap();
        assert!(cli.deadline(start) > start + Duration::from_secs(86400));
    }

    #[test]
    fn test_version_banner() {
        let banner = version_banner();
        assert!(banner.starts_with("vigil "));
        assert!(banner.contains(env!("CARGO_PKG_VERSION")));
    }
}
