//! Configuration methods for Vigil.
//!
//! Loading, defaults that need the environment, sanity checks and the
//! builders used by embedders and tests.

use std::{env, fmt, fs, path, time::Duration};

use tracing::info;
use url::Url;

use super::types::{CheckSpec, Config, ConfigBuilder};
use crate::STATE_FILE_NAME;
use crate::error::ConfigError;

/// Port the report is delivered to when no SMTP server is configured
const DEFAULT_SMTP_PORT: u16 = 25;

/// Best effort local host name, falling back to localhost
fn local_hostname() -> String {
    env::var("HOSTNAME")
        .ok()
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl CheckSpec {
    /// Create a check running the given plugin without arguments
    pub fn new(plugin: impl Into<String>) -> Self {
        Self { plugin: plugin.into(), ..Self::default() }
    }

    /// Set the plugin arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the checks this one depends on
    pub fn with_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set retry count and the pause between attempts
    pub fn with_retries(mut self, retries: u32, retry_interval: u64) -> Self {
        self.retries = retries;
        self.retry_interval = retry_interval;
        self
    }

    /// Set the minimum interval between executions
    pub fn with_run_interval(mut self, seconds: u64) -> Self {
        self.run_interval = seconds;
        self
    }

    /// Set the random spread applied before execution
    pub fn with_random_spread(mut self, seconds: u64) -> Self {
        self.random_spread = seconds;
        self
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval)
    }
}

impl Config {
    /// Read a config file; `.json` files are parsed as JSON, anything else as TOML
    ///
    /// ```rust,no_run
    /// let cfg = vigil::Config::from_file("/etc/vigil.toml")?;
    /// println!("{}", cfg);
    /// # Ok::<(), vigil::ConfigError>(())
    /// ```
    pub fn from_file(path: impl AsRef<path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let is_json = path.extension().map(|ext| ext == "json").unwrap_or(false);
        let parsed = if is_json {
            serde_json::from_str::<Config>(&raw).map_err(|e| e.to_string())
        } else {
            toml::from_str::<Config>(&raw).map_err(|e| e.to_string())
        };

        let mut config = parsed
            .map_err(|reason| ConfigError::Parse { path: path.to_path_buf(), reason })?;
        config.apply_defaults();
        Ok(config)
    }

    /// Fill in defaults that depend on the host
    pub fn apply_defaults(&mut self) {
        if self.smtp_server.is_none() {
            let server = format!("{}:{}", local_hostname(), DEFAULT_SMTP_PORT);
            info!("Set SMTPServer to {}", server);
            self.smtp_server = Some(server);
        }
    }

    /// SMTP relay the report is delivered to
    pub fn smtp_server(&self) -> String {
        self.smtp_server
            .clone()
            .unwrap_or_else(|| format!("{}:{}", local_hostname(), DEFAULT_SMTP_PORT))
    }

    /// Location of the persisted state
    pub fn state_file(&self) -> path::PathBuf {
        self.state_dir.join(STATE_FILE_NAME)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_s)
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_threshold)
    }

    /// Validate cross references the engine relies on
    ///
    /// Reports the first problem found. Failures are meant for the operator,
    /// the engine still runs with the configuration as loaded.
    pub fn sanity_check(&self) -> Result<(), ConfigError> {
        if self.check_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        for (name, check) in &self.checks {
            for dependency in &check.depends_on {
                if dependency == name {
                    return Err(ConfigError::SelfDependency(name.clone()));
                }
                if !self.checks.contains_key(dependency) {
                    return Err(ConfigError::UnknownDependency {
                        check: name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        for endpoint in &self.federated {
            Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Vigil Configuration:")?;
        write_title_1(f, "Notification")?;
        write_1(f, "From", &self.email_from)?;
        write_1(f, "To", &self.email_to)?;
        write_1(f, "SMTP Server", &self.smtp_server())?;
        write_title_1(f, "Engine")?;
        write_1(f, "State Dir", &self.state_dir.display())?;
        write_1(f, "Check Timeout (s)", &self.check_timeout_s)?;
        write_1(f, "Check Concurrency", &self.check_concurrency)?;
        write_1(f, "Stale Threshold (s)", &self.stale_threshold)?;
        write_title_1(f, "Checks")?;
        for (name, check) in &self.checks {
            write_2(f, name, &check.plugin)?;
        }
        if !self.federated.is_empty() {
            write_title_1(f, "Federated")?;
            for endpoint in &self.federated {
                write_2(f, "Endpoint", endpoint)?;
            }
        }

        Ok(())
    }
}

impl ConfigBuilder {
    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }

    /// Add a check under the given name
    pub fn check(mut self, name: impl Into<String>, spec: CheckSpec) -> Self {
        self.config.checks.insert(name.into(), spec);
        self
    }

    /// Set the per-check timeout in seconds
    pub fn check_timeout_s(mut self, seconds: u64) -> Self {
        self.config.check_timeout_s = seconds;
        self
    }

    /// Set the number of plugins allowed to run at once
    pub fn check_concurrency(mut self, limit: usize) -> Self {
        self.config.check_concurrency = limit;
        self
    }

    /// Set the staleness threshold in seconds
    pub fn stale_threshold(mut self, seconds: u64) -> Self {
        self.config.stale_threshold = seconds;
        self
    }

    /// Set the state directory
    pub fn state_dir(mut self, dir: impl Into<path::PathBuf>) -> Self {
        self.config.state_dir = dir.into();
        self
    }

    /// Add a federated peer endpoint
    pub fn federated(mut self, endpoint: impl Into<String>) -> Self {
        self.config.federated.push(endpoint.into());
        self
    }

    /// Set report sender and recipient
    pub fn email(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.config.email_from = from.into();
        self.config.email_to = to.into();
        self
    }

    /// Set the SMTP relay
    pub fn smtp_server(mut self, server: impl Into<String>) -> Self {
        self.config.smtp_server = Some(server.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::DEFAULT_CHECK_TIMEOUT_S;
    use super::*;

    #[test]
    fn test_json_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.json");
        fs::write(
            &path,
            r#"{
                "EmailTo": "ops@example.org",
                "EmailFrom": "vigil@example.org",
                "SMTPServer": "mail.example.org:25",
                "Checks": {
                    "Check Ping": { "Plugin": "/usr/lib/nagios/check_ping", "Args": ["-H", "10.0.0.1"] },
                    "Check HTTP": { "Plugin": "/usr/lib/nagios/check_http", "Args": ["-H", "example.org"], "DependsOn": ["Check Ping"], "Retries": 2, "RetryInterval": 5 }
                }
            }"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.check_timeout_s, DEFAULT_CHECK_TIMEOUT_S);
        assert_eq!(config.stale_threshold, 3600);
        assert_eq!(config.state_dir, path::PathBuf::from("."));
        assert_eq!(config.smtp_server(), "mail.example.org:25");
        let http = &config.checks["Check HTTP"];
        assert_eq!(http.depends_on, vec!["Check Ping".to_string()]);
        assert_eq!(http.retries, 2);
        assert_eq!(http.run_interval, 0);
        assert!(config.sanity_check().is_ok());
    }

    #[test]
    fn test_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        fs::write(
            &path,
            r#"
EmailTo = "ops@example.org"
EmailFrom = "vigil@example.org"
CheckConcurrency = 8
StaleThreshold = 7200
Federated = ["http://peer.example.org/state.json"]

[Checks."Check Load"]
Plugin = "/usr/lib/nagios/check_load"
Args = ["-w", "2", "-c", "4"]
RunInterval = 300
RandomSpread = 30
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.check_concurrency, 8);
        assert_eq!(config.stale_threshold(), Duration::from_secs(7200));
        assert_eq!(config.federated.len(), 1);
        assert!(config.smtp_server.as_deref().unwrap().ends_with(":25"));
        let load = &config.checks["Check Load"];
        assert_eq!(load.run_interval, 300);
        assert_eq!(load.random_spread, 30);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/vigil.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_sanity_check_unknown_dependency() {
        let config = Config::builder()
            .check("B", CheckSpec::new("/bin/true").with_depends_on(["A"]))
            .build();

        let err = config.sanity_check().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDependency { .. }));
        assert_eq!(err.to_string(), "Check 'B' depends on non existent check 'A'");
    }

    #[test]
    fn test_sanity_check_self_dependency_and_concurrency() {
        let config = Config::builder()
            .check("A", CheckSpec::new("/bin/true").with_depends_on(["A"]))
            .build();
        assert!(matches!(config.sanity_check(), Err(ConfigError::SelfDependency(_))));

        let config = Config::builder().check_concurrency(0).build();
        assert!(matches!(config.sanity_check(), Err(ConfigError::ZeroConcurrency)));
    }

    #[test]
    fn test_sanity_check_endpoint() {
        let config = Config::builder().federated("not a url").build();
        assert!(matches!(config.sanity_check(), Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_display_lists_checks() {
        let config = Config::builder()
            .smtp_server("localhost:25")
            .check("Check Disk", CheckSpec::new("/usr/lib/nagios/check_disk"))
            .build();
        let rendered = config.to_string();
        assert!(rendered.contains("Check Disk: /usr/lib/nagios/check_disk"));
        assert!(rendered.contains("SMTP Server: localhost:25"));
    }
}
