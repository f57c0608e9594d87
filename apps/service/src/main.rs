#![warn(clippy::all, clippy::pedantic)]

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::time::Instant;
use tracing::{error, info};
use vigil::notify::notify_error;
use vigil::{Config, FileStateStore, RunOptions, SmtpNotifier};

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", cli::version_banner());
        return Ok(());
    }

    logger::init();

    // The pass deadline starts before anything else so config loading counts against it
    let deadline = cli.deadline(Instant::now());

    let config = Config::from_file(&cli.cfg)
        .with_context(|| format!("can't load configuration from {}", cli.cfg.display()))?;
    let config = Arc::new(config);

    let store = FileStateStore::new(config.state_file());
    let notifier = SmtpNotifier::from_config(&config);
    let options = RunOptions { deadline, renotify: cli.renotify, force: cli.force };

    match vigil::run(config, options, &store, &notifier).await {
        Ok(report) => {
            info!("Vigil run finished: {}", report.subject);
            Ok(())
        }
        Err(e) => {
            error!("Vigil run failed: {e:#}");
            notify_error(&notifier, &e).await;
            Err(e)
        }
    }
}
