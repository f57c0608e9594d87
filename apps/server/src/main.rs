#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use tracing::info;
use vigil::Config;

mod error;
mod routes;

use error::AppError;
use routes::StateFile;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_CONFIG: &str = "/etc/vigil.toml";

/// Runtime environment first, then whatever `.env` held at build time
fn setting(name: &str, baked: Option<&'static str>, default: &str) -> String {
    env::var(name).ok().or_else(|| baked.map(String::from)).unwrap_or_else(|| default.to_string())
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    logger::init();

    let addr: SocketAddr = setting("VIGIL_BIND", option_env!("VIGIL_BIND"), DEFAULT_BIND).parse()?;
    let config_path = PathBuf::from(setting("VIGIL_CONFIG", option_env!("VIGIL_CONFIG"), DEFAULT_CONFIG));

    let config = Config::from_file(&config_path)?;
    let state_file = StateFile::new(config.state_file());
    info!("Serving {} on {}", state_file.path().display(), addr);

    run_server(addr, state_file).await
}

async fn run_server(addr: SocketAddr, state_file: StateFile) -> Result<(), AppError> {
    let state_file = web::Data::new(state_file);
    HttpServer::new(move || App::new().app_data(state_file.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
