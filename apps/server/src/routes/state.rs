use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, Responder, get, web};
use tracing::{debug, error};

/// Location of the persisted state served to federation peers
#[derive(Debug, Clone)]
pub struct StateFile(PathBuf);

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Serve the state file verbatim, peers decode it themselves
#[get("/state.json")]
pub async fn state_route(state_file: web::Data<StateFile>) -> impl Responder {
    match tokio::fs::read(state_file.path()).await {
        Ok(bytes) => {
            debug!("Serving {} bytes of state", bytes.len());
            HttpResponse::Ok().content_type(ContentType::json()).body(bytes)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => HttpResponse::NotFound().finish(),
        Err(e) => {
            error!("Unable to read {}: {}", state_file.path().display(), e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
