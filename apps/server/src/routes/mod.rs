use actix_web::web::ServiceConfig;

mod health;
mod state;

pub use state::StateFile;

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(health::health_route).service(state::state_route);
}
