// Route exports
pub mod predict;

use actix_web::web;

pub use predict::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(predict::configure),
    );
}
