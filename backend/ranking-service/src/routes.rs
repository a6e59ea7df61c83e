//! Route configuration
//!
//! Centralized route setup so main.rs only wires state

use crate::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .service(
                web::scope("/recommendations/top-creators")
                    .route("", web::get().to(handlers::get_all_top_creators))
                    .route("/status", web::get().to(handlers::get_ranking_status))
                    .route("/calculate", web::post().to(handlers::calculate_top_creators))
                    .route(
                        "/category/{category_id}",
                        web::get().to(handlers::get_category_top_creators),
                    ),
            ),
    );
}
