//! Route configuration

use actix_web::web;

use crate::app_state::AppState;
use crate::handlers;
use crate::middleware::JwtAuthMiddleware;
use crate::storage::local::PUBLIC_PREFIX;

/// Register shared state, extractor configs and every route.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let auth = JwtAuthMiddleware::new(state.auth.clone());

    cfg.app_data(web::Data::new(state.clone()))
        .app_data(handlers::json_config())
        .app_data(handlers::path_config())
        .app_data(handlers::query_config())
        .route("/", web::get().to(handlers::health::root))
        .route("/health", web::get().to(handlers::health::health))
        .service(
            web::scope("/api/auth")
                .route("/signup", web::post().to(handlers::auth::signup))
                .route("/login", web::post().to(handlers::auth::login)),
        )
        .service(
            web::scope("/api/videos")
                .wrap(auth.clone())
                .route("/upload", web::post().to(handlers::videos::upload))
                .route("", web::get().to(handlers::videos::list))
                .route("/{video_id}", web::get().to(handlers::videos::get))
                .route("/{video_id}", web::delete().to(handlers::videos::delete))
                .route("/{video_id}/media", web::get().to(handlers::media::owned_asset))
                .route("/{video_id}/publish", web::put().to(handlers::videos::publish)),
        )
        .service(
            web::scope("/api/public")
                .route("/videos", web::get().to(handlers::public::list_public))
                .route("/rankings", web::get().to(handlers::public::rankings))
                .service(
                    web::resource("/videos/{video_id}/vote")
                        .wrap(auth)
                        .route(web::post().to(handlers::public::vote)),
                ),
        )
        .service(
            web::scope(PUBLIC_PREFIX)
                .route("/processed/{file_name}", web::get().to(handlers::media::public_asset)),
        );
}
