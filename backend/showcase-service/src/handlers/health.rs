use actix_web::{HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Video showcase API",
        "version": VERSION,
    }))
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": VERSION,
        "timestamp": Utc::now(),
    }))
}
