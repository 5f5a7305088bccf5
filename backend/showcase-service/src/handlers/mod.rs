//! HTTP handlers
//!
//! Handlers stay thin: they extract input, call into `services`, and map
//! results to JSON. Errors flow through [`AppError`] so every failure body
//! has the same `{detail, timestamp}` shape.

pub mod auth;
pub mod health;
pub mod media;
pub mod public;
pub mod videos;

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    web, Error, HttpRequest, HttpResponse,
};
use error_types::ErrorResponse;

use crate::error::AppError;

/// Body-parsing failures become 400s with a readable detail.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| -> Error {
        let detail = match &err {
            JsonPayloadError::ContentType => "Content-Type must be application/json".to_string(),
            JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
            other => format!("Invalid request body: {}", other),
        };
        AppError::Validation(detail).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err: PathError, _req: &HttpRequest| -> Error {
        AppError::Validation("Invalid UUID format".to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| -> Error {
        AppError::Validation(format!("Invalid query parameters: {}", err)).into()
    })
}

/// Fallback for unmatched routes
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("Not found"))
}
