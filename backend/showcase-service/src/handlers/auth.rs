use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::Result;
use crate::models::{LoginRequest, SignupRequest};

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// POST /api/auth/signup
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse> {
    let user = state.auth.signup(body.into_inner()).await?;

    Ok(HttpResponse::Created().json(SignupResponse {
        message: "User created successfully",
        user_id: user.id,
    }))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let issued = state.auth.login(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful",
        user_id: issued.user.id,
        email: issued.user.email,
        access_token: issued.access_token,
        token_type: "bearer",
        expires_in: issued.expires_in,
    }))
}
