use crypto_core::{password, JwtService};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::models::{LoginRequest, NewUser, SignupRequest, User};

/// Token handed back on login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: Arc<JwtService>) -> Self {
        Self { users, jwt }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<User> {
        let request = request.normalized();
        request.check()?;

        // Fast path; the unique index is what actually guarantees it.
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let plain = request.password1.clone();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
            .await??;

        let user = self
            .users
            .create(NewUser {
                id: Uuid::new_v4(),
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                password_hash,
                city: request.city,
                country: request.country,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<IssuedToken> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let user = self.users.find_by_email(&email).await?.ok_or_else(invalid)?;

        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || {
            password::verify_password(&request.password, &stored)
        })
        .await??;
        if !matches {
            return Err(invalid());
        }

        let access_token = self.jwt.issue_token(user.id, &user.email)?;
        Ok(IssuedToken {
            access_token,
            expires_in: self.jwt.ttl().num_seconds(),
            user,
        })
    }

    /// Resolve a bearer token into a user id.
    pub fn authenticate(&self, token: &str) -> Result<Uuid> {
        let claims = self.jwt.decode_token(token)?;
        Ok(claims.user_id()?)
    }
}
