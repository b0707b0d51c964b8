//! Session-cookie authentication: HS256 tokens in an HttpOnly cookie, argon2
//! password hashing. The [`Session`] extractor only establishes identity;
//! authorization happens per handler against fresh user rows, so token
//! claims are never trusted for admin checks.

use anyhow::Context;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::ApiError;

pub const COOKIE_NAME: &str = "auth-token";
const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    pub admin_password: Option<String>,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, admin_password: Option<String>) -> Self {
        Self {
            secret: secret.into(),
            admin_password,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("TASKDECK_JWT_SECRET")
            .context("TASKDECK_JWT_SECRET is not set")?;
        let admin_password = std::env::var("TASKDECK_ADMIN_PASSWORD").ok();
        Ok(Self {
            secret,
            admin_password,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

pub fn sign_token(
    config: &AuthConfig,
    user_id: Uuid,
    username: &str,
    admin: bool,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        admin,
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token signing failed: {e}")))
}

pub fn verify_token(config: &AuthConfig, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(COOKIE_NAME, token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Strict);
    cookie.set_max_age(time::Duration::days(TOKEN_TTL_DAYS));
    cookie
}

pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(COOKIE_NAME, "");
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Strict);
    cookie.set_max_age(time::Duration::ZERO);
    cookie
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored password hash invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Verified session identity from the auth cookie.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthorized())?;
        let token = cookies
            .get(COOKIE_NAME)
            .map(|c| c.value().to_string())
            .ok_or_else(ApiError::unauthorized)?;
        let claims = verify_token(&state.auth, &token).ok_or_else(ApiError::unauthorized)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::unauthorized())?;
        Ok(Session {
            user_id,
            username: claims.username,
        })
    }
}
