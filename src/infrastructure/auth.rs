use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;

use axum::{
    async_trait,
    extract::{FromRequestParts, Json},
    http::{StatusCode, request::Parts},
};
use serde_json::json;

use crate::models::user::ROLE_ADMIN;

const SESSION_HOURS: i64 = 24;
const CONFIRMATION_HOURS: i64 = 48;
const CONFIRM_EMAIL_PURPOSE: &str = "confirm_email";

type Rejection = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // email
    pub uid: i32,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, Rejection> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Missing Authorization header" })),
        ))?;

    auth_header.strip_prefix("Bearer ").ok_or((
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Invalid Authorization header format" })),
    ))
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        decode_jwt(token).map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid or expired token" })),
            )
        })
    }
}

/// Claims of an authenticated admin; other roles get 403.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminClaims
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            tracing::warn!("Non-admin {} tried an admin endpoint", claims.sub);
            return Err((
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Admin role required" })),
            ));
        }
        Ok(AdminClaims(claims))
    }
}

/// Claims when a bearer token is present; checkout works for guests too.
#[derive(Debug, Clone)]
pub struct OptionalClaims(pub Option<Claims>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalClaims
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key("Authorization") {
            return Ok(OptionalClaims(None));
        }
        Claims::from_request_parts(parts, state)
            .await
            .map(|claims| OptionalClaims(Some(claims)))
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
}

fn expiry_in(hours: i64) -> usize {
    (Utc::now() + Duration::hours(hours)).timestamp() as usize
}

pub fn create_jwt(email: &str, uid: i32, role: &str) -> Result<String, String> {
    let secret = get_jwt_secret();

    let claims = Claims {
        sub: email.to_owned(),
        uid,
        role: role.to_owned(),
        exp: expiry_in(SESSION_HOURS),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str) -> Result<Claims, String> {
    let secret = get_jwt_secret();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfirmationClaims {
    sub: String,
    uid: i32,
    purpose: String,
    exp: usize,
}

/// Token mailed to a new customer to confirm their address.
pub fn create_confirmation_token(email: &str, uid: i32) -> Result<String, String> {
    let claims = ConfirmationClaims {
        sub: email.to_owned(),
        uid,
        purpose: CONFIRM_EMAIL_PURPOSE.to_owned(),
        exp: expiry_in(CONFIRMATION_HOURS),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_bytes()),
    )
    .map_err(|e| e.to_string())
}

/// Returns the user ID a confirmation token was issued for.
pub fn decode_confirmation_token(token: &str) -> Result<i32, String> {
    let claims = decode::<ConfirmationClaims>(
        token,
        &DecodingKey::from_secret(get_jwt_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.purpose != CONFIRM_EMAIL_PURPOSE {
        return Err("Token is not an email confirmation token".to_string());
    }
    Ok(claims.uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_is_not_a_confirmation_token() {
        let token = create_jwt("a@b.it", 3, "customer").unwrap();
        assert!(decode_confirmation_token(&token).is_err());
    }

    #[test]
    fn password_hashes_are_salted_and_verify() {
        let first = hash_password("cacciavite").unwrap();
        let second = hash_password("cacciavite").unwrap();
        assert_ne!(first, second);
        assert_eq!(verify_password("cacciavite", &first), Ok(true));
        assert_eq!(verify_password("martello", &first), Ok(false));
    }

    #[test]
    fn confirmation_token_carries_user_id() {
        let token = create_confirmation_token("a@b.it", 42).unwrap();
        assert_eq!(decode_confirmation_token(&token), Ok(42));
    }
}
