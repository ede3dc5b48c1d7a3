//! Admin login and bearer-session checks.
//!
//! Credentials are a configured username plus an argon2 password hash.
//! A successful login issues a random token remembered in memory until it
//! expires or the admin logs out.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use futures::future::{ready, Ready};
use rand::Rng;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self) -> Session {
        let now = Utc::now();
        let session = Session {
            token: random_token(),
            expires_at: now + self.ttl,
        };
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, expires_at| *expires_at > now);
        sessions.insert(session.token.clone(), session.expires_at);
        session
    }

    /// Returns the expiry of a live session; expired entries are dropped.
    pub fn validate(&self, token: &str) -> ApiResult<DateTime<Utc>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(token).copied() {
            Some(expires_at) if expires_at > Utc::now() => Ok(expires_at),
            Some(_) => {
                sessions.remove(token);
                Err(ApiError::Unauthorized("session expired".to_string()))
            }
            None => Err(ApiError::Unauthorized("invalid session token".to_string())),
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }
}

fn random_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt_bytes: [u8; 16] = rand::thread_rng().gen();
    let salt = SaltString::encode_b64(&salt_bytes)?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Extractor for routes that require a logged-in admin.
///
/// Expects `Authorization: Bearer <token>` naming a live session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    fn authenticate(req: &HttpRequest) -> ApiResult<Self> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| ApiError::StorageFailure("application state is not configured".to_string()))?;
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized("missing or invalid Authorization header".to_string())
            })?;
        let expires_at = state.sessions.validate(token)?;
        Ok(AdminSession {
            token: token.to_string(),
            expires_at,
        })
    }
}

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::authenticate(req))
    }
}
