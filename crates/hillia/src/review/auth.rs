use std::collections::HashMap;
use std::sync::Mutex;

use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Duration, Utc};

use crate::config::{sha256_hex, AdminConfig};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credentials required")]
    Missing,
    #[error("malformed basic credentials")]
    Malformed,
    #[error("invalid credentials")]
    Invalid,
    #[error("too many failed attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },
}

/// HTTP Basic verification for the reading room with a per-username lockout.
pub struct AdminGate {
    username: String,
    password_hash: String,
    failures: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl AdminGate {
    pub const MAX_FAILED_ATTEMPTS: usize = 5;
    pub const LOCKOUT_MINUTES: i64 = 15;

    pub fn new(config: &AdminConfig) -> Self {
        Self {
            username: config.username.clone(),
            password_hash: config.password_hash.to_ascii_lowercase(),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Verifies an `Authorization` header value and returns the admin username.
    pub fn verify(&self, header: Option<&str>) -> Result<String, AuthError> {
        self.verify_at(header, Utc::now())
    }

    pub fn verify_at(&self, header: Option<&str>, now: DateTime<Utc>) -> Result<String, AuthError> {
        let (username, password) = parse_basic(header.ok_or(AuthError::Missing)?)?;
        let window = Duration::minutes(Self::LOCKOUT_MINUTES);

        let mut failures = self.failures.lock().expect("auth mutex poisoned");
        failures.retain(|_, attempts| {
            attempts.retain(|at| now - *at < window);
            !attempts.is_empty()
        });

        if let Some(attempts) = failures.get(&username) {
            if attempts.len() >= Self::MAX_FAILED_ATTEMPTS {
                let oldest = attempts.iter().min().copied().unwrap_or(now);
                let retry_after_secs = (oldest + window - now).num_seconds().max(1);
                tracing::warn!(username = %username, "admin login locked out");
                return Err(AuthError::RateLimited { retry_after_secs });
            }
        }

        let username_ok = digest_eq(&username, &self.username);
        let password_ok = digest_eq(&sha256_hex(&password), &self.password_hash);
        if username_ok && password_ok {
            failures.remove(&username);
            return Ok(username);
        }

        let attempts = failures.entry(username.clone()).or_default();
        attempts.push(now);
        tracing::info!(username = %username, failures = attempts.len(), "admin login rejected");
        Err(AuthError::Invalid)
    }
}

fn parse_basic(header: &str) -> Result<(String, String), AuthError> {
    let (scheme, encoded) = header.trim().split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::Malformed);
    }

    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
    let (username, password) = decoded.split_once(':').ok_or(AuthError::Malformed)?;
    Ok((username.to_string(), password.to_string()))
}

/// Length-independent comparison that always walks both inputs.
fn digest_eq(left: &str, right: &str) -> bool {
    let (left, right) = (left.as_bytes(), right.as_bytes());
    let mut diff = left.len() ^ right.len();
    for index in 0..left.len().max(right.len()) {
        let a = left.get(index).copied().unwrap_or(0);
        let b = right.get(index).copied().unwrap_or(0);
        diff |= usize::from(a ^ b);
    }
    diff == 0
}
