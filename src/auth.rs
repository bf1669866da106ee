//! Password hashing and access/refresh token plumbing.
//!
//! Short-lived access tokens ride the `Authorization: Bearer` header; the
//! long-lived refresh token rides an HttpOnly cookie scoped to the auth
//! routes, so script code never sees it. Access and refresh tokens are
//! signed with separate secrets.

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

pub const REFRESH_COOKIE: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/api/auth";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    iat: i64,
    exp: i64,
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// Hash a password off the async runtime; bcrypt burns ~100ms of CPU.
pub async fn hash_password(password: String, cost: u32) -> anyhow::Result<String> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Verify a password off the async runtime. Any bcrypt error (e.g. a
/// malformed stored hash) counts as a failed match.
pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn issue_access_token(
    auth: &AuthConfig,
    user_id: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    issue_token(
        &auth.access_token_secret,
        user_id,
        now,
        Duration::minutes(auth.access_token_ttl_mins),
    )
}

pub fn issue_refresh_token(
    auth: &AuthConfig,
    user_id: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    issue_token(
        &auth.refresh_token_secret,
        user_id,
        now,
        Duration::days(auth.refresh_token_ttl_days),
    )
}

fn issue_token(
    secret: &str,
    user_id: i64,
    now: DateTime<Utc>,
    ttl: Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Returns the user id carried by a valid, unexpired access token.
pub fn verify_access_token(auth: &AuthConfig, token: &str) -> Option<i64> {
    verify_token(&auth.access_token_secret, token)
}

/// Returns the user id carried by a valid, unexpired refresh token.
pub fn verify_refresh_token(auth: &AuthConfig, token: &str) -> Option<i64> {
    verify_token(&auth.refresh_token_secret, token)
}

fn verify_token(secret: &str, token: &str) -> Option<i64> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims.sub)
}

// ---------------------------------------------------------------------------
// Refresh cookie
// ---------------------------------------------------------------------------

/// `Set-Cookie` value carrying the refresh token.
pub fn refresh_cookie(token: &str, ttl_days: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path={}; Max-Age={}",
        REFRESH_COOKIE,
        token,
        REFRESH_COOKIE_PATH,
        ttl_days * 24 * 60 * 60,
    )
}

/// `Set-Cookie` value that expires the refresh token immediately.
pub fn clear_refresh_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path={}; Max-Age=0",
        REFRESH_COOKIE, REFRESH_COOKIE_PATH,
    )
}

/// Pull the refresh token out of the request's `Cookie` header.
pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == REFRESH_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Pull the bearer token out of an `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
            access_token_ttl_mins: 15,
            refresh_token_ttl_days: 7,
            bcrypt_cost: 4,
        }
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let cfg = test_auth_config();
        let hash = hash_password("hunter2!".to_string(), cfg.bcrypt_cost)
            .await
            .unwrap();
        assert_ne!(hash, "hunter2!");
        assert!(verify_password("hunter2!".to_string(), hash.clone()).await);
        assert!(!verify_password("hunter3!".to_string(), hash).await);
    }

    #[tokio::test]
    async fn malformed_hash_never_verifies() {
        assert!(!verify_password("whatever".to_string(), "not-a-bcrypt-hash".to_string()).await);
    }

    #[test]
    fn access_token_round_trip() {
        let cfg = test_auth_config();
        let now = Utc::now();
        let token = issue_access_token(&cfg, 42, now).unwrap();
        assert_eq!(verify_access_token(&cfg, &token), Some(42));
        // Signed with a different secret: rejected by the other verifier.
        assert_eq!(verify_refresh_token(&cfg, &token), None);
    }

    #[test]
    fn expired_token_rejected() {
        let cfg = test_auth_config();
        // Issued far enough in the past that exp is behind even the
        // validator's leeway window.
        let then = Utc::now() - Duration::days(2);
        let token = issue_access_token(&cfg, 42, then).unwrap();
        assert_eq!(verify_access_token(&cfg, &token), None);
    }

    #[test]
    fn garbage_token_rejected() {
        let cfg = test_auth_config();
        assert_eq!(verify_access_token(&cfg, "not.a.jwt"), None);
        assert_eq!(verify_access_token(&cfg, ""), None);
    }

    #[test]
    fn refresh_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "theme=dark; refresh_token=abc.def.ghi; lang=en".parse().unwrap(),
        );
        assert_eq!(
            refresh_token_from_headers(&headers).as_deref(),
            Some("abc.def.ghi")
        );

        let mut empty = HeaderMap::new();
        empty.insert(
            axum::http::header::COOKIE,
            "refresh_token=".parse().unwrap(),
        );
        assert_eq!(refresh_token_from_headers(&empty), None);
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc.def.ghi".parse().unwrap(),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        let mut basic = HeaderMap::new();
        basic.insert(
            axum::http::header::AUTHORIZATION,
            "Basic dXNlcjpwYXNz".parse().unwrap(),
        );
        assert_eq!(bearer_token(&basic), None);
    }
}
