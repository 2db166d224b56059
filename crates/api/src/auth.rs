//! Session Authentication
//!
//! Sessions are opaque tokens stored server-side. A token is read from the
//! `heartwise_session` cookie or an `Authorization: Bearer` header. The guard
//! middleware resolves it and inserts an [`AuthContext`] request extension that
//! handlers take with `Extension<AuthContext>`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "heartwise_session";

/// Identity of the caller, resolved from their session
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
}

/// Argon2id parameters from configuration
pub fn password_params(config: &AuthConfig) -> Result<Params, argon2::Error> {
    Params::new(config.argon2_memory_kib, config.argon2_iterations, 1, None)
}

/// Hash a password into a PHC string off the async runtime
pub async fn hash_password(params: Params, password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
    .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored PHC string.
///
/// Parameters are read from the hash itself, so older hashes keep verifying
/// after the configured cost changes. A malformed hash never matches.
pub async fn verify_password(password: String, phc: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    })
    .await
    .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))
}

/// Session token carried by the request, cookie first
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, SESSION_COOKIE).or_else(|| extract_bearer_token(headers))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Resolve the caller's session, if any
pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, ApiError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let user = state.repository.session_user(&token, Utc::now()).await?;
    Ok(user.map(|user| AuthContext {
        user_id: user.id,
        username: user.username,
    }))
}

/// Guard for JSON routes: 401 without a valid session
pub async fn require_api_user(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let resolved = current_user(&state, req.headers()).await;
    match resolved {
        Ok(Some(ctx)) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Ok(None) => {
            debug!("Unauthenticated request to {}", req.uri().path());
            ApiError::Unauthorized.into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Guard for HTML pages: redirect to the login page, remembering the target
pub async fn require_page_user(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let resolved = current_user(&state, req.headers()).await;
    match resolved {
        Ok(Some(ctx)) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Ok(None) => {
            let target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/home");
            Redirect::to(&login_redirect_target(target)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// `/login?next=<target>` with the target form-encoded
pub fn login_redirect_target(target: &str) -> String {
    match serde_urlencoded::to_string([("next", target)]) {
        Ok(query) => format!("/login?{query}"),
        Err(_) => "/login".to_string(),
    }
}

/// Keep a post-login redirect only if it stays on this site
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// `Set-Cookie` value opening a session
pub fn session_cookie(token: &str, config: &AuthConfig) -> String {
    let max_age = config.session_ttl_hours.max(0) * 3600;
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}")
}

/// `Set-Cookie` value clearing the session
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn cheap_params() -> Params {
        Params::new(256, 1, 1, None).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password(cheap_params(), "hunter22".to_string())
            .await
            .unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("hunter23".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_different_salt() {
        let a = hash_password(cheap_params(), "secret".to_string()).await.unwrap();
        let b = hash_password(cheap_params(), "secret".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_never_matches() {
        assert!(!verify_password("x".to_string(), "not-a-hash".to_string())
            .await
            .unwrap());
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; heartwise_session=abc123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(session_token(&headers).as_deref(), Some("tok"));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_empty_cookie_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("heartwise_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/prediction")), Some("/prediction"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn test_login_redirect_encodes_target() {
        assert_eq!(
            login_redirect_target("/prediction?x=1"),
            "/login?next=%2Fprediction%3Fx%3D1"
        );
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = AuthConfig {
            session_ttl_hours: 2,
            cookie_secure: true,
            ..AuthConfig::default()
        };
        let cookie = session_cookie("tok", &config);
        assert!(cookie.starts_with("heartwise_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
