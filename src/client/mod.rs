//! Client-side session management for API consumers.
//!
//! [`SessionManager`] is an explicit session object rather than process-wide
//! state: it owns the current access token, refreshes it proactively before
//! expiry, and coalesces concurrent refreshes into a single network call.
//! The refresh token itself lives in the HTTP client's cookie store and never
//! passes through this module.

pub mod token;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{header::AUTHORIZATION, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{sync::Mutex as AsyncMutex, task::JoinHandle, time::Duration};
use tracing::{debug, warn};

use crate::api::handlers::auth::types::{AuthResponse, RefreshResponse, UserResponse};
use crate::api::handlers::now_unix_seconds;
use crate::APP_USER_AGENT;

use self::token::{decode_expiry, normalize_token};

/// Refresh this many seconds before the token expires (proactive timer).
const REFRESH_LEAD_SECONDS: i64 = 60;
/// Treat a token this close to expiry as stale when about to use it.
const EXPIRY_SKEW_SECONDS: i64 = 30;
/// Fallback access-token lifetime when a response does not carry one.
const DEFAULT_EXPIRES_IN_SECONDS: i64 = 15 * 60;

struct TokenState {
    token: Option<String>,
    refresh_task: Option<JoinHandle<()>>,
}

struct Inner {
    base_url: String,
    http: reqwest::Client,
    state: Mutex<TokenState>,
    // Held across the refresh network call so overlapping triggers (the
    // proactive timer racing a reactive 401) coalesce into one request.
    refresh_lock: AsyncMutex<()>,
}

/// Session object issuing authenticated requests against the storefront API.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a manager for the API at `base_url` (no trailing slash needed).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner: Arc::new(Inner {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                http,
                state: Mutex::new(TokenState {
                    token: None,
                    refresh_task: None,
                }),
                refresh_lock: AsyncMutex::new(()),
            }),
        })
    }

    /// The currently stored access token, if any. Always re-read before each
    /// authenticated call; the stored value is the single source of truth.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock_state().token.clone()
    }

    /// Store a token and (re)schedule the proactive refresh timer to fire
    /// `REFRESH_LEAD_SECONDS` before expiry.
    pub fn set_token(&self, token: &str, expires_in: i64) {
        let normalized = normalize_token(token);
        let delay = expires_in.saturating_sub(REFRESH_LEAD_SECONDS).max(0);

        // Store the token before the timer exists so a zero-delay refresh
        // never observes the previous value.
        let mut state = self.lock_state();
        state.token = Some(normalized);

        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay.unsigned_abs())).await;
            if let Some(inner) = weak.upgrade() {
                let manager = SessionManager { inner };
                let _ = manager.refresh().await;
            }
        });

        if let Some(previous) = state.refresh_task.replace(task) {
            previous.abort();
        }
    }

    /// Adopt a token persisted by an earlier run without scheduling a timer;
    /// the next [`Self::ensure_valid_token`] call decides whether it is still
    /// usable.
    pub fn restore_token(&self, token: &str) {
        let mut state = self.lock_state();
        state.token = Some(normalize_token(token));
    }

    /// Wipe the stored token and cancel any pending refresh.
    pub fn clear_token(&self) {
        let mut state = self.lock_state();
        state.token = None;
        if let Some(task) = state.refresh_task.take() {
            task.abort();
        }
    }

    /// Return a token safe to use right now, refreshing first when the stored
    /// one is within `EXPIRY_SKEW_SECONDS` of expiry, already expired, or
    /// undecodable.
    pub async fn ensure_valid_token(&self) -> Option<String> {
        let token = self.token()?;
        match decode_expiry(&token) {
            Some(exp) if exp - now_unix_seconds() > EXPIRY_SKEW_SECONDS => Some(token),
            _ => self.refresh().await,
        }
    }

    /// Exchange the refresh cookie for a new access token.
    ///
    /// Single-flight: a caller that lost the race re-reads the token the
    /// winner stored instead of issuing a second request. On failure all
    /// local credential state is cleared (logical logout).
    pub async fn refresh(&self) -> Option<String> {
        let _guard = self.inner.refresh_lock.lock().await;

        // A concurrent refresh may have landed while we waited for the lock.
        if let Some(current) = self.token() {
            if let Some(exp) = decode_expiry(&current) {
                if exp - now_unix_seconds() > EXPIRY_SKEW_SECONDS {
                    return Some(current);
                }
            }
        }

        match self.request_refresh().await {
            Ok(response) => {
                self.set_token(&response.token, response.expires_in);
                Some(normalize_token(&response.token))
            }
            Err(err) => {
                warn!("Token refresh failed: {err:#}");
                self.clear_token();
                None
            }
        }
    }

    /// Log in and adopt the issued access token (and refresh cookie).
    ///
    /// # Errors
    ///
    /// Returns an error for invalid credentials or transport failures.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserResponse> {
        let response = self
            .inner
            .http
            .post(format!("{}/api/login", self.inner.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("login request failed")?;

        if response.status() == StatusCode::UNAUTHORIZED {
            bail!("Invalid credentials");
        }
        let response = response
            .error_for_status()
            .context("login rejected by server")?;
        let auth: AuthResponse = response.json().await.context("invalid login response")?;

        self.adopt_auth_response(&auth);
        Ok(auth.user)
    }

    /// Register a new account and adopt its session.
    ///
    /// # Errors
    ///
    /// Returns an error for rejected payloads or transport failures.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<UserResponse> {
        let response = self
            .inner
            .http
            .post(format!("{}/api/register", self.inner.base_url))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .context("registration request failed")?
            .error_for_status()
            .context("registration rejected by server")?;
        let auth: AuthResponse = response
            .json()
            .await
            .context("invalid registration response")?;

        self.adopt_auth_response(&auth);
        Ok(auth.user)
    }

    /// Revoke the server-side session and clear local state. Local state is
    /// cleared even when the server call fails.
    pub async fn logout(&self) {
        if let Some(token) = self.token() {
            let result = self
                .inner
                .http
                .post(format!("{}/api/logout", self.inner.base_url))
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .send()
                .await;
            if let Err(err) = result {
                debug!("logout request failed: {err}");
            }
        }
        self.clear_token();
    }

    /// GET an authenticated endpoint, refreshing once on a `401` response.
    ///
    /// # Errors
    ///
    /// Returns an error when no session is available or the request fails
    /// after the reactive refresh.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        self.request_json(Method::GET, path, None).await
    }

    /// Send an authenticated JSON request, refreshing once on a `401`.
    ///
    /// # Errors
    ///
    /// Returns an error when no session is available or the request fails
    /// after the reactive refresh.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let token = self
            .ensure_valid_token()
            .await
            .ok_or_else(|| anyhow!("no active session"))?;

        let response = self.send(method.clone(), path, body.clone(), &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return parse_json(response).await;
        }

        // Reactive fallback: the server disagreed about validity; refresh
        // once and retry with the new token.
        let token = self
            .refresh()
            .await
            .ok_or_else(|| anyhow!("session expired"))?;
        let response = self.send(method, path, body, &token).await?;
        parse_json(response).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: &str,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{path}", self.inner.base_url);
        let mut request = self
            .inner
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}"));
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.context("request failed")
    }

    async fn request_refresh(&self) -> Result<RefreshResponse> {
        let response = self
            .inner
            .http
            .post(format!("{}/api/refresh-token", self.inner.base_url))
            .send()
            .await
            .context("refresh request failed")?
            .error_for_status()
            .context("refresh rejected by server")?;
        response.json().await.context("invalid refresh response")
    }

    fn adopt_auth_response(&self, auth: &AuthResponse) {
        let normalized = normalize_token(&auth.token);
        // Login responses carry no lifetime; derive it from the token itself.
        let expires_in = decode_expiry(&normalized)
            .map_or(DEFAULT_EXPIRES_IN_SECONDS, |exp| exp - now_unix_seconds());
        self.set_token(&normalized, expires_in);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TokenState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

async fn parse_json(response: reqwest::Response) -> Result<Value> {
    let response = response
        .error_for_status()
        .context("request rejected by server")?;
    response.json().await.context("invalid JSON response")
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_task
            .take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::token::{sign_hs256, TokenClaims};
    use axum::{extract::State, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;
    use uuid::Uuid;

    const TEST_SECRET: &[u8] = b"client-test-secret";

    fn make_token(expires_in: i64) -> String {
        let now = now_unix_seconds();
        let claims = TokenClaims {
            user_id: Uuid::nil().to_string(),
            iat: now,
            exp: now + expires_in,
        };
        sign_hs256(TEST_SECRET, &claims).unwrap()
    }

    #[derive(Clone)]
    struct MockState {
        refresh_calls: Arc<AtomicUsize>,
        fail: bool,
    }

    async fn mock_refresh(State(state): State<MockState>) -> axum::response::Response {
        use axum::response::IntoResponse;
        state.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if state.fail {
            return (StatusCode::UNAUTHORIZED, "Invalid refresh token").into_response();
        }
        Json(serde_json::json!({
            "token": make_token(900),
            "expiresIn": 900,
        }))
        .into_response()
    }

    async fn spawn_mock(fail: bool) -> (String, Arc<AtomicUsize>) {
        let refresh_calls = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            refresh_calls: refresh_calls.clone(),
            fail,
        };
        let app = Router::new()
            .route("/api/refresh-token", post(mock_refresh))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), refresh_calls)
    }

    #[tokio::test]
    async fn set_token_round_trip_normalizes_prefix() {
        let manager = SessionManager::new("http://127.0.0.1:1").unwrap();
        manager.set_token("Bearer abc.def.ghi", 900);
        assert_eq!(manager.token().as_deref(), Some("abc.def.ghi"));

        manager.clear_token();
        assert_eq!(manager.token(), None);
    }

    #[tokio::test]
    async fn ensure_valid_token_keeps_fresh_token() {
        let manager = SessionManager::new("http://127.0.0.1:1").unwrap();
        let fresh = make_token(900);
        manager.restore_token(&fresh);

        // No server needed: a fresh token is returned as-is.
        assert_eq!(manager.ensure_valid_token().await.as_deref(), Some(fresh.as_str()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_token_triggers_refresh_cycle() {
        let (base_url, refresh_calls) = spawn_mock(false).await;
        let manager = SessionManager::new(base_url).unwrap();
        let stale = make_token(20);
        manager.restore_token(&stale);

        let refreshed = manager.ensure_valid_token().await.unwrap();
        assert_ne!(refreshed, stale);
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_refreshes_coalesce_to_one_request() {
        let (base_url, refresh_calls) = spawn_mock(false).await;
        let manager = SessionManager::new(base_url).unwrap();
        manager.restore_token(&make_token(-10));

        let (first, second) = tokio::join!(
            manager.ensure_valid_token(),
            manager.ensure_valid_token()
        );

        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_refresh_logs_out() {
        let (base_url, refresh_calls) = spawn_mock(true).await;
        let manager = SessionManager::new(base_url).unwrap();
        manager.restore_token(&make_token(-10));

        assert_eq!(manager.ensure_valid_token().await, None);
        assert_eq!(manager.token(), None);
        assert_eq!(refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn requests_without_session_fail_fast() {
        let manager = SessionManager::new("http://127.0.0.1:1").unwrap();
        let result = manager.get_json("/api/products").await;
        assert!(result.is_err());
    }
}
