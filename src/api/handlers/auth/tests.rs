//! Gate behavior over a real router.

use super::{authentication_gate, AuthConfig, AuthState, Principal};
use crate::store::{
    memory::MemoryStore, AccountStatus, NewSession, Role, SessionIdentity, SessionStore,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::Extension,
    http::{Request, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Counts store calls so tests can assert public requests never reach it.
struct CountingStore {
    inner: Arc<MemoryStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn create_session(&self, account_id: Uuid, ttl_seconds: i64) -> Result<NewSession> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_session(account_id, ttl_seconds).await
    }

    async fn validate_and_refresh(
        &self,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<Option<SessionIdentity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.validate_and_refresh(token_hash, ttl_seconds).await
    }

    async fn revoke_session(&self, token_hash: &[u8]) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.revoke_session(token_hash).await
    }

    async fn revoke_all_sessions(&self, account_id: Uuid) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.revoke_all_sessions(account_id).await
    }
}

/// Store whose every call fails, standing in for an unreachable backend.
struct BrokenStore;

#[async_trait]
impl SessionStore for BrokenStore {
    async fn create_session(&self, _account_id: Uuid, _ttl_seconds: i64) -> Result<NewSession> {
        bail!("connection refused")
    }

    async fn validate_and_refresh(
        &self,
        _token_hash: &[u8],
        _ttl_seconds: i64,
    ) -> Result<Option<SessionIdentity>> {
        bail!("connection refused")
    }

    async fn revoke_session(&self, _token_hash: &[u8]) -> Result<()> {
        bail!("connection refused")
    }

    async fn revoke_all_sessions(&self, _account_id: Uuid) -> Result<u64> {
        bail!("connection refused")
    }
}

/// Store that answers validation but never completes a revocation, standing
/// in for a backend that accepted the connection and then hung.
struct StalledRevocations {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl SessionStore for StalledRevocations {
    async fn create_session(&self, account_id: Uuid, ttl_seconds: i64) -> Result<NewSession> {
        self.inner.create_session(account_id, ttl_seconds).await
    }

    async fn validate_and_refresh(
        &self,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<Option<SessionIdentity>> {
        self.inner.validate_and_refresh(token_hash, ttl_seconds).await
    }

    async fn revoke_session(&self, _token_hash: &[u8]) -> Result<()> {
        std::future::pending().await
    }

    async fn revoke_all_sessions(&self, _account_id: Uuid) -> Result<u64> {
        std::future::pending().await
    }
}

fn auth_state() -> Arc<AuthState> {
    let config = AuthConfig::new("https://league.example.com".to_string());
    Arc::new(AuthState::new(config).expect("route policy should compile"))
}

fn gated_router(state: Arc<AuthState>, sessions: Arc<dyn SessionStore>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/v1/me",
            get(|principal: Extension<Principal>| async move { principal.email.clone() }),
        )
        .route("/v1/admin/accounts", get(|| async { "accounts" }))
        .layer(middleware::from_fn(authentication_gate))
        .layer(Extension(state))
        .layer(Extension(sessions))
}

async fn seeded_session(store: &MemoryStore) -> (Uuid, String) {
    let account_id = store.seed_account(
        "alice@example.com",
        "Alice",
        "$argon2id$placeholder",
        Role::User,
        AccountStatus::Active,
    );
    let session = store
        .create_session(account_id, 60)
        .await
        .expect("session should be created");
    (account_id, session.token)
}

fn request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request should build")
}

#[tokio::test]
async fn public_route_passes_without_touching_the_store() {
    let memory = Arc::new(MemoryStore::new());
    let counting = Arc::new(CountingStore::new(memory));
    let sessions: Arc<dyn SessionStore> = counting.clone();
    let router = gated_router(auth_state(), sessions);

    let response = router
        .oneshot(request("/health", None))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let memory = Arc::new(MemoryStore::new());
    let router = gated_router(auth_state(), memory);

    let response = router
        .oneshot(request("/v1/me", None))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_credential_is_rejected_before_the_store() {
    let memory = Arc::new(MemoryStore::new());
    let counting = Arc::new(CountingStore::new(memory));
    let sessions: Arc<dyn SessionStore> = counting.clone();
    let router = gated_router(auth_state(), sessions);

    let response = router
        .oneshot(request("/v1/me", Some("not-a-session-token")))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn valid_session_attaches_the_principal() {
    let memory = Arc::new(MemoryStore::new());
    let (_, token) = seeded_session(&memory).await;
    let router = gated_router(auth_state(), memory);

    let response = router
        .oneshot(request("/v1/me", Some(&token)))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    assert_eq!(&body[..], b"alice@example.com");
}

#[tokio::test]
async fn expired_session_is_unauthorized() {
    let memory = Arc::new(MemoryStore::new());
    let (_, token) = seeded_session(&memory).await;
    memory.advance(31 * 60);
    let router = gated_router(auth_state(), memory);

    let response = router
        .oneshot(request("/v1/me", Some(&token)))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn member_role_cannot_reach_admin_routes() {
    let memory = Arc::new(MemoryStore::new());
    let (_, token) = seeded_session(&memory).await;
    let router = gated_router(auth_state(), memory);

    let response = router
        .oneshot(request("/v1/admin/accounts", Some(&token)))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_role_reaches_admin_routes() {
    let memory = Arc::new(MemoryStore::new());
    let account_id = memory.seed_account(
        "commish@example.com",
        "Commish",
        "$argon2id$placeholder",
        Role::Admin,
        AccountStatus::Active,
    );
    let session = memory
        .create_session(account_id, 60)
        .await
        .expect("session should be created");
    let router = gated_router(auth_state(), memory);

    let response = router
        .oneshot(request("/v1/admin/accounts", Some(&session.token)))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn hung_store_call_surfaces_as_gateway_timeout() {
    let memory = Arc::new(MemoryStore::new());
    let (_, token) = seeded_session(&memory).await;
    let config =
        AuthConfig::new("https://league.example.com".to_string()).with_store_timeout_ms(50);
    let state = Arc::new(AuthState::new(config).expect("route policy should compile"));
    let sessions: Arc<dyn SessionStore> = Arc::new(StalledRevocations { inner: memory });

    let router = Router::new()
        .route("/v1/auth/logout", post(super::session::logout))
        .layer(middleware::from_fn(authentication_gate))
        .layer(Extension(state))
        .layer(Extension(sessions));

    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/logout")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request should build");
    let response = router
        .oneshot(request)
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn store_failure_is_service_unavailable_not_unauthorized() {
    let router = gated_router(auth_state(), Arc::new(BrokenStore));
    // Syntactically valid token; the store itself is down.
    let token = crate::store::token::generate_token().expect("token should generate");

    let response = router
        .oneshot(request("/v1/me", Some(&token)))
        .await
        .expect("request should complete");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
