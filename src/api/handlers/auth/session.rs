use crate::{
    api::handlers::auth::{
        error::{bounded, FailureBody},
        principal::Principal,
        state::AuthState,
    },
    store::SessionStore,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionInfo {
    pub success: bool,
    pub account_id: Uuid,
    pub email: String,
    pub role: String,
    /// Expiry after this request's sliding refresh.
    pub expires_at_unix: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutAllResponse {
    pub success: bool,
    pub revoked: u64,
}

#[utoipa::path(
    get,
    path= "/v1/auth/session",
    responses (
        (status = 200, description = "Current session identity", body = [SessionInfo], content_type = "application/json"),
        (status = 401, description = "Authentication token required or invalid", body = [FailureBody]),
    ),
    tag= "auth"
)]
// axum handler for session introspection
pub async fn session(principal: Extension<Principal>) -> impl IntoResponse {
    Json(SessionInfo {
        success: true,
        account_id: principal.account_id,
        email: principal.email.clone(),
        role: principal.role.code().to_string(),
        expires_at_unix: principal.expires_at_unix,
    })
}

#[utoipa::path(
    post,
    path= "/v1/auth/logout",
    responses (
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Authentication token required or invalid", body = [FailureBody]),
    ),
    tag= "auth"
)]
// axum handler for logout
#[instrument(skip(auth_state, sessions, principal))]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
    sessions: Extension<Arc<dyn SessionStore>>,
    principal: Extension<Principal>,
) -> Response {
    match bounded(
        auth_state.config().store_timeout_ms(),
        "revoking session",
        sessions.revoke_session(&principal.token_hash),
    )
    .await
    {
        Ok(()) => {
            info!(account_id = %principal.account_id, "Session revoked");

            StatusCode::NO_CONTENT.into_response()
        }
        Err(gate_err) => gate_err.into_response(),
    }
}

#[utoipa::path(
    post,
    path= "/v1/auth/logout-all",
    responses (
        (status = 200, description = "All sessions revoked", body = [LogoutAllResponse], content_type = "application/json"),
        (status = 401, description = "Authentication token required or invalid", body = [FailureBody]),
    ),
    tag= "auth"
)]
// axum handler for revoking every session of the caller
#[instrument(skip(auth_state, sessions, principal))]
pub async fn logout_all(
    auth_state: Extension<Arc<AuthState>>,
    sessions: Extension<Arc<dyn SessionStore>>,
    principal: Extension<Principal>,
) -> Response {
    match bounded(
        auth_state.config().store_timeout_ms(),
        "revoking sessions",
        sessions.revoke_all_sessions(principal.account_id),
    )
    .await
    {
        Ok(revoked) => {
            info!(account_id = %principal.account_id, revoked, "All sessions revoked");

            (
                StatusCode::OK,
                Json(LogoutAllResponse {
                    success: true,
                    revoked,
                }),
            )
                .into_response()
        }
        Err(gate_err) => gate_err.into_response(),
    }
}
