use crate::{
    api::handlers::auth::{
        credentials::{authenticate, AuthenticateOutcome, ClientInfo},
        error::{bounded, FailureBody},
        state::AuthState,
        utils::{extract_client_ip, extract_user_agent},
    },
    store::{AccountStore, SessionStore},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Login {
    email: String,
    password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    /// Opaque bearer token for subsequent requests.
    pub token: String,
    /// Initial expiry; every authenticated request slides it forward.
    pub expires_at_unix: i64,
}

#[utoipa::path(
    post,
    path= "/v1/auth/login",
    request_body = Login,
    responses (
        (status = 200, description = "Session issued", body = [LoginResponse], content_type = "application/json"),
        (status = 401, description = "Invalid email or password", body = [FailureBody]),
        (status = 403, description = "Account disabled", body = [FailureBody]),
        (status = 423, description = "Account temporarily locked", body = [FailureBody]),
    ),
    tag= "auth"
)]
// axum handler for login
#[instrument(skip(auth_state, accounts, sessions, headers, payload))]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    accounts: Extension<Arc<dyn AccountStore>>,
    sessions: Extension<Arc<dyn SessionStore>>,
    headers: HeaderMap,
    payload: Option<Json<Login>>,
) -> Response {
    let Some(Json(login)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Missing payload")),
        )
            .into_response();
    };

    let client = ClientInfo {
        source_ip: extract_client_ip(&headers),
        user_agent: extract_user_agent(&headers),
    };

    let timeout_ms = auth_state.config().store_timeout_ms();
    let outcome = match bounded(
        timeout_ms,
        "authenticating user",
        authenticate(
            accounts.0.as_ref(),
            auth_state.config(),
            &login.email,
            &login.password,
            &client,
        ),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(gate_err) => return gate_err.into_response(),
    };

    let account = match outcome {
        AuthenticateOutcome::Success(account) => account,
        // One message for both unknown email and wrong password.
        AuthenticateOutcome::InvalidCredentials => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(FailureBody::new("Invalid email or password")),
            )
                .into_response();
        }
        AuthenticateOutcome::Locked { .. } => {
            return (
                StatusCode::LOCKED,
                Json(FailureBody::new(
                    "Account temporarily locked, try again later",
                )),
            )
                .into_response();
        }
        AuthenticateOutcome::Disabled => {
            return (
                StatusCode::FORBIDDEN,
                Json(FailureBody::new("Account disabled")),
            )
                .into_response();
        }
    };

    match bounded(
        timeout_ms,
        "creating session",
        sessions.create_session(account.id, auth_state.config().session_ttl_seconds()),
    )
    .await
    {
        Ok(session) => {
            info!(account_id = %account.id, "Session created");

            let response = LoginResponse {
                success: true,
                token: session.token,
                expires_at_unix: session.expires_at_unix,
            };

            (StatusCode::OK, Json(response)).into_response()
        }
        Err(gate_err) => gate_err.into_response(),
    }
}
