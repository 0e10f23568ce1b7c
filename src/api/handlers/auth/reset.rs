use crate::{
    api::handlers::auth::{
        error::{bounded, FailureBody},
        password::{hash_password, validate_complexity, violations_message},
        state::AuthState,
        utils::{normalize_email, valid_email},
    },
    store::{
        token::{hash_token, well_formed},
        AccountStore, RedeemTokenOutcome,
    },
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetRequest {
    email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetRequested {
    pub success: bool,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetRedeem {
    token: String,
    new_password: String,
    confirm_password: String,
}

const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a reset link has been sent";

#[utoipa::path(
    post,
    path= "/v1/auth/reset/request",
    request_body = ResetRequest,
    responses (
        (status = 202, description = "Reset requested; the response never reveals whether the email exists", body = [ResetRequested], content_type = "application/json"),
        (status = 400, description = "Invalid email", body = [FailureBody]),
    ),
    tag= "auth"
)]
// axum handler for requesting a password reset
#[instrument(skip(auth_state, accounts, payload))]
pub async fn reset_request(
    auth_state: Extension<Arc<AuthState>>,
    accounts: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<ResetRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Missing payload")),
        )
            .into_response();
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Invalid email")),
        )
            .into_response();
    }

    // Known and unknown emails get byte-identical responses.
    match bounded(
        auth_state.config().store_timeout_ms(),
        "issuing reset token",
        accounts.create_reset_token(&email, auth_state.config().reset_token_ttl_seconds()),
    )
    .await
    {
        Ok(Some(_issued)) => info!("Reset token issued"),
        Ok(None) => debug!("Reset requested for unknown email"),
        Err(gate_err) => return gate_err.into_response(),
    }

    (
        StatusCode::ACCEPTED,
        Json(ResetRequested {
            success: true,
            message: RESET_REQUESTED_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path= "/v1/auth/reset/redeem",
    request_body = ResetRedeem,
    responses (
        (status = 204, description = "Password rotated; every session for the account is revoked"),
        (status = 400, description = "Invalid, expired or already used token, or unacceptable password", body = [FailureBody]),
    ),
    tag= "auth"
)]
// axum handler for redeeming a password reset token
#[instrument(skip(auth_state, accounts, payload))]
pub async fn reset_redeem(
    auth_state: Extension<Arc<AuthState>>,
    accounts: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<ResetRedeem>>,
) -> Response {
    let Some(Json(redeem)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Missing payload")),
        )
            .into_response();
    };

    if redeem.new_password != redeem.confirm_password {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Passwords do not match")),
        )
            .into_response();
    }

    let violations = validate_complexity(&redeem.new_password);
    if !violations.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new(violations_message(&violations))),
        )
            .into_response();
    }

    // A token this service never issued fails without a store round trip.
    if !well_formed(&redeem.token) {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Reset token is invalid or already used")),
        )
            .into_response();
    }

    let new_password_hash = match hash_password(&redeem.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Error hashing password: {err:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureBody::new("Error resetting password")),
            )
                .into_response();
        }
    };

    let token_hash = hash_token(&redeem.token);
    let account_id = match bounded(
        auth_state.config().store_timeout_ms(),
        "redeeming reset token",
        accounts.redeem_reset_token(&token_hash, &new_password_hash),
    )
    .await
    {
        Ok(RedeemTokenOutcome::Completed { account_id }) => account_id,
        Ok(RedeemTokenOutcome::TokenInvalid) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(FailureBody::new("Reset token is invalid or already used")),
            )
                .into_response();
        }
        Ok(RedeemTokenOutcome::TokenExpired) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(FailureBody::new("Reset token has expired")),
            )
                .into_response();
        }
        Err(gate_err) => return gate_err.into_response(),
    };

    info!(%account_id, "Password reset completed");

    StatusCode::NO_CONTENT.into_response()
}
