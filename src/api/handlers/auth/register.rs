use crate::{
    api::handlers::auth::{
        error::{bounded, FailureBody},
        password::{hash_password, validate_complexity, violations_message},
        state::AuthState,
        utils::{normalize_email, valid_email},
    },
    store::{AccountStore, CreateAccountOutcome, Role},
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Register {
    email: String,
    display_name: String,
    password: String,
    confirm_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub success: bool,
    pub account_id: Uuid,
}

#[utoipa::path(
    post,
    path= "/v1/auth/register",
    request_body = Register,
    responses (
        (status = 201, description = "Account created", body = [RegisterResponse], content_type = "application/json"),
        (status = 400, description = "Invalid email, display name or password", body = [FailureBody]),
        (status = 409, description = "An account with that email already exists", body = [FailureBody]),
    ),
    tag= "auth"
)]
// axum handler for registration
#[instrument(skip(auth_state, accounts, payload))]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    accounts: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<Register>>,
) -> Response {
    let Some(Json(register)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Missing payload")),
        )
            .into_response();
    };

    let email = normalize_email(&register.email);
    if !valid_email(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Invalid email")),
        )
            .into_response();
    }

    let display_name = register.display_name.trim();
    if display_name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Display name must not be empty")),
        )
            .into_response();
    }

    if register.password != register.confirm_password {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Passwords do not match")),
        )
            .into_response();
    }

    // All complexity violations are reported at once.
    let violations = validate_complexity(&register.password);
    if !violations.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new(violations_message(&violations))),
        )
            .into_response();
    }

    let password_hash = match hash_password(&register.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Error hashing password: {err:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureBody::new("Error creating account")),
            )
                .into_response();
        }
    };

    // Self-service registration always lands on the member role.
    match bounded(
        auth_state.config().store_timeout_ms(),
        "creating account",
        accounts.create_account(&email, display_name, &password_hash, Role::User),
    )
    .await
    {
        Ok(CreateAccountOutcome::Created(account_id)) => {
            info!(%account_id, "Account created");

            (
                StatusCode::CREATED,
                Json(RegisterResponse {
                    success: true,
                    account_id,
                }),
            )
                .into_response()
        }
        Ok(CreateAccountOutcome::EmailTaken) => (
            StatusCode::CONFLICT,
            Json(FailureBody::new("An account with that email already exists")),
        )
            .into_response(),
        Err(gate_err) => gate_err.into_response(),
    }
}
