//! Admin surface: account directory and role management.
//!
//! The gate has already enforced the administrator role before these run;
//! the handlers only do the work.

use crate::{
    api::handlers::auth::{error::bounded, AuthState, FailureBody},
    store::{AccountStore, Role},
};
use axum::{
    extract::{Extension, Path},
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
pub struct AccountSummary {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub status: String,
    /// Present while the account is temporarily locked out.
    pub locked_until_unix: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AssignRole {
    role: String,
}

#[utoipa::path(
    get,
    path= "/v1/admin/accounts",
    responses (
        (status = 200, description = "Account directory, ordered by email", body = [AccountSummary], content_type = "application/json"),
        (status = 403, description = "Requires administrator role", body = [FailureBody]),
    ),
    tag= "admin"
)]
// axum handler for the account directory
#[instrument(skip(auth_state, accounts))]
pub async fn list_accounts(
    auth_state: Extension<Arc<AuthState>>,
    accounts: Extension<Arc<dyn AccountStore>>,
) -> Response {
    match bounded(
        auth_state.config().store_timeout_ms(),
        "listing accounts",
        accounts.list_accounts(),
    )
    .await
    {
        Ok(records) => {
            let summaries: Vec<AccountSummary> = records
                .into_iter()
                .map(|record| AccountSummary {
                    account_id: record.id,
                    email: record.email,
                    display_name: record.display_name,
                    role: record.role.code().to_string(),
                    status: record.status.code().to_string(),
                    locked_until_unix: record.locked_until_unix,
                })
                .collect();

            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(gate_err) => gate_err.into_response(),
    }
}

#[utoipa::path(
    put,
    path= "/v1/admin/accounts/{id}/role",
    request_body = AssignRole,
    params(
        ("id" = Uuid, Path, description = "Account id"),
    ),
    responses (
        (status = 204, description = "Role assigned"),
        (status = 400, description = "Unknown role code", body = [FailureBody]),
        (status = 403, description = "Requires administrator role", body = [FailureBody]),
        (status = 404, description = "No such account", body = [FailureBody]),
    ),
    tag= "admin"
)]
// axum handler for role assignment
#[instrument(skip(auth_state, accounts, payload))]
pub async fn assign_role(
    auth_state: Extension<Arc<AuthState>>,
    accounts: Extension<Arc<dyn AccountStore>>,
    Path(account_id): Path<Uuid>,
    payload: Option<Json<AssignRole>>,
) -> Response {
    let Some(Json(assign)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Missing payload")),
        )
            .into_response();
    };

    // Role codes are a closed catalog; anything else is a client error.
    let Some(role) = Role::from_code(&assign.role) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(FailureBody::new("Unknown role code")),
        )
            .into_response();
    };

    match bounded(
        auth_state.config().store_timeout_ms(),
        "assigning role",
        accounts.assign_role(account_id, role),
    )
    .await
    {
        Ok(true) => {
            info!(%account_id, role = role.code(), "Role assigned");

            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(FailureBody::new("No such account")),
        )
            .into_response(),
        Err(gate_err) => gate_err.into_response(),
    }
}
