use crate::api::handlers::auth::Principal;
use axum::{extract::Extension, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Me {
    pub account_id: Uuid,
    pub email: String,
    pub role: String,
}

#[utoipa::path(
    get,
    path= "/v1/me",
    responses (
        (status = 200, description = "Identity of the caller", body = [Me], content_type = "application/json"),
        (status = 401, description = "Authentication token required or invalid"),
    ),
    tag= "me"
)]
// axum handler echoing the authenticated identity
pub async fn me(principal: Extension<Principal>) -> impl IntoResponse {
    Json(Me {
        account_id: principal.account_id,
        email: principal.email.clone(),
        role: principal.role.code().to_string(),
    })
}
