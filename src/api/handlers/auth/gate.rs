//! Authentication gate: the middleware every request passes through.
//!
//! Flow Overview:
//! 1) Classify the request from its path and method; public requests pass
//!    through untouched, without a store call.
//! 2) Require a well-formed bearer credential, failing closed with 401.
//! 3) Validate the session at the store, which pushes the sliding expiry in
//!    the same atomic operation. Store failures surface as 5xx, never 401.
//! 4) Enforce the classifier's role verdict and attach the [`Principal`] to
//!    the request for downstream handlers.
//!
//! The gate owns only identity/authorization outcomes. Whatever downstream
//! business logic raises after the principal is attached propagates past it
//! untouched.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::error::{bounded, GateError};
use super::principal::Principal;
use super::routes::Access;
use super::state::AuthState;
use super::utils::extract_bearer_token;
use crate::store::token::{hash_token, well_formed};
use crate::store::SessionStore;

pub async fn authentication_gate(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(sessions): Extension<Arc<dyn SessionStore>>,
    mut request: Request,
    next: Next,
) -> Response {
    let access = auth_state
        .routes()
        .classify(request.uri().path(), request.method());
    if access == Access::Public {
        return next.run(request).await;
    }

    let Some(token) = extract_bearer_token(request.headers()) else {
        return GateError::CredentialRequired.into_response();
    };
    if !well_formed(&token) {
        return GateError::CredentialMalformed.into_response();
    }
    let token_hash = hash_token(&token);

    let ttl_seconds = auth_state.config().session_ttl_seconds();
    let identity = match bounded(
        auth_state.config().store_timeout_ms(),
        "validating session",
        sessions.validate_and_refresh(&token_hash, ttl_seconds),
    )
    .await
    {
        Err(gate_err) => return gate_err.into_response(),
        Ok(None) => return GateError::SessionInvalid.into_response(),
        Ok(Some(identity)) => identity,
    };

    // Success signal for the audit/observability pipeline.
    debug!(account_id = %identity.account_id, "session validated");

    if access == Access::AdminOnly && identity.role != crate::store::Role::Admin {
        return GateError::InsufficientRole.into_response();
    }

    request.extensions_mut().insert(Principal {
        account_id: identity.account_id,
        email: identity.email,
        role: identity.role,
        expires_at_unix: identity.expires_at_unix,
        token_hash,
    });

    next.run(request).await
}
