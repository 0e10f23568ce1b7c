//! Gate failure taxonomy and the structured failure body.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::{future::Future, time::Duration};
use tracing::{error, warn};
use utoipa::ToSchema;

/// Body returned for every identity/authorization failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct FailureBody {
    pub success: bool,
    pub message: String,
}

impl FailureBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Terminal outcomes the authentication gate can produce. Everything past
/// the gate is downstream business logic and is not translated here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateError {
    /// No bearer credential on a protected route.
    CredentialRequired,
    /// A credential was presented but is not a token this service issues.
    CredentialMalformed,
    /// The store does not recognize the session (revoked or expired).
    SessionInvalid,
    /// Valid identity, insufficient role.
    InsufficientRole,
    /// The session store is unreachable. Never downgraded to 401: a store
    /// outage must not log users out.
    StoreUnavailable,
    /// The session store call exceeded its deadline.
    StoreTimeout,
}

impl GateError {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::CredentialRequired | Self::CredentialMalformed | Self::SessionInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientRole => StatusCode::FORBIDDEN,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::StoreTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// The three 401 variants share one message so the response cannot be
    /// used to probe which check failed.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::CredentialRequired | Self::CredentialMalformed | Self::SessionInvalid => {
                "Authentication token required or invalid"
            }
            Self::InsufficientRole => "Requires administrator role",
            Self::StoreUnavailable | Self::StoreTimeout => {
                "Authentication service temporarily unavailable"
            }
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(FailureBody::new(self.message()))).into_response()
    }
}

/// Run a store call under a deadline. A hung backend surfaces as
/// [`GateError::StoreTimeout`] instead of stalling the request; a store
/// failure maps to [`GateError::StoreUnavailable`]. Expected outcomes stay
/// in the `Ok` payload.
pub(crate) async fn bounded<T>(
    timeout_ms: u64,
    operation: &str,
    call: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, GateError> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            error!("Error {operation}: {err:#}");
            Err(GateError::StoreUnavailable)
        }
        Err(_elapsed) => {
            warn!("Store call {operation} exceeded {timeout_ms}ms");
            Err(GateError::StoreTimeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FailureBody, GateError};
    use axum::http::StatusCode;

    #[test]
    fn unauthorized_variants_share_status_and_message() {
        for error in [
            GateError::CredentialRequired,
            GateError::CredentialMalformed,
            GateError::SessionInvalid,
        ] {
            assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(error.message(), "Authentication token required or invalid");
        }
    }

    #[test]
    fn role_and_infrastructure_mapping() {
        assert_eq!(GateError::InsufficientRole.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GateError::StoreUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(GateError::StoreTimeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn bounded_times_out_hung_store_calls() {
        let result = super::bounded(10, "hanging", std::future::pending::<anyhow::Result<()>>());
        assert_eq!(result.await.unwrap_err(), GateError::StoreTimeout);
    }

    #[tokio::test]
    async fn bounded_maps_errors_and_passes_values_through() {
        let failed = super::bounded::<()>(1000, "failing", async { anyhow::bail!("down") }).await;
        assert_eq!(failed.unwrap_err(), GateError::StoreUnavailable);

        let value = super::bounded(1000, "fine", async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[test]
    fn failure_body_serializes_success_flag() {
        let body = serde_json::to_value(FailureBody::new("nope")).expect("serialize");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "nope");
    }
}
