//! OpenAPI document and the Swagger UI mount.
//!
//! `/docs` and `/api-docs/openapi.json` are public read-only routes; the
//! route policy carves them out explicitly.

use crate::api::handlers::{admin, auth, health, me, seasons};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register::register,
        auth::login::login,
        auth::session::session,
        auth::session::logout,
        auth::session::logout_all,
        auth::reset::reset_request,
        auth::reset::reset_redeem,
        me::me,
        seasons::current_season,
        admin::list_accounts,
        admin::assign_role,
    ),
    components(schemas(
        health::Health,
        auth::register::Register,
        auth::register::RegisterResponse,
        auth::login::Login,
        auth::login::LoginResponse,
        auth::session::SessionInfo,
        auth::session::LogoutAllResponse,
        auth::reset::ResetRequest,
        auth::reset::ResetRequested,
        auth::reset::ResetRedeem,
        auth::FailureBody,
        me::Me,
        seasons::CurrentSeason,
        admin::AccountSummary,
        admin::AssignRole,
    )),
    tags(
        (name = "gridiron", description = "Fantasy football league API"),
        (name = "auth", description = "Registration, login, sessions and password reset"),
        (name = "admin", description = "Account directory and role management"),
    ),
    info(
        title = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        description = env!("CARGO_PKG_DESCRIPTION"),
        license(name = "BSD-3-Clause"),
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving `/docs` backed by `/api-docs/openapi.json`.
#[must_use]
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn openapi_covers_the_auth_surface() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/auth/register",
            "/v1/auth/login",
            "/v1/auth/session",
            "/v1/auth/logout",
            "/v1/auth/logout-all",
            "/v1/auth/reset/request",
            "/v1/auth/reset/redeem",
            "/v1/me",
            "/v1/seasons/current",
            "/v1/admin/accounts",
        ] {
            assert!(spec.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
