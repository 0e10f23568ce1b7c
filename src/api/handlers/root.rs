use axum::response::IntoResponse;

// axum handler for the root path, a public liveness probe target
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
