use crate::{api, api::handlers::auth::AuthConfig, cli::actions::Action};
use anyhow::Result;

/// Handle the server action
/// # Errors
/// Returns an error if the server fails to start.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            frontend_base_url,
            session_ttl_seconds,
            lockout_threshold,
            lockout_window_seconds,
            reset_token_ttl_seconds,
            store_timeout_ms,
        } => {
            let auth_config = AuthConfig::new(frontend_base_url)
                .with_session_ttl_seconds(session_ttl_seconds)
                .with_lockout_threshold(lockout_threshold)
                .with_lockout_seconds(lockout_window_seconds)
                .with_reset_token_ttl_seconds(reset_token_ttl_seconds)
                .with_store_timeout_ms(store_timeout_ms);

            api::new(port, dsn, auth_config).await?;
        }
    }

    Ok(())
}
