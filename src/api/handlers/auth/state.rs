//! Auth configuration and shared state.

use anyhow::Result;

use super::routes::RoutePolicy;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_LOCKOUT_THRESHOLD: i32 = 5;
const DEFAULT_LOCKOUT_SECONDS: i64 = 15 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 45 * 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 3000;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    lockout_threshold: i32,
    lockout_seconds: i64,
    reset_token_ttl_seconds: i64,
    store_timeout_ms: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: i32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: i64) -> Self {
        self.lockout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_store_timeout_ms(mut self, millis: u64) -> Self {
        self.store_timeout_ms = millis;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn lockout_threshold(&self) -> i32 {
        self.lockout_threshold
    }

    pub(crate) fn lockout_seconds(&self) -> i64 {
        self.lockout_seconds
    }

    pub(crate) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(crate) fn store_timeout_ms(&self) -> u64 {
        self.store_timeout_ms
    }
}

/// Immutable per-process auth state: the configuration and the compiled
/// route policy, built once at startup and shared by reference.
pub struct AuthState {
    config: AuthConfig,
    routes: RoutePolicy,
}

impl AuthState {
    /// # Errors
    /// Returns an error if the route policy patterns fail to compile.
    pub fn new(config: AuthConfig) -> Result<Self> {
        Ok(Self {
            config,
            routes: RoutePolicy::new()?,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn routes(&self) -> &RoutePolicy {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, AuthState};

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://league.example.com".to_string());

        assert_eq!(config.frontend_base_url(), "https://league.example.com");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert_eq!(config.lockout_threshold(), super::DEFAULT_LOCKOUT_THRESHOLD);
        assert_eq!(config.lockout_seconds(), super::DEFAULT_LOCKOUT_SECONDS);
        assert_eq!(
            config.reset_token_ttl_seconds(),
            super::DEFAULT_RESET_TOKEN_TTL_SECONDS
        );
        assert_eq!(config.store_timeout_ms(), super::DEFAULT_STORE_TIMEOUT_MS);

        let config = config
            .with_session_ttl_seconds(60)
            .with_lockout_threshold(3)
            .with_lockout_seconds(120)
            .with_reset_token_ttl_seconds(300)
            .with_store_timeout_ms(500);

        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.lockout_threshold(), 3);
        assert_eq!(config.lockout_seconds(), 120);
        assert_eq!(config.reset_token_ttl_seconds(), 300);
        assert_eq!(config.store_timeout_ms(), 500);
    }

    #[test]
    fn auth_state_compiles_route_policy() {
        let config = AuthConfig::new("https://league.example.com".to_string());
        let state = AuthState::new(config).expect("route policy should compile");
        assert_eq!(
            state.config().frontend_base_url(),
            "https://league.example.com"
        );
    }
}
