//! Storage seams for accounts, sessions and reset tokens.
//!
//! The backing store is an external collaborator: the rest of the crate only
//! talks to the [`SessionStore`] and [`AccountStore`] traits. Expected
//! branches (wrong password, unknown token, locked account) travel in `Ok`
//! payloads as outcome enums; an `Err` from any method always means the store
//! itself failed (unreachable, timed out) and is surfaced upstream as an
//! infrastructure error, never as an authentication verdict.
//!
//! Both traits assume their mutating operations are atomic at the store:
//! [`SessionStore::validate_and_refresh`] checks validity and pushes the
//! sliding expiry in one step, and [`AccountStore::register_failed_login`]
//! is a single increment-and-compare so concurrent failures never under-count.

pub mod memory;
pub mod postgres;
pub mod token;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Closed role catalog. An account holds exactly one role at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::User => "League member",
            Self::Admin => "Administrator",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Disabled,
}

impl AccountStatus {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "active" => Some(Self::Active),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Account row as the credential manager sees it.
///
/// A temporary lockout is not a status of its own: it is `locked_until` in
/// the future, so it can never go stale. The store evaluates that with its
/// own clock; `locked_until_unix` is present only while the lock is still
/// active, so callers never compare it against process time.
#[derive(Clone, Debug)]
pub struct AccountRecord {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub failed_logins: i32,
    pub locked_until_unix: Option<i64>,
}

/// Outcome of account creation.
#[derive(Debug)]
pub enum CreateAccountOutcome {
    Created(Uuid),
    EmailTaken,
}

/// Append-only record of one authentication attempt.
///
/// `account_id` is `None` when the email did not match any account; those
/// attempts are recorded too, so the audit trail does not reveal which
/// emails exist.
#[derive(Clone, Debug)]
pub struct LoginAttempt {
    pub account_id: Option<Uuid>,
    pub email: String,
    pub success: bool,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Failed-login counter state after an atomic increment. As with
/// [`AccountRecord`], `locked_until_unix` is only present while the lock is
/// active on the store's clock.
#[derive(Clone, Copy, Debug)]
pub struct LockoutState {
    pub failed_logins: i32,
    pub locked_until_unix: Option<i64>,
}

/// A freshly created session. The raw token is only handed to the caller;
/// the store keeps its hash.
#[derive(Clone, Debug)]
pub struct NewSession {
    pub token: String,
    pub expires_at_unix: i64,
}

/// Identity resolved from a valid session token.
#[derive(Clone, Debug)]
pub struct SessionIdentity {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
    pub expires_at_unix: i64,
}

/// A freshly issued password-reset token. As with sessions, the store keeps
/// only the hash; the raw token goes into the reset email.
#[derive(Clone, Debug)]
pub struct ResetIssued {
    pub token: String,
    pub expires_at_unix: i64,
}

/// Outcome of redeeming a reset token.
#[derive(Debug, PartialEq, Eq)]
pub enum RedeemTokenOutcome {
    /// Password rotated, lockout cleared, all sessions revoked.
    Completed { account_id: Uuid },
    /// Unknown or already consumed token. Consumed tokens are reported
    /// invalid without ever looking at their expiry.
    TokenInvalid,
    TokenExpired,
}

/// Session operations. All four are atomic at the store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session with a sliding window of `ttl_seconds`.
    async fn create_session(&self, account_id: Uuid, ttl_seconds: i64) -> Result<NewSession>;

    /// Validate a session by token hash and, if valid, push its expiry
    /// forward by `ttl_seconds` in the same operation. Returns `Ok(None)`
    /// for unknown, revoked or expired sessions.
    async fn validate_and_refresh(
        &self,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<Option<SessionIdentity>>;

    /// Revoke one session. Idempotent.
    async fn revoke_session(&self, token_hash: &[u8]) -> Result<()>;

    /// Revoke every session owned by the account. Returns how many were
    /// revoked.
    async fn revoke_all_sessions(&self, account_id: Uuid) -> Result<u64>;
}

/// Account, lockout and reset-token operations.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account. Elapsed locks are already stripped from the
    /// returned record; a present `locked_until_unix` means locked now.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>>;

    async fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<CreateAccountOutcome>;

    /// Append one login attempt to the audit log.
    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()>;

    /// Atomically increment the failed-login counter; when the new count
    /// reaches `threshold`, set `locked_until` to now + `lockout_seconds`
    /// in the same operation.
    async fn register_failed_login(
        &self,
        account_id: Uuid,
        threshold: i32,
        lockout_seconds: i64,
    ) -> Result<LockoutState>;

    /// Reset the failed-login counter and clear any lock.
    async fn clear_login_failures(&self, account_id: Uuid) -> Result<()>;

    /// Issue a reset token for the account behind `email`, if one exists,
    /// and queue the reset email in the same transaction. `Ok(None)` when
    /// the email is unknown; callers must not let that difference reach the
    /// response.
    async fn create_reset_token(
        &self,
        email: &str,
        ttl_seconds: i64,
    ) -> Result<Option<ResetIssued>>;

    /// Redeem a reset token: consume it, set the new password hash, clear
    /// lockout state and revoke all sessions for the account as one
    /// transaction-like unit.
    async fn redeem_reset_token(
        &self,
        token_hash: &[u8],
        new_password_hash: &str,
    ) -> Result<RedeemTokenOutcome>;

    /// Account directory for the admin surface, ordered by email.
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>>;

    /// Assign a role. Returns false when the account does not exist.
    async fn assign_role(&self, account_id: Uuid, role: Role) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::{AccountStatus, RedeemTokenOutcome, Role};
    use uuid::Uuid;

    #[test]
    fn role_codes_round_trip() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
        assert_eq!(Role::from_code("commissioner"), None);
    }

    #[test]
    fn account_status_codes_round_trip() {
        for status in [AccountStatus::Active, AccountStatus::Disabled] {
            assert_eq!(AccountStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(AccountStatus::from_code("locked"), None);
    }

    #[test]
    fn redeem_outcome_distinguishes_invalid_from_expired() {
        assert_ne!(RedeemTokenOutcome::TokenInvalid, RedeemTokenOutcome::TokenExpired);
        let completed = RedeemTokenOutcome::Completed {
            account_id: Uuid::nil(),
        };
        assert_ne!(completed, RedeemTokenOutcome::TokenInvalid);
    }
}
