//! In-memory store for tests and local development.
//!
//! Implements the same contracts as the Postgres backend with a `Mutex`
//! around a single state struct, so every operation is trivially atomic.
//! The clock can be advanced to exercise expiry and lockout windows without
//! sleeping.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use super::token::{generate_token, hash_token};
use super::{
    AccountRecord, AccountStatus, AccountStore, CreateAccountOutcome, LockoutState, LoginAttempt,
    NewSession, RedeemTokenOutcome, ResetIssued, Role, SessionIdentity, SessionStore,
};

#[derive(Clone, Debug)]
struct SessionEntry {
    account_id: Uuid,
    created_at_unix: i64,
    last_activity_at_unix: i64,
    expires_at_unix: i64,
    valid: bool,
}

#[derive(Clone, Debug)]
struct ResetEntry {
    account_id: Uuid,
    expires_at_unix: i64,
    consumed: bool,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, AccountRecord>,
    sessions: HashMap<Vec<u8>, SessionEntry>,
    reset_tokens: HashMap<Vec<u8>, ResetEntry>,
    attempts: Vec<LoginAttempt>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    clock_offset_seconds: AtomicI64,
}

/// Records leave the store with `locked_until_unix` present only while the
/// lock is active on the store clock.
fn strip_elapsed_lock(mut record: AccountRecord, now: i64) -> AccountRecord {
    record.locked_until_unix = record.locked_until_unix.filter(|until| *until > now);
    record
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift the store clock forward. Lets tests cross expiry and lockout
    /// boundaries without sleeping.
    pub fn advance(&self, seconds: i64) {
        self.clock_offset_seconds.fetch_add(seconds, Ordering::SeqCst);
    }

    fn now(&self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        wall + self.clock_offset_seconds.load(Ordering::SeqCst)
    }

    /// Seed an account directly, bypassing registration. Test setup helper.
    pub fn seed_account(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
        status: AccountStatus,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let record = AccountRecord {
            id,
            email: email.to_string(),
            display_name: display_name.to_string(),
            password_hash: password_hash.to_string(),
            role,
            status,
            failed_logins: 0,
            locked_until_unix: None,
        };
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.accounts.insert(id, record);
        id
    }

    /// Snapshot of the login-attempt log, oldest first.
    #[must_use]
    pub fn login_attempts(&self) -> Vec<LoginAttempt> {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.attempts.clone()
    }

    /// Number of currently valid, unexpired sessions for the account.
    #[must_use]
    pub fn live_session_count(&self, account_id: Uuid) -> usize {
        let now = self.now();
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .sessions
            .values()
            .filter(|entry| {
                entry.account_id == account_id && entry.valid && entry.expires_at_unix > now
            })
            .count()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, account_id: Uuid, ttl_seconds: i64) -> Result<NewSession> {
        let token = generate_token()?;
        let now = self.now();
        let expires_at_unix = now + ttl_seconds;
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.sessions.insert(
            hash_token(&token),
            SessionEntry {
                account_id,
                created_at_unix: now,
                last_activity_at_unix: now,
                expires_at_unix,
                valid: true,
            },
        );
        Ok(NewSession {
            token,
            expires_at_unix,
        })
    }

    async fn validate_and_refresh(
        &self,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<Option<SessionIdentity>> {
        let now = self.now();
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let Some(entry) = inner.sessions.get_mut(token_hash) else {
            return Ok(None);
        };
        if !entry.valid || entry.expires_at_unix <= now {
            return Ok(None);
        }
        entry.last_activity_at_unix = now;
        entry.expires_at_unix = now + ttl_seconds;
        let (account_id, expires_at_unix) = (entry.account_id, entry.expires_at_unix);
        let Some(account) = inner.accounts.get(&account_id) else {
            return Ok(None);
        };
        if account.status != AccountStatus::Active {
            return Ok(None);
        }
        Ok(Some(SessionIdentity {
            account_id,
            email: account.email.clone(),
            role: account.role,
            expires_at_unix,
        }))
    }

    async fn revoke_session(&self, token_hash: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if let Some(entry) = inner.sessions.get_mut(token_hash) {
            entry.valid = false;
        }
        Ok(())
    }

    async fn revoke_all_sessions(&self, account_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let mut revoked = 0;
        for entry in inner.sessions.values_mut() {
            if entry.account_id == account_id && entry.valid {
                entry.valid = false;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        let now = self.now();
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .accounts
            .values()
            .find(|record| record.email == email)
            .cloned()
            .map(|record| strip_elapsed_lock(record, now)))
    }

    async fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<CreateAccountOutcome> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if inner.accounts.values().any(|record| record.email == email) {
            return Ok(CreateAccountOutcome::EmailTaken);
        }
        let id = Uuid::new_v4();
        inner.accounts.insert(
            id,
            AccountRecord {
                id,
                email: email.to_string(),
                display_name: display_name.to_string(),
                password_hash: password_hash.to_string(),
                role,
                status: AccountStatus::Active,
                failed_logins: 0,
                locked_until_unix: None,
            },
        );
        Ok(CreateAccountOutcome::Created(id))
    }

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.attempts.push(attempt.clone());
        Ok(())
    }

    async fn register_failed_login(
        &self,
        account_id: Uuid,
        threshold: i32,
        lockout_seconds: i64,
    ) -> Result<LockoutState> {
        let now = self.now();
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let Some(account) = inner.accounts.get_mut(&account_id) else {
            return Ok(LockoutState {
                failed_logins: 0,
                locked_until_unix: None,
            });
        };
        account.failed_logins += 1;
        if account.failed_logins >= threshold {
            account.locked_until_unix = Some(now + lockout_seconds);
        }
        Ok(LockoutState {
            failed_logins: account.failed_logins,
            locked_until_unix: account.locked_until_unix.filter(|until| *until > now),
        })
    }

    async fn clear_login_failures(&self, account_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if let Some(account) = inner.accounts.get_mut(&account_id) {
            account.failed_logins = 0;
            account.locked_until_unix = None;
        }
        Ok(())
    }

    async fn create_reset_token(
        &self,
        email: &str,
        ttl_seconds: i64,
    ) -> Result<Option<ResetIssued>> {
        let now = self.now();
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let Some(account_id) = inner
            .accounts
            .values()
            .find(|record| record.email == email)
            .map(|record| record.id)
        else {
            return Ok(None);
        };
        let token = generate_token()?;
        let expires_at_unix = now + ttl_seconds;
        inner.reset_tokens.insert(
            hash_token(&token),
            ResetEntry {
                account_id,
                expires_at_unix,
                consumed: false,
            },
        );
        Ok(Some(ResetIssued {
            token,
            expires_at_unix,
        }))
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &[u8],
        new_password_hash: &str,
    ) -> Result<RedeemTokenOutcome> {
        let now = self.now();
        let mut inner = self.inner.lock().expect("store lock poisoned");
        // Consumed tokens are indistinguishable from unknown ones; expiry is
        // only checked on tokens that could still be consumed.
        let Some(entry) = inner.reset_tokens.get_mut(token_hash) else {
            return Ok(RedeemTokenOutcome::TokenInvalid);
        };
        if entry.consumed {
            return Ok(RedeemTokenOutcome::TokenInvalid);
        }
        if entry.expires_at_unix <= now {
            return Ok(RedeemTokenOutcome::TokenExpired);
        }
        entry.consumed = true;
        let account_id = entry.account_id;

        if let Some(account) = inner.accounts.get_mut(&account_id) {
            account.password_hash = new_password_hash.to_string();
            account.failed_logins = 0;
            account.locked_until_unix = None;
        }
        for session in inner.sessions.values_mut() {
            if session.account_id == account_id {
                session.valid = false;
            }
        }
        Ok(RedeemTokenOutcome::Completed { account_id })
    }

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let now = self.now();
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut accounts: Vec<AccountRecord> = inner
            .accounts
            .values()
            .cloned()
            .map(|record| strip_elapsed_lock(record, now))
            .collect();
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(accounts)
    }

    async fn assign_role(&self, account_id: Uuid, role: Role) -> Result<bool> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.accounts.get_mut(&account_id) {
            Some(account) => {
                account.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_account() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let id = store.seed_account(
            "alice@example.com",
            "Alice",
            "$argon2id$stub",
            Role::User,
            AccountStatus::Active,
        );
        (store, id)
    }

    #[tokio::test]
    async fn validate_and_refresh_is_idempotent_and_monotonic() -> Result<()> {
        let (store, account_id) = store_with_account();
        let session = store.create_session(account_id, 1800).await?;
        let hash = hash_token(&session.token);

        let first = store
            .validate_and_refresh(&hash, 1800)
            .await?
            .expect("session should be valid");
        store.advance(10);
        let second = store
            .validate_and_refresh(&hash, 1800)
            .await?
            .expect("session should still be valid");
        assert!(second.expires_at_unix >= first.expires_at_unix);
        Ok(())
    }

    #[tokio::test]
    async fn expired_sessions_are_invalid() -> Result<()> {
        let (store, account_id) = store_with_account();
        let session = store.create_session(account_id, 60).await?;
        let hash = hash_token(&session.token);

        store.advance(61);
        assert!(store.validate_and_refresh(&hash, 60).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn sliding_window_outlives_the_original_expiry() -> Result<()> {
        let (store, account_id) = store_with_account();
        let session = store.create_session(account_id, 60).await?;
        let hash = hash_token(&session.token);

        // Touch the session before each expiry; it stays alive well past the
        // initial window.
        for _ in 0..3 {
            store.advance(45);
            assert!(store.validate_and_refresh(&hash, 60).await?.is_some());
        }
        Ok(())
    }

    #[tokio::test]
    async fn revoke_all_invalidates_every_session() -> Result<()> {
        let (store, account_id) = store_with_account();
        let one = store.create_session(account_id, 1800).await?;
        let two = store.create_session(account_id, 1800).await?;
        assert_eq!(store.live_session_count(account_id), 2);

        let revoked = store.revoke_all_sessions(account_id).await?;
        assert_eq!(revoked, 2);
        for token in [one.token, two.token] {
            let hash = hash_token(&token);
            assert!(store.validate_and_refresh(&hash, 1800).await?.is_none());
        }
        Ok(())
    }

    #[tokio::test]
    async fn failed_login_threshold_sets_lock() -> Result<()> {
        let (store, account_id) = store_with_account();
        for attempt in 1..=4 {
            let state = store.register_failed_login(account_id, 5, 900).await?;
            assert_eq!(state.failed_logins, attempt);
            assert!(state.locked_until_unix.is_none());
        }
        let state = store.register_failed_login(account_id, 5, 900).await?;
        assert_eq!(state.failed_logins, 5);
        assert!(state.locked_until_unix.is_some());

        store.clear_login_failures(account_id).await?;
        let account = store
            .find_account_by_email("alice@example.com")
            .await?
            .expect("account should exist");
        assert_eq!(account.failed_logins, 0);
        assert!(account.locked_until_unix.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn elapsed_lock_is_not_reported() -> Result<()> {
        let (store, account_id) = store_with_account();
        for _ in 0..5 {
            store.register_failed_login(account_id, 5, 900).await?;
        }
        let account = store
            .find_account_by_email("alice@example.com")
            .await?
            .expect("account should exist");
        assert!(account.locked_until_unix.is_some());

        // Once the window elapses on the store clock the lock disappears
        // from returned records; the counter stays until a success clears it.
        store.advance(901);
        let account = store
            .find_account_by_email("alice@example.com")
            .await?
            .expect("account should exist");
        assert!(account.locked_until_unix.is_none());
        assert_eq!(account.failed_logins, 5);
        Ok(())
    }

    #[tokio::test]
    async fn reset_token_single_use() -> Result<()> {
        let (store, account_id) = store_with_account();
        let session = store.create_session(account_id, 1800).await?;
        let issued = store
            .create_reset_token("alice@example.com", 2700)
            .await?
            .expect("account exists");
        let token_hash = hash_token(&issued.token);

        let first = store.redeem_reset_token(&token_hash, "$argon2id$new").await?;
        assert_eq!(first, RedeemTokenOutcome::Completed { account_id });

        // The session issued before the reset is gone.
        let session_hash = hash_token(&session.token);
        assert!(store.validate_and_refresh(&session_hash, 1800).await?.is_none());

        // Second redemption reports invalid, not expired, even if time passes.
        store.advance(10_000);
        let second = store.redeem_reset_token(&token_hash, "$argon2id$again").await?;
        assert_eq!(second, RedeemTokenOutcome::TokenInvalid);
        Ok(())
    }

    #[tokio::test]
    async fn reset_token_expires() -> Result<()> {
        let (store, _) = store_with_account();
        let issued = store
            .create_reset_token("alice@example.com", 60)
            .await?
            .expect("account exists");
        store.advance(61);
        let outcome = store
            .redeem_reset_token(&hash_token(&issued.token), "$argon2id$new")
            .await?;
        assert_eq!(outcome, RedeemTokenOutcome::TokenExpired);
        Ok(())
    }

    #[tokio::test]
    async fn reset_request_for_unknown_email_is_a_noop() -> Result<()> {
        let (store, _) = store_with_account();
        assert!(store
            .create_reset_token("nobody@example.com", 2700)
            .await?
            .is_none());
        Ok(())
    }
}
