//! Credential verification and login lockout.
//!
//! Every attempt is appended to the login-attempt log, including attempts
//! for emails that match no account, so the audit trail and the error
//! surface cannot be used to enumerate registered emails. Failed-attempt
//! counting is delegated to the store's atomic increment so concurrent
//! failures never under-count toward the lockout threshold.

use anyhow::{Context, Result};
use std::sync::OnceLock;
use tracing::error;

use super::password::{hash_password, verify_password};
use super::state::AuthConfig;
use super::utils::normalize_email;
use crate::store::{AccountRecord, AccountStatus, AccountStore, LoginAttempt};

/// Caller context recorded in the login-attempt log.
#[derive(Clone, Debug, Default)]
pub struct ClientInfo {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Outcome of a login attempt. Locked and disabled are surfaced distinctly
/// to the login caller; the attempt log records them all the same way.
#[derive(Debug)]
pub enum AuthenticateOutcome {
    Success(AccountRecord),
    InvalidCredentials,
    Locked { until_unix: i64 },
    Disabled,
}

/// Hash verified on the unknown-email path, so a miss costs the same Argon2
/// work as a wrong password and response timing cannot separate the two.
fn phantom_hash() -> &'static str {
    static PHANTOM: OnceLock<String> = OnceLock::new();
    PHANTOM.get_or_init(|| hash_password("xQ7m2Rp9").unwrap_or_default())
}

/// Audit writes never block or fail the login flow.
async fn record_attempt(
    accounts: &dyn AccountStore,
    account_id: Option<uuid::Uuid>,
    email: &str,
    success: bool,
    client: &ClientInfo,
) {
    let attempt = LoginAttempt {
        account_id,
        email: email.to_string(),
        success,
        source_ip: client.source_ip.clone(),
        user_agent: client.user_agent.clone(),
    };
    if let Err(err) = accounts.record_login_attempt(&attempt).await {
        error!("Failed to record login attempt: {err:#}");
    }
}

/// Verify an email/password pair, maintaining the failed-login counter and
/// lockout window as side effects at the store.
pub async fn authenticate(
    accounts: &dyn AccountStore,
    config: &AuthConfig,
    email: &str,
    password: &str,
    client: &ClientInfo,
) -> Result<AuthenticateOutcome> {
    let email = normalize_email(email);

    let Some(account) = accounts
        .find_account_by_email(&email)
        .await
        .context("account lookup failed")?
    else {
        let _ = verify_password(password, phantom_hash());
        record_attempt(accounts, None, &email, false, client).await;
        return Ok(AuthenticateOutcome::InvalidCredentials);
    };

    if account.status == AccountStatus::Disabled {
        record_attempt(accounts, Some(account.id), &email, false, client).await;
        return Ok(AuthenticateOutcome::Disabled);
    }

    // The store reports the lock only while it is active on its own clock.
    if let Some(until_unix) = account.locked_until_unix {
        record_attempt(accounts, Some(account.id), &email, false, client).await;
        return Ok(AuthenticateOutcome::Locked { until_unix });
    }

    let password_ok = verify_password(password, &account.password_hash)?;

    if !password_ok {
        // The counter update is part of the lockout contract, so unlike the
        // attempt log a store failure here does propagate.
        let state = accounts
            .register_failed_login(
                account.id,
                config.lockout_threshold(),
                config.lockout_seconds(),
            )
            .await
            .context("failed-login registration failed")?;
        record_attempt(accounts, Some(account.id), &email, false, client).await;

        if let Some(until_unix) = state.locked_until_unix {
            return Ok(AuthenticateOutcome::Locked { until_unix });
        }
        return Ok(AuthenticateOutcome::InvalidCredentials);
    }

    // Success resets the counter, including after an elapsed lockout.
    if account.failed_logins > 0 || account.locked_until_unix.is_some() {
        accounts
            .clear_login_failures(account.id)
            .await
            .context("failed to clear login failures")?;
    }
    record_attempt(accounts, Some(account.id), &email, true, client).await;

    Ok(AuthenticateOutcome::Success(account))
}
