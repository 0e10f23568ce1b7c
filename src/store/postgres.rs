//! Postgres-backed store.
//!
//! Every contract that must be atomic is a single statement or a single
//! transaction here: session validation+refresh is one `UPDATE ... RETURNING`
//! CTE, failed-login counting is one increment-and-compare `UPDATE`, and
//! reset-token redemption consumes the token, rotates the password and drops
//! all sessions inside one transaction.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::token::{generate_token, hash_token};
use super::{
    AccountRecord, AccountStatus, AccountStore, CreateAccountOutcome, LockoutState, LoginAttempt,
    NewSession, RedeemTokenOutcome, ResetIssued, Role, SessionIdentity, SessionStore,
};

pub struct PgStore {
    pool: PgPool,
    frontend_base_url: String,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool, frontend_base_url: String) -> Self {
        Self {
            pool,
            frontend_base_url,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<AccountRecord> {
    let role_code: String = row.get("role_code");
    let status_code: String = row.get("status");
    Ok(AccountRecord {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        role: Role::from_code(&role_code).ok_or_else(|| anyhow!("unknown role code: {role_code}"))?,
        status: AccountStatus::from_code(&status_code)
            .ok_or_else(|| anyhow!("unknown account status: {status_code}"))?,
        failed_logins: row.get("failed_logins"),
        locked_until_unix: row.get("locked_until_unix"),
    })
}

/// Reset link included in the outbound email payload.
fn build_reset_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/reset-password#token={token}")
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, account_id: Uuid, ttl_seconds: i64) -> Result<NewSession> {
        // Generate a random token, store only its hash, and return the raw
        // value for the bearer credential.
        let query = r"
            INSERT INTO sessions (account_id, token_hash, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
            RETURNING EXTRACT(EPOCH FROM expires_at)::BIGINT AS expires_at_unix
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        for _ in 0..3 {
            let token = generate_token()?;
            let token_hash = hash_token(&token);
            let result = sqlx::query(query)
                .bind(account_id)
                .bind(token_hash)
                .bind(ttl_seconds)
                .fetch_one(&self.pool)
                .instrument(span.clone())
                .await;

            match result {
                Ok(row) => {
                    return Ok(NewSession {
                        token,
                        expires_at_unix: row.get("expires_at_unix"),
                    });
                }
                Err(err) if is_unique_violation(&err) => {}
                Err(err) => return Err(err).context("failed to insert session"),
            }
        }

        Err(anyhow!("failed to generate unique session token"))
    }

    async fn validate_and_refresh(
        &self,
        token_hash: &[u8],
        ttl_seconds: i64,
    ) -> Result<Option<SessionIdentity>> {
        // Validity check and sliding-expiry push in one statement, so two
        // concurrent requests on the same session both observe a consistent
        // refresh.
        let query = r"
            WITH refreshed AS (
                UPDATE sessions
                SET expires_at = NOW() + ($2 * INTERVAL '1 second'),
                    last_activity_at = NOW()
                WHERE token_hash = $1
                  AND valid
                  AND expires_at > NOW()
                RETURNING account_id, expires_at
            )
            SELECT refreshed.account_id,
                   accounts.email,
                   accounts.role_code,
                   EXTRACT(EPOCH FROM refreshed.expires_at)::BIGINT AS expires_at_unix
            FROM refreshed
            JOIN accounts ON accounts.id = refreshed.account_id
            WHERE accounts.status = 'active'
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(ttl_seconds)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to validate session")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role_code: String = row.get("role_code");
        Ok(Some(SessionIdentity {
            account_id: row.get("account_id"),
            email: row.get("email"),
            role: Role::from_code(&role_code)
                .ok_or_else(|| anyhow!("unknown role code: {role_code}"))?,
            expires_at_unix: row.get("expires_at_unix"),
        }))
    }

    async fn revoke_session(&self, token_hash: &[u8]) -> Result<()> {
        // Logout is idempotent; it's fine if no rows match.
        let query = "UPDATE sessions SET valid = FALSE WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to revoke session")?;
        Ok(())
    }

    async fn revoke_all_sessions(&self, account_id: Uuid) -> Result<u64> {
        let query = "UPDATE sessions SET valid = FALSE WHERE account_id = $1 AND valid";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(account_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to revoke account sessions")?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        // Lock liveness is decided here, on the database clock, so the
        // caller never compares it against app time.
        let query = r"
            SELECT id, email, display_name, password_hash, role_code,
                   status::text AS status, failed_logins,
                   CASE WHEN locked_until > NOW()
                        THEN EXTRACT(EPOCH FROM locked_until)::BIGINT
                   END AS locked_until_unix
            FROM accounts
            WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account")?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<CreateAccountOutcome> {
        let query = r"
            INSERT INTO accounts (email, display_name, password_hash, role_code)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(display_name)
            .bind(password_hash)
            .bind(role.code())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateAccountOutcome::Created(row.get("id"))),
            Err(err) if is_unique_violation(&err) => Ok(CreateAccountOutcome::EmailTaken),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn record_login_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        let query = r"
            INSERT INTO login_attempts (account_id, email, success, source_ip, user_agent)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(attempt.account_id)
            .bind(&attempt.email)
            .bind(attempt.success)
            .bind(&attempt.source_ip)
            .bind(&attempt.user_agent)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to record login attempt")?;
        Ok(())
    }

    async fn register_failed_login(
        &self,
        account_id: Uuid,
        threshold: i32,
        lockout_seconds: i64,
    ) -> Result<LockoutState> {
        // Increment-and-compare in one statement; concurrent failures on the
        // same account cannot lose updates.
        let query = r"
            UPDATE accounts
            SET failed_logins = failed_logins + 1,
                locked_until = CASE
                    WHEN failed_logins + 1 >= $2
                        THEN NOW() + ($3 * INTERVAL '1 second')
                    ELSE locked_until
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING failed_logins,
                      CASE WHEN locked_until > NOW()
                           THEN EXTRACT(EPOCH FROM locked_until)::BIGINT
                      END AS locked_until_unix
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(account_id)
            .bind(threshold)
            .bind(lockout_seconds)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to register failed login")?;

        Ok(LockoutState {
            failed_logins: row.get("failed_logins"),
            locked_until_unix: row.get("locked_until_unix"),
        })
    }

    async fn clear_login_failures(&self, account_id: Uuid) -> Result<()> {
        let query = r"
            UPDATE accounts
            SET failed_logins = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to clear login failures")?;
        Ok(())
    }

    async fn create_reset_token(
        &self,
        email: &str,
        ttl_seconds: i64,
    ) -> Result<Option<ResetIssued>> {
        // Token and outbox row are committed together so a reset email can
        // never reference a token that was not stored.
        let mut tx = self.pool.begin().await.context("begin reset transaction")?;

        let query = "SELECT id FROM accounts WHERE email = $1 AND status = 'active'";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&mut *tx)
            .instrument(span)
            .await
            .context("failed to lookup account for reset")?;

        let Some(row) = row else {
            tx.commit().await.context("commit reset noop")?;
            return Ok(None);
        };
        let account_id: Uuid = row.get("id");

        let token = generate_token()?;
        let token_hash = hash_token(&token);

        let query = r"
            INSERT INTO password_reset_tokens (account_id, token_hash, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
            RETURNING EXTRACT(EPOCH FROM expires_at)::BIGINT AS expires_at_unix
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(account_id)
            .bind(token_hash)
            .bind(ttl_seconds)
            .fetch_one(&mut *tx)
            .instrument(span)
            .await
            .context("failed to insert reset token")?;
        let expires_at_unix: i64 = row.get("expires_at_unix");

        let reset_url = build_reset_url(&self.frontend_base_url, &token);
        let payload = serde_json::to_string(&json!({
            "email": email,
            "reset_url": reset_url,
        }))
        .context("failed to serialize reset email payload")?;

        let query = r"
            INSERT INTO email_outbox (to_email, template, payload_json)
            VALUES ($1, $2, $3::jsonb)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(email)
            .bind("password_reset")
            .bind(payload)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to insert reset email outbox row")?;

        tx.commit().await.context("commit reset transaction")?;

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
        // Consume, rotate and revoke as one unit: a crash between the
        // password change and session revocation must never leave old
        // sessions valid against the new password.
        let mut tx = self.pool.begin().await.context("begin redeem transaction")?;

        let query = r"
            UPDATE password_reset_tokens
            SET consumed_at = NOW()
            WHERE token_hash = $1
              AND consumed_at IS NULL
            RETURNING account_id, (expires_at > NOW()) AS live
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&mut *tx)
            .instrument(span)
            .await
            .context("failed to consume reset token")?;

        // Consumed and unknown tokens are both invalid; expiry is only
        // checked on a token that was still open.
        let Some(row) = row else {
            tx.rollback().await.context("rollback redeem")?;
            return Ok(RedeemTokenOutcome::TokenInvalid);
        };
        let live: bool = row.get("live");
        if !live {
            tx.rollback().await.context("rollback expired redeem")?;
            return Ok(RedeemTokenOutcome::TokenExpired);
        }
        let account_id: Uuid = row.get("account_id");

        let query = r"
            UPDATE accounts
            SET password_hash = $2,
                failed_logins = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .bind(new_password_hash)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to rotate password")?;

        let query = "UPDATE sessions SET valid = FALSE WHERE account_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to revoke sessions on reset")?;

        tx.commit().await.context("commit redeem transaction")?;

        Ok(RedeemTokenOutcome::Completed { account_id })
    }

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let query = r"
            SELECT id, email, display_name, password_hash, role_code,
                   status::text AS status, failed_logins,
                   CASE WHEN locked_until > NOW()
                        THEN EXTRACT(EPOCH FROM locked_until)::BIGINT
                   END AS locked_until_unix
            FROM accounts
            ORDER BY email
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list accounts")?;

        rows.iter().map(row_to_account).collect()
    }

    async fn assign_role(&self, account_id: Uuid, role: Role) -> Result<bool> {
        let query = r"
            UPDATE accounts
            SET role_code = $2,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(account_id)
            .bind(role.code())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to assign role")?;
        Ok(result.rows_affected() > 0)
    }
}
