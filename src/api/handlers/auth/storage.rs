//! Credential store adapter.
//!
//! Every state transition is a single conditional `UPDATE ... WHERE
//! <expected state> ... RETURNING` statement. Two requests racing on the same
//! secret can both read "valid", but only one update matches at write time;
//! the loser observes zero rows and reports invalid-or-expired. Expiry
//! comparisons are strict: a secret presented exactly at its expiry instant
//! is already expired.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;
use crate::tokens::Role;

/// Account identity record, minus secret fields.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(AccountRecord),
    DuplicateEmail,
}

/// Fields persisted at registration. The verification secret is written in
/// the same statement as the account row.
pub(super) struct NewAccount {
    pub(super) email: String,
    pub(super) password_hash: String,
    pub(super) role: Role,
    pub(super) first_name: String,
    pub(super) last_name: String,
    pub(super) verification_token_hash: Vec<u8>,
    pub(super) verification_expires_at: DateTime<Utc>,
}

fn account_from_row(row: &PgRow) -> Result<AccountRecord> {
    let role: String = row.get("role");
    let role = role
        .parse::<Role>()
        .map_err(|err| anyhow!("corrupt account row: {err}"))?;
    Ok(AccountRecord {
        id: row.get("id"),
        email: row.get("email"),
        role,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_verified: row.get("is_verified"),
        is_active: row.get("is_active"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}

pub(super) async fn insert_account(pool: &PgPool, new: &NewAccount) -> Result<SignupOutcome> {
    let query = "
        INSERT INTO accounts
            (email, password_hash, role, first_name, last_name,
             verification_token_hash, verification_expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, email, role, first_name, last_name, is_verified, is_active,
                  password_hash, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.verification_token_hash)
        .bind(new.verification_expires_at)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(account_from_row(&row)?)),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::DuplicateEmail),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

pub(super) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<AccountRecord>> {
    let query = "SELECT id, email, role, first_name, last_name, is_verified, is_active, \
                 password_hash, created_at FROM accounts WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by email")?;
    row.as_ref().map(account_from_row).transpose()
}

pub(crate) async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<AccountRecord>> {
    let query = "SELECT id, email, role, first_name, last_name, is_verified, is_active, \
                 password_hash, created_at FROM accounts WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;
    row.as_ref().map(account_from_row).transpose()
}

/// Record a successful login. Best-effort from the caller's point of view.
pub(super) async fn record_login(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "UPDATE accounts SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record login")?;
    Ok(())
}

/// Consume an unexpired verification token and activate the account in one
/// statement. A second call with the same token matches nothing.
pub(super) async fn consume_verification_token(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<AccountRecord>> {
    let query = "
        UPDATE accounts
        SET is_verified = TRUE,
            is_active = TRUE,
            verification_token_hash = NULL,
            verification_expires_at = NULL,
            updated_at = NOW()
        WHERE verification_token_hash = $1
          AND verification_expires_at > NOW()
          AND is_verified = FALSE
        RETURNING id, email, role, first_name, last_name, is_verified, is_active,
                  password_hash, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume verification token")?;
    row.as_ref().map(account_from_row).transpose()
}

/// Consume an unexpired signup OTP for a still-inactive account.
pub(super) async fn consume_signup_otp(
    pool: &PgPool,
    email: &str,
    otp: &str,
) -> Result<Option<AccountRecord>> {
    let query = "
        UPDATE accounts
        SET is_verified = TRUE,
            is_active = TRUE,
            signup_otp = NULL,
            signup_otp_expires_at = NULL,
            updated_at = NOW()
        WHERE email = $1
          AND signup_otp = $2
          AND signup_otp_expires_at > NOW()
          AND is_active = FALSE
        RETURNING id, email, role, first_name, last_name, is_verified, is_active,
                  password_hash, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(otp)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume signup otp")?;
    row.as_ref().map(account_from_row).transpose()
}

/// Install a fresh signup OTP on a not-yet-verified account, overwriting any
/// previous code. `None` when the account is missing or already verified.
pub(super) async fn issue_signup_otp(
    pool: &PgPool,
    email: &str,
    otp: &str,
    expires_at: DateTime<Utc>,
) -> Result<Option<AccountRecord>> {
    let query = "
        UPDATE accounts
        SET signup_otp = $2,
            signup_otp_expires_at = $3,
            updated_at = NOW()
        WHERE email = $1
          AND is_verified = FALSE
          AND is_active = FALSE
        RETURNING id, email, role, first_name, last_name, is_verified, is_active,
                  password_hash, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(otp)
        .bind(expires_at)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to issue signup otp")?;
    row.as_ref().map(account_from_row).transpose()
}

/// Install a fresh reset OTP on a verified, active account. Any prior reset
/// OTP or reset token is invalidated in the same statement.
pub(super) async fn issue_reset_otp(
    pool: &PgPool,
    email: &str,
    otp: &str,
    expires_at: DateTime<Utc>,
) -> Result<Option<AccountRecord>> {
    let query = "
        UPDATE accounts
        SET reset_otp = $2,
            reset_otp_expires_at = $3,
            reset_token_hash = NULL,
            reset_token_expires_at = NULL,
            updated_at = NOW()
        WHERE email = $1
          AND is_verified = TRUE
          AND is_active = TRUE
        RETURNING id, email, role, first_name, last_name, is_verified, is_active,
                  password_hash, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(otp)
        .bind(expires_at)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to issue reset otp")?;
    row.as_ref().map(account_from_row).transpose()
}

/// Exchange a matching, unexpired reset OTP for a reset token. Exactly one of
/// two concurrent calls can win: the OTP is cleared by the same statement
/// that installs the token.
pub(super) async fn confirm_reset_otp(
    pool: &PgPool,
    email: &str,
    otp: &str,
    reset_token_hash: &[u8],
    expires_at: DateTime<Utc>,
) -> Result<bool> {
    let query = "
        UPDATE accounts
        SET reset_otp = NULL,
            reset_otp_expires_at = NULL,
            reset_token_hash = $3,
            reset_token_expires_at = $4,
            updated_at = NOW()
        WHERE email = $1
          AND reset_otp = $2
          AND reset_otp_expires_at > NOW()
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(otp)
        .bind(reset_token_hash)
        .bind(expires_at)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to confirm reset otp")?;
    Ok(row.is_some())
}

/// Consume an unexpired reset token and replace the password hash.
pub(super) async fn consume_reset_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<Option<AccountRecord>> {
    let query = "
        UPDATE accounts
        SET password_hash = $2,
            reset_token_hash = NULL,
            reset_token_expires_at = NULL,
            updated_at = NOW()
        WHERE reset_token_hash = $1
          AND reset_token_expires_at > NOW()
        RETURNING id, email, role, first_name, last_name, is_verified, is_active,
                  password_hash, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(new_password_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume reset token")?;
    row.as_ref().map(account_from_row).transpose()
}
