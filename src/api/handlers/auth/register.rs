//! Registration and signup-OTP reissue endpoints.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

use super::state::AuthState;
use super::storage::{self, NewAccount, SignupOutcome};
use super::types::{AccountView, MessageResponse, RegisterRequest, ResendOtpRequest};
use super::utils::{hash_secret, normalize_email, password_rejection, valid_email};
use crate::api::email::OtpPurpose;
use crate::api::error::AuthError;
use crate::otp::{self, SecretPurpose};
use crate::tokens::Role;

/// Create an account in the unverified state and email a verification link.
///
/// A failed email send is reported in the logs but does not roll back the
/// account: the resend path still gets the user to a code.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification pending", body = AccountView),
        (status = 400, description = "Validation failed", body = crate::api::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::invalid_field("body", "Missing payload")),
    };

    let email = normalize_email(&request.email);
    let first_name = request.first_name.trim().to_string();
    let last_name = request.last_name.trim().to_string();

    let mut fields = BTreeMap::new();
    if !valid_email(&email) {
        fields.insert("email".to_string(), "Invalid email address".to_string());
    }
    if let Some(message) = password_rejection(&request.password) {
        fields.insert("password".to_string(), message.to_string());
    }
    let role = match request.role.trim().parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            fields.insert(
                "role".to_string(),
                "Must be one of mentor, student, admin".to_string(),
            );
            None
        }
    };
    if first_name.is_empty() {
        fields.insert("firstName".to_string(), "Must not be empty".to_string());
    }
    if last_name.is_empty() {
        fields.insert("lastName".to_string(), "Must not be empty".to_string());
    }
    if !fields.is_empty() {
        return Err(AuthError::Validation(fields));
    }
    let Some(role) = role else {
        return Err(AuthError::invalid_field(
            "role",
            "Must be one of mentor, student, admin",
        ));
    };

    let password_hash = auth_state.hasher().hash(&request.password)?;
    let secret = otp::issue(SecretPurpose::EmailVerification)?;

    let new_account = NewAccount {
        email,
        password_hash,
        role,
        first_name,
        last_name,
        verification_token_hash: hash_secret(&secret.value),
        verification_expires_at: secret.expires_at,
    };

    let account = match storage::insert_account(&pool, &new_account).await? {
        SignupOutcome::Created(account) => account,
        SignupOutcome::DuplicateEmail => return Err(AuthError::DuplicateAccount),
    };

    if let Err(err) =
        auth_state
            .email()
            .send_verification(&account.email, &secret.value, &account.first_name)
    {
        error!("Failed to send verification email: {err}");
    }

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

/// Issue a fresh signup OTP for a not-yet-verified account.
///
/// Unlike registration, an email failure here is fatal: the OTP flow has no
/// other way to deliver the code.
#[utoipa::path(
    post,
    path = "/v1/auth/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = MessageResponse),
        (status = 404, description = "No pending account for this email", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn resend_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendOtpRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::invalid_field("body", "Missing payload")),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::invalid_field("email", "Invalid email address"));
    }

    // A new code overwrites the previous one; at most one OTP is live.
    let secret = otp::issue(SecretPurpose::SignupOtp)?;
    let account = storage::issue_signup_otp(&pool, &email, &secret.value, secret.expires_at)
        .await?
        .ok_or(AuthError::NotFoundOrAlreadyVerified)?;

    auth_state.email().send_otp(
        &account.email,
        &secret.value,
        &account.first_name,
        OtpPurpose::SignupVerification,
    )?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "A verification code has been sent to your email".to_string(),
        }),
    ))
}
