//! OTP-mediated password recovery.
//!
//! Three steps: request an OTP, exchange the OTP for an opaque reset token,
//! spend the token on a password change. Each transition is one conditional
//! update; racing submissions settle at the store.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;

use super::state::AuthState;
use super::storage;
use super::types::{
    ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, VerifyResetOtpRequest,
    VerifyResetOtpResponse,
};
use super::utils::{hash_secret, normalize_email, password_rejection, plausible_otp, valid_email};
use crate::api::email::OtpPurpose;
use crate::api::error::AuthError;
use crate::otp::{self, SecretPurpose};

// The same body is returned whether or not the account exists.
const GENERIC_RESET_MESSAGE: &str =
    "If an account exists for this address, a reset code has been sent";

fn generic_response() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: GENERIC_RESET_MESSAGE.to_string(),
        }),
    )
}

/// Start a reset: install a 10-minute OTP and email it.
///
/// The response never reveals whether the account exists. An email-delivery
/// failure is the one surfaced error, because the flow is unusable without
/// the code.
#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Generic acknowledgement", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Ok(generic_response()),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Ok(generic_response());
    }

    let secret = otp::issue(SecretPurpose::ResetOtp)?;
    let account =
        match storage::issue_reset_otp(&pool, &email, &secret.value, secret.expires_at).await? {
            Some(account) => account,
            None => return Ok(generic_response()),
        };

    auth_state.email().send_otp(
        &account.email,
        &secret.value,
        &account.first_name,
        OtpPurpose::PasswordReset,
    )?;

    Ok(generic_response())
}

/// Exchange a matching reset OTP for a 1-hour opaque reset token.
///
/// Two simultaneous submissions of the same code produce exactly one token:
/// the conditional update clears the OTP as it installs the token.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-reset-otp",
    request_body = VerifyResetOtpRequest,
    responses(
        (status = 200, description = "Reset token issued", body = VerifyResetOtpResponse),
        (status = 400, description = "Invalid or expired OTP", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_reset_otp(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyResetOtpRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::invalid_field("body", "Missing payload")),
    };

    let email = normalize_email(&request.email);
    let otp = request.otp.trim();
    if !valid_email(&email) || !plausible_otp(otp) {
        return Err(AuthError::InvalidOrExpiredOtp);
    }

    let secret = otp::issue(SecretPurpose::ResetToken)?;
    let token_hash = hash_secret(&secret.value);
    let confirmed =
        storage::confirm_reset_otp(&pool, &email, otp, &token_hash, secret.expires_at).await?;
    if !confirmed {
        return Err(AuthError::InvalidOrExpiredOtp);
    }

    Ok((
        StatusCode::OK,
        Json(VerifyResetOtpResponse {
            reset_token: secret.value,
        }),
    ))
}

/// Spend the reset token on a password change.
#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::invalid_field("body", "Missing payload")),
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidOrExpiredToken);
    }
    if let Some(message) = password_rejection(&request.password) {
        return Err(AuthError::invalid_field("password", message));
    }

    let password_hash = auth_state.hasher().hash(&request.password)?;
    let token_hash = hash_secret(token);
    storage::consume_reset_token(&pool, &token_hash, &password_hash)
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password updated".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::state::test_support::auth_state;
    use super::*;
    use axum::body::to_bytes;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> anyhow::Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    #[tokio::test]
    async fn forgot_password_is_generic_for_malformed_email() -> anyhow::Result<()> {
        let response = forgot_password(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(ForgotPasswordRequest {
                email: "definitely-not-an-email".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body: MessageResponse = serde_json::from_slice(&bytes)?;
        assert_eq!(body.message, GENERIC_RESET_MESSAGE);
        Ok(())
    }

    #[tokio::test]
    async fn forgot_password_missing_payload_is_still_generic() -> anyhow::Result<()> {
        let response = forgot_password(Extension(lazy_pool()?), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn verify_reset_otp_rejects_malformed_code() -> anyhow::Result<()> {
        let result = verify_reset_otp(
            Extension(lazy_pool()?),
            Some(Json(VerifyResetOtpRequest {
                email: "alice@example.com".to_string(),
                otp: "abcdef".to_string(),
            })),
        )
        .await;
        assert!(matches!(result.err(), Some(AuthError::InvalidOrExpiredOtp)));
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_requires_token_and_strong_password() -> anyhow::Result<()> {
        let result = reset_password(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(ResetPasswordRequest {
                token: String::new(),
                password: "new-password".to_string(),
            })),
        )
        .await;
        assert!(matches!(
            result.err(),
            Some(AuthError::InvalidOrExpiredToken)
        ));

        let result = reset_password(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(ResetPasswordRequest {
                token: "some-token".to_string(),
                password: "short".to_string(),
            })),
        )
        .await;
        assert!(matches!(result.err(), Some(AuthError::Validation(_))));
        Ok(())
    }
}
