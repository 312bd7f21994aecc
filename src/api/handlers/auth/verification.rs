//! Email verification endpoints: link-token flow and signup-OTP flow.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::state::AuthState;
use super::storage;
use super::types::{
    AccountView, VerifyEmailRequest, VerifyEmailResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use super::utils::{hash_secret, normalize_email, plausible_otp, valid_email};
use crate::api::error::AuthError;

const POST_VERIFICATION_PATH: &str = "/login";

/// Consume the emailed verification token and activate the account.
///
/// Consumption and activation are one conditional update, so a second call
/// with the same token fails as invalid-or-expired.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 400, description = "Invalid or expired token", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::invalid_field("body", "Missing payload")),
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidOrExpiredToken);
    }

    let token_hash = hash_secret(token);
    let account = storage::consume_verification_token(&pool, &token_hash)
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    if let Err(err) =
        auth_state
            .email()
            .send_welcome(&account.email, &account.first_name, account.role)
    {
        error!("Failed to send welcome notification: {err}");
    }

    Ok((
        StatusCode::OK,
        Json(VerifyEmailResponse {
            verified: true,
            redirect_to: POST_VERIFICATION_PATH.to_string(),
        }),
    ))
}

/// Verify via the signup OTP. Only meaningful while the account is still
/// inactive, which in this flow means "not yet verified".
#[utoipa::path(
    post,
    path = "/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account verified", body = VerifyOtpResponse),
        (status = 400, description = "Invalid or expired OTP", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
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

    let account = storage::consume_signup_otp(&pool, &email, otp)
        .await?
        .ok_or(AuthError::InvalidOrExpiredOtp)?;

    if let Err(err) =
        auth_state
            .email()
            .send_welcome(&account.email, &account.first_name, account.role)
    {
        error!("Failed to send welcome notification: {err}");
    }

    Ok((
        StatusCode::OK,
        Json(VerifyOtpResponse {
            verified: true,
            user: AccountView::from(&account),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::state::test_support::auth_state;
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> anyhow::Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    #[test]
    fn otp_shape_check_accepts_six_digits_only() {
        assert!(plausible_otp("123456"));
        assert!(!plausible_otp("12345"));
        assert!(!plausible_otp("1234567"));
        assert!(!plausible_otp("12345a"));
        assert!(!plausible_otp(""));
    }

    #[tokio::test]
    async fn verify_email_missing_payload() -> anyhow::Result<()> {
        let response = verify_email(Extension(lazy_pool()?), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_empty_token() -> anyhow::Result<()> {
        let response = verify_email(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(VerifyEmailRequest {
                token: "  ".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_otp_rejects_malformed_code_like_a_wrong_one() -> anyhow::Result<()> {
        let result = verify_otp(
            Extension(lazy_pool()?),
            Extension(auth_state()),
            Some(Json(VerifyOtpRequest {
                email: "alice@example.com".to_string(),
                otp: "12-456".to_string(),
            })),
        )
        .await;
        assert!(matches!(result.err(), Some(AuthError::InvalidOrExpiredOtp)));
        Ok(())
    }
}
