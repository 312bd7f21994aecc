//! API error taxonomy.
//!
//! Authentication failures stay generic so callers cannot tell which check
//! failed; the one intentional exception is `EmailNotVerified`, which carries
//! a machine-readable code so clients can route to the verification screen.
//! Unexpected failures collapse to a generic 500 with detail kept server-side.

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("An account with this email already exists")]
    DuplicateAccount,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account has been deactivated")]
    AccountDeactivated,
    #[error("Email address has not been verified")]
    EmailNotVerified,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,
    #[error("Invalid or expired session")]
    InvalidToken,
    #[error("Account not found or already verified")]
    NotFoundOrAlreadyVerified,
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

/// Wire shape for every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl AuthError {
    /// Convenience constructor for a single-field validation failure.
    #[must_use]
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), message.to_string());
        Self::Validation(fields)
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidOrExpiredToken | Self::InvalidOrExpiredOtp => {
                StatusCode::BAD_REQUEST
            }
            Self::DuplicateAccount => StatusCode::CONFLICT,
            Self::InvalidCredentials
            | Self::AccountDeactivated
            | Self::EmailNotVerified
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::NotFoundOrAlreadyVerified => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::DuplicateAccount => "DUPLICATE_ACCOUNT",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            Self::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            Self::InvalidOrExpiredOtp => "INVALID_OR_EXPIRED_OTP",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::NotFoundOrAlreadyVerified => "NOT_FOUND_OR_ALREADY_VERIFIED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref err) = self {
            // Full chain stays server-side; the caller only sees the generic kind.
            error!("internal error: {err:#}");
        }
        let fields = match &self {
            Self::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
            fields,
        };
        (self.status(), Json(body)).into_response()
    }
}
