//! Request/response types for the identity endpoints.
//!
//! Wire field names are camelCase to match the public API contract.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::storage::AccountRecord;
use crate::tokens::{Role, TokenPair};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
}

/// Public view of an account; never exposes hashes or secrets.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
}

impl From<&AccountRecord> for AccountView {
    fn from(record: &AccountRecord) -> Self {
        Self {
            id: record.id.to_string(),
            email: record.email.clone(),
            role: record.role,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            is_verified: record.is_verified,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairBody {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&TokenPair> for TokenPairBody {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access.clone(),
            refresh_token: pair.refresh.clone(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: AccountView,
    pub tokens: TokenPairBody,
    pub redirect_to: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshResponse {
    pub tokens: TokenPairBody,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailResponse {
    pub verified: bool,
    pub redirect_to: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpResponse {
    pub verified: bool,
    pub user: AccountView,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Generic acknowledgement used where the response must not reveal state.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyResetOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResetOtpResponse {
    pub reset_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub user: AccountView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use chrono::Utc;
    use uuid::Uuid;

    fn record() -> AccountRecord {
        AccountRecord {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::Mentor,
            first_name: "Alice".to_string(),
            last_name: "Lee".to_string(),
            is_verified: false,
            is_active: false,
            password_hash: "$argon2id$...".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn register_request_uses_camel_case_names() -> Result<()> {
        let decoded: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "alice@example.com",
            "password": "s3cret-pw",
            "role": "student",
            "firstName": "Alice",
            "lastName": "Lee",
        }))?;
        assert_eq!(decoded.first_name, "Alice");
        assert_eq!(decoded.last_name, "Lee");
        Ok(())
    }

    #[test]
    fn account_view_never_carries_the_hash() -> Result<()> {
        let view = AccountView::from(&record());
        let value = serde_json::to_value(&view)?;
        let object = value.as_object().context("expected object")?;
        assert!(!object.contains_key("passwordHash"));
        assert_eq!(value["isVerified"], serde_json::json!(false));
        assert_eq!(value["role"], serde_json::json!("mentor"));
        Ok(())
    }

    #[test]
    fn login_response_shape() -> Result<()> {
        let response = LoginResponse {
            user: AccountView::from(&record()),
            tokens: TokenPairBody {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
            },
            redirect_to: "/dashboard".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(value["tokens"]["accessToken"], serde_json::json!("a"));
        assert_eq!(value["tokens"]["refreshToken"], serde_json::json!("r"));
        assert_eq!(value["redirectTo"], serde_json::json!("/dashboard"));
        Ok(())
    }

    #[test]
    fn reset_token_field_is_camel_case() -> Result<()> {
        let value = serde_json::to_value(VerifyResetOtpResponse {
            reset_token: "opaque".to_string(),
        })?;
        assert_eq!(value["resetToken"], serde_json::json!("opaque"));
        Ok(())
    }
}
