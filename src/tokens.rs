//! Stateless session tokens.
//!
//! A login issues a pair of HMAC-signed JWTs: a short-lived access token that
//! authenticates individual requests and a long-lived refresh token that can
//! only mint new pairs. The server keeps no session table; validity is a pure
//! function of signature and expiry. Access and refresh tokens are signed with
//! distinct secrets so one can never stand in for the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Account role carried in token claims and route decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    Student,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mentor => "mentor",
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mentor" => Ok(Self::Mentor),
            "student" => Ok(Self::Student),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a token asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Claim set shared by both tokens; the pair differs only in expiry and
/// signing secret.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Freshly signed access/refresh pair. Never persisted server-side.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Verification failure. Deliberately opaque: expired, malformed, and
/// tampered tokens are indistinguishable to the caller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid or expired token")]
pub struct TokenError;

/// Signing secrets and lifetimes for the token pair.
pub struct TokenConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }
}

/// Issues and verifies signed token pairs. Pure computation, no I/O.
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        let access = config.access_secret.expose_secret().as_bytes();
        let refresh = config.refresh_secret.expose_secret().as_bytes();
        Self {
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            access_ttl_seconds: config.access_ttl_seconds,
            refresh_ttl_seconds: config.refresh_ttl_seconds,
        }
    }

    /// Sign a fresh access/refresh pair for the identity. `iat` is always the
    /// server clock.
    ///
    /// # Errors
    /// Returns an error only when JWT encoding itself fails.
    pub fn issue(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        let access = self.sign(
            identity,
            now.timestamp(),
            (now + Duration::seconds(self.access_ttl_seconds)).timestamp(),
            &self.access_encoding,
        )?;
        let refresh = self.sign(
            identity,
            now.timestamp(),
            (now + Duration::seconds(self.refresh_ttl_seconds)).timestamp(),
            &self.refresh_encoding,
        )?;
        Ok(TokenPair { access, refresh })
    }

    /// Verify an access token and return the identity it asserts.
    ///
    /// # Errors
    /// Fails with the single opaque [`TokenError`] on any signature,
    /// format, or expiry problem.
    pub fn verify_access(&self, token: &str) -> Result<Identity, TokenError> {
        Self::verify(token, &self.access_decoding)
    }

    /// Verify a refresh token against the refresh-signing secret.
    ///
    /// # Errors
    /// Fails with the single opaque [`TokenError`] on any signature,
    /// format, or expiry problem.
    pub fn verify_refresh(&self, token: &str) -> Result<Identity, TokenError> {
        Self::verify(token, &self.refresh_decoding)
    }

    #[must_use]
    pub const fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub const fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    fn sign(
        &self,
        identity: &Identity,
        iat: i64,
        exp: i64,
        key: &EncodingKey,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: identity.account_id,
            email: identity.email.clone(),
            role: identity.role,
            iat,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, key).map_err(|_| TokenError)
    }

    fn verify(token: &str, key: &DecodingKey) -> Result<Identity, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is an exclusive boundary; no clock leeway.
        validation.leeway = 0;
        let data = decode::<Claims>(token, key, &validation).map_err(|_| TokenError)?;
        Ok(Identity {
            account_id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig::new(
            SecretString::from("access-secret-for-tests"),
            SecretString::from("refresh-secret-for-tests"),
        )
    }

    fn identity() -> Identity {
        Identity {
            account_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::Mentor,
        }
    }

    #[test]
    fn issue_then_verify_round_trips() -> Result<(), TokenError> {
        let service = TokenService::new(&config());
        let identity = identity();
        let pair = service.issue(&identity)?;

        assert_eq!(service.verify_access(&pair.access)?, identity);
        assert_eq!(service.verify_refresh(&pair.refresh)?, identity);
        Ok(())
    }

    #[test]
    fn access_token_is_not_a_refresh_token() -> Result<(), TokenError> {
        let service = TokenService::new(&config());
        let pair = service.issue(&identity())?;

        assert_eq!(service.verify_refresh(&pair.access), Err(TokenError));
        assert_eq!(service.verify_access(&pair.refresh), Err(TokenError));
        Ok(())
    }

    #[test]
    fn expired_token_fails_verification() -> Result<(), TokenError> {
        let config = config()
            .with_access_ttl_seconds(-60)
            .with_refresh_ttl_seconds(-60);
        let service = TokenService::new(&config);
        let pair = service.issue(&identity())?;

        assert_eq!(service.verify_access(&pair.access), Err(TokenError));
        assert_eq!(service.verify_refresh(&pair.refresh), Err(TokenError));
        Ok(())
    }

    #[test]
    fn tampered_token_fails_with_same_error() -> Result<(), TokenError> {
        let service = TokenService::new(&config());
        let pair = service.issue(&identity())?;

        let mut tampered = pair.access.clone();
        tampered.pop();
        tampered.push('x');
        assert_eq!(service.verify_access(&tampered), Err(TokenError));
        assert_eq!(service.verify_access("not-a-jwt"), Err(TokenError));
        Ok(())
    }

    #[test]
    fn other_secret_fails_verification() -> Result<(), TokenError> {
        let service = TokenService::new(&config());
        let other = TokenService::new(&TokenConfig::new(
            SecretString::from("different-access"),
            SecretString::from("different-refresh"),
        ));
        let pair = service.issue(&identity())?;

        assert_eq!(other.verify_access(&pair.access), Err(TokenError));
        Ok(())
    }

    #[test]
    fn role_parses_and_displays() {
        assert_eq!("mentor".parse::<Role>(), Ok(Role::Mentor));
        assert_eq!("student".parse::<Role>(), Ok(Role::Student));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(Role::Student.to_string(), "student");
    }

    #[test]
    fn default_ttls_match_recommendations() {
        let service = TokenService::new(&config());
        assert_eq!(service.access_ttl_seconds(), 15 * 60);
        assert_eq!(service.refresh_ttl_seconds(), 7 * 24 * 60 * 60);
    }
}
