//! One-time codes and opaque verification secrets.
//!
//! Every secret is scoped to one account and one purpose and paired with an
//! explicit expiry. Numeric codes are uniform OsRng digits for flows where
//! the user retypes the value; opaque tokens are 256-bit random strings for
//! flows where guessing must be infeasible.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore, rngs::OsRng};

pub const NUMERIC_CODE_LENGTH: usize = 6;
pub const OPAQUE_TOKEN_BYTES: usize = 32;

/// Which lifecycle flow a secret belongs to. At most one secret is live per
/// purpose per account; issuing a new one overwrites the previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretPurpose {
    /// Emailed link token proving address ownership after registration.
    EmailVerification,
    /// Numeric code for the signup-OTP verification flow.
    SignupOtp,
    /// Numeric code confirming a password-reset request.
    ResetOtp,
    /// Opaque bearer token exchanged for a confirmed reset OTP.
    ResetToken,
}

impl SecretPurpose {
    #[must_use]
    pub const fn ttl_seconds(self) -> i64 {
        match self {
            Self::EmailVerification => 24 * 60 * 60,
            Self::SignupOtp | Self::ResetOtp => 10 * 60,
            Self::ResetToken => 60 * 60,
        }
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::SignupOtp | Self::ResetOtp)
    }
}

/// A freshly generated secret plus its expiry instant.
#[derive(Debug, Clone)]
pub struct IssuedSecret {
    pub purpose: SecretPurpose,
    /// Raw value sent to the user; long-lived tokens are stored hashed.
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Generate a secret for the given purpose with `expires_at = now + TTL`.
///
/// # Errors
/// Returns an error when the OS random source fails.
pub fn issue(purpose: SecretPurpose) -> Result<IssuedSecret> {
    let value = if purpose.is_numeric() {
        numeric_code(NUMERIC_CODE_LENGTH)
    } else {
        opaque_token(OPAQUE_TOKEN_BYTES)?
    };
    Ok(IssuedSecret {
        purpose,
        value,
        expires_at: Utc::now() + Duration::seconds(purpose.ttl_seconds()),
    })
}

/// Fixed-width numeric code with cryptographically-uniform digits.
#[must_use]
pub fn numeric_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// High-entropy opaque token, URL-safe encoded.
///
/// # Errors
/// Returns an error when the OS random source fails.
pub fn opaque_token(byte_length: usize) -> Result<String> {
    let mut bytes = vec![0u8; byte_length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate opaque token")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
