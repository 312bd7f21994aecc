//! Small helpers shared by the auth handlers.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use regex::Regex;
use sha2::{Digest, Sha256};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Password policy shared by registration and reset. Returns the rejection
/// message, if any.
pub(crate) fn password_rejection(password: &str) -> Option<&'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some("Must be at least 8 characters");
    }
    None
}

/// Shape check for user-typed one-time codes; anything else is reported
/// exactly like a wrong code.
pub(super) fn plausible_otp(otp: &str) -> bool {
    otp.len() == crate::otp::NUMERIC_CODE_LENGTH && otp.chars().all(|c| c.is_ascii_digit())
}

/// Hash a long-lived secret so raw values never touch the database. Lookups
/// bind the hash, which keeps the match-then-set statements exact-match.
pub(crate) fn hash_secret(value: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().to_vec()
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Bearer token from the Authorization header, if present and non-empty.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Named cookie from the Cookie header.
pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}
