//! # Mentorium Identity Service
//!
//! `mentorium` owns the identity and session lifecycle of the Mentorium
//! mentorship marketplace: account creation, email/OTP verification,
//! credential login with a dual-token stateless session, silent refresh,
//! OTP-mediated password recovery, and role-aware route gating.
//!
//! ## Sessions
//!
//! Logins issue an HMAC-signed access/refresh JWT pair delivered as
//! `HttpOnly`, `SameSite=Strict` cookies. The server keeps no session table:
//! token validity is a pure function of signature and expiry, and the single
//! stateful check happens on refresh, where a deactivated account stops
//! minting new pairs.
//!
//! ## One-time secrets
//!
//! Verification tokens, signup/reset OTPs, and reset tokens are scoped to
//! one account and one purpose, carry strict expiries, and are consumed by
//! single conditional updates so racing submissions settle with exactly one
//! winner. Long-lived opaque secrets are stored hashed; only the raw value
//! is ever emailed.

pub mod api;
pub mod cli;
pub mod client;
pub mod otp;
pub mod password;
pub mod tokens;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
