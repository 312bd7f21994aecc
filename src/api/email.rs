//! Outbound email abstraction.
//!
//! The identity service never talks SMTP itself; it hands fully-formed
//! messages to an [`EmailSender`] and treats the result as final. There are
//! no internal retries: registration tolerates a failed verification email
//! (the resend path exists), while OTP issuance surfaces the failure because
//! the user has no other way to obtain the code.

use anyhow::Result;
use tracing::info;

use crate::tokens::Role;

/// Which flow an OTP email belongs to; senders pick wording from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    SignupVerification,
    PasswordReset,
}

impl OtpPurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignupVerification => "signup-verification",
            Self::PasswordReset => "password-reset",
        }
    }
}

/// Delivery abstraction for the identity flows. Fire-and-forget from the
/// caller's point of view; a returned error means the message was not
/// accepted for delivery.
pub trait EmailSender: Send + Sync {
    /// Send the registration verification link.
    ///
    /// # Errors
    /// Returns an error when the message cannot be handed off.
    fn send_verification(&self, email: &str, token: &str, name: &str) -> Result<()>;

    /// Send a 6-digit one-time code.
    ///
    /// # Errors
    /// Returns an error when the message cannot be handed off.
    fn send_otp(&self, email: &str, code: &str, name: &str, purpose: OtpPurpose) -> Result<()>;

    /// Send the post-verification welcome notification.
    ///
    /// # Errors
    /// Returns an error when the message cannot be handed off.
    fn send_welcome(&self, email: &str, name: &str, role: Role) -> Result<()>;
}

/// Local dev sender that logs instead of delivering real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send_verification(&self, email: &str, token: &str, name: &str) -> Result<()> {
        info!(
            to_email = %email,
            name = %name,
            token = %token,
            "verification email send stub"
        );
        Ok(())
    }

    fn send_otp(&self, email: &str, code: &str, name: &str, purpose: OtpPurpose) -> Result<()> {
        info!(
            to_email = %email,
            name = %name,
            code = %code,
            purpose = purpose.as_str(),
            "otp email send stub"
        );
        Ok(())
    }

    fn send_welcome(&self, email: &str, name: &str, role: Role) -> Result<()> {
        info!(
            to_email = %email,
            name = %name,
            role = %role,
            "welcome email send stub"
        );
        Ok(())
    }
}
