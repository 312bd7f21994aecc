//! Onboarding-state collaborator.
//!
//! Post-login routing needs to know how far a mentor got through onboarding.
//! That state belongs to the profile subsystem; this module only defines the
//! reader interface and the step-to-path mapping the session issuer consumes.

use anyhow::Result;
use uuid::Uuid;

/// Mentor onboarding steps, in completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Expertise,
    Availability,
    Rates,
}

impl OnboardingStep {
    /// Frontend route that collects this step.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Expertise => "/onboarding/expertise",
            Self::Availability => "/onboarding/availability",
            Self::Rates => "/onboarding/rates",
        }
    }
}

/// Reads the furthest-incomplete onboarding step for an account.
pub trait OnboardingReader: Send + Sync {
    /// `None` means onboarding is complete (or not applicable).
    ///
    /// # Errors
    /// Returns an error when the underlying profile store is unavailable.
    fn furthest_incomplete_step(&self, account_id: Uuid) -> Result<Option<OnboardingStep>>;
}

/// Default reader that treats every account as fully onboarded. Deployments
/// wire in a profile-backed implementation.
#[derive(Clone, Debug)]
pub struct NoOnboarding;

impl OnboardingReader for NoOnboarding {
    fn furthest_incomplete_step(&self, _account_id: Uuid) -> Result<Option<OnboardingStep>> {
        Ok(None)
    }
}
