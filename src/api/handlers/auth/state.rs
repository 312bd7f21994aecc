//! Shared auth state and configuration.

use anyhow::Result;
use std::sync::Arc;

use crate::api::email::EmailSender;
use crate::api::onboarding::OnboardingReader;
use crate::password::PasswordHasher;
use crate::tokens::{TokenConfig, TokenService};

const DEFAULT_LANDING_PATH: &str = "/dashboard";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    landing_path: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_landing_path(mut self, path: String) -> Self {
        self.landing_path = path;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Default post-login destination for fully-onboarded accounts.
    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything the auth handlers share: configuration, the token service,
/// the password hasher, and the external collaborators.
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenService,
    hasher: PasswordHasher,
    // Verified against when the account does not exist, so missing accounts
    // and wrong passwords take the same time.
    dummy_digest: String,
    email: Arc<dyn EmailSender>,
    onboarding: Arc<dyn OnboardingReader>,
}

impl AuthState {
    /// Build the shared state.
    ///
    /// # Errors
    /// Returns an error when the decoy digest cannot be computed.
    pub fn new(
        config: AuthConfig,
        token_config: &TokenConfig,
        hasher: PasswordHasher,
        email: Arc<dyn EmailSender>,
        onboarding: Arc<dyn OnboardingReader>,
    ) -> Result<Self> {
        let dummy_digest = hasher.hash("mentorium-decoy-password")?;
        Ok(Self {
            config,
            tokens: TokenService::new(token_config),
            hasher,
            dummy_digest,
            email,
            onboarding,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub(crate) fn dummy_digest(&self) -> &str {
        &self.dummy_digest
    }

    pub(crate) fn email(&self) -> &dyn EmailSender {
        self.email.as_ref()
    }

    pub(crate) fn onboarding(&self) -> &dyn OnboardingReader {
        self.onboarding.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{AuthConfig, AuthState};
    use crate::api::email::{EmailSender, LogEmailSender};
    use crate::api::onboarding::{NoOnboarding, OnboardingReader};
    use crate::password::PasswordHasher;
    use crate::tokens::TokenConfig;
    use secrecy::SecretString;
    use std::sync::Arc;

    #[must_use]
    pub fn token_config() -> TokenConfig {
        TokenConfig::new(
            SecretString::from("test-access-secret"),
            SecretString::from("test-refresh-secret"),
        )
    }

    /// State over stub collaborators; cost kept minimal for fast tests.
    pub fn auth_state() -> Arc<AuthState> {
        auth_state_with(Arc::new(LogEmailSender), Arc::new(NoOnboarding))
    }

    pub fn auth_state_with(
        email: Arc<dyn EmailSender>,
        onboarding: Arc<dyn OnboardingReader>,
    ) -> Arc<AuthState> {
        let hasher = PasswordHasher::with_cost(8, 1).expect("test hasher");
        let config = AuthConfig::new("https://mentorium.dev".to_string());
        Arc::new(
            AuthState::new(config, &token_config(), hasher, email, onboarding)
                .expect("test auth state"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AuthConfig::new("https://mentorium.dev".to_string());
        assert_eq!(config.frontend_base_url(), "https://mentorium.dev");
        assert_eq!(config.landing_path(), "/dashboard");
        assert!(config.cookie_secure());

        let config = config.with_landing_path("/home".to_string());
        assert_eq!(config.landing_path(), "/home");

        let config = AuthConfig::new("http://localhost:3000".to_string());
        assert!(!config.cookie_secure());
    }

    #[test]
    fn state_precomputes_a_decoy_digest() {
        let state = test_support::auth_state();
        assert!(state.dummy_digest().starts_with("$argon2id$"));
        assert!(!state.hasher().verify("anything", state.dummy_digest()));
    }
}
