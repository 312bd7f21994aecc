//! Caller-side session controller.
//!
//! Depends only on the HTTP contract of the session endpoints: cookies carry
//! the tokens, so this controller never sees or stores a refresh token. It
//! holds the current identity in memory, drives a periodic silent refresh
//! well under the access-token lifetime, and falls back to the
//! unauthenticated state the moment a refresh fails.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Ten minutes: comfortably inside the 15-minute access-token lifetime.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Non-sensitive identity metadata mirrored from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
}

/// What a successful login reports back to the embedding application.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: SessionUser,
    pub redirect_to: String,
}

#[derive(Deserialize)]
struct MeBody {
    user: SessionUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    user: SessionUser,
    redirect_to: String,
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload<'a> {
    email: &'a str,
    password: &'a str,
    role: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

struct Inner {
    http: Client,
    base_url: Url,
    identity: RwLock<Option<SessionUser>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

/// Client-side counterpart of the session issuer.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    /// Controller against the given API base URL.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self> {
        // The cookie store is the only place the tokens ever live client-side.
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                identity: RwLock::new(None),
                refresh_task: Mutex::new(None),
            }),
        })
    }

    /// Current identity, if authenticated.
    #[must_use]
    pub fn current(&self) -> Option<SessionUser> {
        self.inner.identity.read().ok()?.clone()
    }

    fn set_identity(&self, user: Option<SessionUser>) {
        if let Ok(mut identity) = self.inner.identity.write() {
            *identity = user;
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.inner
            .base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path: {path}"))
    }

    /// Ask the server who we are using the ambient cookie. `Ok(None)` means
    /// the session is absent or expired.
    ///
    /// # Errors
    /// Returns an error only on transport failures; an unauthenticated
    /// answer is not an error.
    pub async fn hydrate(&self) -> Result<Option<SessionUser>> {
        let response = self
            .inner
            .http
            .get(self.endpoint("/v1/me")?)
            .send()
            .await
            .context("who-am-i request failed")?;
        if !response.status().is_success() {
            self.set_identity(None);
            return Ok(None);
        }
        let body: MeBody = response.json().await.context("malformed who-am-i body")?;
        self.set_identity(Some(body.user.clone()));
        Ok(Some(body.user))
    }

    /// Log in and remember the returned identity. Tokens arrive as cookies.
    ///
    /// # Errors
    /// Returns an error on transport failure or any non-success status.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let response = self
            .inner
            .http
            .post(self.endpoint("/v1/auth/login")?)
            .json(&LoginPayload { email, password })
            .send()
            .await
            .context("login request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("login rejected: {}", response.status()));
        }
        let body: LoginBody = response.json().await.context("malformed login body")?;
        self.set_identity(Some(body.user.clone()));
        Ok(LoginOutcome {
            user: body.user,
            redirect_to: body.redirect_to,
        })
    }

    /// Register a new account. Does not authenticate; the account still has
    /// to be verified.
    ///
    /// # Errors
    /// Returns an error on transport failure or any non-success status.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<SessionUser> {
        let response = self
            .inner
            .http
            .post(self.endpoint("/v1/auth/register")?)
            .json(&RegisterPayload {
                email,
                password,
                role,
                first_name,
                last_name,
            })
            .send()
            .await
            .context("register request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("registration rejected: {}", response.status()));
        }
        response.json().await.context("malformed register body")
    }

    /// One silent refresh attempt. On failure the local identity is cleared;
    /// the caller is effectively logged out.
    pub async fn refresh(&self) -> bool {
        let request = match self.endpoint("/v1/auth/refresh") {
            Ok(url) => self.inner.http.post(url),
            Err(err) => {
                warn!("refresh endpoint unavailable: {err}");
                self.set_identity(None);
                return false;
            }
        };
        match request.send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!("refresh rejected with {}", response.status());
                self.set_identity(None);
                false
            }
            Err(err) => {
                debug!("refresh transport failure: {err}");
                self.set_identity(None);
                false
            }
        }
    }

    /// Start the background refresh loop. A previous loop, if any, is
    /// replaced. The task stops itself on the first failed refresh.
    pub fn spawn_refresh(&self, interval: Duration) {
        let client = self.clone();
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // The immediate first tick would refresh straight after login.
            timer.tick().await;
            loop {
                timer.tick().await;
                if !client.refresh().await {
                    break;
                }
            }
        });
        self.install_refresh_task(Some(handle));
    }

    /// Stop the background refresh loop, if running.
    pub fn stop_refresh(&self) {
        self.install_refresh_task(None);
    }

    fn install_refresh_task(&self, handle: Option<JoinHandle<()>>) {
        if let Ok(mut slot) = self.inner.refresh_task.lock() {
            if let Some(previous) = slot.take() {
                previous.abort();
            }
            *slot = handle;
        }
    }

    /// Log out: the refresh loop stops and the local identity is cleared
    /// even when the network call fails.
    pub async fn logout(&self) {
        self.stop_refresh();
        self.set_identity(None);
        match self.endpoint("/v1/auth/logout") {
            Ok(url) => {
                if let Err(err) = self.inner.http.post(url).send().await {
                    debug!("logout request failed: {err}");
                }
            }
            Err(err) => debug!("logout endpoint unavailable: {err}"),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_identity_for_tests(&self, user: SessionUser) {
        self.set_identity(Some(user));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead_server_client() -> Result<SessionClient> {
        // Nothing listens on the discard port; every call fails fast.
        SessionClient::new(Url::parse("http://127.0.0.1:9")?)
    }

    fn user() -> SessionUser {
        SessionUser {
            id: "0193-a".to_string(),
            email: "alice@example.com".to_string(),
            role: "student".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Lee".to_string(),
            is_verified: true,
        }
    }

    #[test]
    fn starts_unauthenticated() -> Result<()> {
        assert_eq!(dead_server_client()?.current(), None);
        Ok(())
    }

    #[tokio::test]
    async fn failed_login_leaves_identity_clear() -> Result<()> {
        let client = dead_server_client()?;
        assert!(client.login("alice@example.com", "pw").await.is_err());
        assert_eq!(client.current(), None);
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_clears_identity() -> Result<()> {
        let client = dead_server_client()?;
        client.set_identity_for_tests(user());
        assert!(!client.refresh().await);
        assert_eq!(client.current(), None);
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_identity_despite_network_failure() -> Result<()> {
        let client = dead_server_client()?;
        client.set_identity_for_tests(user());
        client.logout().await;
        assert_eq!(client.current(), None);
        Ok(())
    }

    #[tokio::test]
    async fn background_refresh_stops_after_failure() -> Result<()> {
        let client = dead_server_client()?;
        client.set_identity_for_tests(user());
        client.spawn_refresh(Duration::from_millis(10));
        // One failed cycle is enough to drop back to unauthenticated.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(client.current(), None);
        client.stop_refresh();
        Ok(())
    }

    #[tokio::test]
    async fn spawning_twice_replaces_the_previous_loop() -> Result<()> {
        let client = dead_server_client()?;
        client.spawn_refresh(Duration::from_secs(600));
        client.spawn_refresh(Duration::from_secs(600));
        client.stop_refresh();
        Ok(())
    }

    #[test]
    fn session_user_round_trips_camel_case() -> Result<()> {
        let value = serde_json::to_value(user())?;
        assert_eq!(value["firstName"], serde_json::json!("Alice"));
        assert_eq!(value["isVerified"], serde_json::json!(true));
        let decoded: SessionUser = serde_json::from_value(value)?;
        assert_eq!(decoded, user());
        Ok(())
    }
}
