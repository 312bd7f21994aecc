//! Session issuance: login, silent refresh, logout.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::session::{clear_pair_cookies, extract_refresh_token, pair_cookies};
use super::state::AuthState;
use super::storage::{self, AccountRecord};
use super::types::{
    AccountView, LoginRequest, LoginResponse, RefreshResponse, TokenPairBody,
};
use super::utils::normalize_email;
use crate::api::error::AuthError;
use crate::tokens::{Identity, Role};

fn identity_of(account: &AccountRecord) -> Identity {
    Identity {
        account_id: account.id,
        email: account.email.clone(),
        role: account.role,
    }
}

/// Post-login destination: mentors resume at their earliest incomplete
/// onboarding step, everyone else lands on the default page. Onboarding-state
/// failures fall back to the landing page rather than blocking login.
fn redirect_target(state: &AuthState, account: &AccountRecord) -> String {
    if account.role == Role::Mentor {
        match state.onboarding().furthest_incomplete_step(account.id) {
            Ok(Some(step)) => return step.path().to_string(),
            Ok(None) => {}
            Err(err) => error!("Failed to read onboarding state: {err}"),
        }
    }
    state.config().landing_path().to_string()
}

/// Authenticate credentials and issue the cookie-borne token pair.
///
/// Unknown email and wrong password are indistinguishable on the wire; a
/// decoy hash verification runs for unknown accounts so the two cases also
/// take comparable time.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; session cookies set", body = LoginResponse),
        (status = 401, description = "Invalid credentials, deactivated, or unverified", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::invalid_field("body", "Missing payload")),
    };

    let email = normalize_email(&request.email);
    let account = storage::find_by_email(&pool, &email).await?;
    let Some(account) = account else {
        let _ = auth_state
            .hasher()
            .verify(&request.password, auth_state.dummy_digest());
        return Err(AuthError::InvalidCredentials);
    };

    if !auth_state
        .hasher()
        .verify(&request.password, &account.password_hash)
    {
        return Err(AuthError::InvalidCredentials);
    }
    if !account.is_verified {
        // Intentionally informative: the client routes to the verify screen.
        return Err(AuthError::EmailNotVerified);
    }
    if !account.is_active {
        return Err(AuthError::AccountDeactivated);
    }

    let identity = identity_of(&account);
    let pair = auth_state
        .tokens()
        .issue(&identity)
        .map_err(|err| AuthError::Internal(err.into()))?;

    if let Err(err) = storage::record_login(&pool, account.id).await {
        error!("Failed to record login timestamp: {err}");
    }

    let cookies = pair_cookies(&auth_state, &pair)
        .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
    let response = LoginResponse {
        user: AccountView::from(&account),
        tokens: TokenPairBody::from(&pair),
        redirect_to: redirect_target(&auth_state, &account),
    };
    Ok((StatusCode::OK, cookies, Json(response)))
}

/// Mint a fresh pair from the refresh cookie.
///
/// Verification is stateless, but the account is re-read so deactivation or
/// un-verification takes effect at the next refresh.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    responses(
        (status = 200, description = "New pair issued; cookies rotated", body = RefreshResponse),
        (status = 401, description = "Missing, invalid, or expired refresh token", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let token = extract_refresh_token(&headers).ok_or(AuthError::InvalidToken)?;
    let claimed = auth_state
        .tokens()
        .verify_refresh(&token)
        .map_err(|_| AuthError::InvalidToken)?;

    let account = storage::find_by_id(&pool, claimed.account_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    if !account.is_verified || !account.is_active {
        return Err(AuthError::InvalidToken);
    }

    // Claims are rebuilt from the store so role/email changes propagate.
    let pair = auth_state
        .tokens()
        .issue(&identity_of(&account))
        .map_err(|err| AuthError::Internal(err.into()))?;
    let cookies = pair_cookies(&auth_state, &pair)
        .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;

    Ok((
        StatusCode::OK,
        cookies,
        Json(RefreshResponse {
            tokens: TokenPairBody::from(&pair),
        }),
    ))
}

/// Clear both session cookies. Always succeeds; bearer tokens already issued
/// simply age out.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cookies cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let cookies = clear_pair_cookies(auth_state.config())
        .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
    Ok((StatusCode::NO_CONTENT, cookies))
}

#[cfg(test)]
mod tests {
    use super::super::state::test_support::{auth_state, auth_state_with};
    use super::*;
    use crate::api::email::LogEmailSender;
    use crate::api::onboarding::{OnboardingStep, test_support::StuckAt};
    use axum::http::header::SET_COOKIE;
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn lazy_pool() -> anyhow::Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    fn account(role: Role) -> AccountRecord {
        AccountRecord {
            id: Uuid::new_v4(),
            email: "mentor@example.com".to_string(),
            role,
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            is_verified: true,
            is_active: true,
            password_hash: "$argon2id$...".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn redirect_resumes_incomplete_mentor_onboarding() {
        let state = auth_state_with(
            std::sync::Arc::new(LogEmailSender),
            std::sync::Arc::new(StuckAt(OnboardingStep::Availability)),
        );
        assert_eq!(
            redirect_target(&state, &account(Role::Mentor)),
            "/onboarding/availability"
        );
        // Students are not subject to mentor onboarding.
        assert_eq!(redirect_target(&state, &account(Role::Student)), "/dashboard");
    }

    #[test]
    fn redirect_defaults_to_landing_when_complete() {
        let state = auth_state();
        assert_eq!(redirect_target(&state, &account(Role::Mentor)), "/dashboard");
    }

    #[tokio::test]
    async fn login_missing_payload() -> anyhow::Result<()> {
        let result = login(Extension(lazy_pool()?), Extension(auth_state()), None).await;
        assert!(matches!(result.err(), Some(AuthError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_unauthorized() -> anyhow::Result<()> {
        let result = refresh(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(auth_state()),
        )
        .await;
        assert!(matches!(result.err(), Some(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rejects_access_token_in_refresh_cookie() -> anyhow::Result<()> {
        let state = auth_state();
        let identity = Identity {
            account_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::Student,
        };
        let pair = state.tokens().issue(&identity)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            format!("refreshToken={}", pair.access).parse()?,
        );
        let result = refresh(headers, Extension(lazy_pool()?), Extension(state)).await;
        assert!(matches!(result.err(), Some(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_cookies_unconditionally() -> anyhow::Result<()> {
        let response = logout(Extension(auth_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
        Ok(())
    }
}
