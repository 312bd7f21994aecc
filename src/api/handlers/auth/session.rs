//! Cookie plumbing for the stateless session pair.
//!
//! Both tokens travel as `HttpOnly`, `SameSite=Strict` cookies whose
//! lifetimes match the token expiries. The refresh token is never exposed to
//! script-readable storage; callers that prefer headers may present the
//! access token as a bearer credential instead, and the header wins when
//! both are present.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{InvalidHeaderValue, SET_COOKIE},
};

use super::state::{AuthConfig, AuthState};
use super::utils::{extract_bearer_token, extract_cookie};
use crate::api::error::AuthError;
use crate::tokens::{Identity, TokenPair};

pub(crate) const ACCESS_COOKIE: &str = "accessToken";
pub(crate) const REFRESH_COOKIE: &str = "refreshToken";

/// Build one `Set-Cookie` value for a session token.
pub(super) fn token_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    token_cookie(name, "", 0, secure)
}

/// `Set-Cookie` headers installing a fresh token pair.
pub(super) fn pair_cookies(
    state: &AuthState,
    pair: &TokenPair,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let secure = state.config().cookie_secure();
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        token_cookie(
            ACCESS_COOKIE,
            &pair.access,
            state.tokens().access_ttl_seconds(),
            secure,
        )?,
    );
    headers.append(
        SET_COOKIE,
        token_cookie(
            REFRESH_COOKIE,
            &pair.refresh,
            state.tokens().refresh_ttl_seconds(),
            secure,
        )?,
    );
    Ok(headers)
}

/// `Set-Cookie` headers expiring both session cookies.
pub(super) fn clear_pair_cookies(config: &AuthConfig) -> Result<HeaderMap, InvalidHeaderValue> {
    let secure = config.cookie_secure();
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, clear_cookie(ACCESS_COOKIE, secure)?);
    headers.append(SET_COOKIE, clear_cookie(REFRESH_COOKIE, secure)?);
    Ok(headers)
}

/// Access token from the Authorization header or the access-token cookie;
/// the header takes precedence.
pub(crate) fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_cookie(headers, ACCESS_COOKIE))
}

/// Refresh token from its cookie. Refresh is cookie-only by contract.
pub(super) fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, REFRESH_COOKIE)
}

/// Authenticate a request from its access token alone; no store lookup.
pub(crate) fn require_identity(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Identity, AuthError> {
    let token = extract_access_token(headers).ok_or(AuthError::InvalidToken)?;
    state
        .tokens()
        .verify_access(&token)
        .map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::super::state::test_support::auth_state;
    use super::*;
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use uuid::Uuid;

    use crate::tokens::Role;

    #[test]
    fn cookie_attributes_follow_the_contract() -> anyhow::Result<()> {
        let cookie = token_cookie(ACCESS_COOKIE, "jwt", 900, true)?;
        let value = cookie.to_str()?;
        assert!(value.starts_with("accessToken=jwt"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Strict"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("Max-Age=900"));
        assert!(value.contains("Secure"));

        let cookie = token_cookie(REFRESH_COOKIE, "jwt", 604_800, false)?;
        assert!(!cookie.to_str()?.contains("Secure"));
        Ok(())
    }

    #[test]
    fn pair_cookies_match_token_ttls() -> anyhow::Result<()> {
        let state = auth_state();
        let pair = crate::tokens::TokenPair {
            access: "a.b.c".to_string(),
            refresh: "d.e.f".to_string(),
        };
        let headers = pair_cookies(&state, &pair)?;
        let values: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].contains("Max-Age=900"));
        assert!(values[1].contains("Max-Age=604800"));
        Ok(())
    }

    #[test]
    fn clearing_expires_both_cookies() -> anyhow::Result<()> {
        let state = auth_state();
        let headers = clear_pair_cookies(state.config())?;
        for value in headers.get_all(SET_COOKIE) {
            assert!(value.to_str()?.contains("Max-Age=0"));
        }
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
        Ok(())
    }

    #[test]
    fn header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer from-header".parse().unwrap());
        headers.insert(COOKIE, "accessToken=from-cookie".parse().unwrap());
        assert_eq!(
            extract_access_token(&headers),
            Some("from-header".to_string())
        );

        headers.remove(AUTHORIZATION);
        assert_eq!(
            extract_access_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn require_identity_round_trips_a_real_token() -> anyhow::Result<()> {
        let state = auth_state();
        let identity = crate::tokens::Identity {
            account_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::Student,
        };
        let pair = state.tokens().issue(&identity)?;

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("accessToken={}", pair.access).parse()?);
        let resolved = require_identity(&headers, &state).map_err(|e| anyhow::anyhow!("{e}"))?;
        assert_eq!(resolved, identity);
        Ok(())
    }

    #[test]
    fn require_identity_rejects_missing_or_garbage_tokens() {
        let state = auth_state();
        let headers = HeaderMap::new();
        assert!(matches!(
            require_identity(&headers, &state),
            Err(AuthError::InvalidToken)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "accessToken=garbage".parse().unwrap());
        assert!(matches!(
            require_identity(&headers, &state),
            Err(AuthError::InvalidToken)
        ));
    }
}
