//! Edge route guard.
//!
//! Runs in front of every handler: classifies the request path, validates
//! the access token locally (signature + expiry only, never a store lookup),
//! and enforces the authentication/role invariants before any application
//! logic executes. API paths get JSON statuses; page paths get redirects
//! that preserve the originally requested target.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::api::error::AuthError;
use crate::api::handlers::auth::AuthState;
use crate::api::handlers::auth::session::extract_access_token;
use crate::tokens::{Identity, Role};

const LOGIN_PATH: &str = "/login";
// The OTP verification screen must stay reachable mid-authentication, so it
// is carved out of the auth-only class.
const OTP_VERIFICATION_PATH: &str = "/verify-otp";

const PROTECTED_PREFIXES: &[&str] = &[
    "/v1/me",
    "/dashboard",
    "/sessions",
    "/messages",
    "/settings",
];
const AUTH_ONLY_PREFIXES: &[&str] = &[
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
];
const MENTOR_ONBOARDING_PREFIX: &str = "/onboarding";

/// What a path demands before the handler may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Requires a valid access token.
    Protected,
    /// Reachable only while unauthenticated (login, registration, reset).
    AuthOnly,
    /// Requires an authenticated mentor.
    MentorOnboarding,
    /// No requirements.
    Public,
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

impl RouteClass {
    #[must_use]
    pub fn classify(path: &str) -> Self {
        if matches_prefix(path, OTP_VERIFICATION_PATH) {
            return Self::Public;
        }
        if matches_prefix(path, MENTOR_ONBOARDING_PREFIX) {
            return Self::MentorOnboarding;
        }
        if PROTECTED_PREFIXES.iter().any(|p| matches_prefix(path, p)) {
            return Self::Protected;
        }
        if AUTH_ONLY_PREFIXES.iter().any(|p| matches_prefix(path, p)) {
            return Self::AuthOnly;
        }
        Self::Public
    }
}

fn is_api_path(path: &str) -> bool {
    matches_prefix(path, "/v1")
}

/// Redirect target for an unauthenticated page request, preserving where the
/// user was headed.
fn login_redirect(original: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
    format!("{LOGIN_PATH}?redirect={encoded}")
}

fn reject_unauthenticated(path: &str, original: &str) -> Response {
    if is_api_path(path) {
        AuthError::InvalidToken.into_response()
    } else {
        Redirect::temporary(&login_redirect(original)).into_response()
    }
}

/// The guard itself. Decisions are a pure function of the token and the
/// path; on success the verified identity is handed to the handler through
/// request extensions.
pub async fn guard(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let original = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());

    let identity: Option<Identity> = extract_access_token(request.headers())
        .and_then(|token| state.tokens().verify_access(&token).ok());

    match RouteClass::classify(&path) {
        RouteClass::Public => next.run(request).await,
        RouteClass::Protected => match identity {
            Some(identity) => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            None => reject_unauthenticated(&path, &original),
        },
        RouteClass::AuthOnly => {
            if identity.is_some() {
                // Never render the login/registration forms to an
                // authenticated user.
                Redirect::temporary(state.config().landing_path()).into_response()
            } else {
                next.run(request).await
            }
        }
        RouteClass::MentorOnboarding => match identity {
            Some(identity) if identity.role == Role::Mentor => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Some(_) => Redirect::temporary(state.config().landing_path()).into_response(),
            None => reject_unauthenticated(&path, &original),
        },
    }
}
