//! Authenticated "who am I" endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::auth::AuthState;
use super::auth::session::require_identity;
use super::auth::storage;
use super::auth::types::{AccountView, MeResponse};
use crate::api::error::AuthError;

/// Resolve the access token to the current account view.
///
/// The token alone authenticates the request; the store read only refreshes
/// the public view (name, verification state).
#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Current account", body = MeResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::api::error::ErrorBody)
    ),
    tag = "me"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let identity = require_identity(&headers, &auth_state)?;
    let account = storage::find_by_id(&pool, identity.account_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok((
        StatusCode::OK,
        Json(MeResponse {
            user: AccountView::from(&account),
        }),
    ))
}
