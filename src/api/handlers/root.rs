//! Undocumented root route; useful for load balancers and smoke checks.

use axum::response::IntoResponse;

pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
