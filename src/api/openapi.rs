use super::handlers::{auth, health, me};
use utoipa::openapi::{InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated spec. Routes added outside (like `/`) are
/// intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the
    // route to the OpenAPI document.
    let router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::register::resend_otp))
        .routes(routes!(auth::verification::verify_email))
        .routes(routes!(auth::verification::verify_otp))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::login::refresh))
        .routes(routes!(auth::login::logout))
        .routes(routes!(auth::password_reset::forgot_password))
        .routes(routes!(auth::password_reset::verify_reset_otp))
        .routes(routes!(auth::password_reset::reset_password))
        .routes(routes!(me::me));

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    let identifier = env!("CARGO_PKG_LICENSE");
    if !identifier.is_empty() {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        info.license = Some(license);
    }

    let mut auth_tag = Tag::new("auth");
    auth_tag.description =
        Some("Registration, verification, sessions, and password recovery".to_string());

    let mut me_tag = Tag::new("me");
    me_tag.description = Some("Authenticated self-service".to_string());

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![auth_tag, me_tag]))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_identity_route() {
        let spec = openapi();
        let paths = &spec.paths.paths;
        for path in [
            "/health",
            "/v1/auth/register",
            "/v1/auth/resend-otp",
            "/v1/auth/verify-email",
            "/v1/auth/verify-otp",
            "/v1/auth/login",
            "/v1/auth/refresh",
            "/v1/auth/logout",
            "/v1/auth/forgot-password",
            "/v1/auth/verify-reset-otp",
            "/v1/auth/reset-password",
            "/v1/me",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn openapi_uses_cargo_metadata() {
        let spec = openapi();
        assert_eq!(spec.info.title, "mentorium");
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }
}
