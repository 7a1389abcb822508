use super::handlers::{health, signup, social};
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
    let router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(signup::signup_start))
        .routes(routes!(signup::signup_verify))
        .routes(routes!(signup::signup_resend))
        .routes(routes!(social::google_login))
        .routes(routes!(social::apple_login));

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    let mut signup_tag = Tag::new("signup");
    signup_tag.description = Some("OTP-gated signup sessions".to_string());

    let mut social_tag = Tag::new("social");
    social_tag.description = Some("Google and Apple identity-token login".to_string());

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![signup_tag, social_tag]))
        .build()
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    if value.is_empty() { None } else { Some(value) }
}
