//! Social login endpoints: Google and Apple identity tokens.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::idtoken::Provider;
use crate::social::{SocialLogin, SocialLoginError};

use super::extract_client_ip;
use super::rate_limit::{RateLimitAction, RateLimitDecision, RateLimiter};
use super::signup::UserResponse;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SocialLoginRequest {
    pub id_token: String,
    #[serde(default)]
    pub nonce: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SocialTokenResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserResponse,
    pub created: bool,
}

#[utoipa::path(
    post,
    path = "/v1/auth/google",
    request_body = SocialLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = [SocialTokenResponse]),
        (status = 401, description = "Token rejected", body = String),
        (status = 503, description = "Provider unavailable or not configured", body = String)
    ),
    tag = "social"
)]
pub async fn google_login(
    headers: HeaderMap,
    login: Extension<Arc<SocialLogin>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<SocialLoginRequest>>,
) -> impl IntoResponse {
    social_login(Provider::Google, &headers, &login, &limiter, payload).await
}

#[utoipa::path(
    post,
    path = "/v1/auth/apple",
    request_body = SocialLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = [SocialTokenResponse]),
        (status = 401, description = "Token rejected", body = String),
        (status = 503, description = "Provider unavailable or not configured", body = String)
    ),
    tag = "social"
)]
pub async fn apple_login(
    headers: HeaderMap,
    login: Extension<Arc<SocialLogin>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<SocialLoginRequest>>,
) -> impl IntoResponse {
    social_login(Provider::Apple, &headers, &login, &limiter, payload).await
}

async fn social_login(
    provider: Provider,
    headers: &HeaderMap,
    login: &SocialLogin,
    limiter: &Arc<dyn RateLimiter>,
    payload: Option<Json<SocialLoginRequest>>,
) -> axum::response::Response {
    let request: SocialLoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let token = request.id_token.trim();
    if token.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing id_token".to_string()).into_response();
    }

    let client_ip = extract_client_ip(headers);
    if limiter.check_ip(client_ip.as_deref(), RateLimitAction::SocialLogin)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match login.login(provider, token, request.nonce.as_deref()).await {
        Ok(outcome) => Json(SocialTokenResponse {
            access: outcome.tokens.access,
            refresh: outcome.tokens.refresh,
            user: UserResponse {
                id: outcome.account.id.to_string(),
                email: outcome.account.email,
            },
            created: outcome.created,
        })
        .into_response(),
        Err(SocialLoginError::ProviderNotConfigured(provider)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{provider} login is not configured"),
        )
            .into_response(),
        Err(SocialLoginError::Token(err)) if err.is_availability() => {
            // An unreachable key source is an outage, not a forged token.
            error!(provider = %provider, "identity key source unavailable: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Key source unavailable".to_string(),
            )
                .into_response()
        }
        Err(SocialLoginError::Token(err)) => {
            // Rejected tokens are security events; repeated ones are probing.
            warn!(provider = %provider, client_ip = ?client_ip, "identity token rejected: {err}");
            (
                StatusCode::UNAUTHORIZED,
                format!("Invalid {provider} token"),
            )
                .into_response()
        }
        Err(err) => {
            error!(provider = %provider, "social login failure: {err:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string()).into_response()
        }
    }
}
