//! Signup endpoints: start, verify, resend.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::otp::{SignupError, SignupFlow, SignupFlowError, normalize_email};

use super::rate_limit::{RateLimitAction, RateLimitDecision, RateLimiter};
use super::{extract_client_ip, requested_locale};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct StartSignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct StartSignupResponse {
    pub session_id: String,
    pub email: String,
    pub email_sent: bool,
    pub ttl_seconds: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifySignupRequest {
    pub session_id: String,
    pub otp: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserResponse,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendRequest {
    pub session_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendResponse {
    pub ok: bool,
    pub ttl_seconds_left: u64,
    pub resends_used: u32,
    pub resends_left: u32,
}

/// Map a flow failure to a response, keeping client rejections distinct
/// from collaborator outages.
fn error_response(err: &SignupFlowError) -> (StatusCode, String) {
    match err {
        SignupFlowError::Rejected(rejected) => {
            let status = match rejected {
                SignupError::TooManyAttempts | SignupError::ResendLimitReached => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                _ => StatusCode::BAD_REQUEST,
            };
            (status, rejected.to_string())
        }
        SignupFlowError::Collaborator(err) => {
            error!("signup collaborator failure: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Signup failed".to_string(),
            )
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup/start",
    request_body = StartSignupRequest,
    responses(
        (status = 200, description = "Signup session created", body = [StartSignupResponse]),
        (status = 400, description = "Invalid input or already registered", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "signup"
)]
pub async fn signup_start(
    headers: HeaderMap,
    flow: Extension<Arc<SignupFlow>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<StartSignupRequest>>,
) -> impl IntoResponse {
    let request: StartSignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let client_ip = extract_client_ip(&headers);
    if limiter.check_ip(client_ip.as_deref(), RateLimitAction::SignupStart)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    let email = normalize_email(&request.email);
    if limiter.check_email(&email, RateLimitAction::SignupStart) == RateLimitDecision::Limited {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let locale = requested_locale(request.locale, &headers);
    let password = SecretString::from(request.password);

    match flow.start(&email, &password, locale).await {
        Ok(outcome) => Json(StartSignupResponse {
            session_id: outcome.session_id.to_string(),
            email: outcome.email,
            email_sent: outcome.email_sent,
            ttl_seconds: outcome.ttl.as_secs(),
        })
        .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup/verify",
    request_body = VerifySignupRequest,
    responses(
        (status = 201, description = "Account created, credentials issued", body = [TokenResponse]),
        (status = 400, description = "Unknown session, wrong code, or password mismatch", body = String),
        (status = 429, description = "Too many attempts", body = String)
    ),
    tag = "signup"
)]
pub async fn signup_verify(
    headers: HeaderMap,
    flow: Extension<Arc<SignupFlow>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<VerifySignupRequest>>,
) -> impl IntoResponse {
    let request: VerifySignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let client_ip = extract_client_ip(&headers);
    if limiter.check_ip(client_ip.as_deref(), RateLimitAction::SignupVerify)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let Ok(session_id) = Uuid::parse_str(request.session_id.trim()) else {
        return (StatusCode::BAD_REQUEST, "Invalid session".to_string()).into_response();
    };

    let password = SecretString::from(request.password);
    match flow.verify(session_id, &request.otp, &password).await {
        Ok(verified) => (
            StatusCode::CREATED,
            Json(TokenResponse {
                access: verified.tokens.access,
                refresh: verified.tokens.refresh,
                user: UserResponse {
                    id: verified.account.id.to_string(),
                    email: verified.account.email,
                },
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup/resend",
    request_body = ResendRequest,
    responses(
        (status = 200, description = "Code re-issued", body = [ResendResponse]),
        (status = 400, description = "Unknown or expired session", body = String),
        (status = 429, description = "Resend limit reached", body = String),
        (status = 502, description = "Code could not be delivered", body = String)
    ),
    tag = "signup"
)]
pub async fn signup_resend(
    headers: HeaderMap,
    flow: Extension<Arc<SignupFlow>>,
    limiter: Extension<Arc<dyn RateLimiter>>,
    payload: Option<Json<ResendRequest>>,
) -> impl IntoResponse {
    let request: ResendRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let client_ip = extract_client_ip(&headers);
    if limiter.check_ip(client_ip.as_deref(), RateLimitAction::SignupResend)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let Ok(session_id) = Uuid::parse_str(request.session_id.trim()) else {
        return (StatusCode::BAD_REQUEST, "Invalid session".to_string()).into_response();
    };

    match flow.resend(session_id).await {
        Ok(outcome) => {
            if !outcome.email_sent {
                // The code was rotated; without delivery the caller can only retry.
                return (StatusCode::BAD_GATEWAY, "Failed to send code".to_string())
                    .into_response();
            }
            Json(ResendResponse {
                ok: true,
                ttl_seconds_left: outcome.ttl_left.as_secs(),
                resends_used: outcome.resends_used,
                resends_left: outcome.resends_left,
            })
            .into_response()
        }
        Err(err) => error_response(&err).into_response(),
    }
}
