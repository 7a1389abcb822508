use crate::account::{InMemoryUserStore, LogNotifier, OpaqueCredentialIssuer, UserStore};
use crate::api;
use crate::idtoken::{HttpKeyFetcher, JwksCache, TokenVerifier};
use crate::otp::{SessionStore, SignupConfig, SignupFlow};
use crate::social::{SocialLogin, SocialLoginConfig};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub frontend_base_url: String,
    pub otp_length: u8,
    pub otp_ttl_seconds: u64,
    pub otp_max_attempts: u32,
    pub otp_max_resends: u32,
    pub default_locale: String,
    pub google_client_id: Option<String>,
    pub apple_client_id: Option<String>,
    pub jwks_timeout_seconds: u64,
}

/// Execute the server action.
///
/// The user store, notifier, and credential issuer wired here are the local
/// dev implementations; deployments that own real collaborators assemble
/// the flows themselves and call `api::new` directly.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = SignupConfig::new()
        .with_otp_length(usize::from(args.otp_length))
        .with_ttl(Duration::from_secs(args.otp_ttl_seconds))
        .with_max_attempts(args.otp_max_attempts)
        .with_max_resends(args.otp_max_resends)
        .with_default_locale(args.default_locale);

    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let issuer = Arc::new(OpaqueCredentialIssuer);

    let signup = Arc::new(SignupFlow::new(
        SessionStore::new(config),
        Arc::clone(&users),
        Arc::new(LogNotifier),
        issuer.clone(),
    ));

    if args.google_client_id.is_none() && args.apple_client_id.is_none() {
        warn!("no provider client ids configured; social login endpoints will refuse requests");
    }

    let fetcher = HttpKeyFetcher::new(Duration::from_secs(args.jwks_timeout_seconds))?;
    let verifier = TokenVerifier::new(JwksCache::new(Arc::new(fetcher)));
    let social = Arc::new(SocialLogin::new(
        verifier,
        users,
        issuer,
        SocialLoginConfig::new()
            .with_google_client_id(args.google_client_id)
            .with_apple_client_id(args.apple_client_id),
    ));

    api::new(
        args.port,
        &args.frontend_base_url,
        signup,
        social,
        Arc::new(api::NoopRateLimiter),
    )
    .await
}
