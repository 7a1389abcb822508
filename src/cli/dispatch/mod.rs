use crate::cli::actions::{Action, server};
use crate::cli::commands::{self, otp, providers};
use anyhow::Result;

/// Turn parsed arguments into the action the binary should run.
///
/// # Errors
///
/// Returns an error if a required argument is missing (defaults make this
/// unreachable in practice).
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server(server::Args {
        port: matches
            .get_one::<u16>(commands::ARG_PORT)
            .copied()
            .unwrap_or(8080),
        frontend_base_url: matches
            .get_one::<String>(commands::ARG_FRONTEND_BASE_URL)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing argument: --frontend-base-url"))?,
        otp_length: matches
            .get_one::<u8>(otp::ARG_OTP_LENGTH)
            .copied()
            .unwrap_or(4),
        otp_ttl_seconds: matches
            .get_one::<u64>(otp::ARG_OTP_TTL_SECONDS)
            .copied()
            .unwrap_or(600),
        otp_max_attempts: matches
            .get_one::<u32>(otp::ARG_OTP_MAX_ATTEMPTS)
            .copied()
            .unwrap_or(5),
        otp_max_resends: matches
            .get_one::<u32>(otp::ARG_OTP_MAX_RESENDS)
            .copied()
            .unwrap_or(3),
        default_locale: matches
            .get_one::<String>(otp::ARG_DEFAULT_LOCALE)
            .cloned()
            .unwrap_or_else(|| "en".to_string()),
        google_client_id: matches
            .get_one::<String>(providers::ARG_GOOGLE_CLIENT_ID)
            .cloned(),
        apple_client_id: matches
            .get_one::<String>(providers::ARG_APPLE_CLIENT_ID)
            .cloned(),
        jwks_timeout_seconds: matches
            .get_one::<u64>(providers::ARG_JWKS_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(10),
    }))
}
