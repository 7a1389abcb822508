use clap::{Arg, Command};

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_APPLE_CLIENT_ID: &str = "apple-client-id";
pub const ARG_JWKS_TIMEOUT_SECONDS: &str = "jwks-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Registered Google client id; Google login is disabled without it")
                .env("ALIRO_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_APPLE_CLIENT_ID)
                .long(ARG_APPLE_CLIENT_ID)
                .help("Registered Apple client id (bundle id); Apple login is disabled without it")
                .env("ALIRO_APPLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_JWKS_TIMEOUT_SECONDS)
                .long(ARG_JWKS_TIMEOUT_SECONDS)
                .help("Timeout for provider key-set fetches in seconds")
                .default_value("10")
                .env("ALIRO_JWKS_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
