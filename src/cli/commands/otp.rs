use clap::{Arg, Command};

pub const ARG_OTP_LENGTH: &str = "otp-length";
pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_OTP_MAX_ATTEMPTS: &str = "otp-max-attempts";
pub const ARG_OTP_MAX_RESENDS: &str = "otp-max-resends";
pub const ARG_DEFAULT_LOCALE: &str = "default-locale";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OTP_LENGTH)
                .long(ARG_OTP_LENGTH)
                .help("Digits in the one-time code")
                .default_value("4")
                .env("ALIRO_OTP_LENGTH")
                .value_parser(clap::value_parser!(u8).range(4..=6)),
        )
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("Lifetime of a signup session in seconds")
                .default_value("600")
                .env("ALIRO_OTP_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_OTP_MAX_ATTEMPTS)
                .long(ARG_OTP_MAX_ATTEMPTS)
                .help("Verification attempts before a session is terminated")
                .default_value("5")
                .env("ALIRO_OTP_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_OTP_MAX_RESENDS)
                .long(ARG_OTP_MAX_RESENDS)
                .help("Code re-issues allowed per session")
                .default_value("3")
                .env("ALIRO_OTP_MAX_RESENDS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_DEFAULT_LOCALE)
                .long(ARG_DEFAULT_LOCALE)
                .help("Locale used for notification templating when the client sends none")
                .default_value("en")
                .env("ALIRO_DEFAULT_LOCALE"),
        )
}
