//! Pending-signup session model and configuration.

use std::time::{Duration, Instant};
use uuid::Uuid;

use super::hasher;

const DEFAULT_OTP_LENGTH: usize = 4;
const DEFAULT_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_MAX_RESENDS: u32 = 3;
const DEFAULT_LOCALE: &str = "en";

#[derive(Clone, Debug)]
pub struct SignupConfig {
    otp_length: usize,
    ttl: Duration,
    max_attempts: u32,
    max_resends: u32,
    default_locale: String,
}

impl SignupConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            otp_length: DEFAULT_OTP_LENGTH,
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_resends: DEFAULT_MAX_RESENDS,
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }

    #[must_use]
    pub fn with_otp_length(mut self, length: usize) -> Self {
        self.otp_length = length.clamp(4, 6);
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, cap: u32) -> Self {
        self.max_attempts = cap;
        self
    }

    #[must_use]
    pub fn with_max_resends(mut self, cap: u32) -> Self {
        self.max_resends = cap;
        self
    }

    #[must_use]
    pub fn with_default_locale(mut self, locale: String) -> Self {
        self.default_locale = locale;
        self
    }

    #[must_use]
    pub fn otp_length(&self) -> usize {
        self.otp_length
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn max_resends(&self) -> u32 {
        self.max_resends
    }

    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One in-progress signup, keyed by a random 128-bit session id.
///
/// The id is generated independently of the email so sessions cannot be
/// enumerated or predicted for a given address. Only digests of the OTP
/// code and the candidate password are kept; the code plaintext exists
/// exactly once, in the return value of the issuing call.
#[derive(Debug)]
pub struct SignupSession {
    session_id: Uuid,
    email: String,
    password_digest: String,
    password_salt: String,
    otp_salt: String,
    otp_digest: String,
    issued_at: Instant,
    expires_at: Instant,
    attempts: u32,
    resends: u32,
    locale: String,
}

impl SignupSession {
    /// Create a session for `email` and return it with the plaintext code.
    pub(super) fn new(email: String, password: &str, locale: String, config: &SignupConfig) -> (Self, String) {
        let code = hasher::generate_code(config.otp_length());
        let otp_salt = hasher::generate_salt();
        let otp_digest = hasher::digest(&code, &otp_salt);
        let password_salt = hasher::generate_salt();
        let password_digest = hasher::digest(password, &password_salt);
        let now = Instant::now();

        let session = Self {
            session_id: Uuid::new_v4(),
            email,
            password_digest,
            password_salt,
            otp_salt,
            otp_digest,
            issued_at: now,
            expires_at: now + config.ttl(),
            attempts: 0,
            resends: 0,
            locale,
        };
        (session, code)
    }

    /// Replace code, salt, and digest in one step and reset `issued_at`.
    ///
    /// `expires_at` is left untouched: resending never extends the life of
    /// the session, only of the code within it.
    pub(super) fn rotate_code(&mut self, config: &SignupConfig) -> String {
        let code = hasher::generate_code(config.otp_length());
        let salt = hasher::generate_salt();
        self.otp_digest = hasher::digest(&code, &salt);
        self.otp_salt = salt;
        self.issued_at = Instant::now();
        code
    }

    pub(super) fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub(super) fn matches_code(&self, code: &str) -> bool {
        hasher::compare(&hasher::digest(code, &self.otp_salt), &self.otp_digest)
    }

    pub(super) fn matches_password(&self, password: &str) -> bool {
        hasher::compare(
            &hasher::digest(password, &self.password_salt),
            &self.password_digest,
        )
    }

    pub(super) fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub(super) fn record_resend(&mut self) {
        self.resends += 1;
    }

    /// Remaining wall-clock validity, zero once expired.
    #[must_use]
    pub fn ttl_left(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn resends(&self) -> u32 {
        self.resends
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }
}
