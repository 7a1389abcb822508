//! # Aliro (Credential Issuance)
//!
//! `aliro` is the credential-issuance service of the app backend: it owns
//! everything between "a stranger typed an email address" and "an account
//! exists and holds tokens".
//!
//! ## Signup sessions (OTP)
//!
//! Signup is gated behind a time-boxed email challenge. A `start` call
//! creates an ephemeral session holding only digests of the one-time code
//! and the candidate password; `verify` consumes the session and
//! materializes the account; `resend` rotates the code without extending
//! the session or forgiving earlier bad guesses. Attempt and resend caps
//! are enforced linearizably, so parallel guessing cannot stretch them.
//!
//! ## Social login (Google / Apple)
//!
//! Identity tokens are verified against the providers' published key sets:
//! RS256 signature, pinned issuer, configured audience, freshness with
//! bounded clock skew, and an optional nonce binding. Key sets are cached
//! per provider and refreshed reactively when a token references an
//! unknown key id, which is how rotation presents itself.
//!
//! ## Collaborators
//!
//! Account storage, email delivery, and token minting are external
//! concerns behind the traits in [`account`]; the binary wires local dev
//! implementations.

pub mod account;
pub mod api;
pub mod cli;
pub mod idtoken;
pub mod otp;
pub mod social;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
