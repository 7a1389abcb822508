use thiserror::Error;

/// Client-recoverable failures of the signup flow.
///
/// Every variant is scoped to a single request; callers map them to a
/// response status and move on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignupError {
    #[error("user with this email already exists")]
    AlreadyRegistered,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid password")]
    InvalidPassword,
    #[error("invalid session")]
    SessionNotFound,
    #[error("code expired")]
    SessionExpired,
    #[error("too many attempts")]
    TooManyAttempts,
    #[error("invalid code")]
    InvalidCode,
    #[error("password mismatch with initial step")]
    PasswordMismatch,
    #[error("resend limit reached")]
    ResendLimitReached,
}
