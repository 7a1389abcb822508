use thiserror::Error;

/// Failures of identity-token verification.
///
/// Everything except [`Error::KeySourceUnavailable`] means the presented
/// token is not acceptable (a security event); availability failures are
/// infrastructure and must never be reported to callers as proof of a
/// forged credential.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("unknown signing key: {0}")]
    UnknownSigningKey(String),
    #[error("invalid key material")]
    KeyMaterial,
    #[error("invalid signature")]
    BadSignature,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("audience mismatch")]
    AudienceMismatch,
    #[error("token expired")]
    TokenExpired,
    #[error("token not yet valid")]
    TokenNotYetValid,
    #[error("nonce mismatch")]
    NonceMismatch,
    #[error("key source unavailable: {0}")]
    KeySourceUnavailable(String),
}

impl Error {
    /// True for infrastructure failures, as opposed to rejected tokens.
    #[must_use]
    pub fn is_availability(&self) -> bool {
        matches!(self, Self::KeySourceUnavailable(_))
    }
}
