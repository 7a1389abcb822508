//! Signup orchestration: start / verify / resend over the session store,
//! composed with the user store, notifier, and credential issuer.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::account::{
    Account, CreateOutcome, CredentialIssuer, NewAccount, Notifier, TokenPair, UserStore,
};

use super::error::SignupError;
use super::store::{SessionStore, StartedSession};

const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 128;

#[derive(Debug, Error)]
pub enum SignupFlowError {
    /// Client-recoverable rejection, mapped to a 4xx by the HTTP layer.
    #[error(transparent)]
    Rejected(#[from] SignupError),
    /// A collaborator failed; retryable, never reported as a client error.
    #[error("collaborator failure: {0}")]
    Collaborator(#[source] anyhow::Error),
}

/// Result of starting a signup. The code itself has already been handed to
/// the notifier and is not part of this value.
#[derive(Debug)]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub email: String,
    pub email_sent: bool,
    pub ttl: Duration,
}

#[derive(Debug)]
pub struct VerifiedSignup {
    pub account: Account,
    pub tokens: TokenPair,
}

#[derive(Debug)]
pub struct ResendOutcome {
    pub email_sent: bool,
    pub ttl_left: Duration,
    pub resends_used: u32,
    pub resends_left: u32,
}

/// Normalize an email for lookup and uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

fn valid_password(password: &str) -> bool {
    let chars = password.chars().count();
    (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&chars)
}

pub struct SignupFlow {
    store: SessionStore,
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    issuer: Arc<dyn CredentialIssuer>,
}

impl SignupFlow {
    #[must_use]
    pub fn new(
        store: SessionStore,
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Self {
        Self {
            store,
            users,
            notifier,
            issuer,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Start a signup: validate input, check the address is free, create a
    /// session, and hand the code to the notifier.
    ///
    /// The existence check here is advisory; the authoritative one is the
    /// atomic create at verification time. Notifier failures are logged and
    /// reported through `email_sent`, never rolled back: an undelivered
    /// code is still resendable.
    ///
    /// # Errors
    ///
    /// Rejects invalid input and already-registered addresses; propagates
    /// user-store failures as collaborator errors.
    pub async fn start(
        &self,
        email: &str,
        password: &SecretString,
        locale: Option<String>,
    ) -> Result<StartOutcome, SignupFlowError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(SignupError::InvalidEmail.into());
        }
        if !valid_password(password.expose_secret()) {
            return Err(SignupError::InvalidPassword.into());
        }

        if self
            .users
            .exists(&email)
            .await
            .map_err(SignupFlowError::Collaborator)?
        {
            return Err(SignupError::AlreadyRegistered.into());
        }

        let locale = self.clamp_locale(locale);
        let StartedSession {
            session_id,
            code,
            ttl,
        } = self
            .store
            .start(email.clone(), password.expose_secret(), locale.clone())
            .await;

        let email_sent = match self.notifier.send_code(&email, &code, ttl, &locale).await {
            Ok(()) => true,
            Err(err) => {
                error!(email = %email, "failed to send signup code: {err:#}");
                false
            }
        };

        Ok(StartOutcome {
            session_id,
            email,
            email_sent,
            ttl,
        })
    }

    /// Verify a code and materialize the account.
    ///
    /// The session is consumed by the store before the account is created.
    /// If a concurrent signup won the race for the same email, the caller
    /// sees `AlreadyRegistered` and the session stays consumed; retrying
    /// with the same session would be a replay.
    ///
    /// # Errors
    ///
    /// Rejects unknown/expired/exhausted sessions, wrong codes, and
    /// password mismatches; propagates collaborator failures.
    pub async fn verify(
        &self,
        session_id: Uuid,
        code: &str,
        password: &SecretString,
    ) -> Result<VerifiedSignup, SignupFlowError> {
        let session = self
            .store
            .verify(session_id, code.trim(), password.expose_secret())
            .await?;

        let outcome = self
            .users
            .create(NewAccount {
                email: session.email().to_string(),
                password: Some(password.clone()),
            })
            .await
            .map_err(SignupFlowError::Collaborator)?;

        let account = match outcome {
            CreateOutcome::Created(account) => account,
            CreateOutcome::AlreadyExists => {
                // Lost the race against a concurrent signup for this email.
                warn!(email = %session.email(), "verified session raced an existing account");
                return Err(SignupError::AlreadyRegistered.into());
            }
        };

        let tokens = self
            .issuer
            .issue(&account)
            .await
            .map_err(SignupFlowError::Collaborator)?;

        Ok(VerifiedSignup { account, tokens })
    }

    /// Re-issue the code for an active session and notify again.
    ///
    /// # Errors
    ///
    /// Rejects unknown/expired sessions and exhausted resend allowances.
    pub async fn resend(&self, session_id: Uuid) -> Result<ResendOutcome, SignupFlowError> {
        let reissued = self.store.resend(session_id).await?;

        let email_sent = match self
            .notifier
            .send_code(
                &reissued.email,
                &reissued.code,
                reissued.ttl_left,
                &reissued.locale,
            )
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!(email = %reissued.email, "failed to resend signup code: {err:#}");
                false
            }
        };

        Ok(ResendOutcome {
            email_sent,
            ttl_left: reissued.ttl_left,
            resends_used: reissued.resends_used,
            resends_left: reissued.resends_left,
        })
    }

    fn clamp_locale(&self, locale: Option<String>) -> String {
        let fallback = self.store.config().default_locale();
        let locale = locale
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        locale.chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{InMemoryUserStore, LogNotifier, OpaqueCredentialIssuer};
    use crate::otp::SignupConfig;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send_code(
            &self,
            _email: &str,
            _code: &str,
            _ttl: Duration,
            _locale: &str,
        ) -> AnyResult<()> {
            anyhow::bail!("smtp down")
        }
    }

    /// Notifier that remembers the last code it was asked to deliver.
    #[derive(Default)]
    struct CapturingNotifier {
        last_code: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn send_code(
            &self,
            _email: &str,
            code: &str,
            _ttl: Duration,
            _locale: &str,
        ) -> AnyResult<()> {
            *self.last_code.lock().expect("lock") = Some(code.to_string());
            Ok(())
        }
    }

    fn flow_with(
        config: SignupConfig,
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
    ) -> SignupFlow {
        SignupFlow::new(
            SessionStore::new(config),
            users,
            notifier,
            Arc::new(OpaqueCredentialIssuer),
        )
    }

    fn password(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn start_then_verify_creates_the_account() {
        let users: Arc<InMemoryUserStore> = Arc::new(InMemoryUserStore::new());
        let notifier = Arc::new(CapturingNotifier::default());
        let flow = flow_with(SignupConfig::new(), users.clone(), notifier.clone());

        let started = flow
            .start(" A@X.com ", &password("Secret1!"), None)
            .await
            .expect("start should succeed");
        assert_eq!(started.email, "a@x.com");
        assert!(started.email_sent);

        let code = notifier
            .last_code
            .lock()
            .expect("lock")
            .clone()
            .expect("a code was delivered");
        let verified = flow
            .verify(started.session_id, &code, &password("Secret1!"))
            .await
            .expect("verify should succeed");

        assert_eq!(verified.account.email, "a@x.com");
        assert!(!verified.tokens.access.is_empty());
        assert!(users.exists("a@x.com").await.expect("exists"));
        assert!(!flow.store().contains(started.session_id).await);
    }

    #[tokio::test]
    async fn five_bad_codes_then_too_many_attempts() {
        let users: Arc<InMemoryUserStore> = Arc::new(InMemoryUserStore::new());
        let notifier = Arc::new(CapturingNotifier::default());
        let flow = flow_with(SignupConfig::new(), users.clone(), notifier.clone());

        let started = flow
            .start("a@x.com", &password("Secret1!"), None)
            .await
            .expect("start");
        let code = notifier
            .last_code
            .lock()
            .expect("lock")
            .clone()
            .expect("code");
        let wrong = if code == "0000" { "1111" } else { "0000" };

        for _ in 0..5 {
            let err = flow
                .verify(started.session_id, wrong, &password("Secret1!"))
                .await
                .err();
            assert!(matches!(
                err,
                Some(SignupFlowError::Rejected(SignupError::InvalidCode))
            ));
        }

        let err = flow
            .verify(started.session_id, &code, &password("Secret1!"))
            .await
            .err();
        assert!(matches!(
            err,
            Some(SignupFlowError::Rejected(SignupError::TooManyAttempts))
        ));
        assert!(!flow.store().contains(started.session_id).await);
        assert!(!users.exists("a@x.com").await.expect("exists"));
    }

    #[tokio::test]
    async fn start_rejects_registered_email_and_bad_input() {
        let users: Arc<InMemoryUserStore> = Arc::new(InMemoryUserStore::new());
        let _ = users
            .create(NewAccount {
                email: "taken@x.com".to_string(),
                password: None,
            })
            .await
            .expect("create");
        let flow = flow_with(SignupConfig::new(), users, Arc::new(LogNotifier));

        let err = flow
            .start("taken@x.com", &password("Secret1!"), None)
            .await
            .err();
        assert!(matches!(
            err,
            Some(SignupFlowError::Rejected(SignupError::AlreadyRegistered))
        ));

        let err = flow
            .start("not-an-email", &password("Secret1!"), None)
            .await
            .err();
        assert!(matches!(
            err,
            Some(SignupFlowError::Rejected(SignupError::InvalidEmail))
        ));

        let err = flow.start("a@x.com", &password("short"), None).await.err();
        assert!(matches!(
            err,
            Some(SignupFlowError::Rejected(SignupError::InvalidPassword))
        ));
    }

    #[tokio::test]
    async fn raced_account_creation_still_consumes_the_session() {
        let users: Arc<InMemoryUserStore> = Arc::new(InMemoryUserStore::new());
        let notifier = Arc::new(CapturingNotifier::default());
        let flow = flow_with(SignupConfig::new(), users.clone(), notifier.clone());

        let started = flow
            .start("a@x.com", &password("Secret1!"), None)
            .await
            .expect("start");
        let code = notifier
            .last_code
            .lock()
            .expect("lock")
            .clone()
            .expect("code");

        // Simulate a concurrent signup winning the email between start and verify.
        let _ = users
            .create(NewAccount {
                email: "a@x.com".to_string(),
                password: None,
            })
            .await
            .expect("create");

        let err = flow
            .verify(started.session_id, &code, &password("Secret1!"))
            .await
            .err();
        assert!(matches!(
            err,
            Some(SignupFlowError::Rejected(SignupError::AlreadyRegistered))
        ));
        // Consumed, not replayable.
        assert!(!flow.store().contains(started.session_id).await);
    }

    #[tokio::test]
    async fn notifier_failure_reports_email_not_sent_but_keeps_the_session() {
        let users: Arc<InMemoryUserStore> = Arc::new(InMemoryUserStore::new());
        let flow = flow_with(SignupConfig::new(), users, Arc::new(FailingNotifier));

        let started = flow
            .start("a@x.com", &password("Secret1!"), None)
            .await
            .expect("start should still succeed");
        assert!(!started.email_sent);
        assert!(flow.store().contains(started.session_id).await);

        let resent = flow.resend(started.session_id).await.expect("resend");
        assert!(!resent.email_sent);
        assert_eq!(resent.resends_used, 1);
    }

    #[tokio::test]
    async fn locale_falls_back_and_is_clamped() {
        let users: Arc<InMemoryUserStore> = Arc::new(InMemoryUserStore::new());
        let flow = flow_with(SignupConfig::new(), users, Arc::new(LogNotifier));
        assert_eq!(flow.clamp_locale(None), "en");
        assert_eq!(flow.clamp_locale(Some("  ".to_string())), "en");
        assert_eq!(
            flow.clamp_locale(Some("de-DE,de;q=0.9".to_string())),
            "de-DE,de"
        );
    }

    #[test]
    fn normalize_and_validate_email() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }
}
