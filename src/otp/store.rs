//! In-memory store for pending signup sessions.
//!
//! Sessions are ephemeral by definition, so they live in a single mutex-guarded
//! map shared by all request handlers. Every operation is one critical section,
//! which makes the increment-then-check discipline on `attempts` and `resends`
//! linearizable without any per-entry machinery: concurrent callers cannot
//! interleave inside a session mutation.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::SignupError;
use super::session::{SignupConfig, SignupSession};

/// Result of creating a session: the bearer id and the one plaintext code.
#[derive(Debug)]
pub struct StartedSession {
    pub session_id: Uuid,
    pub code: String,
    pub ttl: Duration,
}

/// Result of re-issuing a code on an active session.
#[derive(Debug)]
pub struct ReissuedCode {
    pub email: String,
    pub locale: String,
    pub code: String,
    pub ttl_left: Duration,
    pub resends_used: u32,
    pub resends_left: u32,
}

pub struct SessionStore {
    config: SignupConfig,
    sessions: Mutex<HashMap<Uuid, SignupSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(config: SignupConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SignupConfig {
        &self.config
    }

    /// Create a session and return its id plus the plaintext code.
    ///
    /// The caller is responsible for handing the code to the notifier; it is
    /// not retained here in any recoverable form.
    pub async fn start(&self, email: String, password: &str, locale: String) -> StartedSession {
        let (session, code) = SignupSession::new(email, password, locale, &self.config);
        let session_id = session.session_id();
        let mut sessions = self.sessions.lock().await;
        // Opportunistic cleanup keeps abandoned signups from accumulating.
        let now = Instant::now();
        sessions.retain(|_, entry| !entry.is_expired(now));
        sessions.insert(session_id, session);
        StartedSession {
            session_id,
            code,
            ttl: self.config.ttl(),
        }
    }

    /// Check a code and password against a session.
    ///
    /// The attempt is recorded before the code comparison, so every call
    /// counts against the cap whether it succeeds or not. On success the
    /// session is removed and handed to the caller in one step; it can never
    /// be verified twice.
    pub async fn verify(
        &self,
        session_id: Uuid,
        code: &str,
        password: &str,
    ) -> Result<SignupSession, SignupError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(SignupError::SessionNotFound)?;

        if session.is_expired(Instant::now()) {
            sessions.remove(&session_id);
            return Err(SignupError::SessionExpired);
        }

        if session.attempts() >= self.config.max_attempts() {
            sessions.remove(&session_id);
            return Err(SignupError::TooManyAttempts);
        }

        session.record_attempt();

        if !session.matches_code(code) {
            return Err(SignupError::InvalidCode);
        }

        if !session.matches_password(password) {
            return Err(SignupError::PasswordMismatch);
        }

        // Consume on success: account materialization happens outside, but the
        // session is gone either way, so a raced or failed materialization can
        // never be replayed with the same code.
        sessions
            .remove(&session_id)
            .ok_or(SignupError::SessionNotFound)
    }

    /// Re-issue the code on an active session.
    ///
    /// Does not touch `attempts`: resending never forgives earlier bad
    /// guesses. Reaching the resend cap fails the resend but leaves the
    /// session verifiable against its current code.
    pub async fn resend(&self, session_id: Uuid) -> Result<ReissuedCode, SignupError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(SignupError::SessionNotFound)?;

        let now = Instant::now();
        if session.is_expired(now) {
            sessions.remove(&session_id);
            return Err(SignupError::SessionExpired);
        }

        if session.resends() >= self.config.max_resends() {
            return Err(SignupError::ResendLimitReached);
        }

        let code = session.rotate_code(&self.config);
        session.record_resend();

        Ok(ReissuedCode {
            email: session.email().to_string(),
            locale: session.locale().to_string(),
            code,
            ttl_left: session.ttl_left(now),
            resends_used: session.resends(),
            resends_left: self.config.max_resends() - session.resends(),
        })
    }

    /// Whether a session is still present (active).
    pub async fn contains(&self, session_id: Uuid) -> bool {
        self.sessions.lock().await.contains_key(&session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Barrier;

    fn store() -> SessionStore {
        SessionStore::new(SignupConfig::new())
    }

    async fn started(store: &SessionStore) -> StartedSession {
        store
            .start(
                "alice@example.com".to_string(),
                "Secret1!",
                "en".to_string(),
            )
            .await
    }

    #[tokio::test]
    async fn verify_consumes_the_session_on_success() {
        let store = store();
        let started = started(&store).await;

        let session = store
            .verify(started.session_id, &started.code, "Secret1!")
            .await
            .expect("verify should succeed");
        assert_eq!(session.email(), "alice@example.com");
        assert!(!store.contains(started.session_id).await);

        let replay = store
            .verify(started.session_id, &started.code, "Secret1!")
            .await;
        assert_eq!(replay.err(), Some(SignupError::SessionNotFound));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_code_then_wrong_password() {
        let store = store();
        let started = started(&store).await;

        let wrong_code = store
            .verify(started.session_id, "bad", "Secret1!")
            .await
            .err();
        assert_eq!(wrong_code, Some(SignupError::InvalidCode));

        let wrong_password = store
            .verify(started.session_id, &started.code, "Other9!")
            .await
            .err();
        assert_eq!(wrong_password, Some(SignupError::PasswordMismatch));

        // Both failures counted, but the session is still active.
        assert!(store.contains(started.session_id).await);
    }

    #[tokio::test]
    async fn sixth_verify_reports_too_many_attempts_and_deletes() {
        let store = store();
        let started = started(&store).await;

        for _ in 0..5 {
            let err = store
                .verify(started.session_id, "bad", "Secret1!")
                .await
                .err();
            assert_eq!(err, Some(SignupError::InvalidCode));
        }

        let err = store
            .verify(started.session_id, &started.code, "Secret1!")
            .await
            .err();
        assert_eq!(err, Some(SignupError::TooManyAttempts));
        assert!(!store.contains(started.session_id).await);
    }

    #[tokio::test]
    async fn concurrent_verifies_never_exceed_the_attempt_cap() {
        // 20 simultaneous guesses against a cap of 5: exactly 5 may be judged
        // on the code, the rest must observe the exhausted session.
        let store = Arc::new(store());
        let started = started(&store).await;
        let barrier = Arc::new(Barrier::new(20));

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let session_id = started.session_id;
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                store.verify(session_id, "bad", "Secret1!").await
            }));
        }

        let mut invalid_code = 0;
        let mut exhausted = 0;
        for task in tasks {
            match task.await.expect("task should not panic") {
                Err(SignupError::InvalidCode) => invalid_code += 1,
                Err(SignupError::TooManyAttempts) | Err(SignupError::SessionNotFound) => {
                    exhausted += 1;
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(invalid_code, 5);
        assert_eq!(exhausted, 15);
        assert!(!store.contains(started.session_id).await);
    }

    #[tokio::test]
    async fn expired_session_fails_verify_and_resend_identically() {
        let store = SessionStore::new(SignupConfig::new().with_ttl(Duration::ZERO));
        let started = store
            .start(
                "alice@example.com".to_string(),
                "Secret1!",
                "en".to_string(),
            )
            .await;

        let err = store.resend(started.session_id).await.err();
        assert_eq!(err, Some(SignupError::SessionExpired));

        // The expiry check already deleted the session.
        let err = store
            .verify(started.session_id, &started.code, "Secret1!")
            .await
            .err();
        assert_eq!(err, Some(SignupError::SessionNotFound));
    }

    #[tokio::test]
    async fn verify_on_expired_session_reports_expiry_first() {
        let store = SessionStore::new(SignupConfig::new().with_ttl(Duration::ZERO));
        let started = store
            .start(
                "alice@example.com".to_string(),
                "Secret1!",
                "en".to_string(),
            )
            .await;

        let err = store
            .verify(started.session_id, &started.code, "Secret1!")
            .await
            .err();
        assert_eq!(err, Some(SignupError::SessionExpired));
        assert!(!store.contains(started.session_id).await);
    }

    #[tokio::test]
    async fn resend_rotates_the_code_without_resetting_attempts() {
        let store = store();
        let started = started(&store).await;

        // Burn two attempts first.
        for _ in 0..2 {
            let _ = store.verify(started.session_id, "bad", "Secret1!").await;
        }

        let reissued = store
            .resend(started.session_id)
            .await
            .expect("resend should succeed");
        assert_eq!(reissued.resends_used, 1);
        assert_eq!(reissued.resends_left, 2);

        // The two earlier failures still count: three more bad guesses
        // exhaust the cap even though the code was just re-issued.
        for _ in 0..3 {
            let err = store
                .verify(started.session_id, "bad", "Secret1!")
                .await
                .err();
            assert_eq!(err, Some(SignupError::InvalidCode));
        }
        let err = store
            .verify(started.session_id, &reissued.code, "Secret1!")
            .await
            .err();
        assert_eq!(err, Some(SignupError::TooManyAttempts));
    }

    #[tokio::test]
    async fn two_resends_yield_codes_where_only_the_latest_validates() {
        let store = store();
        let started = started(&store).await;

        let first = store.resend(started.session_id).await.expect("first resend");
        let second = store
            .resend(started.session_id)
            .await
            .expect("second resend");

        if first.code != second.code {
            let err = store
                .verify(started.session_id, &first.code, "Secret1!")
                .await
                .err();
            assert_eq!(err, Some(SignupError::InvalidCode));
        }
        let session = store
            .verify(started.session_id, &second.code, "Secret1!")
            .await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn resend_cap_fails_without_killing_the_session() {
        let store = SessionStore::new(SignupConfig::new().with_max_resends(1));
        let started = started(&store).await;

        let reissued = store.resend(started.session_id).await.expect("resend");
        let err = store.resend(started.session_id).await.err();
        assert_eq!(err, Some(SignupError::ResendLimitReached));

        // The current code still verifies.
        let session = store
            .verify(started.session_id, &reissued.code, "Secret1!")
            .await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn start_purges_expired_sessions() {
        let store = SessionStore::new(SignupConfig::new().with_ttl(Duration::ZERO));
        let first = started(&store).await;
        let _second = started(&store).await;
        assert!(!store.contains(first.session_id).await);
    }
}
