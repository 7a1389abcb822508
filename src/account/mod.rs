//! Collaborator interfaces around the credential-issuance core.
//!
//! The permanent user store, the email notifier, and the access/refresh
//! token issuer all live outside this service. The core talks to them
//! through the traits below and assumes nothing about their internals
//! beyond what the trait contracts state; in particular, [`UserStore::create`]
//! must be an atomic create-if-absent, because the existence check at
//! signup start is advisory only.
//!
//! The in-memory/logging implementations back the test suite and the dev
//! wiring of the binary; production deployments inject their own.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use secrecy::SecretString;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// A permanent account as the user store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    /// External identity provider, once a social login has touched the
    /// account. Set unconditionally by the social login flow.
    pub provider: Option<String>,
    pub provider_subject: Option<String>,
}

/// Payload for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    /// Candidate password for email/password accounts; social accounts
    /// have none. The store owns how (and whether) this is persisted.
    pub password: Option<SecretString>,
}

/// Outcome of an atomic create-if-absent.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Account),
    AlreadyExists,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Advisory existence check by normalized email.
    async fn exists(&self, email: &str) -> Result<bool>;

    /// Create an account if the email is free. Atomic with respect to
    /// concurrent creates for the same email.
    async fn create(&self, account: NewAccount) -> Result<CreateOutcome>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Record which external identity an account belongs to.
    async fn link_identity(&self, id: Uuid, provider: &str, subject: &str) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a one-time code, or return an error to be logged by the
    /// caller. Delivery failures never roll anything back.
    async fn send_code(&self, email: &str, code: &str, ttl: Duration, locale: &str) -> Result<()>;
}

/// Access/refresh pair minted for an authenticated account.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self, account: &Account) -> Result<TokenPair>;
}

/// Local dev notifier that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_code(&self, email: &str, code: &str, ttl: Duration, locale: &str) -> Result<()> {
        info!(
            to_email = %email,
            code = %code,
            ttl_seconds = ttl.as_secs(),
            locale = %locale,
            "otp delivery stub"
        );
        Ok(())
    }
}

/// Dev credential issuer minting opaque random bearer strings.
#[derive(Clone, Debug)]
pub struct OpaqueCredentialIssuer;

fn random_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate credential token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[async_trait]
impl CredentialIssuer for OpaqueCredentialIssuer {
    async fn issue(&self, _account: &Account) -> Result<TokenPair> {
        Ok(TokenPair {
            access: random_token()?,
            refresh: random_token()?,
        })
    }
}

/// Mutex-guarded map keyed by email; the single lock makes
/// create-if-absent atomic.
#[derive(Default)]
pub struct InMemoryUserStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn exists(&self, email: &str) -> Result<bool> {
        Ok(self.accounts.lock().await.contains_key(email))
    }

    async fn create(&self, account: NewAccount) -> Result<CreateOutcome> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&account.email) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email.clone(),
            provider: None,
            provider_subject: None,
        };
        accounts.insert(account.email, created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.accounts.lock().await.get(email).cloned())
    }

    async fn link_identity(&self, id: Uuid, provider: &str, subject: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().await;
        for account in accounts.values_mut() {
            if account.id == id {
                account.provider = Some(provider.to_string());
                account.provider_subject = Some(subject.to_string());
                return Ok(());
            }
        }
        anyhow::bail!("no account with id {id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_first_writer_wins() {
        let store = InMemoryUserStore::new();
        let new_account = NewAccount {
            email: "alice@example.com".to_string(),
            password: None,
        };

        let first = store.create(new_account.clone()).await.expect("create");
        assert!(matches!(first, CreateOutcome::Created(_)));

        let second = store.create(new_account).await.expect("create");
        assert!(matches!(second, CreateOutcome::AlreadyExists));

        assert!(store.exists("alice@example.com").await.expect("exists"));
        assert!(!store.exists("bob@example.com").await.expect("exists"));
    }

    #[tokio::test]
    async fn link_identity_sets_the_provider_pair() {
        let store = InMemoryUserStore::new();
        let created = store
            .create(NewAccount {
                email: "alice@example.com".to_string(),
                password: None,
            })
            .await
            .expect("create");
        let CreateOutcome::Created(account) = created else {
            panic!("expected a created account");
        };

        store
            .link_identity(account.id, "google", "sub-123")
            .await
            .expect("link");

        let found = store
            .find_by_email("alice@example.com")
            .await
            .expect("find")
            .expect("account should exist");
        assert_eq!(found.provider.as_deref(), Some("google"));
        assert_eq!(found.provider_subject.as_deref(), Some("sub-123"));
    }

    #[tokio::test]
    async fn opaque_issuer_mints_distinct_pairs() {
        let issuer = OpaqueCredentialIssuer;
        let account = Account {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            provider: None,
            provider_subject: None,
        };
        let first = issuer.issue(&account).await.expect("issue");
        let second = issuer.issue(&account).await.expect("issue");
        assert_ne!(first.access, second.access);
        assert_ne!(first.refresh, second.refresh);
        assert_ne!(first.access, first.refresh);
    }
}
