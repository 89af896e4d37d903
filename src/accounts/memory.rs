use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::accounts::{Account, AccountStore, NewAccount, Role};
use crate::error::AppError;

/// In-memory account store.
///
/// Backs the integration test suite and local development. A single
/// write lock spans every conditional update, which gives the same
/// exactly-one-winner guarantee the Postgres store gets from conditional
/// `UPDATE` statements.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let needle = email.to_lowercase();
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == needle).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn create(&self, draft: NewAccount) -> Result<Account, AppError> {
        let email = draft.email.to_lowercase();
        let mut accounts = self.accounts.write().await;

        if accounts.values().any(|a| a.email == email) {
            return Err(AppError::DuplicateIdentity);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email,
            name: draft.name,
            password_digest: draft.password_digest,
            role: Role::default(),
            verified: false,
            verification_token_digest: draft.verification_token_digest,
            reset_token_digest: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn set_password(&self, id: Uuid, digest: &str) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.password_digest = digest.to_string();
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.reset_token_digest = Some(digest.to_string());
            account.reset_token_expires_at = Some(expires_at);
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_verification_token(&self, id: Uuid, digest: &str) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id) {
            account.verification_token_digest = Some(digest.to_string());
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_by_verification_digest(
        &self,
        digest: &str,
    ) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.verification_token_digest.as_deref() == Some(digest))
            .cloned())
    }

    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        new_password_digest: &str,
    ) -> Result<Option<Account>, AppError> {
        let mut accounts = self.accounts.write().await;

        let account = accounts.values_mut().find(|a| {
            a.reset_token_digest.as_deref() == Some(digest)
                && a.reset_token_expires_at.map_or(false, |at| at > now)
        });

        Ok(account.map(|a| {
            a.password_digest = new_password_digest.to_string();
            a.reset_token_digest = None;
            a.reset_token_expires_at = None;
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn consume_verification_token(
        &self,
        digest: &str,
    ) -> Result<Option<Account>, AppError> {
        let mut accounts = self.accounts.write().await;

        let account = accounts
            .values_mut()
            .find(|a| a.verification_token_digest.as_deref() == Some(digest) && !a.verified);

        Ok(account.map(|a| {
            a.verified = true;
            a.verification_token_digest = None;
            a.updated_at = Utc::now();
            a.clone()
        }))
    }
}
