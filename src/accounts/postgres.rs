use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::{Account, AccountStore, NewAccount, Role};
use crate::error::AppError;

/// Row shape shared by every query that returns a full account.
type AccountRow = (
    Uuid,
    String,
    String,
    String,
    String,
    bool,
    Option<String>,
    Option<String>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const ACCOUNT_COLUMNS: &str = "id, email, name, password_digest, role, verified, \
     verification_token_digest, reset_token_digest, reset_token_expires_at, \
     created_at, updated_at";

fn account_from_row(row: AccountRow) -> Result<Account, AppError> {
    let role = Role::parse(&row.4)
        .ok_or_else(|| AppError::Internal(format!("unknown role in store: {}", row.4)))?;

    Ok(Account {
        id: row.0,
        email: row.1,
        name: row.2,
        password_digest: row.3,
        role,
        verified: row.5,
        verification_token_digest: row.6,
        reset_token_digest: row.7,
        reset_token_expires_at: row.8,
        created_at: row.9,
        updated_at: row.10,
    })
}

/// Postgres-backed account store.
///
/// Consume operations are single conditional `UPDATE ... RETURNING`
/// statements, so concurrent consumers of the same token are serialized
/// by the database and exactly one wins.
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn create(&self, draft: NewAccount) -> Result<Account, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts
                (id, email, name, password_digest, role, verified,
                 verification_token_digest, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, false, $6, $7, $7)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(draft.email.to_lowercase())
        .bind(&draft.name)
        .bind(&draft.password_digest)
        .bind(Role::default().as_str())
        .bind(&draft.verification_token_digest)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        account_from_row(row)
    }

    async fn set_password(&self, id: Uuid, digest: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE accounts SET password_digest = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(digest)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET reset_token_digest = $1, reset_token_expires_at = $2, updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(digest)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_verification_token(&self, id: Uuid, digest: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET verification_token_digest = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(digest)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_verification_digest(
        &self,
        digest: &str,
    ) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE verification_token_digest = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        new_password_digest: &str,
    ) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE accounts
            SET password_digest = $1,
                reset_token_digest = NULL,
                reset_token_expires_at = NULL,
                updated_at = $2
            WHERE reset_token_digest = $3
              AND reset_token_expires_at > $4
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(new_password_digest)
        .bind(Utc::now())
        .bind(digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn consume_verification_token(
        &self,
        digest: &str,
    ) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE accounts
            SET verified = true,
                verification_token_digest = NULL,
                updated_at = $1
            WHERE verification_token_digest = $2
              AND verified = false
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(Utc::now())
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }
}
