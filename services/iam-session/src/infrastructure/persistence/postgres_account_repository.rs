use async_trait::async_trait;
use emporia_common::{AccountId, AuditInfo};
use emporia_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::domain::account::{Account, AuthProvider};
use crate::domain::repositories::AccountRepository;
use crate::domain::value_objects::{Email, HashedPassword};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, \
     avatar_url, email_verified, enabled, locked, failed_login_attempts, lock_time, \
     two_factor_enabled, two_factor_secret, provider, provider_id, role, created_at, updated_at";

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find account: {}", e)))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Account>> {
        debug!("Finding account by email");

        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find account: {}", e)))?;

        row.map(Account::try_from).transpose()
    }

    async fn exists_by_email(&self, email: &Email) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to check email: {}", e)))?;

        Ok(exists)
    }

    async fn save(&self, account: &Account) -> AppResult<()> {
        debug!(account_id = %account.id, "Saving account");

        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, password_hash, first_name, last_name, phone,
                                  avatar_url, email_verified, enabled, locked,
                                  failed_login_attempts, lock_time, two_factor_enabled,
                                  two_factor_secret, provider, provider_id, role,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(account.id.0)
        .bind(account.email.as_str())
        .bind(account.password_hash.as_ref().map(|h| h.as_str()))
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone)
        .bind(&account.avatar_url)
        .bind(account.email_verified)
        .bind(account.enabled)
        .bind(account.locked)
        .bind(account.failed_login_attempts)
        .bind(account.lock_time)
        .bind(account.two_factor_enabled)
        .bind(&account.two_factor_secret)
        .bind(account.provider.as_str())
        .bind(&account.provider_id)
        .bind(&account.role)
        .bind(account.audit_info.created_at)
        .bind(account.audit_info.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save account: {}", e)))?;

        Ok(())
    }

    async fn update(&self, account: &Account) -> AppResult<()> {
        debug!(account_id = %account.id, "Updating account");

        sqlx::query(
            r#"
            UPDATE accounts
            SET email = $2, password_hash = $3, first_name = $4, last_name = $5,
                phone = $6, avatar_url = $7, email_verified = $8, enabled = $9,
                locked = $10, failed_login_attempts = $11, lock_time = $12,
                two_factor_enabled = $13, two_factor_secret = $14, provider = $15,
                provider_id = $16, role = $17, updated_at = $18
            WHERE id = $1
            "#,
        )
        .bind(account.id.0)
        .bind(account.email.as_str())
        .bind(account.password_hash.as_ref().map(|h| h.as_str()))
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone)
        .bind(&account.avatar_url)
        .bind(account.email_verified)
        .bind(account.enabled)
        .bind(account.locked)
        .bind(account.failed_login_attempts)
        .bind(account.lock_time)
        .bind(account.two_factor_enabled)
        .bind(&account.two_factor_secret)
        .bind(account.provider.as_str())
        .bind(&account.provider_id)
        .bind(&account.role)
        .bind(account.audit_info.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update account: {}", e)))?;

        Ok(())
    }

    async fn increment_failed_attempts(&self, id: &AccountId) -> AppResult<i32> {
        // 单条原子自增，并发失败不会丢计数
        let attempts: i32 = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET failed_login_attempts = failed_login_attempts + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to increment attempts: {}", e)))?;

        Ok(attempts)
    }

    async fn reset_failed_attempts(&self, id: &AccountId) -> AppResult<()> {
        sqlx::query(
            "UPDATE accounts SET failed_login_attempts = 0, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to reset attempts: {}", e)))?;

        Ok(())
    }

    async fn lock(&self, id: &AccountId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET locked = TRUE, lock_time = NOW(), updated_at = NOW()
            WHERE id = $1 AND locked = FALSE
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to lock account: {}", e)))?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    avatar_url: Option<String>,
    email_verified: bool,
    enabled: bool,
    locked: bool,
    failed_login_attempts: i32,
    lock_time: Option<chrono::DateTime<chrono::Utc>>,
    two_factor_enabled: bool,
    two_factor_secret: Option<String>,
    provider: String,
    provider_id: Option<String>,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let provider = AuthProvider::from_name(&row.provider)
            .ok_or_else(|| AppError::database(format!("Unknown provider: {}", row.provider)))?;

        Ok(Self {
            id: AccountId::from_uuid(row.id),
            // 库中存的邮箱已经规范化过，不再重跑格式校验
            email: Email(row.email),
            password_hash: row.password_hash.map(HashedPassword::from_hash),
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            avatar_url: row.avatar_url,
            email_verified: row.email_verified,
            enabled: row.enabled,
            locked: row.locked,
            failed_login_attempts: row.failed_login_attempts,
            lock_time: row.lock_time,
            two_factor_enabled: row.two_factor_enabled,
            two_factor_secret: row.two_factor_secret,
            provider,
            provider_id: row.provider_id,
            role: row.role,
            audit_info: AuditInfo {
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
    }
}
