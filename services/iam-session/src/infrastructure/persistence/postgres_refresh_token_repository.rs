use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emporia_common::{AccountId, RefreshTokenId};
use emporia_errors::{AppError, AppResult};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::domain::refresh_token::RefreshToken;
use crate::domain::repositories::RefreshTokenRepository;

pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        debug!("Finding refresh token");

        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, account_id, token, expires_at, revoked, replaced_by,
                   created_by_ip, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find refresh token: {}", e)))?;

        Ok(row.map(|r| r.into()))
    }

    async fn save(&self, token: &RefreshToken) -> AppResult<()> {
        debug!("Saving refresh token");

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, account_id, token, expires_at, revoked,
                                        replaced_by, created_by_ip, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id.0)
        .bind(token.account_id.0)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(&token.replaced_by)
        .bind(&token.created_by_ip)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save refresh token: {}", e)))?;

        Ok(())
    }

    async fn revoke(&self, token: &str) -> AppResult<bool> {
        // CAS：revoked = FALSE 的守卫让并发轮换恰好一个赢家
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1 AND revoked = FALSE",
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to revoke refresh token: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_replaced(&self, token: &str, replaced_by: &str) -> AppResult<()> {
        sqlx::query("UPDATE refresh_tokens SET replaced_by = $2 WHERE token = $1")
            .bind(token)
            .bind(replaced_by)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to link successor token: {}", e)))?;

        Ok(())
    }

    async fn revoke_all_for_account(&self, account_id: &AccountId) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE account_id = $1 AND revoked = FALSE",
        )
        .bind(account_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to revoke account tokens: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn delete_dead(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM refresh_tokens WHERE revoked = TRUE OR expires_at < $1")
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to delete dead tokens: {}", e)))?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    account_id: Uuid,
    token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
    revoked: bool,
    replaced_by: Option<String>,
    created_by_ip: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: RefreshTokenId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            token: row.token,
            expires_at: row.expires_at,
            revoked: row.revoked,
            replaced_by: row.replaced_by,
            created_by_ip: row.created_by_ip,
            created_at: row.created_at,
        }
    }
}
