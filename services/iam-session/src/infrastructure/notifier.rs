//! SMTP 邮件通知
//!
//! 密码重置令牌在这里签发、落库、一次性核销；核心层只看到
//! [`EmailNotifier`] 接口。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use emporia_adapter_email::EmailSender;
use emporia_common::AccountId;
use emporia_errors::{AppError, AppResult};
use rand::RngCore;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::services::email_notifier::EmailNotifier;

/// 重置令牌有效期
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub struct SmtpEmailNotifier {
    sender: Arc<dyn EmailSender>,
    pool: PgPool,
    reset_link_base_url: String,
}

impl SmtpEmailNotifier {
    pub fn new(sender: Arc<dyn EmailSender>, pool: PgPool, reset_link_base_url: String) -> Self {
        Self {
            sender,
            pool,
            reset_link_base_url,
        }
    }

    /// 32 字节随机令牌，hex 编码
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    async fn store_reset_token(
        &self,
        account_id: &AccountId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token, account_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token)
        .bind(account_id.0)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store reset token: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl EmailNotifier for SmtpEmailNotifier {
    async fn send_verification_email(
        &self,
        account_id: &AccountId,
        email: &str,
    ) -> AppResult<()> {
        let body = format!(
            "Welcome to Emporia!\n\n\
             Your account has been created. Please verify your email address \
             by following the link we sent to {}.\n",
            email
        );

        self.sender
            .send_text_email(email, "Welcome to Emporia", &body)
            .await?;

        info!(account_id = %account_id, "Verification email sent");
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        account_id: &AccountId,
        email: &str,
    ) -> AppResult<()> {
        let token = Self::generate_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.store_reset_token(account_id, &token, expires_at).await?;

        let link = format!("{}?token={}", self.reset_link_base_url, token);
        let body = format!(
            "We received a request to reset your password.\n\n\
             Reset it here (valid for {} minutes):\n{}\n\n\
             If you did not request this, you can ignore this email.\n",
            RESET_TOKEN_TTL_MINUTES, link
        );

        self.sender
            .send_text_email(email, "Reset your Emporia password", &body)
            .await?;

        info!(account_id = %account_id, "Password reset email sent");
        Ok(())
    }

    async fn verify_password_reset_token(&self, token: &str) -> AppResult<AccountId> {
        // DELETE ... RETURNING：核销是单条原子操作，令牌只能用一次
        let row: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(
            r#"
            DELETE FROM password_reset_tokens
            WHERE token = $1
            RETURNING account_id, expires_at
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to consume reset token: {}", e)))?;

        let (account_id, expires_at) =
            row.ok_or_else(|| AppError::validation("Invalid password reset token"))?;

        if Utc::now() > expires_at {
            return Err(AppError::validation("Password reset token has expired"));
        }

        Ok(AccountId::from_uuid(account_id))
    }
}
