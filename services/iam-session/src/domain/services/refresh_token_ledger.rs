//! 刷新令牌台账
//!
//! 签发、轮换、撤销与清理。轮换走一次性语义：出示已撤销的
//! 令牌视为被盗信号，立刻吊销该账户全部会话。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use emporia_auth_core::TokenCodec;
use emporia_common::{AccountId, Clock};
use emporia_errors::{AppError, AppResult};
use tracing::{debug, info, warn};

use crate::domain::account::Account;
use crate::domain::refresh_token::RefreshToken;
use crate::domain::repositories::{AccountRepository, RefreshTokenRepository};

/// 一次成功轮换的产物
#[derive(Debug)]
pub struct RotatedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub account: Account,
}

/// 刷新令牌台账
pub struct RefreshTokenLedger {
    tokens: Arc<dyn RefreshTokenRepository>,
    accounts: Arc<dyn AccountRepository>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl RefreshTokenLedger {
    pub fn new(
        tokens: Arc<dyn RefreshTokenRepository>,
        accounts: Arc<dyn AccountRepository>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            accounts,
            codec,
            clock,
        }
    }

    /// 为账户签发新的刷新令牌并入账
    pub async fn issue(
        &self,
        account_id: &AccountId,
        client_ip: Option<&str>,
    ) -> AppResult<String> {
        let token = self.codec.issue_refresh(account_id)?;
        let now = self.clock.now();

        let record = RefreshToken::new(
            *account_id,
            token.clone(),
            now + Duration::milliseconds(self.codec.refresh_ttl_ms()),
            client_ip.map(|s| s.to_string()),
            now,
        );
        self.tokens.save(&record).await?;

        debug!(account_id = %account_id, "Refresh token issued");
        Ok(token)
    }

    /// 轮换刷新令牌
    ///
    /// 成功时旧令牌被撤销并链接到继任者，返回新令牌对。
    /// 同一旧令牌并发轮换时恰好一个调用成功，输家与后续
    /// 出示者一律走复用处理。
    pub async fn rotate(&self, presented: &str, client_ip: Option<&str>) -> AppResult<RotatedTokens> {
        // 先查台账。撤销判定必须先于过期判定：被盗令牌往往在
        // 过期之后才被重放，级联吊销不能因此漏掉。
        let record = match self.tokens.find_by_token(presented).await? {
            Some(record) => record,
            None => return Err(self.classify_unknown(presented)),
        };

        if record.is_revoked() {
            return Err(self.handle_reuse(&record).await?);
        }

        if record.is_expired_at(self.clock.now()) {
            return Err(AppError::TokenExpired);
        }

        // CAS 撤销：并发轮换同一令牌时只有一个赢家
        if !self.tokens.revoke(presented).await? {
            return Err(self.handle_reuse(&record).await?);
        }

        let account = self
            .accounts
            .find_by_id(&record.account_id)
            .await?
            .ok_or_else(|| AppError::invalid_token("Token does not belong to a known account"))?;

        let refresh_token = self.issue(&record.account_id, client_ip).await?;
        self.tokens.mark_replaced(presented, &refresh_token).await?;

        let access_token = self.codec.issue_access(&account.id, account.email.as_str())?;

        info!(account_id = %account.id, "Refresh token rotated");
        Ok(RotatedTokens {
            access_token,
            refresh_token,
            account,
        })
    }

    /// 撤销单个令牌（登出）。未知令牌静默成功。
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        self.tokens.revoke(token).await?;
        Ok(())
    }

    /// 撤销账户全部令牌（全端登出 / 密码重置后）
    pub async fn revoke_all(&self, account_id: &AccountId) -> AppResult<u64> {
        let revoked = self.tokens.revoke_all_for_account(account_id).await?;
        if revoked > 0 {
            info!(account_id = %account_id, revoked, "All refresh tokens revoked");
        }
        Ok(revoked)
    }

    /// 清理已撤销或已过期的记录
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.tokens.delete_dead(now).await
    }

    /// 台账里没有的令牌只定错误类别，不改任何状态。
    /// 过期与否都报"不认识"，不泄露它曾否有效。
    fn classify_unknown(&self, presented: &str) -> AppError {
        match self.codec.verify(presented) {
            Ok(claims) if !claims.is_refresh_token() => {
                AppError::invalid_token("Access token cannot be used to refresh")
            }
            Ok(_) | Err(AppError::TokenExpired) => {
                AppError::invalid_token("Refresh token is not recognized")
            }
            Err(err) => err,
        }
    }

    /// 复用已撤销令牌：吊销全账户会话并返回 TokenReused
    async fn handle_reuse(&self, record: &RefreshToken) -> AppResult<AppError> {
        warn!(
            account_id = %record.account_id,
            "Revoked refresh token presented again, revoking all sessions"
        );
        metrics::counter!("iam_session_token_reuse_total").increment(1);

        self.tokens.revoke_all_for_account(&record.account_id).await?;
        Ok(AppError::TokenReused)
    }
}
