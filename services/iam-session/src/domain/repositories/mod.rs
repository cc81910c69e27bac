//! 仓储接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emporia_common::AccountId;
use emporia_errors::AppResult;

use crate::domain::account::Account;
use crate::domain::refresh_token::RefreshToken;
use crate::domain::value_objects::Email;

/// 账户仓储
///
/// 失败计数相关操作必须是存储层原子操作，并发登录失败下
/// 计数不得丢失更新。
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>>;

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Account>>;

    async fn exists_by_email(&self, email: &Email) -> AppResult<bool>;

    async fn save(&self, account: &Account) -> AppResult<()>;

    async fn update(&self, account: &Account) -> AppResult<()>;

    /// 原子自增失败计数，返回自增后的值
    async fn increment_failed_attempts(&self, id: &AccountId) -> AppResult<i32>;

    /// 失败计数清零（登录成功后）
    async fn reset_failed_attempts(&self, id: &AccountId) -> AppResult<()>;

    /// 锁定账户（幂等）
    async fn lock(&self, id: &AccountId) -> AppResult<()>;
}

/// Refresh Token 仓储
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshToken>>;

    async fn save(&self, token: &RefreshToken) -> AppResult<()>;

    /// CAS 撤销：仅当记录尚未撤销时置位。
    /// 返回 true 表示本次调用完成了撤销，false 表示已被他人撤销。
    async fn revoke(&self, token: &str) -> AppResult<bool>;

    /// 记录继任令牌
    async fn mark_replaced(&self, token: &str, replaced_by: &str) -> AppResult<()>;

    /// 撤销账户名下所有未撤销令牌，返回受影响条数
    async fn revoke_all_for_account(&self, account_id: &AccountId) -> AppResult<u64>;

    /// 删除已撤销或已过期的记录，返回删除条数
    async fn delete_dead(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
