//! 邮件通知接口

use async_trait::async_trait;
use emporia_common::AccountId;
use emporia_errors::AppResult;

/// 邮件通知
///
/// 密码重置令牌由实现方签发、存储并核销，核心层只拿回账户 ID。
#[async_trait]
pub trait EmailNotifier: Send + Sync {
    /// 注册后的验证邮件
    async fn send_verification_email(&self, account_id: &AccountId, email: &str)
    -> AppResult<()>;

    /// 密码重置邮件（实现方生成并存储一次性令牌）
    async fn send_password_reset_email(
        &self,
        account_id: &AccountId,
        email: &str,
    ) -> AppResult<()>;

    /// 核销密码重置令牌，返回其账户 ID。
    /// 未知、过期或已用过的令牌返回 Validation 错误。
    async fn verify_password_reset_token(&self, token: &str) -> AppResult<AccountId>;
}
