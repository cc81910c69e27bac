//! Refresh Token 实体

use chrono::{DateTime, Utc};
use emporia_common::{AccountId, RefreshTokenId};
use serde::{Deserialize, Serialize};

/// Refresh Token
///
/// 一条已签发刷新令牌的服务端记录。轮换时旧记录被撤销并通过
/// `replaced_by` 指向继任者，形成可审计的令牌链。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    /// 账户 ID
    pub account_id: AccountId,
    /// Token 字符串（签名 JWT）
    pub token: String,
    /// 过期时间
    pub expires_at: DateTime<Utc>,
    /// 是否已撤销
    pub revoked: bool,
    /// 轮换后的继任令牌
    pub replaced_by: Option<String>,
    /// 签发时的客户端 IP
    pub created_by_ip: Option<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// 创建新的 Refresh Token 记录
    pub fn new(
        account_id: AccountId,
        token: String,
        expires_at: DateTime<Utc>,
        created_by_ip: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RefreshTokenId::new(),
            account_id,
            token,
            expires_at,
            revoked: false,
            replaced_by: None,
            created_by_ip,
            created_at,
        }
    }

    /// 检查在给定时刻是否过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 检查是否已撤销
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// 检查在给定时刻是否可用（未过期且未撤销）
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && !self.is_revoked()
    }

    /// 撤销 Token
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// 标记被继任令牌取代
    pub fn replace_with(&mut self, successor: &str) {
        self.revoked = true;
        self.replaced_by = Some(successor.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_token(ttl_minutes: i64) -> RefreshToken {
        let now = Utc::now();
        RefreshToken::new(
            AccountId::new(),
            "token-abc".to_string(),
            now + Duration::minutes(ttl_minutes),
            Some("127.0.0.1".to_string()),
            now,
        )
    }

    #[test]
    fn test_new_token_is_active() {
        let token = create_test_token(10);
        assert!(token.is_active_at(Utc::now()));
        assert!(!token.is_revoked());
        assert!(token.replaced_by.is_none());
    }

    #[test]
    fn test_expired_token_is_not_active() {
        let token = create_test_token(-1);
        assert!(token.is_expired_at(Utc::now()));
        assert!(!token.is_active_at(Utc::now()));
    }

    #[test]
    fn test_revoked_token_is_not_active() {
        let mut token = create_test_token(10);
        token.revoke();
        assert!(!token.is_active_at(Utc::now()));
    }

    #[test]
    fn test_replace_with_revokes_and_links() {
        let mut token = create_test_token(10);
        token.replace_with("token-def");

        assert!(token.is_revoked());
        assert_eq!(token.replaced_by.as_deref(), Some("token-def"));
    }
}
