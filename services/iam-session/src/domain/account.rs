//! 账户实体

use chrono::{DateTime, Utc};
use emporia_common::{AccountId, AuditInfo};
use emporia_domain_core::{AggregateRoot, Entity};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Email, HashedPassword};

/// 认证提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthProvider {
    Local,
    Google,
    Facebook,
}

impl AuthProvider {
    /// 从提供方名称解析（小写）
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "google" => Some(Self::Google),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

impl Default for AuthProvider {
    fn default() -> Self {
        Self::Local
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 账户实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: Email,
    /// 联合身份账户没有本地密码
    pub password_hash: Option<HashedPassword>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub enabled: bool,
    // 账户锁定相关
    pub locked: bool,
    pub failed_login_attempts: i32,
    pub lock_time: Option<DateTime<Utc>>,
    // 两步验证
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub role: String,
    pub audit_info: AuditInfo,
}

impl Account {
    /// 本地注册账户
    pub fn new(
        email: Email,
        password_hash: HashedPassword,
        first_name: String,
        last_name: String,
        phone: Option<String>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            email,
            password_hash: Some(password_hash),
            first_name,
            last_name,
            phone,
            avatar_url: None,
            email_verified: false,
            enabled: true,
            locked: false,
            failed_login_attempts: 0,
            lock_time: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            provider: AuthProvider::Local,
            provider_id: None,
            role: "user".to_string(),
            audit_info: AuditInfo::default(),
        }
    }

    /// 联合身份账户（提供方已验证邮箱，无本地密码）
    pub fn federated(
        email: Email,
        first_name: String,
        last_name: String,
        avatar_url: Option<String>,
        provider: AuthProvider,
        provider_id: String,
    ) -> Self {
        Self {
            id: AccountId::new(),
            email,
            password_hash: None,
            first_name,
            last_name,
            phone: None,
            avatar_url,
            email_verified: true,
            enabled: true,
            locked: false,
            failed_login_attempts: 0,
            lock_time: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            provider,
            provider_id: Some(provider_id),
            role: "user".to_string(),
            audit_info: AuditInfo::default(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// 校验明文密码；无本地密码的账户永远不匹配
    pub fn verify_password(&self, plain: &str) -> bool {
        match &self.password_hash {
            Some(hash) => hash.verify(plain).unwrap_or(false),
            None => false,
        }
    }

    pub fn set_password(&mut self, password_hash: HashedPassword) {
        self.password_hash = Some(password_hash);
        self.touch();
    }

    // ========================================================
    // 账户锁定相关方法
    // ========================================================

    /// 记录登录失败，达到阈值时锁定。返回本次是否触发锁定。
    pub fn record_login_failure(&mut self, max_attempts: i32) -> bool {
        self.failed_login_attempts += 1;
        self.touch();

        if self.failed_login_attempts >= max_attempts && !self.locked {
            self.lock();
            return true;
        }
        false
    }

    /// 锁定账户
    pub fn lock(&mut self) {
        self.locked = true;
        self.lock_time = Some(Utc::now());
        self.touch();

        tracing::warn!(account_id = %self.id, "Account locked");
    }

    /// 解锁账户并清空失败计数
    pub fn unlock(&mut self) {
        self.locked = false;
        self.lock_time = None;
        self.failed_login_attempts = 0;
        self.touch();

        tracing::info!(account_id = %self.id, "Account unlocked");
    }

    /// 清除登录失败记录（登录成功后）
    pub fn clear_login_failures(&mut self) {
        self.failed_login_attempts = 0;
        self.touch();
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    // ========================================================
    // 两步验证相关方法
    // ========================================================

    /// 暂存 2FA secret（待首码确认）
    pub fn stage_two_factor_secret(&mut self, secret: String) {
        self.two_factor_secret = Some(secret);
        self.touch();
    }

    /// 确认并启用 2FA
    pub fn enable_two_factor(&mut self) {
        self.two_factor_enabled = true;
        self.touch();
    }

    /// 关闭 2FA 并丢弃 secret
    pub fn disable_two_factor(&mut self) {
        self.two_factor_enabled = false;
        self.two_factor_secret = None;
        self.touch();
    }

    pub fn mark_email_verified(&mut self) {
        self.email_verified = true;
        self.touch();
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Account {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}

// ============================================================
// 单元测试
// ============================================================
