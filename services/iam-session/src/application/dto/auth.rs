//! 认证 DTO

use serde::{Deserialize, Serialize};

use crate::domain::account::Account;

/// 注册请求
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub recaptcha_token: String,
}

/// 登录请求
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// 已开启 2FA 的账户在第二步携带
    pub two_factor_code: Option<String>,
}

/// 刷新请求
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshRequest {
    pub refresh_token: String,
}

/// 账户视图
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub two_factor_enabled: bool,
    pub role: String,
}

impl UserResponse {
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.to_string(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            avatar_url: account.avatar_url.clone(),
            email_verified: account.email_verified,
            two_factor_enabled: account.two_factor_enabled,
            role: account.role.clone(),
        }
    }
}

/// 认证响应
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// 访问令牌有效期（毫秒）
    pub expires_in: i64,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn bearer(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        account: &Account,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: UserResponse::from_account(account),
        }
    }
}
