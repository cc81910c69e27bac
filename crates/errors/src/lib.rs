//! emporia-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
///
/// 认证相关的变体是安全边界的一部分：`InvalidCredentials` 对
/// "账户不存在" 和 "密码错误" 统一呈现，防止账户枚举。
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is locked. Please contact support.")]
    AccountLocked,

    #[error("Invalid 2FA code")]
    InvalidTwoFactorCode,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token reuse detected")]
    TokenReused,

    #[error("Provider mismatch: {0}")]
    ProviderMismatch(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn provider_mismatch(msg: impl Into<String>) -> Self {
        Self::ProviderMismatch(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials => 401,
            Self::AccountLocked => 403,
            Self::InvalidTwoFactorCode => 400,
            Self::InvalidToken(_) => 401,
            Self::TokenExpired => 401,
            Self::TokenReused => 401,
            Self::ProviderMismatch(_) => 409,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
            Self::Database(_) => 500,
            Self::ExternalService(_) => 502,
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn problem_type(&self) -> String {
        let slug = match self {
            Self::InvalidCredentials => "invalid-credentials",
            Self::AccountLocked => "account-locked",
            Self::InvalidTwoFactorCode => "invalid-two-factor-code",
            Self::InvalidToken(_) => "invalid-token",
            Self::TokenExpired => "token-expired",
            Self::TokenReused => "token-reused",
            Self::ProviderMismatch(_) => "provider-mismatch",
            Self::NotFound(_) => "not-found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
            Self::Database(_) => "database",
            Self::ExternalService(_) => "external-service",
        };
        format!("https://api.emporia.sh/problems/{}", slug)
    }

    fn problem_title(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid Credentials".to_string(),
            Self::AccountLocked => "Account Locked".to_string(),
            Self::InvalidTwoFactorCode => "Invalid Two-Factor Code".to_string(),
            Self::InvalidToken(_) => "Invalid Token".to_string(),
            Self::TokenExpired => "Token Expired".to_string(),
            Self::TokenReused => "Token Reuse Detected".to_string(),
            Self::ProviderMismatch(_) => "Provider Mismatch".to_string(),
            Self::NotFound(_) => "Resource Not Found".to_string(),
            Self::Validation(_) => "Validation Error".to_string(),
            Self::Conflict(_) => "Conflict".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
            Self::Database(_) => "Database Error".to_string(),
            Self::ExternalService(_) => "External Service Error".to_string(),
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
