//! emporia-config - 配置加载库

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// JWT 配置
///
/// 过期时间以毫秒为单位，`expires_in` 响应字段直接引用这里。
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    #[serde(default = "default_access_token_expiration_ms")]
    pub access_token_expiration_ms: i64,
    #[serde(default = "default_refresh_token_expiration_ms")]
    pub refresh_token_expiration_ms: i64,
}

fn default_access_token_expiration_ms() -> i64 {
    900_000 // 15 minutes
}

fn default_refresh_token_expiration_ms() -> i64 {
    604_800_000 // 7 days
}

/// 账户锁定配置
#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: i32,
}

fn default_max_failed_attempts() -> i32 {
    5
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
        }
    }
}

/// TOTP 配置
#[derive(Debug, Clone, Deserialize)]
pub struct TotpConfig {
    #[serde(default = "default_totp_issuer")]
    pub issuer: String,
}

fn default_totp_issuer() -> String {
    "Emporia".to_string()
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: default_totp_issuer(),
        }
    }
}

/// 令牌清理任务配置
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    86_400 // once daily
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 邮件配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub reset_link_base_url: String,
}

fn default_timeout_secs() -> u64 {
    30
}

/// reCAPTCHA 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RecaptchaConfig {
    pub secret: Secret<String>,
    #[serde(default = "default_recaptcha_verify_url")]
    pub verify_url: String,
}

fn default_recaptcha_verify_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub totp: TotpConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub email: EmailConfig,
    pub recaptcha: RecaptchaConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("").split("_"))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

#[cfg(test)]
mod tests;
