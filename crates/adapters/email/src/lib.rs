//! Email 适配器
//!
//! 提供 SMTP 邮件发送功能，支持 HTML 和纯文本邮件。

mod client;

pub use client::{EmailClient, EmailMessage};

use secrecy::Secret;
use serde::Deserialize;

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
}

fn default_timeout_secs() -> u64 {
    30
}

use emporia_errors::AppResult;

/// 邮件发送接口
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// 发送纯文本邮件
    async fn send_text_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;

    /// 发送 HTML 邮件
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> AppResult<()>;
}
