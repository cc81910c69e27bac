//! Email 值对象

use serde::{Deserialize, Serialize};
use std::fmt;

/// Email 值对象（RFC 5322 校验，统一小写）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(pub String);

impl Email {
    /// 创建新的 Email
    pub fn new(email: impl Into<String>) -> Result<Self, EmailError> {
        let email = email.into();

        if !email_address::EmailAddress::is_valid(&email) {
            return Err(EmailError::InvalidFormat(email));
        }

        Ok(Self(email.to_lowercase()))
    }

    /// 获取邮箱域名
    pub fn domain(&self) -> Option<&str> {
        self.0.split('@').nth(1)
    }

    /// 获取字符串引用
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email 错误
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

impl From<EmailError> for emporia_errors::AppError {
    fn from(err: EmailError) -> Self {
        emporia_errors::AppError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(Email::new("shopper@example.com").is_ok());
        assert!(Email::new("first.last@example.com").is_ok());
        assert!(Email::new("user+orders@example.co.uk").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert!(Email::new("").is_err());
        assert!(Email::new("no-at-sign.example.com").is_err());
        assert!(Email::new("user@@example.com").is_err());
        assert!(Email::new("@example.com").is_err());
        assert!(Email::new("user@").is_err());
        assert!(Email::new("user name@example.com").is_err());
    }

    #[test]
    fn test_email_lowercase() {
        let email = Email::new("Shopper@Example.COM").unwrap();
        assert_eq!(email.as_str(), "shopper@example.com");
    }

    #[test]
    fn test_email_domain() {
        let email = Email::new("shopper@example.com").unwrap();
        assert_eq!(email.domain(), Some("example.com"));
    }
}
