//! 密码服务

use emporia_errors::AppResult;

use crate::domain::value_objects::HashedPassword;

/// 密码哈希门面
pub struct PasswordService;

impl PasswordService {
    /// 哈希明文密码（含长度策略校验）
    pub fn hash(plain: &str) -> AppResult<HashedPassword> {
        Ok(HashedPassword::from_plain(plain)?)
    }

    /// 校验明文密码
    pub fn verify(hash: &HashedPassword, plain: &str) -> bool {
        hash.verify(plain).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = PasswordService::hash("open sesame 42").unwrap();

        assert!(PasswordService::verify(&hash, "open sesame 42"));
        assert!(!PasswordService::verify(&hash, "open sesame 43"));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        let hash = HashedPassword::from_hash("not-a-phc-string".to_string());
        assert!(!PasswordService::verify(&hash, "anything"));
    }
}
