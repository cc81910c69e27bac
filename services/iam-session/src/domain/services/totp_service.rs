//! TOTP 服务
//!
//! 提供 TOTP secret 生成、otpauth:// URI 生成与验证码校验。

use chrono::{DateTime, Utc};
use data_encoding::BASE32;
use emporia_errors::{AppError, AppResult};
use rand::Rng;
use totp_rs::{Algorithm, Secret, TOTP};

/// TOTP 服务
///
/// SHA-1 / 6 位 / 30 秒步长 / ±1 步窗口。
pub struct TotpService {
    issuer: String,
}

impl TotpService {
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    /// 生成 TOTP secret
    pub fn generate_secret(&self) -> AppResult<String> {
        // 20 字节随机数据，Base32 编码
        let mut rng = rand::thread_rng();
        let secret_bytes: Vec<u8> = (0..20).map(|_| rng.r#gen()).collect();

        Ok(BASE32.encode(&secret_bytes))
    }

    /// 生成配置 URI（otpauth:// 格式，交给认证器 App 扫码）
    pub fn provisioning_uri(&self, account_label: &str, secret: &str) -> String {
        format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits=6&period=30",
            urlencoding::encode(&self.issuer),
            urlencoding::encode(account_label),
            secret,
            urlencoding::encode(&self.issuer)
        )
    }

    /// 在给定时刻校验 TOTP 码
    ///
    /// 非 6 位纯数字输入直接判否，不做任何密码学运算。
    pub fn is_valid(&self, secret: &str, code: &str, now: DateTime<Utc>) -> AppResult<bool> {
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }

        let totp = self.create_totp(secret)?;
        Ok(totp.check(code, now.timestamp().max(0) as u64))
    }

    /// 创建 TOTP 实例
    fn create_totp(&self, secret: &str) -> AppResult<TOTP> {
        let secret = Secret::Encoded(secret.to_string())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid secret: {}", e)))?;

        TOTP::new(
            Algorithm::SHA1,
            6,  // 6 位数字
            1,  // 1 步时间窗口
            30, // 30 秒有效期
            secret,
        )
        .map_err(|e| AppError::internal(format!("Failed to create TOTP: {}", e)))
    }
}
