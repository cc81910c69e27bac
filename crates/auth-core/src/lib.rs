//! emporia-auth-core - 令牌编解码核心库
//!
//! 无状态访问/刷新令牌的签发与校验。签名密钥在进程启动时加载一次，
//! 运行期间只读共享；不支持密钥轮换。

use chrono::{DateTime, Duration, TimeZone, Utc};
use emporia_common::AccountId;
use emporia_errors::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Email（仅访问令牌携带）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Token type (access or refresh)
    pub token_type: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// JWT ID（仅刷新令牌携带，保证同一毫秒内签发的令牌也互不相同）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    pub fn account_id(&self) -> AppResult<AccountId> {
        AccountId::from_string(&self.sub)
            .map_err(|_| AppError::invalid_token("Invalid account ID in token"))
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type == TOKEN_TYPE_ACCESS
    }

    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TOKEN_TYPE_REFRESH
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// 令牌编解码器
///
/// 所有解析都必须经过 [`TokenCodec::verify`]；调用方不得绕过签名校验读取
/// claims。
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_ms: i64,
    refresh_ttl_ms: i64,
}

impl TokenCodec {
    pub fn new(secret: &str, access_ttl_ms: i64, refresh_ttl_ms: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_ms,
            refresh_ttl_ms,
        }
    }

    /// 签发访问令牌
    pub fn issue_access(&self, account_id: &AccountId, email: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            email: Some(email.to_string()),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::milliseconds(self.access_ttl_ms)).timestamp(),
            jti: None,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign access token: {}", e)))
    }

    /// 签发刷新令牌（带随机 jti）
    pub fn issue_refresh(&self, account_id: &AccountId) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            email: None,
            token_type: TOKEN_TYPE_REFRESH.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::milliseconds(self.refresh_ttl_ms)).timestamp(),
            jti: Some(Uuid::new_v4().to_string()),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign refresh token: {}", e)))
    }

    /// 校验令牌并返回 claims
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(map_jwt_error)?;

        let claims = token_data.claims;
        if claims.token_type.is_empty() {
            return Err(AppError::invalid_token("Token type not specified"));
        }

        Ok(claims)
    }

    /// 令牌类型投影
    pub fn token_type_of(&self, token: &str) -> AppResult<String> {
        Ok(self.verify(token)?.token_type)
    }

    /// Subject 投影
    pub fn subject_of(&self, token: &str) -> AppResult<AccountId> {
        self.verify(token)?.account_id()
    }

    /// 过期时间投影
    pub fn expiry_of(&self, token: &str) -> AppResult<DateTime<Utc>> {
        Ok(self.verify(token)?.expires_at())
    }

    /// 访问令牌有效期（毫秒）
    pub fn access_ttl_ms(&self) -> i64 {
        self.access_ttl_ms
    }

    /// 刷新令牌有效期（毫秒）
    pub fn refresh_ttl_ms(&self) -> i64 {
        self.refresh_ttl_ms
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AppError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        ErrorKind::InvalidSignature => AppError::invalid_token("Invalid signature"),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            AppError::invalid_token("Unsupported token algorithm")
        }
        _ => AppError::invalid_token("Malformed token"),
    }
}
