//! 联合身份服务
//!
//! 提供方 claims 的归一化是纯函数，按提供方名称注册；
//! 账户的查找/创建/更新在服务内统一处理。

use std::collections::HashMap;
use std::sync::Arc;

use emporia_errors::{AppError, AppResult};
use serde_json::Value;
use tracing::info;

use crate::domain::account::{Account, AuthProvider};
use crate::domain::repositories::AccountRepository;
use crate::domain::value_objects::Email;

/// 归一化后的提供方档案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    /// 提供方侧的用户标识
    pub subject: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

/// claims 归一化函数：纯映射，无 IO
pub type ProfileMapper = fn(&Value) -> AppResult<FederatedProfile>;

/// 联合身份服务
pub struct FederatedIdentityService {
    accounts: Arc<dyn AccountRepository>,
    mappers: HashMap<String, ProfileMapper>,
}

impl FederatedIdentityService {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        let mut mappers: HashMap<String, ProfileMapper> = HashMap::new();
        mappers.insert("google".to_string(), map_google_profile);
        mappers.insert("facebook".to_string(), map_facebook_profile);

        Self { accounts, mappers }
    }

    /// 注册额外的提供方映射
    pub fn register_mapper(&mut self, provider: &str, mapper: ProfileMapper) {
        self.mappers.insert(provider.to_lowercase(), mapper);
    }

    /// 将一次外部登录解析为本地账户
    ///
    /// 新邮箱创建账户；同提供方回访刷新档案；邮箱已被其他
    /// 提供方（含本地注册）占用时拒绝。
    pub async fn resolve(&self, provider_name: &str, claims: &Value) -> AppResult<Account> {
        let provider_key = provider_name.to_lowercase();
        let mapper = self.mappers.get(&provider_key).ok_or_else(|| {
            AppError::validation(format!("Login with {} is not supported", provider_name))
        })?;
        let provider = AuthProvider::from_name(&provider_key).ok_or_else(|| {
            AppError::validation(format!("Login with {} is not supported", provider_name))
        })?;

        let profile = mapper(claims)?;
        if profile.email.is_empty() {
            return Err(AppError::validation("Email not found from OAuth2 provider"));
        }
        let email = Email::new(&profile.email)?;

        match self.accounts.find_by_email(&email).await? {
            Some(mut account) => {
                if account.provider != provider {
                    return Err(AppError::provider_mismatch(format!(
                        "This email is already registered with a {} account. \
                         Please use your {} account to login.",
                        account.provider, account.provider
                    )));
                }

                // 回访：刷新提供方侧可能变化的档案字段
                account.first_name = profile.first_name;
                account.last_name = profile.last_name;
                if profile.avatar_url.is_some() {
                    account.avatar_url = profile.avatar_url;
                }
                account.audit_info.touch();
                self.accounts.update(&account).await?;

                Ok(account)
            }
            None => {
                let account = Account::federated(
                    email,
                    profile.first_name,
                    profile.last_name,
                    profile.avatar_url,
                    provider,
                    profile.subject,
                );
                self.accounts.save(&account).await?;

                info!(account_id = %account.id, provider = %provider, "Federated account created");
                Ok(account)
            }
        }
    }
}

fn string_field(claims: &Value, key: &str) -> Option<String> {
    claims.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Google OIDC claims
fn map_google_profile(claims: &Value) -> AppResult<FederatedProfile> {
    let subject = string_field(claims, "sub")
        .ok_or_else(|| AppError::validation("Missing subject in Google claims"))?;

    Ok(FederatedProfile {
        subject,
        email: string_field(claims, "email").unwrap_or_default(),
        first_name: string_field(claims, "given_name").unwrap_or_default(),
        last_name: string_field(claims, "family_name").unwrap_or_default(),
        avatar_url: string_field(claims, "picture"),
    })
}

/// Facebook Graph API 用户对象
fn map_facebook_profile(claims: &Value) -> AppResult<FederatedProfile> {
    let subject = string_field(claims, "id")
        .ok_or_else(|| AppError::validation("Missing id in Facebook claims"))?;

    // 头像藏在 picture.data.url
    let avatar_url = claims
        .get("picture")
        .and_then(|p| p.get("data"))
        .and_then(|d| d.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(FederatedProfile {
        subject,
        email: string_field(claims, "email").unwrap_or_default(),
        first_name: string_field(claims, "first_name").unwrap_or_default(),
        last_name: string_field(claims, "last_name").unwrap_or_default(),
        avatar_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_google_mapper() {
        let claims = json!({
            "sub": "108123",
            "email": "shopper@gmail.com",
            "given_name": "Sam",
            "family_name": "Ng",
            "picture": "https://lh3.example.com/photo.jpg"
        });

        let profile = map_google_profile(&claims).unwrap();

        assert_eq!(profile.subject, "108123");
        assert_eq!(profile.email, "shopper@gmail.com");
        assert_eq!(profile.first_name, "Sam");
        assert_eq!(profile.last_name, "Ng");
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://lh3.example.com/photo.jpg")
        );
    }

    #[test]
    fn test_facebook_mapper_nested_picture() {
        let claims = json!({
            "id": "fb-777",
            "email": "shopper@fb.com",
            "first_name": "Ana",
            "last_name": "Reyes",
            "picture": { "data": { "url": "https://graph.example.com/p.jpg" } }
        });

        let profile = map_facebook_profile(&claims).unwrap();

        assert_eq!(profile.subject, "fb-777");
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://graph.example.com/p.jpg")
        );
    }

    #[test]
    fn test_google_mapper_requires_subject() {
        let claims = json!({ "email": "shopper@gmail.com" });
        assert!(map_google_profile(&claims).is_err());
    }
}
