//! 测试支撑：内存仓储与假协作者

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emporia_auth_core::TokenCodec;
use emporia_common::{AccountId, Clock};
use emporia_errors::{AppError, AppResult};

use iam_session::domain::account::Account;
use iam_session::domain::refresh_token::RefreshToken;
use iam_session::domain::repositories::{AccountRepository, RefreshTokenRepository};
use iam_session::domain::services::{
    AuthService, CaptchaVerifier, EmailNotifier, RefreshTokenLedger, TotpService,
};
use iam_session::domain::value_objects::Email;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789";
pub const ACCESS_TTL_MS: i64 = 900_000;
pub const REFRESH_TTL_MS: i64 = 604_800_000;
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

// ============================================================
// 时钟
// ============================================================

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().unwrap() = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.0.lock().unwrap();
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// ============================================================
// 内存仓储
// ============================================================

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn get(&self, id: &AccountId) -> Option<Account> {
        self.accounts.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> AppResult<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| &a.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AppResult<bool> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .any(|a| &a.email == email))
    }

    async fn save(&self, account: &Account) -> AppResult<()> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> AppResult<()> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn increment_failed_attempts(&self, id: &AccountId) -> AppResult<i32> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| AppError::not_found("Account not found"))?;
        account.failed_login_attempts += 1;
        Ok(account.failed_login_attempts)
    }

    async fn reset_failed_attempts(&self, id: &AccountId) -> AppResult<()> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(id) {
            account.failed_login_attempts = 0;
        }
        Ok(())
    }

    async fn lock(&self, id: &AccountId) -> AppResult<()> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(id) {
            if !account.locked {
                account.locked = true;
                account.lock_time = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    tokens: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn get(&self, token: &str) -> Option<RefreshToken> {
        self.tokens.lock().unwrap().get(token).cloned()
    }

    pub fn active_count_for(&self, account_id: &AccountId) -> usize {
        self.tokens
            .lock()
            .unwrap()
            .values()
            .filter(|t| &t.account_id == account_id && !t.revoked)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        Ok(self.tokens.lock().unwrap().get(token).cloned())
    }

    async fn save(&self, token: &RefreshToken) -> AppResult<()> {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn revoke(&self, token: &str) -> AppResult<bool> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(token) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_replaced(&self, token: &str, replaced_by: &str) -> AppResult<()> {
        if let Some(record) = self.tokens.lock().unwrap().get_mut(token) {
            record.replaced_by = Some(replaced_by.to_string());
        }
        Ok(())
    }

    async fn revoke_all_for_account(&self, account_id: &AccountId) -> AppResult<u64> {
        let mut revoked = 0;
        for record in self.tokens.lock().unwrap().values_mut() {
            if &record.account_id == account_id && !record.revoked {
                record.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_dead(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| !t.revoked && t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}

// ============================================================
// 假协作者
// ============================================================

pub struct AcceptAllCaptcha;

#[async_trait]
impl CaptchaVerifier for AcceptAllCaptcha {
    async fn verify(&self, _token: &str) -> AppResult<bool> {
        Ok(true)
    }
}

pub struct RejectAllCaptcha;

#[async_trait]
impl CaptchaVerifier for RejectAllCaptcha {
    async fn verify(&self, _token: &str) -> AppResult<bool> {
        Ok(false)
    }
}

/// 记录发信并在内存里管理重置令牌
#[derive(Default)]
pub struct RecordingNotifier {
    pub verification_emails: Mutex<Vec<String>>,
    pub reset_emails: Mutex<Vec<String>>,
    reset_tokens: Mutex<HashMap<String, AccountId>>,
}

impl RecordingNotifier {
    pub fn last_reset_token(&self) -> Option<String> {
        self.reset_tokens.lock().unwrap().keys().next().cloned()
    }
}

#[async_trait]
impl EmailNotifier for RecordingNotifier {
    async fn send_verification_email(
        &self,
        _account_id: &AccountId,
        email: &str,
    ) -> AppResult<()> {
        self.verification_emails
            .lock()
            .unwrap()
            .push(email.to_string());
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        account_id: &AccountId,
        email: &str,
    ) -> AppResult<()> {
        let token = format!("reset-{}", uuid::Uuid::new_v4());
        self.reset_tokens
            .lock()
            .unwrap()
            .insert(token, *account_id);
        self.reset_emails.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn verify_password_reset_token(&self, token: &str) -> AppResult<AccountId> {
        self.reset_tokens
            .lock()
            .unwrap()
            .remove(token)
            .ok_or_else(|| AppError::validation("Invalid password reset token"))
    }
}

// ============================================================
// 装配
// ============================================================

pub struct Harness {
    pub accounts: Arc<InMemoryAccountRepository>,
    pub tokens: Arc<InMemoryRefreshTokenRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<FixedClock>,
    pub codec: Arc<TokenCodec>,
    pub totp: Arc<TotpService>,
    pub ledger: Arc<RefreshTokenLedger>,
    pub auth: AuthService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_codec(TokenCodec::new(TEST_SECRET, ACCESS_TTL_MS, REFRESH_TTL_MS))
    }

    pub fn with_codec(codec: TokenCodec) -> Self {
        let accounts = Arc::new(InMemoryAccountRepository::default());
        let tokens = Arc::new(InMemoryRefreshTokenRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let codec = Arc::new(codec);
        let totp = Arc::new(TotpService::new("Emporia".to_string()));

        let ledger = Arc::new(RefreshTokenLedger::new(
            tokens.clone(),
            accounts.clone(),
            codec.clone(),
            clock.clone(),
        ));

        let auth = AuthService::new(
            accounts.clone(),
            ledger.clone(),
            codec.clone(),
            totp.clone(),
            Arc::new(AcceptAllCaptcha),
            notifier.clone(),
            clock.clone(),
            MAX_FAILED_ATTEMPTS,
        );

        Self {
            accounts,
            tokens,
            notifier,
            clock,
            codec,
            totp,
            ledger,
            auth,
        }
    }

    /// 换一个人机验证实现，其余组件共用
    pub fn auth_with_captcha(&self, captcha: Arc<dyn CaptchaVerifier>) -> AuthService {
        AuthService::new(
            self.accounts.clone(),
            self.ledger.clone(),
            self.codec.clone(),
            self.totp.clone(),
            captcha,
            self.notifier.clone(),
            self.clock.clone(),
            MAX_FAILED_ATTEMPTS,
        )
    }
}
