//! 认证服务
//!
//! 登录状态机（凭证 -> 锁定 -> 2FA -> 发令牌）、注册、
//! 密码重置与 2FA 开关。

use std::sync::Arc;

use emporia_auth_core::TokenCodec;
use emporia_common::{AccountId, Clock};
use emporia_errors::{AppError, AppResult};
use tracing::{error, info, warn};

use crate::application::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::domain::account::Account;
use crate::domain::repositories::AccountRepository;
use crate::domain::services::captcha::CaptchaVerifier;
use crate::domain::services::email_notifier::EmailNotifier;
use crate::domain::services::password_service::PasswordService;
use crate::domain::services::refresh_token_ledger::RefreshTokenLedger;
use crate::domain::services::totp_service::TotpService;
use crate::domain::value_objects::Email;

/// 登录结果
///
/// 密码通过但账户开了 2FA 且未携带验证码时，登录尚未完成，
/// 这不是失败，所以不走错误通道。
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(AuthResponse),
    TwoFactorRequired,
}

/// 认证服务
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<RefreshTokenLedger>,
    codec: Arc<TokenCodec>,
    totp: Arc<TotpService>,
    captcha: Arc<dyn CaptchaVerifier>,
    notifier: Arc<dyn EmailNotifier>,
    clock: Arc<dyn Clock>,
    max_failed_attempts: i32,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<RefreshTokenLedger>,
        codec: Arc<TokenCodec>,
        totp: Arc<TotpService>,
        captcha: Arc<dyn CaptchaVerifier>,
        notifier: Arc<dyn EmailNotifier>,
        clock: Arc<dyn Clock>,
        max_failed_attempts: i32,
    ) -> Self {
        Self {
            accounts,
            ledger,
            codec,
            totp,
            captcha,
            notifier,
            clock,
            max_failed_attempts,
        }
    }

    // ========================================================
    // 注册
    // ========================================================

    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserResponse> {
        if !self.captcha.verify(&request.recaptcha_token).await? {
            return Err(AppError::validation("reCAPTCHA verification failed"));
        }

        if request.password != request.confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }

        let email = Email::new(&request.email)?;
        if self.accounts.exists_by_email(&email).await? {
            return Err(AppError::conflict("Email is already registered"));
        }

        let password_hash = PasswordService::hash(&request.password)?;
        let account = Account::new(
            email,
            password_hash,
            request.first_name,
            request.last_name,
            request.phone,
        );
        self.accounts.save(&account).await?;

        // 验证邮件失败不阻塞注册
        if let Err(e) = self
            .notifier
            .send_verification_email(&account.id, account.email.as_str())
            .await
        {
            error!(account_id = %account.id, error = %e, "Failed to send verification email");
        }

        info!(account_id = %account.id, "Account registered");
        Ok(UserResponse::from_account(&account))
    }

    // ========================================================
    // 登录
    // ========================================================

    /// 登录状态机
    ///
    /// 检查顺序固定：存在性 -> 锁定 -> 启用 -> 密码 -> 2FA。
    /// 不存在的邮箱和错误的密码返回同一个错误。
    pub async fn login(
        &self,
        request: LoginRequest,
        client_ip: Option<&str>,
    ) -> AppResult<LoginOutcome> {
        let email = Email::new(request.email.as_str())
            .map_err(|_| AppError::InvalidCredentials)?;

        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if account.is_locked() {
            warn!(account_id = %account.id, "Login attempt on locked account");
            return Err(AppError::AccountLocked);
        }

        if !account.enabled {
            // 停用账户与坏密码不可区分
            return Err(AppError::InvalidCredentials);
        }

        if !account.verify_password(&request.password) {
            return Err(self.record_failed_attempt(&account).await?);
        }

        if account.failed_login_attempts > 0 {
            self.accounts.reset_failed_attempts(&account.id).await?;
        }

        if account.two_factor_enabled {
            let code = match request.two_factor_code.as_deref() {
                None | Some("") => {
                    return Ok(LoginOutcome::TwoFactorRequired);
                }
                Some(code) => code,
            };

            let secret = account
                .two_factor_secret
                .as_deref()
                .ok_or_else(|| AppError::internal("2FA enabled without a secret"))?;

            if !self.totp.is_valid(secret, code, self.clock.now())? {
                metrics::counter!("iam_session_two_factor_failures_total").increment(1);
                return Err(AppError::InvalidTwoFactorCode);
            }
        }

        let response = self.issue_session(&account, client_ip).await?;
        info!(account_id = %account.id, "Login succeeded");
        Ok(LoginOutcome::Authenticated(response))
    }

    /// 为已通过认证的账户发放会话（本地登录与联合登录共用）
    pub async fn issue_session(
        &self,
        account: &Account,
        client_ip: Option<&str>,
    ) -> AppResult<AuthResponse> {
        let access_token = self.codec.issue_access(&account.id, account.email.as_str())?;
        let refresh_token = self.ledger.issue(&account.id, client_ip).await?;

        Ok(AuthResponse::bearer(
            access_token,
            refresh_token,
            self.codec.access_ttl_ms(),
            account,
        ))
    }

    /// 失败计数走存储层原子自增；达到阈值时锁定。
    /// 触发锁定的这一次仍然报 InvalidCredentials，下一次才是 AccountLocked。
    async fn record_failed_attempt(&self, account: &Account) -> AppResult<AppError> {
        let attempts = self.accounts.increment_failed_attempts(&account.id).await?;

        if attempts >= self.max_failed_attempts {
            self.accounts.lock(&account.id).await?;
            warn!(
                account_id = %account.id,
                attempts,
                "Account locked after repeated login failures"
            );
            metrics::counter!("iam_session_lockouts_total").increment(1);
        }

        Ok(AppError::InvalidCredentials)
    }

    // ========================================================
    // 令牌生命周期
    // ========================================================

    /// 刷新会话（轮换刷新令牌）
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client_ip: Option<&str>,
    ) -> AppResult<AuthResponse> {
        let rotated = self.ledger.rotate(refresh_token, client_ip).await?;

        Ok(AuthResponse::bearer(
            rotated.access_token,
            rotated.refresh_token,
            self.codec.access_ttl_ms(),
            &rotated.account,
        ))
    }

    /// 登出当前会话。对未知令牌也返回成功。
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        self.ledger.revoke(refresh_token).await
    }

    /// 全端登出
    pub async fn logout_all(&self, account_id: &AccountId) -> AppResult<u64> {
        self.ledger.revoke_all(account_id).await
    }

    // ========================================================
    // 密码重置
    // ========================================================

    /// 发起密码重置。邮箱不存在时静默成功，避免账户枚举。
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let email = match Email::new(email) {
            Ok(email) => email,
            Err(_) => return Ok(()),
        };

        match self.accounts.find_by_email(&email).await? {
            Some(account) => {
                self.notifier
                    .send_password_reset_email(&account.id, account.email.as_str())
                    .await
            }
            None => {
                info!("Password reset requested for unknown email");
                Ok(())
            }
        }
    }

    /// 用重置令牌设置新密码；成功后解锁账户并吊销全部会话
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> AppResult<()> {
        if new_password != confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }

        let account_id = self.notifier.verify_password_reset_token(token).await?;
        let mut account = self
            .accounts
            .find_by_id(&account_id)
            .await?
            .ok_or_else(|| AppError::not_found("Account not found"))?;

        account.set_password(PasswordService::hash(new_password)?);
        account.unlock();
        self.accounts.update(&account).await?;

        self.ledger.revoke_all(&account.id).await?;
        info!(account_id = %account.id, "Password reset completed");
        Ok(())
    }

    // ========================================================
    // 两步验证
    // ========================================================

    /// 开始 2FA 绑定：生成 secret 暂存，待首码确认后才生效。
    /// 返回 (secret, otpauth URI)。
    pub async fn begin_two_factor_setup(
        &self,
        account_id: &AccountId,
    ) -> AppResult<(String, String)> {
        let mut account = self.find_account(account_id).await?;

        let secret = self.totp.generate_secret()?;
        let uri = self.totp.provisioning_uri(account.email.as_str(), &secret);

        account.stage_two_factor_secret(secret.clone());
        self.accounts.update(&account).await?;

        Ok((secret, uri))
    }

    /// 确认首码，正式启用 2FA
    pub async fn confirm_two_factor(&self, account_id: &AccountId, code: &str) -> AppResult<()> {
        let mut account = self.find_account(account_id).await?;

        let secret = account
            .two_factor_secret
            .as_deref()
            .ok_or_else(|| AppError::validation("Two-factor setup has not been started"))?;

        if !self.totp.is_valid(secret, code, self.clock.now())? {
            return Err(AppError::InvalidTwoFactorCode);
        }

        account.enable_two_factor();
        self.accounts.update(&account).await?;

        info!(account_id = %account.id, "Two-factor authentication enabled");
        Ok(())
    }

    /// 关闭 2FA，需要一个当前有效的验证码
    pub async fn disable_two_factor(&self, account_id: &AccountId, code: &str) -> AppResult<()> {
        let mut account = self.find_account(account_id).await?;

        if !account.two_factor_enabled {
            return Err(AppError::validation("Two-factor authentication is not enabled"));
        }

        let secret = account
            .two_factor_secret
            .as_deref()
            .ok_or_else(|| AppError::internal("2FA enabled without a secret"))?;

        if !self.totp.is_valid(secret, code, self.clock.now())? {
            return Err(AppError::InvalidTwoFactorCode);
        }

        account.disable_two_factor();
        self.accounts.update(&account).await?;

        info!(account_id = %account.id, "Two-factor authentication disabled");
        Ok(())
    }

    async fn find_account(&self, account_id: &AccountId) -> AppResult<Account> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::not_found("Account not found"))
    }
}
