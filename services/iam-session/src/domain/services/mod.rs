//! 领域服务

pub mod auth_service;
pub mod captcha;
pub mod email_notifier;
pub mod federated_identity;
pub mod password_service;
pub mod refresh_token_ledger;
pub mod totp_service;

pub use auth_service::{AuthService, LoginOutcome};
pub use captcha::CaptchaVerifier;
pub use email_notifier::EmailNotifier;
pub use federated_identity::{FederatedIdentityService, FederatedProfile};
pub use password_service::PasswordService;
pub use refresh_token_ledger::{RefreshTokenLedger, RotatedTokens};
pub use totp_service::TotpService;
