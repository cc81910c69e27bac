//! 两步验证流程测试

mod support;

use emporia_common::{AccountId, Clock};
use emporia_errors::AppError;
use iam_session::application::dto::{LoginRequest, RegisterRequest};
use iam_session::domain::services::LoginOutcome;
use support::Harness;
use totp_rs::{Algorithm, Secret, TOTP};

fn code_for(secret: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    let bytes = Secret::Encoded(secret.to_string()).to_bytes().unwrap();
    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes).unwrap();
    totp.generate(at.timestamp() as u64)
}

async fn register(h: &Harness) -> AccountId {
    let user = h
        .auth
        .register(RegisterRequest {
            email: "sam@example.com".to_string(),
            password: "sturdy passphrase".to_string(),
            confirm_password: "sturdy passphrase".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Ng".to_string(),
            phone: None,
            recaptcha_token: "captcha-ok".to_string(),
        })
        .await
        .unwrap();
    AccountId::from_string(&user.id).unwrap()
}

fn login(code: Option<&str>) -> LoginRequest {
    LoginRequest {
        email: "sam@example.com".to_string(),
        password: "sturdy passphrase".to_string(),
        two_factor_code: code.map(str::to_string),
    }
}

#[tokio::test]
async fn setup_returns_secret_and_provisioning_uri() {
    let h = Harness::new();
    let account_id = register(&h).await;

    let (secret, uri) = h.auth.begin_two_factor_setup(&account_id).await.unwrap();

    assert!(uri.starts_with("otpauth://totp/"));
    assert!(uri.contains(&format!("secret={}", secret)));

    // 未确认前 2FA 不生效
    let account = h.accounts.get(&account_id).unwrap();
    assert!(!account.two_factor_enabled);
    assert_eq!(account.two_factor_secret.as_deref(), Some(secret.as_str()));
}

#[tokio::test]
async fn confirm_requires_valid_first_code() {
    let h = Harness::new();
    let account_id = register(&h).await;
    let (secret, _) = h.auth.begin_two_factor_setup(&account_id).await.unwrap();

    let err = h
        .auth
        .confirm_two_factor(&account_id, "000000")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTwoFactorCode));
    assert!(!h.accounts.get(&account_id).unwrap().two_factor_enabled);

    h.auth
        .confirm_two_factor(&account_id, &code_for(&secret, h.clock.now()))
        .await
        .unwrap();
    assert!(h.accounts.get(&account_id).unwrap().two_factor_enabled);
}

#[tokio::test]
async fn confirm_without_setup_is_rejected() {
    let h = Harness::new();
    let account_id = register(&h).await;

    let err = h
        .auth
        .confirm_two_factor(&account_id, "123456")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn login_with_2fa_is_a_two_step_handshake() {
    let h = Harness::new();
    let account_id = register(&h).await;
    let (secret, _) = h.auth.begin_two_factor_setup(&account_id).await.unwrap();
    h.auth
        .confirm_two_factor(&account_id, &code_for(&secret, h.clock.now()))
        .await
        .unwrap();

    // 第一步：密码对但没带验证码，不算失败
    let outcome = h.auth.login(login(None), None).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::TwoFactorRequired));

    // 错误的验证码是硬失败
    let err = h.auth.login(login(Some("999999")), None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTwoFactorCode));

    // 第二步：带上有效验证码完成登录
    let code = code_for(&secret, h.clock.now());
    let outcome = h.auth.login(login(Some(&code)), None).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
}

#[tokio::test]
async fn wrong_password_still_wins_over_2fa() {
    // 密码错时不泄露 2FA 状态
    let h = Harness::new();
    let account_id = register(&h).await;
    let (secret, _) = h.auth.begin_two_factor_setup(&account_id).await.unwrap();
    h.auth
        .confirm_two_factor(&account_id, &code_for(&secret, h.clock.now()))
        .await
        .unwrap();

    let err = h
        .auth
        .login(
            LoginRequest {
                email: "sam@example.com".to_string(),
                password: "wrong password".to_string(),
                two_factor_code: None,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidCredentials));
}

#[tokio::test]
async fn disable_requires_current_code_and_discards_secret() {
    let h = Harness::new();
    let account_id = register(&h).await;
    let (secret, _) = h.auth.begin_two_factor_setup(&account_id).await.unwrap();
    h.auth
        .confirm_two_factor(&account_id, &code_for(&secret, h.clock.now()))
        .await
        .unwrap();

    let err = h
        .auth
        .disable_two_factor(&account_id, "000000")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTwoFactorCode));

    h.auth
        .disable_two_factor(&account_id, &code_for(&secret, h.clock.now()))
        .await
        .unwrap();

    let account = h.accounts.get(&account_id).unwrap();
    assert!(!account.two_factor_enabled);
    assert!(account.two_factor_secret.is_none());
}
