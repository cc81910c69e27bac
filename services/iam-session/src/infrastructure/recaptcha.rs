//! reCAPTCHA 校验

use async_trait::async_trait;
use emporia_config::RecaptchaConfig;
use emporia_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::domain::services::captcha::CaptchaVerifier;

/// Google reCAPTCHA siteverify 客户端
pub struct RecaptchaVerifier {
    http: reqwest::Client,
    config: RecaptchaConfig,
}

impl RecaptchaVerifier {
    pub fn new(config: RecaptchaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    success: bool,
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> AppResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }

        let params = [
            ("secret", self.config.secret.expose_secret().as_str()),
            ("response", token),
        ];

        let response = self
            .http
            .post(&self.config.verify_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                AppError::external_service(format!("reCAPTCHA request failed: {}", e))
            })?;

        let body: SiteVerifyResponse = response.json().await.map_err(|e| {
            AppError::external_service(format!("Invalid reCAPTCHA response: {}", e))
        })?;

        debug!(success = body.success, "reCAPTCHA verified");
        Ok(body.success)
    }
}
