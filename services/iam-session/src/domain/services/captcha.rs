//! 人机验证接口

use async_trait::async_trait;
use emporia_errors::AppResult;

/// 人机验证
///
/// 注册路径上的布尔判定。实现方自行处理远端调用与评分阈值。
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<bool>;
}
