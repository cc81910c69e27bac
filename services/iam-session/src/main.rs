//! IAM Session Service - 会话安全服务入口
//!
//! 装配配置、遥测、数据库连接与后台令牌清理任务。

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

use emporia_auth_core::TokenCodec;
use emporia_common::{Clock, SystemClock};
use emporia_config::AppConfig;

use iam_session::domain::repositories::{AccountRepository, RefreshTokenRepository};
use iam_session::domain::services::RefreshTokenLedger;
use iam_session::infrastructure::cleanup::TokenSweepTask;
use iam_session::infrastructure::persistence::{
    PostgresAccountRepository, PostgresRefreshTokenRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load("config")?;

    if config.is_production() {
        emporia_telemetry::init_tracing_json(&config.telemetry.log_level);
    } else {
        emporia_telemetry::init_tracing(&config.telemetry.log_level);
    }
    let _metrics = emporia_telemetry::init_metrics();

    info!(app = %config.app_name, env = %config.app_env, "Starting iam-session");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(config.database.url.expose_secret())
        .await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = Arc::new(TokenCodec::new(
        config.jwt.secret.expose_secret(),
        config.jwt.access_token_expiration_ms,
        config.jwt.refresh_token_expiration_ms,
    ));

    let accounts: Arc<dyn AccountRepository> =
        Arc::new(PostgresAccountRepository::new(pool.clone()));
    let tokens: Arc<dyn RefreshTokenRepository> =
        Arc::new(PostgresRefreshTokenRepository::new(pool.clone()));

    let ledger = Arc::new(RefreshTokenLedger::new(
        tokens,
        accounts,
        codec,
        clock.clone(),
    ));

    let shutdown = CancellationToken::new();
    let sweep = Arc::new(TokenSweepTask::new(
        ledger,
        clock,
        Duration::from_secs(config.sweep.interval_secs),
    ));
    let sweep_handle = sweep.start(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown.cancel();
    sweep_handle.await?;

    info!("iam-session stopped");
    Ok(())
}
