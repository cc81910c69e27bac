//! Postgres 仓储实现

mod postgres_account_repository;
mod postgres_refresh_token_repository;

pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_refresh_token_repository::PostgresRefreshTokenRepository;
