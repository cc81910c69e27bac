//! IAM Session Service - 认证与会话安全核心
//!
//! 凭证验证、JWT 访问/刷新令牌生命周期（轮换 + 复用检测）、
//! 账户锁定、TOTP 两步验证与联合身份登录。

pub mod application;
pub mod domain;
pub mod infrastructure;
