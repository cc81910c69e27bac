//! 基础设施层

pub mod cleanup;
pub mod notifier;
pub mod persistence;
pub mod recaptcha;
