//! emporia-domain-core - 领域基础库

pub mod entity;

pub use entity::*;
