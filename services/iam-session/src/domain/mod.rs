//! 领域层

pub mod account;
pub mod refresh_token;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use account::{Account, AuthProvider};
pub use refresh_token::RefreshToken;
