//! 数据传输对象

mod auth;

pub use auth::{
    AuthResponse, LoginRequest, RegisterRequest, TokenRefreshRequest, UserResponse,
};
