//! 时钟抽象
//!
//! 令牌过期和 TOTP 窗口都依赖当前时间，通过 trait 注入以便测试。

use chrono::{DateTime, Utc};

/// 时钟 trait
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Unix 时间戳（秒）
    fn unix_seconds(&self) -> u64 {
        self.now().timestamp().max(0) as u64
    }
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_unix_seconds_matches_now() {
        let clock = SystemClock;
        let secs = clock.unix_seconds();
        let now = clock.now().timestamp() as u64;
        assert!(now - secs <= 1);
    }
}
