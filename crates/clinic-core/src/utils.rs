//! 通用工具函数

use chrono::Utc;

/// 号码前缀
pub const TOKEN_PREFIX: char = 'T';

/// 生成号码标识，例如 T42
pub fn format_token_id(number: u64) -> String {
    format!("{}{}", TOKEN_PREFIX, number)
}

/// 解析号码标识中的顺序号
pub fn parse_token_id(token_id: &str) -> Option<u64> {
    let digits = token_id.strip_prefix(TOKEN_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// 当前时间 (epoch 毫秒)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_token_id() {
        assert_eq!(format_token_id(1), "T1");
        assert_eq!(format_token_id(120), "T120");
    }

    #[test]
    fn test_parse_token_id() {
        assert_eq!(parse_token_id("T15"), Some(15));
        assert_eq!(parse_token_id("T0"), None);
        assert_eq!(parse_token_id("T"), None);
        assert_eq!(parse_token_id("15"), None);
        assert_eq!(parse_token_id("T1a"), None);
    }
}
