//! 通用工具函数

/// 脱敏手机号等标识，仅保留前 3 位与后 4 位
///
/// 长度不足 8 的字符串整体替换为 `***`。
pub fn mask_identifier(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 8 {
        return "***".to_string();
    }

    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_identifier("13800138000"), "138****8000");
    }

    #[test]
    fn test_mask_short_value() {
        assert_eq!(mask_identifier("abc"), "***");
        assert_eq!(mask_identifier(""), "***");
    }
}
