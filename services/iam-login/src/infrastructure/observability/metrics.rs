//! IAM Login Metrics
//!
//! 业务指标记录

use metrics::counter;

/// 记录登录尝试
pub fn record_login_attempt(login_type: &str, success: bool) {
    let labels = [
        ("login_type", login_type.to_string()),
        ("success", success.to_string()),
    ];
    counter!("iam_login_attempts_total", &labels).increment(1);
}

/// 记录账户锁定
pub fn record_account_locked() {
    counter!("iam_account_locked_total").increment(1);
}

/// 记录验证码发送
pub fn record_sms_code_issued(result: &str) {
    let labels = [("result", result.to_string())];
    counter!("iam_sms_codes_issued_total", &labels).increment(1);
}

/// 记录第三方应用令牌签发
pub fn record_app_token_issued() {
    counter!("iam_app_tokens_issued_total").increment(1);
}
