//! 请求与响应 DTO

use std::collections::HashMap;

use keel_common::TenantId;
use keel_errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{LoginRequest, LoginType};

/// 登录命令
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginCommand {
    /// 为空时按密码登录
    pub login_type: Option<String>,
    /// 用户名、手机号、提供商或应用标识
    pub username: String,
    /// 密码、验证码或授权码
    #[serde(skip_serializing)]
    pub password: String,
    pub device_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_code: Option<String>,
    pub custom_params: HashMap<String, Value>,
}

impl LoginCommand {
    pub fn login_type_tag(&self) -> &str {
        match self.login_type.as_deref().map(str::trim) {
            Some(tag) if !tag.is_empty() => tag,
            _ => LoginType::Password.as_str(),
        }
    }

    pub fn into_request(self) -> AppResult<LoginRequest> {
        let tenant_id = self
            .tenant_id
            .filter(|t| !t.trim().is_empty())
            .map(|t| TenantId::from_string(t.trim()))
            .transpose()
            .map_err(|_| AppError::validation("Invalid tenant id"))?;

        Ok(LoginRequest {
            identifier: self.username,
            secret: self.password,
            device_id: self.device_id,
            client_ip: self.ip,
            user_agent: self.user_agent,
            tenant_id,
            tenant_code: self.tenant_code,
            custom_params: self.custom_params,
        })
    }
}

/// 发送验证码命令
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeCommand {
    pub phone: String,
}

/// 刷新会话命令
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshCommand {
    pub refresh_token: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// 统一响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// 成功为 200，失败为对应的 HTTP 状态码
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
            error_code: None,
        }
    }

    pub fn error(error: &AppError) -> Self {
        let body = error.to_error_body();
        Self {
            code: error.status_code(),
            message: body.message,
            data: None,
            error_code: Some(body.code),
        }
    }

    pub fn from_result(result: AppResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::error(&e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_command_from_camel_case_json() {
        let command: LoginCommand = serde_json::from_value(json!({
            "loginType": "SMS",
            "username": "13800138000",
            "password": "123456",
            "deviceId": "ios",
            "customParams": { "appSecret": "x" }
        }))
        .unwrap();

        assert_eq!(command.login_type_tag(), "SMS");
        let request = command.into_request().unwrap();
        assert_eq!(request.identifier, "13800138000");
        assert_eq!(request.device_id.as_deref(), Some("ios"));
        assert_eq!(request.param_str("appSecret"), Some("x"));
    }

    #[test]
    fn test_missing_login_type_defaults_to_password() {
        let command: LoginCommand =
            serde_json::from_value(json!({ "username": "alice", "password": "pw" })).unwrap();
        assert_eq!(command.login_type_tag(), "PASSWORD");

        let blank = LoginCommand {
            login_type: Some(" ".to_string()),
            ..command
        };
        assert_eq!(blank.login_type_tag(), "PASSWORD");
    }

    #[test]
    fn test_invalid_tenant_id_is_validation_error() {
        let command = LoginCommand {
            tenant_id: Some("not-a-uuid".to_string()),
            ..Default::default()
        };
        assert!(matches!(command.into_request(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_error_response_shape() {
        let response = ApiResponse::<()>::error(&AppError::InvalidCredentials);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["code"], 401);
        assert_eq!(value["errorCode"], "INVALID_CREDENTIALS");
        assert_eq!(value["message"], "Invalid username or password");
        assert!(value.get("data").is_none());
    }
}
