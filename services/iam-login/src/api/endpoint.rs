//! 接口入口
//!
//! 错误不向上抛出，统一转换为 `ApiResponse`。

use keel_common::RequestContext;

use super::dto::{ApiResponse, LoginCommand, RefreshCommand, SendCodeCommand};
use crate::application::LoginService;
use crate::domain::LoginResponse;

/// 登录
pub async fn login_endpoint(
    service: &LoginService,
    ctx: &RequestContext,
    command: LoginCommand,
) -> ApiResponse<LoginResponse> {
    let login_type = command.login_type_tag().to_string();
    let result = match command.into_request() {
        Ok(request) => service.login(ctx, &login_type, request).await,
        Err(e) => Err(e),
    };
    ApiResponse::from_result(result)
}

/// 发送短信验证码
pub async fn send_code_endpoint(
    service: &LoginService,
    ctx: &RequestContext,
    command: SendCodeCommand,
) -> ApiResponse<bool> {
    ApiResponse::from_result(service.send_sms_code(ctx, &command.phone).await)
}

/// 刷新会话
pub async fn refresh_endpoint(
    service: &LoginService,
    command: RefreshCommand,
) -> ApiResponse<LoginResponse> {
    ApiResponse::from_result(
        service
            .refresh(&command.refresh_token, command.device_id.as_deref())
            .await,
    )
}
