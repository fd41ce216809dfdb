//! OAuth2 与 IAM 登录场景测试

mod common;

use common::Harness;
use iam_login::LoginRequest;
use iam_login::application::token_issuer::{DEFAULT_DEVICE, IAM_DEVICE};
use iam_login::domain::third_party_app::{PERMISSION_IAM_LOGIN, PERMISSION_OAUTH2_LOGIN};
use iam_login::domain::{LoginType, ThirdPartyApp};
use keel_common::RequestContext;
use keel_errors::AppError;

fn github_app() -> ThirdPartyApp {
    ThirdPartyApp::new("app-github", "github", "gh-secret", "GitHub")
        .with_permissions(&[PERMISSION_OAUTH2_LOGIN])
}

fn portal_app() -> ThirdPartyApp {
    ThirdPartyApp::new("app-portal", "portal", "portal-secret", "Portal")
        .with_permissions(&[PERMISSION_IAM_LOGIN])
}

// ============================================================================
// OAuth2
// ============================================================================

#[tokio::test]
async fn test_oauth2_login_provisions_identity_once() {
    let h = Harness::new();
    h.add_app(github_app());

    let request = LoginRequest::new("GitHub", "auth-code").with_param("appSecret", "gh-secret");
    let first = h
        .module
        .login
        .login(&RequestContext::anonymous(), "OAUTH2", request.clone())
        .await
        .unwrap();
    let second = h
        .module
        .login
        .login(&RequestContext::anonymous(), "OAUTH2", request)
        .await
        .unwrap();

    assert_eq!(first.user.username, "oauth2_github");
    assert_eq!(first.user.nickname, "GitHub");
    assert_eq!(first.user.id, second.user.id);
    assert!(h.module.tokens.validate(&first.access_token, DEFAULT_DEVICE));

    let last = h.audit.last().unwrap();
    assert!(last.success);
    assert_eq!(last.login_type, LoginType::OAuth2);
}

#[tokio::test]
async fn test_oauth2_provider_outside_allow_list_is_rejected() {
    let h = Harness::new();

    let err = h
        .module
        .login
        .login(
            &RequestContext::anonymous(),
            "OAUTH2",
            LoginRequest::new("myspace", "auth-code"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnsupportedProvider(p) if p == "myspace"));
    assert!(h.audit.is_empty());
}

#[tokio::test]
async fn test_oauth2_wrong_app_secret_is_unauthorized_and_audited() {
    let h = Harness::new();
    h.add_app(github_app());

    let request = LoginRequest::new("github", "auth-code").with_param("appSecret", "guess");
    let err = h
        .module
        .login
        .login(&RequestContext::anonymous(), "OAUTH2", request)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(_)));
    assert!(!h.audit.last().unwrap().success);
}

// ============================================================================
// IAM
// ============================================================================

#[tokio::test]
async fn test_iam_login_exchanges_code_with_app_credentials() {
    let h = Harness::new();
    h.add_app(portal_app());
    h.iam.respond_with("erin", Some("Erin"));

    let response = h
        .module
        .login
        .login(
            &RequestContext::anonymous(),
            "IAM",
            LoginRequest::new("portal", "iam-code"),
        )
        .await
        .unwrap();

    assert_eq!(response.user.username, "erin");
    assert_eq!(response.user.nickname, "Erin");
    assert!(h.module.tokens.validate(&response.access_token, IAM_DEVICE));
    assert_eq!(
        h.iam.calls(),
        vec![(
            "portal".to_string(),
            "portal-secret".to_string(),
            "iam-code".to_string()
        )]
    );
    assert!(h.identity("erin").await.password_hash.is_empty());
}

#[tokio::test]
async fn test_iam_login_honours_device_id() {
    let h = Harness::new();
    h.add_app(portal_app());
    h.iam.respond_with("erin", None);

    let response = h
        .module
        .login
        .login(
            &RequestContext::anonymous(),
            "IAM",
            LoginRequest::new("portal", "iam-code").with_device("kiosk-7"),
        )
        .await
        .unwrap();

    assert!(h.module.tokens.validate(&response.access_token, "kiosk-7"));
    assert!(!h.module.tokens.validate(&response.access_token, IAM_DEVICE));
}

#[tokio::test]
async fn test_iam_outage_becomes_internal_error() {
    let h = Harness::new();
    h.add_app(portal_app());

    let err = h
        .module
        .login
        .login(
            &RequestContext::anonymous(),
            "IAM",
            LoginRequest::new("portal", "iam-code"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    let last = h.audit.last().unwrap();
    assert!(!last.success);
    assert!(last.message.contains("IAM unreachable"));
}

#[tokio::test]
async fn test_iam_app_without_permission_is_forbidden() {
    let h = Harness::new();
    h.add_app(ThirdPartyApp::new("app-x", "portal", "portal-secret", "Portal"));
    h.iam.respond_with("erin", None);

    let err = h
        .module
        .login
        .login(
            &RequestContext::anonymous(),
            "IAM",
            LoginRequest::new("portal", "iam-code"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(h.iam.calls().is_empty());
}
