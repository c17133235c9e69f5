use actix_web::{dev::Payload, test, FromRequest};
use forohub::{
    auth::{create_jwt, Auth, Claims},
    error::ApiError,
    models::Role,
};
use serial_test::serial;
use std::env;

// Helper that guarantees a sufficiently long secret for tests.
fn set_secret() {
    env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

fn claims(sub: &str, roles: Vec<Role>) -> Auth {
    Auth(Claims { sub: sub.into(), exp: usize::MAX, roles })
}

#[actix_web::test]
#[serial]
async fn jwt_roundtrip_ok() {
    set_secret();
    let token = create_jwt("ana", vec![Role::Student]).expect("token");
    // The Auth extractor is the public way to validate, so use it here.
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert_eq!(auth.0.sub, "ana");
    assert!(!auth.is_admin());
}

#[actix_web::test]
#[serial]
async fn extractor_rejects_invalid_or_missing_token() {
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", "Bearer notatoken"))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(matches!(Auth::from_request(&req, &mut pl).await, Err(ApiError::Unauthorized)));

    let req = test::TestRequest::default().to_http_request();
    assert!(matches!(Auth::from_request(&req, &mut pl).await, Err(ApiError::Unauthorized)));
}

#[actix_web::test]
#[serial]
async fn token_signed_with_another_secret_is_rejected() {
    env::set_var("JWT_SECRET", "another-secret-that-is-32-bytes-long");
    let token = create_jwt("ana", vec![Role::Admin]).expect("token");
    set_secret();
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(matches!(Auth::from_request(&req, &mut pl).await, Err(ApiError::Unauthorized)));
}

#[actix_web::test]
#[serial]
async fn missing_secret_is_a_server_error() {
    set_secret();
    let token = create_jwt("ana", vec![Role::Student]).expect("token");
    env::remove_var("JWT_SECRET");
    let req = test::TestRequest::default()
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(matches!(Auth::from_request(&req, &mut pl).await, Err(ApiError::Internal)));
    set_secret();
}

#[::core::prelude::v1::test]
fn role_guards() {
    let admin = claims("root", vec![Role::Admin]);
    let ana = claims("ana", vec![Role::Student]);

    assert!(admin.require_admin().is_ok());
    assert!(matches!(ana.require_admin(), Err(ApiError::Forbidden)));

    assert!(admin.require_self_or_admin("ana").is_ok());
    assert!(ana.require_self_or_admin("ana").is_ok());
    assert!(matches!(ana.require_self_or_admin("bob"), Err(ApiError::Forbidden)));
}
