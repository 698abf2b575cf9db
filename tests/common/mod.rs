#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;

use authforge::auth::token::DEFAULT_ISSUER;
use authforge::auth::{AuthResponse, RequestGate, SessionAuthority, TokenCodec};
use authforge::routes::{self, health};
use authforge::store::MemoryStore;

/// `test-secret-key-for-authforge-32`, base64-encoded.
pub const TEST_SECRET: &str = "dGVzdC1zZWNyZXQta2V5LWZvci1hdXRoZm9yZ2UtMzI=";
pub const PASSWORD: &str = "Password123!";

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET, Duration::hours(1), DEFAULT_ISSUER).expect("test secret is valid")
}

pub fn test_authority() -> (web::Data<SessionAuthority>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let authority = SessionAuthority::new(test_codec(), store.clone(), store.clone());
    (web::Data::new(authority), store)
}

pub async fn init_app(
    authority: web::Data<SessionAuthority>,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(authority)
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(RequestGate)
                    .configure(routes::config),
            ),
    )
    .await
}

pub async fn signup(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    email: &str,
) -> AuthResponse {
    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": email,
            "password": PASSWORD
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Signup failed. Body: {:?}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).expect("Failed to parse signup response JSON")
}

pub async fn login(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    email: &str,
) -> AuthResponse {
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::OK,
        "Login failed. Body: {:?}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).expect("Failed to parse login response JSON")
}

/// `GET /api/account` with `token`; returns status and JSON body.
pub async fn get_account(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    token: &str,
) -> (actix_web::http::StatusCode, serde_json::Value) {
    let req = test::TestRequest::get()
        .uri("/api/account")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
