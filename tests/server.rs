mod common;

use actix_web::middleware::Logger;
use actix_web::{rt, web, App, HttpServer};
use serde_json::json;
use std::net::TcpListener;

use authforge::auth::outcome::INVALID_TOKEN_MESSAGE;
use authforge::auth::{AuthResponse, RequestGate};
use authforge::routes::{self, health};

use common::{test_authority, PASSWORD};

#[actix_rt::test]
async fn test_session_lifecycle_over_http() {
    let (authority, _store) = test_authority();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(authority.clone())
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(RequestGate)
                    .configure(routes::config),
            )
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen on bound port")
    .run();
    let handle = server.handle();
    rt::spawn(server);

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/signup", base))
        .json(&json!({
            "first_name": "Barbara",
            "last_name": "Liskov",
            "email": "barbara@example.com",
            "password": PASSWORD
        }))
        .send()
        .await
        .expect("Failed to send signup request");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let first: AuthResponse = resp.json().await.unwrap();

    let resp = client
        .get(format!("{}/api/account", base))
        .bearer_auth(&first.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = client
        .post(format!("{}/api/auth/logout", base))
        .bearer_auth(&first.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = client
        .get(format!("{}/api/account", base))
        .bearer_auth(&first.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], INVALID_TOKEN_MESSAGE);

    let resp = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "email": "barbara@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let second: AuthResponse = resp.json().await.unwrap();
    assert_ne!(second.token, first.token);

    handle.stop(true).await;
}
