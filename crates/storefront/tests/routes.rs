//! End-to-end route tests through the full middleware stack.
//!
//! Most tests point the storefront at an address nothing listens on, so
//! every page is rendered from the bundled catalog.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode, header},
};
use ringside_storefront::{
    app,
    config::{ApiConfig, StorefrontConfig},
    state::AppState,
};
use serde_json::json;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UNREACHABLE_BACKEND: &str = "http://127.0.0.1:9";

// ============= Helper Functions =============

fn local_config(url: &str) -> StorefrontConfig {
    StorefrontConfig::local(ApiConfig::new(Url::parse(url).unwrap()))
}

fn app_with_backend(url: &str) -> Router {
    app(AppState::new(local_config(url)).unwrap())
}

fn offline_app() -> Router {
    app_with_backend(UNREACHABLE_BACKEND)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Peer address the server would see for a direct connection.
fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([203, 0, 113, 7], 51000)))
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .extension(peer());
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

/// The `name=value` part of the session cookie set by a response.
fn session_cookie(response: &Response<Body>) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

fn login_response(purchased: &[i32], expires_in: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "access-1",
        "refresh_token": "refresh-1",
        "expires_in": expires_in,
        "user": {
            "id": 7,
            "email": "ali@example.com",
            "name": "Ali",
            "purchased_course_ids": purchased
        }
    }))
}

/// Sign in against a backend that answers only the login call, so catalog
/// reads fall back to the bundled data and payments are offline.
async fn signed_in(purchased: &[i32]) -> (MockServer, Router, String) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(login_response(purchased, 3600))
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .with_priority(10)
        .mount(&server)
        .await;

    let app = app_with_backend(&server.uri());
    let response = app
        .clone()
        .oneshot(post_form(
            "/auth/login",
            "email=ali%40example.com&password=hunter22",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response);
    (server, app, cookie)
}

// ============= Health =============

#[tokio::test]
async fn test_health_is_ok() {
    let response = offline_app().oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_fails_without_backend() {
    let response = offline_app()
        .oneshot(get("/health/ready", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============= Catalog pages =============

#[tokio::test]
async fn test_home_renders_bundled_catalog() {
    let response = offline_app().oneshot(get("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("content-security-policy"));

    let html = body_text(response).await;
    assert!(html.contains("Boxing Fundamentals"));
    assert!(html.contains("Ringside Training Gloves"));
    assert!(html.contains("saved catalog"));
}

#[tokio::test]
async fn test_course_listing_filters_by_level() {
    let response = offline_app()
        .oneshot(get("/courses?level=advanced", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Defense and Counterpunching"));
    assert!(!html.contains("Boxing Fundamentals"));
}

#[tokio::test]
async fn test_unknown_course_is_not_found() {
    let response = offline_app()
        .oneshot(get("/courses/999", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_page_shows_options() {
    let response = offline_app().oneshot(get("/shop/1", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Choose a size"));
    assert!(html.contains("14oz"));
}

#[tokio::test]
async fn test_my_courses_requires_sign_in() {
    let response = offline_app()
        .oneshot(get("/my-courses", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

// ============= Cart and checkout =============

#[tokio::test]
async fn test_cart_add_then_show() {
    let app = offline_app();

    let response = app
        .clone()
        .oneshot(post_form("/cart/add", "product_id=2&color=black&quantity=2", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
    let cookie = session_cookie(&response);

    let response = app
        .clone()
        .oneshot(get("/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(body_text(response).await, "2");

    let response = app.oneshot(get("/cart", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Hand Wraps"));
    // 2 x 9.99 plus flat shipping
    assert!(html.contains("$27.97"));
}

#[tokio::test]
async fn test_cart_add_requires_color() {
    let response = offline_app()
        .oneshot(post_form("/cart/add", "product_id=2&quantity=1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/shop/2");
}

#[tokio::test]
async fn test_checkout_with_empty_cart_redirects() {
    let response = offline_app()
        .oneshot(get("/checkout", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
}

#[tokio::test]
async fn test_checkout_rejects_bad_card() {
    let app = offline_app();
    let response = app
        .clone()
        .oneshot(post_form("/cart/add", "product_id=2&color=red", None))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let form = "name=Ali&email=ali%40example.com&address=1+Ring+Rd&city=Leeds\
                &postal_code=LS1&country=UK&card_number=1234567812345678\
                &card_expiry=12%2F99&card_cvc=123";
    let response = app
        .oneshot(post_form("/checkout", form, Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Card number is invalid"));
    assert!(!html.contains("1234567812345678"));
    assert!(html.contains("1 Ring Rd"));
}

#[tokio::test]
async fn test_offline_checkout_records_order() {
    let app = offline_app();
    let response = app
        .clone()
        .oneshot(post_form("/cart/add", "product_id=2&color=white&quantity=3", None))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let form = "name=Ali&email=ali%40example.com&address=1+Ring+Rd&city=Leeds\
                &postal_code=LS1&country=UK&card_number=4242424242424242\
                &card_expiry=12%2F99&card_cvc=123";
    let response = app
        .clone()
        .oneshot(post_form("/checkout", form, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/checkout/complete");

    let response = app
        .clone()
        .oneshot(get("/checkout/complete", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("RS-"));
    assert!(html.contains("recorded locally"));

    let response = app
        .oneshot(get("/cart/count", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(body_text(response).await, "0");
}

// ============= Auth =============

#[tokio::test]
async fn test_login_without_backend_shows_message() {
    let response = offline_app()
        .oneshot(post_form(
            "/auth/login",
            "email=ali%40example.com&password=hunter22",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let html = body_text(response).await;
    assert!(html.contains("Sign-in is unavailable right now"));
    assert!(html.contains("ali@example.com"));
}

#[tokio::test]
async fn test_login_rejects_invalid_email() {
    let response = offline_app()
        .oneshot(post_form("/auth/login", "email=not-an-email&password=x", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Enter a valid email address"));
}

#[tokio::test]
async fn test_sign_in_lists_purchased_courses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "user": {
                "id": 7,
                "email": "ali@example.com",
                "name": "Ali",
                "purchased_course_ids": [1]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 1,
            "slug": "boxing-fundamentals",
            "title": "Boxing Fundamentals",
            "summary": "Stance and guard.",
            "instructor": "Coach Maria Reyes",
            "level": "beginner",
            "price": "49.00"
        }])))
        .mount(&server)
        .await;

    let app = app_with_backend(&server.uri());
    let response = app
        .clone()
        .oneshot(post_form(
            "/auth/login",
            "email=ali%40example.com&password=hunter22",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/my-courses");
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(get("/my-courses", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Boxing Fundamentals"));
    assert!(html.contains("Welcome back, Ali."));
}

#[tokio::test]
async fn test_sign_in_accepts_huge_token_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(login_response(&[], i64::MAX))
        .mount(&server)
        .await;

    let response = app_with_backend(&server.uri())
        .oneshot(post_form(
            "/auth/login",
            "email=ali%40example.com&password=hunter22",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/my-courses");
}

// ============= Rate limiting =============

fn login_attempt(forwarded_for: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", forwarded_for)
        .extension(peer())
        .body(Body::from("email=ali%40example.com&password=hunter22"))
        .unwrap()
}

async fn login_statuses(app: Router, attempts: u8) -> Vec<StatusCode> {
    let mut statuses = Vec::new();
    for i in 0..attempts {
        let response = app
            .clone()
            .oneshot(login_attempt(&format!("198.51.100.{i}")))
            .await
            .unwrap();
        statuses.push(response.status());
    }
    statuses
}

#[tokio::test]
async fn test_login_limit_ignores_forwarded_for_by_default() {
    let statuses = login_statuses(offline_app(), 6).await;

    assert!(statuses[..5].iter().all(|s| *s != StatusCode::TOO_MANY_REQUESTS));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_login_limit_uses_forwarded_for_behind_proxy() {
    let mut config = local_config(UNREACHABLE_BACKEND);
    config.trust_proxy_headers = true;

    let statuses = login_statuses(app(AppState::new(config).unwrap()), 6).await;

    assert!(statuses.iter().all(|s| *s != StatusCode::TOO_MANY_REQUESTS));
}

// ============= Lesson player =============

#[tokio::test]
async fn test_unowned_course_player_redirects_to_course() {
    let app = offline_app();
    let response = app
        .clone()
        .oneshot(get("/courses/1/learn", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/courses/1");
    let cookie = session_cookie(&response);

    let response = app.oneshot(get("/courses/1", Some(&cookie))).await.unwrap();
    assert!(body_text(response).await.contains("Purchase this course to start learning."));
}

#[tokio::test]
async fn test_owned_course_opens_at_resume_point() {
    let (_server, app, cookie) = signed_in(&[1]).await;

    let response = app
        .oneshot(get("/courses/1/learn", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Stance and Guard"));
    assert!(html.contains("Finding your stance"));
    assert!(html.contains("Page 1 of 2"));
}

#[tokio::test]
async fn test_locked_page_redirects_to_resume_point() {
    let (_server, app, cookie) = signed_in(&[1]).await;
    // Shows and clears the sign-in notice
    app.clone()
        .oneshot(get("/courses/1/learn", Some(&cookie)))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/courses/1/learn?lesson=102&page=0", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/courses/1/learn?lesson=101&page=0");

    let response = app
        .oneshot(get("/courses/1/learn?lesson=101&page=0", Some(&cookie)))
        .await
        .unwrap();
    assert!(body_text(response).await.contains("Finish the previous page first."));
}

#[tokio::test]
async fn test_pending_notice_survives_locked_redirect() {
    let (_server, app, cookie) = signed_in(&[1]).await;

    let response = app
        .clone()
        .oneshot(get("/courses/1/learn?lesson=103&page=1", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .oneshot(get(location(&response), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Welcome back, Ali."));
}

#[tokio::test]
async fn test_unknown_page_is_not_found() {
    let (_server, app, cookie) = signed_in(&[1]).await;

    let response = app
        .clone()
        .oneshot(get("/courses/1/learn?lesson=101&page=9", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get("/courses/1/learn?lesson=201&page=0", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_completing_page_advances_player() {
    let (_server, app, cookie) = signed_in(&[1]).await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/courses/1/learn/complete",
            "lesson_id=101&page=0",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/courses/1/learn?lesson=101&page=1");

    let response = app
        .oneshot(get("/courses/1/learn", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Hands up"));
    assert!(html.contains("Page 2 of 2"));
}

#[tokio::test]
async fn test_offline_purchase_unlocks_player() {
    let (_server, app, cookie) = signed_in(&[]).await;

    let response = app
        .clone()
        .oneshot(get("/courses/2/learn", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(location(&response), "/courses/2");

    let response = app
        .clone()
        .oneshot(post_form("/courses/2/purchase", "", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/courses/2/learn");

    let response = app
        .oneshot(get("/courses/2/learn", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("demo mode"));
    assert!(html.contains("Step-drag"));
}

// ============= Chat =============

#[tokio::test]
async fn test_chat_without_backend_apologizes() {
    let app = offline_app();
    let response = app
        .clone()
        .oneshot(post_form("/chat", "message=How+do+I+slip+a+jab%3F", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/chat");
    let cookie = session_cookie(&response);

    let response = app.oneshot(get("/chat", Some(&cookie))).await.unwrap();
    let html = body_text(response).await;
    assert!(html.contains("How do I slip a jab?"));
    assert!(html.contains("chat-coach"));
}
