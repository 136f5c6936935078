use std::time::Duration;

use ark::checker::{Checker, HttpChecker};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn checker() -> HttpChecker {
    HttpChecker::new(Duration::from_secs(2), "ark-tests").unwrap()
}

#[tokio::test]
async fn ok_response_is_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = checker().check(&format!("{}/health", server.uri())).await;

    assert!(outcome.up);
    assert_eq!(outcome.status_code, 200);
    assert!(outcome.error.is_none());
    assert!(outcome.latency_ms >= 0);
}

#[tokio::test]
async fn server_error_is_down_with_its_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let outcome = checker().check(&server.uri()).await;

    assert!(!outcome.up);
    assert_eq!(outcome.status_code, 503);
}

#[tokio::test]
async fn other_success_codes_are_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let outcome = checker().check(&server.uri()).await;

    assert!(!outcome.up);
    assert_eq!(outcome.status_code, 204);
}

#[tokio::test]
async fn slow_response_times_out_as_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let checker = HttpChecker::new(Duration::from_millis(200), "ark-tests").unwrap();
    let outcome = checker.check(&server.uri()).await;

    assert!(!outcome.up);
    assert_eq!(outcome.status_code, 0);
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let outcome = checker().check("http://127.0.0.1:1/").await;

    assert!(!outcome.up);
    assert_eq!(outcome.status_code, 0);
    assert!(outcome.error.is_some());
}
