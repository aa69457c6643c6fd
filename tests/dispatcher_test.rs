mod common;

use std::time::Duration;

use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

use common::SubscriberState;
use getnet_gateway::{
    callback::{CallbackDispatcher, CallbackJob, DeliveryOutcome},
    domain::{Buyer, PaymentStatus},
};

fn job(url: String) -> CallbackJob {
    CallbackJob {
        callback_url: url,
        request_id: "88860455".to_string(),
        reference: "ORDER-1".to_string(),
        status: PaymentStatus::Approved,
        amount: 5000,
        currency: "CLP".to_string(),
        buyer: Buyer {
            name: "Hugo".to_string(),
            email: "test@example.com".to_string(),
            document: None,
        },
        is_retry: false,
        attempt_number: 1,
    }
}

fn dispatcher() -> CallbackDispatcher {
    CallbackDispatcher::new(common::TEST_SECRET.to_string(), Duration::from_secs(2))
        .expect("dispatcher")
}

#[tokio::test]
async fn delivers_payload_and_headers() -> anyhow::Result<()> {
    let captured: std::sync::Arc<std::sync::Mutex<Vec<(HeaderMap, Value)>>> = Default::default();
    let capture = captured.clone();
    let router = Router::new().route(
        "/callback",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let capture = capture.clone();
            async move {
                capture.lock().expect("lock").push((headers, body));
                StatusCode::OK
            }
        }),
    );
    let addr = common::spawn_server(router).await;
    let url = format!("http://{addr}/callback");

    let outcome = dispatcher().deliver(&job(url.clone())).await;
    assert_eq!(outcome, DeliveryOutcome::Success { status_code: 200 });
    assert!(outcome.is_success());
    assert_eq!(outcome.status_code(), 200);
    assert_eq!(outcome.error_message(), None);

    let captured = captured.lock().expect("lock");
    let (headers, body) = &captured[0];
    assert_eq!(headers.get("x-getnet-requestid").unwrap(), "88860455");
    assert_eq!(headers.get("x-attempt-number").unwrap(), "1");

    // secretHash = SHA-1("test-secret" + callbackUrl), travels in the body.
    let expected_hash = dispatcher().callback_secret(&url);
    assert_eq!(body["secretHash"].as_str().unwrap(), expected_hash);
    assert_eq!(body["requestId"], "88860455");
    assert_eq!(body["reference"], "ORDER-1");
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["amount"], 5000);
    assert_eq!(body["currency"], "CLP");
    assert_eq!(body["isRetry"], false);
    assert_eq!(body["attemptNumber"], 1);
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

    Ok(())
}

#[tokio::test]
async fn only_200_and_201_count_as_success() -> anyhow::Result<()> {
    let state = SubscriberState::default();
    let addr = common::spawn_subscriber(state.clone()).await;
    let url = format!("http://{addr}/callback");

    // 201 is accepted.
    let outcome = dispatcher().deliver(&job(url)).await;
    assert_eq!(outcome, DeliveryOutcome::Success { status_code: 201 });

    // 204 is a 2xx but not an accepted status.
    let router = Router::new().route("/callback", post(|| async { StatusCode::NO_CONTENT }));
    let addr = common::spawn_server(router).await;
    let outcome = dispatcher().deliver(&job(format!("http://{addr}/callback"))).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::HttpFailure {
            status_code: 204,
            error: "HTTP 204".to_string()
        }
    );

    Ok(())
}

#[tokio::test]
async fn failure_error_comes_from_response_body() -> anyhow::Result<()> {
    let router = Router::new()
        .route(
            "/message",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "boom" })),
                )
            }),
        )
        .route(
            "/error",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad payload" }))) }),
        )
        .route("/bare", post(|| async { StatusCode::NOT_FOUND }));
    let addr = common::spawn_server(router).await;

    let outcome = dispatcher().deliver(&job(format!("http://{addr}/message"))).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::HttpFailure {
            status_code: 500,
            error: "boom".to_string()
        }
    );

    let outcome = dispatcher().deliver(&job(format!("http://{addr}/error"))).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::HttpFailure {
            status_code: 400,
            error: "bad payload".to_string()
        }
    );

    // No parseable body: synthesized message.
    let outcome = dispatcher().deliver(&job(format!("http://{addr}/bare"))).await;
    assert_eq!(
        outcome,
        DeliveryOutcome::HttpFailure {
            status_code: 404,
            error: "HTTP 404".to_string()
        }
    );

    Ok(())
}

#[tokio::test]
async fn slow_subscriber_is_classified_as_timeout() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/callback",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    );
    let addr = common::spawn_server(router).await;

    let dispatcher =
        CallbackDispatcher::new(common::TEST_SECRET.to_string(), Duration::from_millis(250))
            .expect("dispatcher");
    let outcome = dispatcher.deliver(&job(format!("http://{addr}/callback"))).await;

    assert_eq!(outcome, DeliveryOutcome::Timeout);
    assert_eq!(outcome.status_code(), 0);
    assert_eq!(outcome.error_message().as_deref(), Some("Timeout"));

    Ok(())
}

#[tokio::test]
async fn unreachable_subscriber_is_a_transport_failure() -> anyhow::Result<()> {
    // Port 9 is discard; nothing listens there in the test environment.
    let outcome = dispatcher().deliver(&job("http://127.0.0.1:9/callback".to_string())).await;

    match outcome {
        DeliveryOutcome::TransportFailure { ref error } => assert!(!error.is_empty()),
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert_eq!(outcome.status_code(), 0);

    Ok(())
}
