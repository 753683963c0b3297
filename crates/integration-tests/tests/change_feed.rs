//! Server-Sent Events fan-out from the event hub.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use serde_json::json;
use tower::ServiceExt;

use soko_api::realtime::{BridgeEvent, Feed};
use soko_integration_tests::{test_app, test_config};

fn events_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

fn notification(feed: Feed, table: &str, change: &str, status: &str) -> BridgeEvent {
    let payload = json!({
        "table": table,
        "type": change,
        "record": { "id": "6f1c2a9e-8b3d-4c5e-9f7a-1b2c3d4e5f60", "status": status },
        "old_record": null
    });
    BridgeEvent::from_notification(feed, &payload.to_string()).expect("valid notification")
}

#[tokio::test]
async fn test_stream_delivers_only_requested_feeds() {
    let (app, events) = test_app(test_config());
    let response = app
        .oneshot(events_request("/api/events?feeds=rides"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .expect("content type"),
        "text/event-stream"
    );
    assert_eq!(events.subscriber_count(), 1);

    events.publish(notification(Feed::Orders, "orders", "UPDATE", "confirmed"));
    events.publish(notification(Feed::Rides, "rides", "UPDATE", "in_progress"));

    let mut body = response.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .expect("event within timeout")
        .expect("stream open")
        .expect("frame");
    let text = String::from_utf8(frame.to_vec()).expect("utf-8 frame");

    assert!(text.starts_with("event: rides"), "unexpected frame: {text}");
    assert!(text.contains("\"toast\":\"Ride in progress\""));
    assert!(!text.contains("Order confirmed"));
}

#[tokio::test]
async fn test_every_client_receives_each_event() {
    let (app, events) = test_app(test_config());
    let first = app
        .clone()
        .oneshot(events_request("/api/events"))
        .await
        .expect("response");
    let second = app
        .oneshot(events_request("/api/events?feeds=chats"))
        .await
        .expect("response");
    assert_eq!(events.subscriber_count(), 2);

    let delivered = events.publish(notification(Feed::Chats, "chats", "INSERT", "sent"));
    assert_eq!(delivered, 2);

    for response in [first, second] {
        let mut body = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .expect("event within timeout")
            .expect("stream open")
            .expect("frame");
        let text = String::from_utf8(frame.to_vec()).expect("utf-8 frame");
        assert!(text.contains("\"toast\":\"New message\""));
    }
}

#[tokio::test]
async fn test_unknown_feed_is_rejected() {
    let (app, events) = test_app(test_config());
    let response = app
        .oneshot(events_request("/api/events?feeds=orders,parcels"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(events.subscriber_count(), 0);
}
