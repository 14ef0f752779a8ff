//! Invocation surface over a real socket.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

mod common;

#[tokio::test]
async fn ping_and_listing() {
    let invoker = common::start(common::MANIFEST).await;
    let client = reqwest::Client::new();

    let ping = client.get(invoker.url("/ping")).send().await.unwrap();
    assert_eq!(ping.status(), StatusCode::OK);
    let body: Value = ping.json().await.unwrap();
    assert_eq!(body["message"], "pong");
    assert!(body["timestamp"].is_string());

    let listing: Value = client
        .get(invoker.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = listing["functions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"uppercase"));
    assert!(!names.contains(&"functionRouter"));
}

#[tokio::test]
async fn invokes_configured_functions() {
    let invoker = common::start(common::MANIFEST).await;
    let client = reqwest::Client::new();

    let upper: Value = client
        .post(invoker.url("/upper"))
        .body("hello")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(upper, "HELLO");

    let count = client
        .post(invoker.url("/count"))
        .body(r#"{"text": "one two three"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(count.status(), StatusCode::OK);
    let count: Value = count.json().await.unwrap();
    assert_eq!(count["words"], 3);
}

#[tokio::test]
async fn routing_errors_are_structured() {
    let invoker = common::start(common::MANIFEST).await;
    let client = reqwest::Client::new();

    let put = client.put(invoker.url("/upper")).body("x").send().await.unwrap();
    assert_eq!(put.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(put.headers()["allow"], "POST");
    let body: Value = put.json().await.unwrap();
    assert_eq!(body["status"], 405);
    assert!(body["message"].as_str().unwrap().contains("PUT"));
    assert!(body["requestId"].is_string());

    let unknown = client.post(invoker.url("/unknown")).send().await.unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let body: Value = unknown.json().await.unwrap();
    assert_eq!(body["path"], "/unknown");
    assert_eq!(body["error"], "Not Found");

    let undeployed = client.post(invoker.url("/missing")).send().await.unwrap();
    assert_eq!(undeployed.status(), StatusCode::NOT_FOUND);
    let body: Value = undeployed.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("notDeployed"));
}

#[tokio::test]
async fn handler_failure_does_not_poison_the_server() {
    let invoker = common::start(common::MANIFEST).await;
    let client = reqwest::Client::new();

    let failed = client
        .post(invoker.url("/count"))
        .body(r#"{"text": "   "}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = failed.json().await.unwrap();
    let message = body["message"].as_str().unwrap();
    assert!(message.contains(r#"{"text": "   "}"#));
    assert!(message.contains("text must not be blank"));

    let ok = client
        .post(invoker.url("/upper"))
        .body("again")
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
}

#[tokio::test]
async fn request_id_round_trips() {
    let invoker = common::start(common::MANIFEST).await;
    let response = reqwest::Client::new()
        .post(invoker.url("/nowhere"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["requestId"], "trace-me");
}

#[tokio::test]
async fn manifest_swap_changes_routing() {
    let invoker = common::start(common::MANIFEST).await;
    let client = reqwest::Client::new();

    let reloaded = common::manifest(
        "location: demo.jar\npaths:\n  /shout:\n    handler: com.example.functions.Uppercase\n",
    );
    faas_invoker::lifecycle::apply_manifest(reloaded, &invoker.routing, &invoker.store).unwrap();

    let old = client.post(invoker.url("/upper")).body("x").send().await.unwrap();
    assert_eq!(old.status(), StatusCode::NOT_FOUND);
    let new = client.post(invoker.url("/shout")).body("x").send().await.unwrap();
    assert_eq!(new.status(), StatusCode::OK);
    assert_eq!(invoker.store.version(), 2);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let invoker = common::start(common::MANIFEST).await;
    let url = invoker.url("/ping");
    invoker.shutdown.trigger();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let mut refused = false;
    for _ in 0..50 {
        if client.get(&url).send().await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(refused);
}
