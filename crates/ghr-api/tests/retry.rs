use std::{sync::Arc, time::Duration};

use ghr_api::{
    ApiClient, Method,
    mock::{Reply, ScriptedTransport},
};
use ghr_model::{Credential, RetryPolicy};
use serde_json::json;
use tokio::time::Instant;

const URL: &str = "http://cp.test/repos/o/r/actions/runners/registration-token";

fn client(transport: &Arc<ScriptedTransport>, attempts: u32) -> ApiClient {
    let policy = RetryPolicy::new(attempts, Duration::from_secs(1), 2.0).unwrap();
    ApiClient::new(transport.clone(), policy)
}

#[tokio::test(start_paused = true)]
async fn backoff_waits_one_then_two_seconds() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on(
        Method::Post,
        URL,
        [
            Reply::fail("connection reset"),
            Reply::text(502, "<html>bad gateway</html>"),
            Reply::json(201, json!({"token": "AAAA1111"})),
        ],
    );

    let started = Instant::now();
    let resp = client(&transport, 3).json(Method::Post, URL, None).await;

    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(resp.status, Some(201));
    assert_eq!(resp.json.unwrap()["token"], "AAAA1111");
    assert_eq!(transport.count(Method::Post, URL), 3);
}

#[tokio::test(start_paused = true)]
async fn well_formed_error_document_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on(
        Method::Post,
        URL,
        [Reply::json(401, json!({"message": "Bad credentials"}))],
    );

    let started = Instant::now();
    let resp = client(&transport, 6).json(Method::Post, URL, None).await;

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(resp.status, Some(401));
    assert_eq!(resp.message().as_deref(), Some("Bad credentials"));
    assert_eq!(transport.count(Method::Post, URL), 1);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_hands_back_last_observation() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on(
        Method::Post,
        URL,
        [Reply::fail("dns"), Reply::text(503, "maintenance")],
    );

    let started = Instant::now();
    let resp = client(&transport, 4).json(Method::Post, URL, None).await;

    // 1 + 2 + 4
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    assert!(!resp.is_valid());
    assert_eq!(resp.status, Some(503));
    assert_eq!(resp.body, "maintenance");
    assert_eq!(transport.count(Method::Post, URL), 4);
}

#[tokio::test(start_paused = true)]
async fn status_call_retries_until_success() {
    let url = "http://cp.test/repos/o/r/actions/runners/7";
    let transport = Arc::new(ScriptedTransport::new());
    transport.on(
        Method::Delete,
        url,
        [Reply::status(500), Reply::status(204)],
    );

    let status = client(&transport, 3).status(Method::Delete, url, None).await;
    assert_eq!(status, Some(204));
    assert_eq!(transport.count_method(Method::Delete), 2);
}

#[tokio::test(start_paused = true)]
async fn status_call_reports_none_without_any_response() {
    let url = "http://cp.test/repos/o/r/actions/runners/7";
    let transport = Arc::new(ScriptedTransport::new());

    let status = client(&transport, 2).status(Method::Delete, url, None).await;
    assert_eq!(status, None);
    assert_eq!(transport.count_method(Method::Delete), 2);
}

#[tokio::test(start_paused = true)]
async fn download_gives_up_with_none() {
    let url = "https://objects.test/actions-runner-linux-x64-2.320.0.tar.gz";
    let transport = Arc::new(ScriptedTransport::new());
    transport.on(Method::Get, url, [Reply::status(404)]);

    assert!(client(&transport, 3).download(url).await.is_none());
    assert_eq!(transport.count(Method::Get, url), 3);

    transport.on(Method::Get, url, [Reply::bytes(200, vec![1, 2, 3])]);
    assert_eq!(client(&transport, 3).download(url).await, Some(vec![1, 2, 3]));
}

#[tokio::test(start_paused = true)]
async fn bearer_is_attached_to_api_calls_only() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on(Method::Post, URL, [Reply::json(201, json!({"token": "x"}))]);
    transport.on(Method::Get, "https://objects.test/a", [Reply::bytes(200, vec![0])]);

    let api = client(&transport, 1);
    let cred = Credential::new("ghp_secretvalue");
    api.json(Method::Post, URL, Some(&cred)).await;
    api.download("https://objects.test/a").await;

    let requests = transport.requests();
    assert_eq!(requests[0].bearer.as_ref().map(Credential::expose), Some("ghp_secretvalue"));
    assert!(requests[1].bearer.is_none());
}
