//! The HTTP application end to end, in-process, with wiremock backends.

use axum::body::{Body, BodyDataStream};
use axum::http::{Request, StatusCode};
use axum::Router;
use baton::{SessionRegistry, SseBinding};
use futures::StreamExt;
use seine::{serve, ToolDispatcher};
use seineconf::SeineConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    app: Router,
    sessions: Arc<SessionRegistry<SseBinding>>,
    _searxng: MockServer,
    _crawl4ai: MockServer,
}

async fn harness(auth_token: Option<&str>) -> Harness {
    let searxng = MockServer::start().await;
    let crawl4ai = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&searxng)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "rust",
            "number_of_results": 1,
            "results": [{ "title": "Rust", "url": "https://www.rust-lang.org/", "content": "A language" }]
        })))
        .mount(&searxng)
        .await;
    Mock::given(method("POST"))
        .and(path("/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "url": "https://www.rust-lang.org/",
            "data": { "markdown": "# Rust" }
        })))
        .mount(&crawl4ai)
        .await;
    // No /health mock on crawl4ai: wiremock answers 404.

    let mut config = SeineConfig::default();
    config.backends.searxng_url = searxng.uri();
    config.backends.crawl4ai_url = crawl4ai.uri();
    config.http.auth_token = auth_token.map(str::to_string);

    let dispatcher = Arc::new(ToolDispatcher::from_config(&config).unwrap());
    let sessions = Arc::new(SessionRegistry::new());
    let app = serve::app(dispatcher, Arc::clone(&sessions), &config.http);

    Harness {
        app,
        sessions,
        _searxng: searxng,
        _crawl4ai: crawl4ai,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read one SSE event, returning (event name, data).
async fn next_event(stream: &mut BodyDataStream, buffer: &mut String) -> (String, String) {
    loop {
        if let Some(end) = buffer.find("\n\n") {
            let raw: String = buffer.drain(..end + 2).collect();
            let mut event = String::new();
            let mut data = String::new();
            for line in raw.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    event = v.trim().to_string();
                } else if let Some(v) = line.strip_prefix("data:") {
                    data.push_str(v.trim());
                }
            }
            if event.is_empty() && data.is_empty() {
                continue;
            }
            return (event, data);
        }

        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for SSE event")
            .expect("stream ended")
            .expect("body error");
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

#[tokio::test]
async fn test_health_reports_each_backend() {
    let h = harness(None).await;
    let (status, body) = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "searxng": true, "crawl4ai": false }));
}

#[tokio::test]
async fn test_bearer_token_guards_everything() {
    let h = harness(Some("s3cret")).await;

    let (status, body) = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "ok": false, "error": "unauthorized" }));

    let (status, _) = send(
        &h.app,
        Request::get("/health")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&h.app, Request::get("/mcp/sse").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn test_pass_through_search_web() {
    let h = harness(None).await;
    let (status, body) = send(
        &h.app,
        post_json("/mcp/tool/search_web", json!({ "arguments": { "query": "rust" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"]["isError"], false);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let inner: Value = serde_json::from_str(text).unwrap();
    assert_eq!(inner["total_results"], 1);
    assert_eq!(inner["results"][0]["url"], "https://www.rust-lang.org/");
}

#[tokio::test]
async fn test_pass_through_call_body_forms() {
    let h = harness(None).await;

    let (status, body) = send(
        &h.app,
        post_json("/mcp/call", json!({ "name": "scrape_url", "args": { "url": "https://www.rust-lang.org/" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let inner: Value = serde_json::from_str(body["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(inner["data"]["markdown"], "# Rust");

    let (status, body) = send(&h.app, post_json("/mcp/call", json!({ "params": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tool name required");

    let (status, body) = send(&h.app, post_json("/mcp/tool/crawl_website", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_pass_through_error_is_500() {
    let h = harness(None).await;
    let (status, body) = send(&h.app, post_json("/mcp/tool/search_web", json!({ "arguments": {} }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid arguments for search_web:"));
}

#[tokio::test]
async fn test_sse_session_under_both_prefixes() {
    let h = harness(None).await;
    let mut open_streams = Vec::new();

    for uri in ["/mcp/sse", "/sse"] {
        let response = h
            .app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut stream = response.into_body().into_data_stream();
        let mut buffer = String::new();
        let (event, endpoint) = next_event(&mut stream, &mut buffer).await;
        assert_eq!(event, "endpoint");
        assert!(endpoint.starts_with("/mcp/sse?sessionId="), "{}", endpoint);

        let (status, _) = send(
            &h.app,
            post_json(&endpoint, json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (event, data) = next_event(&mut stream, &mut buffer).await;
        assert_eq!(event, "message");
        let reply: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(reply["result"]["tools"].as_array().unwrap().len(), 9);
        open_streams.push(stream);
    }

    assert_eq!(h.sessions.len(), 2);
    h.sessions.close_all();
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn test_sse_tool_call_carries_result() {
    let h = harness(None).await;
    let response = h
        .app
        .clone()
        .oneshot(Request::get("/mcp/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut stream = response.into_body().into_data_stream();
    let mut buffer = String::new();
    let (_, endpoint) = next_event(&mut stream, &mut buffer).await;

    let (status, _) = send(
        &h.app,
        post_json(
            &endpoint,
            json!({
                "jsonrpc": "2.0", "id": "call-1", "method": "tools/call",
                "params": { "name": "search_and_scrape", "arguments": { "query": "rust" } }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, data) = next_event(&mut stream, &mut buffer).await;
    let reply: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(reply["id"], "call-1");
    assert_eq!(reply["result"]["isError"], false);
    let inner: Value = serde_json::from_str(reply["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(inner["scraped_count"], 1);
    assert_eq!(inner["results"][0]["scraped_content"]["markdown"], "# Rust");
}
