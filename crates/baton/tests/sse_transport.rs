//! SSE transport end to end, in-process through the axum router.

use async_trait::async_trait;
use axum::body::{Body, BodyDataStream};
use axum::http::{Request, StatusCode};
use axum::Router;
use baton::{
    CallToolResult, ErrorData, Handler, Implementation, McpState, SessionRegistry, SseBinding, Tool,
    ToolCallRequest,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct Greeter;

#[async_trait]
impl Handler for Greeter {
    fn tools(&self) -> Vec<Tool> {
        vec![Tool::new("greet", "Greet someone")]
    }

    async fn call_tool(&self, request: ToolCallRequest) -> Result<CallToolResult, ErrorData> {
        let name = request.arguments["name"].as_str().unwrap_or("stranger");
        Ok(CallToolResult::text(format!(
            "hello {} from {}",
            name,
            request.session_id.unwrap_or_default()
        )))
    }

    fn server_info(&self) -> Implementation {
        Implementation::new("greeter", "0.0.1")
    }
}

fn setup() -> (Router, Arc<SessionRegistry<SseBinding>>) {
    let sessions = Arc::new(SessionRegistry::new());
    let state = Arc::new(
        McpState::new(Arc::new(Greeter), Arc::clone(&sessions)).with_message_endpoint("/message"),
    );
    (baton::router(state), sessions)
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
                continue; // keep-alive comment
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

async fn post(app: &Router, uri: &str, body: Value) -> StatusCode {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_sse_round_trip() {
    let (app, sessions) = setup();

    let response = app
        .clone()
        .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut stream = response.into_body().into_data_stream();
    let mut buffer = String::new();

    let (event, endpoint) = next_event(&mut stream, &mut buffer).await;
    assert_eq!(event, "endpoint");
    assert!(endpoint.starts_with("/message?sessionId="));
    let session_id = endpoint.trim_start_matches("/message?sessionId=").to_string();
    assert_eq!(sessions.len(), 1);
    assert!(sessions.contains(&session_id));

    let status = post(
        &app,
        &endpoint,
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": { "name": "greet", "arguments": { "name": "ada" } }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (event, data) = next_event(&mut stream, &mut buffer).await;
    assert_eq!(event, "message");
    let reply: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(reply["id"], 1);
    assert_eq!(
        reply["result"]["content"][0]["text"],
        format!("hello ada from {}", session_id)
    );

    // Path-addressed form reaches the same session.
    let status = post(
        &app,
        &format!("/sse/{}", session_id),
        json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (_, data) = next_event(&mut stream, &mut buffer).await;
    let reply: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(reply["id"], 2);

    // Client goes away: the session disappears with it.
    drop(stream);
    tokio::time::timeout(Duration::from_secs(2), async {
        while !sessions.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session should be removed after disconnect");

    let status = post(
        &app,
        &format!("/message?sessionId={}", session_id),
        json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (app, sessions) = setup();

    let response = app
        .clone()
        .oneshot(
            Request::post("/message?sessionId=does-not-exist")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "jsonrpc": "2.0", "id": 7, "method": "ping" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["id"], 7);
    assert_eq!(body["error"]["message"], "Session not found");
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_missing_session_id_is_bad_request() {
    let (app, _) = setup();
    let status = post(&app, "/message", json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_header_addressed_session() {
    let (app, sessions) = setup();

    let response = app
        .clone()
        .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut stream = response.into_body().into_data_stream();
    let mut buffer = String::new();
    let (_, endpoint) = next_event(&mut stream, &mut buffer).await;
    let session_id = endpoint.trim_start_matches("/message?sessionId=").to_string();

    let status = app
        .clone()
        .oneshot(
            Request::post("/sse")
                .header("content-type", "application/json")
                .header("x-session-id", &session_id)
                .body(Body::from(
                    json!({ "jsonrpc": "2.0", "id": 11, "method": "tools/list" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap()
        .status();
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, data) = next_event(&mut stream, &mut buffer).await;
    let reply: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(reply["result"]["tools"][0]["name"], "greet");

    sessions.close_all();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_unauthorized_request_creates_no_session() {
    let (app, sessions) = setup();
    let app = baton::with_bearer_auth(app, Some(baton::BearerToken::new("hunter2")));

    let response = app
        .clone()
        .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(sessions.is_empty());
}
