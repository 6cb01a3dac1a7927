//! GeminiService against a one-shot local HTTP server.

use pretty_assertions::assert_eq;
use readiness_core::flows::trl_pipeline;
use readiness_core::{GenerationRequest, GenerativeService, ServiceError};
use readiness_service::GeminiService;
use readiness_test_utils::{fixed_clock, test_config, FIXED_TIMESTAMP};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Captured request: head (request line + headers) and JSON body
struct Captured {
    head: String,
    body: Value,
}

/// Serve a single response and hand back what the client sent
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        let split = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buffer[..split]).to_string();
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buffer.len() < split + length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending body");
            buffer.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        Captured {
            head,
            body: serde_json::from_slice(&buffer[split..split + length]).unwrap_or(Value::Null),
        }
    });

    (base_url, handle)
}

fn reply_with(text: &str) -> String {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}]})
        .to_string()
}

fn request() -> GenerationRequest {
    GenerationRequest {
        instruction: "Assess: pump".to_string(),
        source_text: "a pump".to_string(),
        candidates: vec!["pump".into()],
        temperature: 0.2,
    }
}

#[tokio::test]
async fn posts_prompt_and_returns_text() {
    let (base_url, server) = serve_once("200 OK", reply_with(r#"{"pump": {"trl": 3}}"#)).await;
    let service = GeminiService::new(base_url, "gemini-2.0-flash", "test-key");

    let text = service.generate(&request()).await.unwrap();
    assert_eq!(text, r#"{"pump": {"trl": 3}}"#);

    let captured = server.await.unwrap();
    assert!(captured
        .head
        .starts_with("POST /v1beta/models/gemini-2.0-flash:generateContent HTTP/1.1"));
    assert!(captured.head.to_lowercase().contains("x-goog-api-key: test-key"));
    assert_eq!(
        captured.body["contents"][0]["parts"][0]["text"],
        json!("Assess: pump\na pump")
    );
    assert!((captured.body["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn error_status_is_reported() {
    let (base_url, server) = serve_once("429 Too Many Requests", json!({"error": "quota"}).to_string()).await;
    let service = GeminiService::new(base_url, "m", "k");

    let err = service.generate(&request()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Status { status: 429, .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn missing_text_is_malformed() {
    let (base_url, server) = serve_once("200 OK", json!({"candidates": []}).to_string()).await;
    let service = GeminiService::new(base_url, "m", "k");

    let err = service.generate(&request()).await.unwrap_err();
    assert!(err.is_malformed());
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = GeminiService::new(format!("http://{addr}"), "m", "k");
    assert!(matches!(
        service.generate(&request()).await,
        Err(ServiceError::Transport(_))
    ));
}

#[tokio::test]
async fn trl_pipeline_over_http() {
    let (base_url, server) = serve_once(
        "200 OK",
        reply_with(r#"{"valve": {"trl": 5, "justification": "Validated in relevant environment"}}"#),
    )
    .await;
    let config = test_config().with_base_url(base_url);
    let service = Arc::new(GeminiService::from_config_with(&config, |_| Some("k".to_string())).unwrap());
    let pipeline = trl_pipeline(service, &config).unwrap().with_clock(fixed_clock());

    let mapping = pipeline.run("Inlet valve assembly").await;
    assert_eq!(
        serde_json::to_value(&mapping).unwrap(),
        json!({"valve": {"trl": 5, "justification": "Validated in relevant environment", "timestamp": FIXED_TIMESTAMP}})
    );
    server.await.unwrap();
}
