//! Provider adapters against a throwaway local HTTP server.

use std::sync::Arc;
use std::time::Duration;

use codeshot_lib::ai::anthropic::AnthropicClient;
use codeshot_lib::ai::gemini::GeminiClient;
use codeshot_lib::ai::http::RequestPolicy;
use codeshot_lib::ai::openai::OpenAIClient;
use codeshot_lib::{AiRequest, ErrorKind, ImageData, ProviderClient, Stage};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

struct Stub {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn last_request(&self) -> String {
        self.requests.lock().last().cloned().unwrap_or_default()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Serves every connection with the same status and body after `delay`.
async fn stub(status: u16, body: &'static str, delay: Duration) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let seen = seen.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                seen.lock().push(request);
                tokio::time::sleep(delay).await;
                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Stub {
        base_url: format!("http://{}", addr),
        requests,
    }
}

fn request() -> AiRequest {
    AiRequest {
        stage: Stage::Extraction,
        system_prompt: "extract the problem".to_string(),
        prompt: "here are the screenshots".to_string(),
        images: vec![ImageData::png("aGVsbG8=")],
    }
}

fn quick_policy() -> RequestPolicy {
    RequestPolicy {
        timeout: Duration::from_secs(10),
        max_retries: 1,
    }
}

fn clients(base_url: &str) -> Vec<Box<dyn ProviderClient>> {
    vec![
        Box::new(OpenAIClient::new("sk-test", quick_policy()).with_base_url(base_url)),
        Box::new(GeminiClient::new("AIza-test-key", quick_policy()).with_base_url(base_url)),
        Box::new(AnthropicClient::new("sk-ant-test", quick_policy()).with_base_url(base_url)),
    ]
}

#[tokio::test]
async fn openai_returns_first_choice_text() {
    let server = stub(
        200,
        r#"{"choices":[{"message":{"content":"hello"}},{"message":{"content":"ignored"}}]}"#,
        Duration::ZERO,
    )
    .await;
    let client = OpenAIClient::new("sk-test", quick_policy()).with_base_url(&server.base_url);

    let text = client
        .send(&request(), "gpt-4o", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "hello");

    let raw = server.last_request().to_lowercase();
    assert!(raw.starts_with("post /v1/chat/completions"));
    assert!(raw.contains("authorization: bearer sk-test"));
    assert!(raw.contains("data:image/png;base64,agvsbg8="));
}

#[tokio::test]
async fn gemini_sends_key_as_query_parameter() {
    let server = stub(
        200,
        r#"{"candidates":[{"content":{"parts":[{"text":"{\"problem_statement\":\"x\"}"}]}}]}"#,
        Duration::ZERO,
    )
    .await;
    let client = GeminiClient::new("AIza-test-key", quick_policy()).with_base_url(&server.base_url);

    let text = client
        .send(&request(), "gemini-2.0-flash", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, r#"{"problem_statement":"x"}"#);

    let raw = server.last_request();
    assert!(raw.starts_with("POST /v1beta/models/gemini-2.0-flash:generateContent?key=AIza-test-key"));
    assert!(raw.contains("inlineData"));
}

#[tokio::test]
async fn anthropic_sends_version_header() {
    let server = stub(
        200,
        r#"{"content":[{"type":"text","text":"analysis"}]}"#,
        Duration::ZERO,
    )
    .await;
    let client = AnthropicClient::new("sk-ant-test", quick_policy()).with_base_url(&server.base_url);

    let text = client
        .send(&request(), "claude-3-7-sonnet-20250219", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "analysis");

    let raw = server.last_request().to_lowercase();
    assert!(raw.starts_with("post /v1/messages"));
    assert!(raw.contains("x-api-key: sk-ant-test"));
    assert!(raw.contains("anthropic-version: 2023-06-01"));
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited_for_every_adapter() {
    let server = stub(429, r#"{"error":"slow down"}"#, Duration::ZERO).await;

    for client in clients(&server.base_url) {
        let err = client
            .send(&request(), "model", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert!(
            err.message.contains(client.provider().display_name()),
            "{}",
            err.message
        );
    }
    // 429 is never retried
    assert_eq!(server.requests.lock().len(), 3);
}

#[tokio::test]
async fn auth_and_size_and_server_errors_are_distinct() {
    let unauthorized = stub(401, "{}", Duration::ZERO).await;
    let too_large = stub(413, "{}", Duration::ZERO).await;
    let unavailable = stub(503, "{}", Duration::ZERO).await;

    for (server, kind) in [
        (&unauthorized, ErrorKind::InvalidCredential),
        (&too_large, ErrorKind::PayloadTooLarge),
        (&unavailable, ErrorKind::VendorServerError),
    ] {
        for client in clients(&server.base_url) {
            let err = client
                .send(&request(), "model", &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind, kind);
        }
    }
}

#[tokio::test]
async fn missing_text_is_no_content() {
    let empty_openai = stub(200, r#"{"choices":[]}"#, Duration::ZERO).await;
    let client = OpenAIClient::new("sk-test", quick_policy()).with_base_url(&empty_openai.base_url);
    let err = client
        .send(&request(), "gpt-4o", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoContent);

    let empty_claude = stub(200, r#"{"content":[]}"#, Duration::ZERO).await;
    let client =
        AnthropicClient::new("sk-ant-test", quick_policy()).with_base_url(&empty_claude.base_url);
    let err = client
        .send(&request(), "claude", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoContent);

    let empty_gemini = stub(200, r#"{"candidates":[]}"#, Duration::ZERO).await;
    let client =
        GeminiClient::new("AIza-test-key", quick_policy()).with_base_url(&empty_gemini.base_url);
    let err = client
        .send(&request(), "gemini", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoContent);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_request() {
    let server = stub(200, r#"{"choices":[]}"#, Duration::from_secs(30)).await;
    let client = OpenAIClient::new("sk-test", quick_policy()).with_base_url(&server.base_url);
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.send(&request(), "gpt-4o", &token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Canceled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unreachable_host_is_generic_after_retries() {
    // Grab a free port, then close it so connections are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GeminiClient::new("AIza-test-key", quick_policy())
        .with_base_url(format!("http://{}", addr));
    let err = client
        .send(&request(), "gemini-2.0-flash", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Generic);
    assert!(err.message.contains("request failed"));
}
