//! Clarifai client against a local one-shot HTTP responder

use classview_ai::backends::ClarifaiClient;
use classview_ai::config::ClarifaiConfig;
use classview_ai::{BackendError, VisionBackend};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one request with `status` and `body`; yields the raw request
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn client_for(base_url: &str, api_key: Option<&str>) -> ClarifaiClient {
    client_with_timeout(base_url, api_key, Duration::from_secs(5))
}

fn client_with_timeout(
    base_url: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> ClarifaiClient {
    let config = ClarifaiConfig {
        api_key: api_key.map(str::to_string),
        user_id: "district".to_string(),
        app_id: "classroom".to_string(),
        model_id: "classroom-analysis-model".to_string(),
        base_url: base_url.to_string(),
    };
    ClarifaiClient::new(&config, timeout).unwrap()
}

#[tokio::test]
async fn test_successful_request_returns_concepts() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"status":{"code":10000,"description":"Ok"},"outputs":[{"data":{"concepts":[
            {"name":"person","value":0.93},
            {"name":"whiteboard","value":0.71}
        ]}}]}"#,
    )
    .await;

    let client = client_for(&base_url, Some("secret-key"));
    let concepts = client.score(b"fake image").await.unwrap();

    assert_eq!(concepts.len(), 2);
    assert_eq!(concepts[0].name, "person");
    assert!((concepts[0].confidence - 0.93).abs() < 1e-6);

    let request = server.await.unwrap();
    assert!(request.starts_with(
        "POST /v2/users/district/apps/classroom/models/classroom-analysis-model/outputs"
    ));
    assert!(request
        .lines()
        .any(|line| line.eq_ignore_ascii_case("authorization: Key secret-key")));
    // base64 of "fake image"
    assert!(request.contains(r#""base64":"ZmFrZSBpbWFnZQ==""#));
}

#[tokio::test]
async fn test_http_error_is_api_error_with_description() {
    let (base_url, server) = serve_once(
        "401 Unauthorized",
        r#"{"status":{"code":11102,"description":"Invalid API key"}}"#,
    )
    .await;

    let client = client_for(&base_url, Some("wrong-key"));
    let err = client.score(b"fake image").await.unwrap_err();

    match err {
        BackendError::Api(message) => {
            assert!(message.contains("401"));
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_non_success_status_code_in_ok_response() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"status":{"code":10020,"description":"Failure"},"outputs":[]}"#,
    )
    .await;

    let client = client_for(&base_url, Some("secret-key"));
    let err = client.score(b"fake image").await.unwrap_err();
    assert!(matches!(err, BackendError::Api(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = client_for(&base_url, Some("secret-key"));
    let err = client.score(b"fake image").await.unwrap_err();
    assert!(matches!(err, BackendError::Network(_)));
}

#[tokio::test]
async fn test_unanswered_request_is_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    // Accept and read, but never answer
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _request = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = client_with_timeout(&base_url, Some("secret-key"), Duration::from_millis(200));
    let err = client.score(b"fake image").await.unwrap_err();
    assert!(matches!(err, BackendError::Timeout(200)), "got {:?}", err);

    server.abort();
}
