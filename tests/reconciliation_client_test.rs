/// HTTP reconciliation client tests against a local one-shot server
///
/// Tests cover:
/// - Request path, auth header and JSON body
/// - Error status mapping
use merchant_cascade::modules::reconciliation::{
    HttpReconciliationClient, ReconciliationClient, ReconciliationIdentifier,
};
use merchant_cascade::shared::config::ReconciliationConfig;
use merchant_cascade::shared::errors::AppError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: serde_json::Value,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Accept one connection, answer with `status`, return what was sent
async fn serve_once(status: u16) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let mut lines = head.split("\r\n").filter(|l| !l.is_empty());
        let request_line = lines.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        let content_length: usize = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .map(|(_, v)| v.parse().unwrap())
            .unwrap_or(0);
        while buffer.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            buffer.extend_from_slice(&chunk[..n]);
        }
        let body = serde_json::from_slice(&buffer[header_end..header_end + content_length])
            .unwrap_or(serde_json::Value::Null);

        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        CapturedRequest {
            request_line,
            headers,
            body,
        }
    });

    (base_url, handle)
}

fn identifier() -> ReconciliationIdentifier {
    ReconciliationIdentifier {
        identifier: "87654321".to_string(),
        loyalty_plan: "bink-loyalty".to_string(),
        payment_scheme: "mastercard".to_string(),
        location_id: Some("STORE-7".to_string()),
    }
}

fn client_for(base_url: &str) -> HttpReconciliationClient {
    let mut config = ReconciliationConfig::new(base_url);
    config.api_key = Some("secret".to_string());
    HttpReconciliationClient::new(&config).unwrap()
}

#[tokio::test]
async fn onboard_posts_identifiers_with_token() {
    let (base_url, server) = serve_once(201).await;

    client_for(&base_url).onboard(&[identifier()]).await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /identifiers HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("Token secret"));
    assert_eq!(
        request.body,
        serde_json::json!([{
            "identifier": "87654321",
            "loyalty_plan": "bink-loyalty",
            "payment_scheme": "mastercard",
            "location_id": "STORE-7"
        }])
    );
}

#[tokio::test]
async fn offboard_posts_to_deletion_endpoint() {
    let (base_url, server) = serve_once(200).await;

    client_for(&base_url).offboard(&[identifier()]).await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line, "POST /identifiers/deletion HTTP/1.1");
}

#[tokio::test]
async fn server_error_is_external_service_error() {
    let (base_url, server) = serve_once(503).await;

    let result = client_for(&base_url).onboard(&[identifier()]).await;

    assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
    assert!(result.unwrap_err().is_transient());
    server.await.unwrap();
}

#[tokio::test]
async fn client_error_is_not_transient() {
    let (base_url, server) = serve_once(400).await;

    let result = client_for(&base_url).offboard(&[identifier()]).await;

    assert!(matches!(result, Err(AppError::ApiError(_))));
    assert!(!result.unwrap_err().is_transient());
    server.await.unwrap();
}
