//! Canned HTTP stubs for exercising the clients without the real
//! Google endpoints.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sa_factory_auth::token::Token;
use sa_factory_auth::token_source::TokenSource;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub(crate) struct StaticTokenSource;

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Token, sa_factory_auth::error::Error> {
        Ok(Token {
            access_token: "test-token".to_string(),
            token_type: "Bearer".to_string(),
            expiry: None,
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StubResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.into(),
        }
    }

    pub fn multipart(boundary: &str, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: format!("multipart/mixed; boundary={boundary}"),
            body: body.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Replays a fixed list of responses in order and records every request.
/// Each connection serves exactly one exchange and is then closed, so the
/// request order stays aligned with the response list.
pub(crate) struct StubServer {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<StubResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            let mut queue = responses.into_iter();
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                let request = read_request(&mut socket).await;
                recorded.lock().unwrap().push(request);
                let response = queue.next().unwrap_or_else(|| StubResponse::json(200, "{}"));
                let payload = format!(
                    "HTTP/1.1 {} OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.status,
                    response.content_type,
                    response.body.len(),
                    response.body,
                );
                let _ = socket.write_all(payload.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Self { endpoint, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        match buf.windows(4).position(|w| w == b"\r\n\r\n") {
            Some(position) => break position + 4,
            None => {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break buf.len();
                }
                buf.extend_from_slice(&chunk[..n]);
            }
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let expected = header_end + content_length(&head);
    while buf.len() < expected {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    RecordedRequest {
        method: request_line.next().unwrap_or_default().to_string(),
        path: request_line.next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    }
}

fn content_length(head: &str) -> usize {
    for line in head.lines() {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse().unwrap_or(0);
            }
        }
    }
    0
}
