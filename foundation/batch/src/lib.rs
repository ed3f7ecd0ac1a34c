//! One HTTP round trip carrying many independent Google API calls.
//!
//! Google's batch endpoints accept a `multipart/mixed` POST where every
//! part is an `application/http` envelope holding one inner request, and
//! answer with the same shape holding one inner response per part. Each
//! item resolves with its own status and body, so a single throttled or
//! failed call does not poison its siblings.

pub mod error;

use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;

pub use crate::error::{Error, ErrorResponse};
use crate::error::ErrorWrapper;

/// Fixed pause applied by callers when a batch item comes back 429.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(300);

#[derive(Clone, Debug)]
struct Part {
    method: reqwest::Method,
    path: String,
    body: Option<serde_json::Value>,
}

/// An ordered set of independent API calls dispatched as one request.
#[derive(Clone, Debug)]
pub struct BatchRequest {
    endpoint: String,
    parts: Vec<Part>,
}

impl BatchRequest {
    /// `endpoint` is the service's batch URL, e.g.
    /// `https://iam.googleapis.com/batch`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            parts: Vec::new(),
        }
    }

    /// Queues one call. `path` is relative to the service root and `body`
    /// is serialized as the inner JSON payload when present.
    pub fn add(&mut self, method: reqwest::Method, path: impl Into<String>, body: Option<serde_json::Value>) {
        self.parts.push(Part {
            method,
            path: path.into(),
            body,
        });
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn encode(&self, boundary: &str) -> String {
        let mut out = String::new();
        for (index, part) in self.parts.iter().enumerate() {
            out.push_str(&format!("--{boundary}\r\n"));
            out.push_str("Content-Type: application/http\r\n");
            out.push_str(&format!("Content-ID: <item{index}>\r\n\r\n"));
            out.push_str(&format!("{} {} HTTP/1.1\r\n", part.method, part.path));
            match &part.body {
                Some(body) => {
                    let json = body.to_string();
                    out.push_str("Content-Type: application/json\r\n");
                    out.push_str(&format!("Content-Length: {}\r\n\r\n", json.len()));
                    out.push_str(&json);
                    out.push_str("\r\n");
                }
                None => out.push_str("\r\n"),
            }
        }
        out.push_str(&format!("--{boundary}--\r\n"));
        out
    }

    /// Sends the batch and returns one [`BatchItem`] per queued call, in
    /// submission order. Results are handed back to the caller rather than
    /// accumulated through shared state.
    pub async fn execute(self, client: &reqwest::Client, authorization: &str) -> Result<Vec<BatchItem>, Error> {
        let boundary = random_boundary();
        let submitted = self.parts.len();
        let payload = self.encode(&boundary);

        let response = client
            .post(&self.endpoint)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/mixed; boundary={boundary}"),
            )
            .header(reqwest::header::AUTHORIZATION, authorization)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(match serde_json::from_str::<ErrorWrapper>(&text) {
                Ok(wrapper) => Error::Response(wrapper.error),
                Err(_) => Error::RawResponse(status.as_u16(), text),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(Error::MissingBoundary)?;
        let response_boundary = extract_boundary(&content_type)?;
        let text = response.text().await?;

        let mut items = decode_batch_response(&response_boundary, &text)?;
        if items.len() != submitted {
            tracing::warn!(
                submitted,
                returned = items.len(),
                "batch response item count does not match the request"
            );
        }
        items.sort_by_key(|item| item.content_id);
        Ok(items)
    }
}

/// The outcome of a single call inside a batch.
#[derive(Clone, Debug)]
pub struct BatchItem {
    /// Zero-based position of the call in the originating [`BatchRequest`].
    pub content_id: usize,
    /// HTTP status of the inner response.
    pub status: u16,
    /// Raw inner response body, usually JSON.
    pub body: String,
}

impl BatchItem {
    pub fn new(content_id: usize, status: u16, body: impl Into<String>) -> Self {
        Self {
            content_id,
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    /// The decoded error payload for a failed item.
    pub fn error(&self) -> Option<ErrorResponse> {
        if self.is_success() {
            return None;
        }
        match serde_json::from_str::<ErrorWrapper>(&self.body) {
            Ok(wrapper) => Some(wrapper.error),
            Err(_) => Some(ErrorResponse {
                code: self.status,
                message: self.body.clone(),
                status: None,
            }),
        }
    }

    /// Deserializes a successful body, or surfaces the item's error.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self.error() {
            Some(error) => Err(Error::Response(error)),
            None => Ok(serde_json::from_str(&self.body)?),
        }
    }
}

fn random_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("batch_{suffix}")
}

fn extract_boundary(content_type: &str) -> Result<String, Error> {
    let marker = "boundary=";
    let start = content_type.find(marker).ok_or(Error::MissingBoundary)? + marker.len();
    let rest = &content_type[start..];
    let value = rest.split(';').next().unwrap_or(rest).trim();
    let value = value.trim_matches('"');
    if value.is_empty() {
        return Err(Error::MissingBoundary);
    }
    Ok(value.to_string())
}

fn decode_batch_response(boundary: &str, body: &str) -> Result<Vec<BatchItem>, Error> {
    let delimiter = format!("--{boundary}");
    let mut items = Vec::new();

    for (position, segment) in body.split(delimiter.as_str()).enumerate() {
        let segment = segment.trim_start_matches("\r\n");
        // The final delimiter is followed by "--"; the preamble is empty.
        if segment.is_empty() || segment.starts_with("--") {
            continue;
        }
        let (part_headers, inner) = segment
            .split_once("\r\n\r\n")
            .ok_or_else(|| Error::MalformedResponse("part is missing its header block".to_string()))?;
        let content_id = parse_content_id(part_headers).unwrap_or(position.saturating_sub(1));

        let (status_line, rest) = inner
            .split_once("\r\n")
            .ok_or_else(|| Error::MalformedResponse("part has no inner status line".to_string()))?;
        let status = parse_status_line(status_line)?;
        let payload = match rest.split_once("\r\n\r\n") {
            Some((_inner_headers, payload)) => payload,
            // An inner response with headers but no body.
            None => "",
        };
        items.push(BatchItem::new(content_id, status, payload.trim_end()));
    }
    Ok(items)
}

/// Servers echo the submitted id as `Content-ID: <response-itemN>`.
fn parse_content_id(part_headers: &str) -> Option<usize> {
    for line in part_headers.lines() {
        let (name, value) = match line.split_once(':') {
            Some(split) => split,
            None => continue,
        };
        if !name.trim().eq_ignore_ascii_case("content-id") {
            continue;
        }
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        return digits.parse().ok();
    }
    None
}

fn parse_status_line(line: &str) -> Result<u16, Error> {
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::MalformedResponse(format!("bad status line: {line}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape() {
        let mut batch = BatchRequest::new("https://iam.googleapis.com/batch");
        batch.add(
            reqwest::Method::POST,
            "/v1/projects/p1/serviceAccounts",
            Some(serde_json::json!({"accountId": "saf-x"})),
        );
        batch.add(reqwest::Method::DELETE, "/v1/projects/p1/serviceAccounts/sa", None);

        let encoded = batch.encode("batch_test");
        assert!(encoded.starts_with("--batch_test\r\nContent-Type: application/http\r\nContent-ID: <item0>\r\n"));
        assert!(encoded.contains("POST /v1/projects/p1/serviceAccounts HTTP/1.1\r\n"));
        assert!(encoded.contains("Content-Length: 21\r\n\r\n"));
        assert!(encoded.contains(r#"{"accountId":"saf-x"}"#));
        assert!(encoded.contains("Content-ID: <item1>"));
        assert!(encoded.contains("DELETE /v1/projects/p1/serviceAccounts/sa HTTP/1.1\r\n"));
        assert!(encoded.ends_with("--batch_test--\r\n"));
    }

    #[test]
    fn test_extract_boundary() {
        assert_eq!(
            "batch_abc",
            extract_boundary("multipart/mixed; boundary=batch_abc").unwrap()
        );
        assert_eq!(
            "b-1",
            extract_boundary("multipart/mixed; boundary=\"b-1\"; charset=UTF-8").unwrap()
        );
        assert!(matches!(
            extract_boundary("application/json"),
            Err(Error::MissingBoundary)
        ));
    }

    fn canned_response() -> String {
        [
            "--batch_abc",
            "Content-Type: application/http",
            "Content-ID: <response-item1>",
            "",
            "HTTP/1.1 429 Too Many Requests",
            "Content-Type: application/json",
            "",
            r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#,
            "--batch_abc",
            "Content-Type: application/http",
            "Content-ID: <response-item0>",
            "",
            "HTTP/1.1 200 OK",
            "Content-Type: application/json",
            "",
            r#"{"name": "operations/cp.123"}"#,
            "--batch_abc--",
            "",
        ]
        .join("\r\n")
    }

    #[test]
    fn test_decode_batch_response() {
        let mut items = decode_batch_response("batch_abc", &canned_response()).unwrap();
        items.sort_by_key(|item| item.content_id);
        assert_eq!(2, items.len());

        assert_eq!(0, items[0].content_id);
        assert!(items[0].is_success());
        assert_eq!(
            "operations/cp.123",
            items[0]
                .clone()
                .into_result::<serde_json::Value>()
                .unwrap()["name"]
                .as_str()
                .unwrap()
        );

        assert_eq!(1, items[1].content_id);
        assert!(items[1].is_rate_limited());
        let error = items[1].error().unwrap();
        assert_eq!(429, error.code);
        assert_eq!(Some("RESOURCE_EXHAUSTED".to_string()), error.status);
        assert!(error.is_retriable());
    }

    #[test]
    fn test_item_error_without_json_body() {
        let item = BatchItem::new(3, 500, "upstream exploded");
        let error = item.error().unwrap();
        assert_eq!(500, error.code);
        assert_eq!("upstream exploded", error.message);
        assert!(error.is_retriable());
    }

    #[test]
    fn test_into_result_on_failure_is_error() {
        let item = BatchItem::new(0, 403, r#"{"error": {"code": 403, "message": "denied", "status": "PERMISSION_DENIED"}}"#);
        let err = item.into_result::<serde_json::Value>().unwrap_err();
        match err {
            Error::Response(e) => {
                assert_eq!(Some("PERMISSION_DENIED".to_string()), e.status);
                assert!(!e.is_retriable());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
