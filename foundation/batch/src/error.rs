use std::fmt;

/// An error payload returned by a Google API, either for a whole request
/// or for a single item inside a batch.
///
/// See the [error model](https://cloud.google.com/apis/design/errors)
/// documentation for the field semantics.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// An HTTP status value, without the textual description.
    pub code: u16,

    /// Description of the error.
    pub message: String,

    /// The canonical status name, e.g. `PERMISSION_DENIED` or
    /// `RESOURCE_EXHAUSTED`.
    pub status: Option<String>,
}

impl ErrorResponse {
    /// Whether a retry may succeed without changing the request.
    pub fn is_retriable(&self) -> bool {
        matches!(self.code, 408 | 429 | 500..=599)
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl std::error::Error for ErrorResponse {}

/// The error response JSON format wraps the payload in an extra object
/// level that is inconvenient to include in our error.
#[derive(serde::Deserialize)]
pub(crate) struct ErrorWrapper {
    pub(crate) error: ErrorResponse,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error returned by the service for the batch request as a whole.
    #[error(transparent)]
    Response(#[from] ErrorResponse),

    /// An error from the underlying HTTP client.
    #[error(transparent)]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("request failed: status={0} detail={1}")]
    RawResponse(u16, String),

    #[error("batch response is missing a multipart boundary")]
    MissingBoundary,

    #[error("malformed batch response: {0}")]
    MalformedResponse(String),
}
