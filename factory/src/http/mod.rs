pub mod drive;
pub mod iam;
pub mod resource_manager;
pub mod service_usage;

use reqwest::Response;
use sa_factory_batch::ErrorResponse;

pub(crate) const USER_AGENT: &str = "sa-factory";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error returned by a Google API.
    #[error(transparent)]
    Response(#[from] ErrorResponse),

    /// An error from the underlying HTTP client.
    #[error(transparent)]
    HttpClient(#[from] reqwest::Error),

    /// An error from the token source.
    #[error(transparent)]
    TokenSource(#[from] sa_factory_auth::error::Error),

    /// A batch round trip that failed as a whole.
    #[error(transparent)]
    Batch(#[from] sa_factory_batch::Error),
}

#[derive(serde::Deserialize)]
struct ErrorWrapper {
    error: ErrorResponse,
}

/// Checks whether an HTTP response is successful and returns it, or
/// returns the decoded service error.
pub(crate) async fn check_response_status(response: Response) -> Result<Response, Error> {
    let error = match response.error_for_status_ref() {
        Ok(_) => return Ok(response),
        Err(error) => error,
    };

    // Try to extract a structured error, falling back to the status error
    // if it cannot be parsed.
    Err(response
        .json::<ErrorWrapper>()
        .await
        .map(|wrapper| Error::Response(wrapper.error))
        .unwrap_or(Error::HttpClient(error)))
}

/// Provides serialization and deserialization for base64 encoded fields.
pub(crate) mod base64 {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        BASE64_STANDARD.encode(value.as_ref()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        BASE64_STANDARD
            .decode(String::deserialize(deserializer)?)
            .map_err(serde::de::Error::custom)
    }
}
