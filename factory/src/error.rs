use crate::http;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] http::Error),

    #[error(transparent)]
    Batch(#[from] sa_factory_batch::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("creating {requested} projects would exceed the maximum of {maximum} ({existing} already exist)")]
    ProjectQuotaExceeded {
        requested: usize,
        existing: usize,
        maximum: usize,
    },

    #[error("operation {name} is still running after {attempts} polls")]
    OperationTimeout { name: String, attempts: usize },

    #[error("operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },

    #[error("project {project} still has fewer than {cap} service accounts after {rounds} rounds")]
    AccountFillTimeout {
        project: String,
        cap: usize,
        rounds: usize,
    },

    #[error("key export for project {project} did not complete within {rounds} rounds")]
    KeyExportTimeout { project: String, rounds: usize },
}

impl Error {
    /// True when the service rejected the call with `PERMISSION_DENIED`,
    /// typically because the Cloud Resource Manager API has not been
    /// enabled for the OAuth client's own project yet.
    pub fn is_permission_denied(&self) -> bool {
        let response = match self {
            Error::Http(http::Error::Response(e)) => e,
            Error::Http(http::Error::Batch(sa_factory_batch::Error::Response(e))) => e,
            Error::Batch(sa_factory_batch::Error::Response(e)) => e,
            _ => return false,
        };
        response.status.as_deref() == Some("PERMISSION_DENIED") || response.code == 403
    }
}
