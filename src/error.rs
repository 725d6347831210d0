use reqwest::StatusCode;

/// A call to the remote board service failed.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("invalid attachment data: {0}")]
    Attachment(String),

    /// Raised by non-HTTP implementations of the remote contract.
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The card itself was not created; the draft is untouched and the
    /// submission can be retried.
    #[error("card creation failed: {0}")]
    CardCreation(#[source] RemoteError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
