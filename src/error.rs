use thiserror::Error;

/// Error types that can occur when talking to the Dify API.
#[derive(Debug, Error)]
pub enum DifyError {
    /// HTTP request/response or body-read errors
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and configuration errors (missing API key)
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Non-success status returned by Dify without a salvageable answer
    #[error("Dify returned error status {status}: {body}")]
    ProviderError { status: u16, body: String },
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// Generic error
    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<reqwest::Error> for DifyError {
    fn from(err: reqwest::Error) -> Self {
        DifyError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for DifyError {
    fn from(err: serde_json::Error) -> Self {
        DifyError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}
