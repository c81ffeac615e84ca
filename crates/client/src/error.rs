use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx response; `message` is the server's `detail` text when
    /// the body carried one.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("not authenticated")]
    MissingToken,
    #[error("event stream error: {0}")]
    Stream(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
