use thiserror::Error;

/// Structured error types for the weather fetch layer
///
/// Cloneable so one in-flight result can be handed to every caller waiting
/// on the same request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("No coordinates provided and no last city found")]
    NoLocation,

    #[error("Request queue is full ({depth} waiting)")]
    QueueFull { depth: usize },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse failure classes surfaced to the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkFailure,
    NoLocation,
    MalformedResponse,
    Internal,
}

impl AppError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::TimeoutError(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::TimeoutError(_)
            | AppError::HttpError { .. }
            | AppError::NetworkError(_)
            | AppError::QueueFull { .. }
            | AppError::Cancelled => ErrorKind::NetworkFailure,
            AppError::NoLocation => ErrorKind::NoLocation,
            AppError::ParseError(_) => ErrorKind::MalformedResponse,
            AppError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Whether offering the user a "retry" action makes sense.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::NetworkFailure
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}
