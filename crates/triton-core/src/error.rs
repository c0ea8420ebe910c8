//! Error types for Triton CloudAPI operations.
//!
//! The pipeline surfaces four classes of failure: authentication (key material or
//! signing), network (connection, TLS, deadline), decode (a body that does not have
//! the expected shape) and API errors. API errors are never raised by the pipeline
//! itself; a non-2xx status is returned as a normal response and only becomes an
//! [`Error::Api`] when the caller asks for it.

use thiserror::Error;

/// Main error type for Triton CloudAPI operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key material could not be read or a request could not be signed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport-level failure (connection refused, DNS, TLS, broken body)
    #[error("Network error: {0}")]
    Network(String),

    /// Request deadline exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Response body could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Non-2xx response promoted to an error by the caller
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider error code, e.g. `ResourceNotFound`
        code: String,
        /// Provider error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Resource identifier is empty or not URL-path-safe
    #[error("Invalid resource identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Specialized result type for Triton operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Auth(_) => "AUTH_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Api { .. } => "API_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Returns true for failures that happened before a response was received.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Returns true if repeating the call might succeed.
    ///
    /// Nothing in this workspace retries; this is a hint for callers that want to.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Config(_) | Self::Decode(_))
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
