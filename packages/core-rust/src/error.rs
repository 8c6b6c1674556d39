//! Errors raised by the JAX-RX layer and its backends.

/// An error raised either by the JAX-RX layer or by a backend.
///
/// Each variant carries a status classification that the transport maps to
/// an HTTP status code via [`JaxRxError::status`].
#[derive(Debug, thiserror::Error)]
pub enum JaxRxError {
    /// Client-caused: unknown or unsupported parameters, invalid documents or input.
    #[error("{0}")]
    BadRequest(String),
    /// Unknown system name or missing resource.
    #[error("{0}")]
    NotFound(String),
    /// A resource path was indexed beyond its depth.
    #[error("Index: {level}, Size: {depth}")]
    OutOfRange { level: usize, depth: usize },
    /// Unexpected failure; wraps the underlying cause chain.
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl JaxRxError {
    /// Shorthand for [`JaxRxError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Shorthand for [`JaxRxError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wraps an arbitrary message as an internal error.
    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self::Internal(anyhow::anyhow!("{message}"))
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::OutOfRange { .. } | Self::Internal(_) => 500,
        }
    }
}

/// Result alias used throughout the JAX-RX crates.
pub type JaxRxResult<T> = Result<T, JaxRxError>;
