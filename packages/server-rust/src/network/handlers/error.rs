//! Mapping of [`JaxRxError`] onto HTTP responses.

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jaxrx_core::constants::TEXT_PLAIN;
use jaxrx_core::JaxRxError;
use tracing::warn;

/// A [`JaxRxError`] answered as a `text/plain` body with its mapped status.
#[derive(Debug)]
pub struct HttpError(pub JaxRxError);

impl From<JaxRxError> for HttpError {
    fn from(err: JaxRxError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "JAX-RX request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "JAX-RX request rejected");
        }
        (status, [(CONTENT_TYPE, TEXT_PLAIN)], self.0.to_string()).into_response()
    }
}
