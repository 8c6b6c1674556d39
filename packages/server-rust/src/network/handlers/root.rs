//! Discovery listings above the `jax-rx` step.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use jaxrx_core::constants::{APPLICATION_XML, JAXRX};
use jaxrx_core::listing::resource_listing;
use jaxrx_core::StreamingOutput;

use super::{AppState, HttpError};

/// `GET /`: every configured system name.
pub async fn root_handler(State(state): State<AppState>) -> Response {
    listing(resource_listing(state.service.system_names()))
}

/// `GET /{system}`: the single `jax-rx` step, once the system resolves.
///
/// # Errors
///
/// 404 if the system is not configured, 500 if its backend cannot be built.
pub async fn system_handler(
    State(state): State<AppState>,
    Path(system): Path<String>,
) -> Result<Response, HttpError> {
    state.service.check_system(&system)?;
    Ok(listing(resource_listing(vec![JAXRX.to_string()])))
}

fn listing(output: StreamingOutput) -> Response {
    (
        [(CONTENT_TYPE, APPLICATION_XML)],
        Body::from_stream(output.into_stream()),
    )
        .into_response()
}
