//! Handlers for `/{system}/jax-rx[/{resource...}]`.
//!
//! Reads are served from the query string (`GET`) or from an
//! `application/query+xml` request document (`POST`). XML bodies posted or
//! put to a resource are stored through the backend.

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use jaxrx_core::constants::{APPLICATION_QUERY_XML, APPLICATION_XML, TEXT_PLAIN, TEXT_XML};

use super::{AppState, HttpError};
use crate::service::OperationResponse;

type QueryPairs = Query<Vec<(String, String)>>;

/// What a request body is, judged by its `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    /// A JAX-RX request document.
    QueryDocument,
    /// An XML resource to store.
    Resource,
    Unsupported(String),
}

impl Payload {
    fn of(headers: &HeaderMap) -> Self {
        let raw = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let media = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match media.as_str() {
            APPLICATION_QUERY_XML => Self::QueryDocument,
            TEXT_XML | APPLICATION_XML => Self::Resource,
            _ => Self::Unsupported(raw.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// GET
// ---------------------------------------------------------------------------

/// `GET /{system}/jax-rx`
///
/// # Errors
///
/// Any [`JaxRxError`](jaxrx_core::JaxRxError) from extraction or the backend.
pub async fn get_root_handler(
    State(state): State<AppState>,
    Path(system): Path<String>,
    Query(pairs): QueryPairs,
) -> Result<Response, HttpError> {
    read(&state, &system, "", &pairs).await
}

/// `GET /{system}/jax-rx/{resource...}`
///
/// # Errors
///
/// Any [`JaxRxError`](jaxrx_core::JaxRxError) from extraction or the backend.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((system, resource)): Path<(String, String)>,
    Query(pairs): QueryPairs,
) -> Result<Response, HttpError> {
    read(&state, &system, &resource, &pairs).await
}

async fn read(
    state: &AppState,
    system: &str,
    resource: &str,
    pairs: &[(String, String)],
) -> Result<Response, HttpError> {
    let response = state.service.query_string(system, resource, pairs).await?;
    Ok(stream(response))
}

// ---------------------------------------------------------------------------
// POST / PUT / DELETE
// ---------------------------------------------------------------------------

/// `POST /{system}/jax-rx`
///
/// # Errors
///
/// Any [`JaxRxError`](jaxrx_core::JaxRxError) from the schema gate,
/// extraction or the backend.
pub async fn post_root_handler(
    State(state): State<AppState>,
    Path(system): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    post(&state, &system, "", &headers, body).await
}

/// `POST /{system}/jax-rx/{resource...}`
///
/// # Errors
///
/// Any [`JaxRxError`](jaxrx_core::JaxRxError) from the schema gate,
/// extraction or the backend.
pub async fn post_handler(
    State(state): State<AppState>,
    Path((system, resource)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    post(&state, &system, &resource, &headers, body).await
}

async fn post(
    state: &AppState,
    system: &str,
    resource: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    match Payload::of(headers) {
        Payload::QueryDocument => {
            let response = state.service.query_document(system, resource, &body).await?;
            Ok(stream(response))
        }
        Payload::Resource => {
            let info = state.service.add(system, resource, body).await?;
            Ok(acknowledge(StatusCode::CREATED, info))
        }
        Payload::Unsupported(media) => Ok(unsupported_media_type(&media)),
    }
}

/// `PUT /{system}/jax-rx/{resource...}`
///
/// # Errors
///
/// Any [`JaxRxError`](jaxrx_core::JaxRxError) from the backend.
pub async fn put_handler(
    State(state): State<AppState>,
    Path((system, resource)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    match Payload::of(&headers) {
        Payload::Resource => {
            let info = state.service.update(&system, &resource, body).await?;
            Ok(acknowledge(StatusCode::CREATED, info))
        }
        Payload::QueryDocument => Ok(unsupported_media_type(APPLICATION_QUERY_XML)),
        Payload::Unsupported(media) => Ok(unsupported_media_type(&media)),
    }
}

/// `DELETE /{system}/jax-rx/{resource...}`
///
/// # Errors
///
/// Any [`JaxRxError`](jaxrx_core::JaxRxError) from the backend.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((system, resource)): Path<(String, String)>,
) -> Result<Response, HttpError> {
    let info = state.service.delete(&system, &resource).await?;
    Ok(acknowledge(StatusCode::OK, info))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn stream(response: OperationResponse) -> Response {
    (
        [(CONTENT_TYPE, response.content_type)],
        Body::from_stream(response.output.into_stream()),
    )
        .into_response()
}

fn acknowledge(status: StatusCode, info: String) -> Response {
    (status, [(CONTENT_TYPE, TEXT_PLAIN)], info).into_response()
}

fn unsupported_media_type(media: &str) -> Response {
    (
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        [(CONTENT_TYPE, TEXT_PLAIN)],
        format!("Unsupported media type: '{media}'"),
    )
        .into_response()
}
