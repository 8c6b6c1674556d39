//! Operation selection and dispatch to a resolved backend.

use std::sync::Arc;

use bytes::Bytes;
use jaxrx_core::constants::{TEXT_PLAIN, TEXT_XML, WRAP_YES};
use jaxrx_core::{Backend, JaxRxResult, QueryParameter, ResourcePath, StreamingOutput};
use tracing::debug;

/// The read operation selected for a request.
///
/// Selectors are checked in [`QueryParameter::SELECTORS`] order (`command`,
/// `run`, `query`); the first one present wins. Without any selector the resource is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    Command(&'a str),
    Run(&'a str),
    Query(&'a str),
    Get,
}

impl<'a> Operation<'a> {
    /// Picks the operation for a path's parameters.
    #[must_use]
    pub fn select(path: &'a ResourcePath) -> Self {
        QueryParameter::SELECTORS
            .into_iter()
            .find_map(|selector| path.value(selector).map(|value| (selector, value)))
            .map_or(Self::Get, |(selector, value)| match selector {
                QueryParameter::Command => Self::Command(value),
                QueryParameter::Run => Self::Run(value),
                _ => Self::Query(value),
            })
    }

    /// Short name used for logging and metrics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Run(_) => "run",
            Self::Query(_) => "query",
            Self::Get => "get",
        }
    }
}

/// A backend's output together with the content type to serve it with.
#[derive(Debug)]
pub struct OperationResponse {
    pub content_type: &'static str,
    pub output: StreamingOutput,
}

/// Content type for a request's `wrap` parameter: absent or `yes` means XML.
#[must_use]
pub fn content_type(path: &ResourcePath) -> &'static str {
    match path.value(QueryParameter::Wrap) {
        None | Some(WRAP_YES) => TEXT_XML,
        Some(_) => TEXT_PLAIN,
    }
}

/// Invokes exactly one read operation on `backend` and shapes the response.
///
/// # Errors
///
/// Passes through whatever error the backend reports.
pub async fn dispatch(
    backend: &Arc<dyn Backend>,
    path: &ResourcePath,
) -> JaxRxResult<OperationResponse> {
    let operation = Operation::select(path);
    debug!(operation = operation.name(), path = %path, "Dispatching operation");
    metrics::counter!("jaxrx_operations_total", "operation" => operation.name()).increment(1);

    let output = match operation {
        Operation::Command(command) => backend.command(command, path).await?,
        Operation::Run(file) => backend.run(file, path).await?,
        Operation::Query(query) => backend.query(query, path).await?,
        Operation::Get => backend.get(path).await?,
    };

    Ok(OperationResponse {
        content_type: content_type(path),
        output,
    })
}

/// Adds `input` below the resource. Parameters do not apply.
///
/// # Errors
///
/// Passes through the backend's error.
pub async fn add(backend: &Arc<dyn Backend>, resource: &str, input: Bytes) -> JaxRxResult<String> {
    metrics::counter!("jaxrx_operations_total", "operation" => "add").increment(1);
    backend.add(input, &ResourcePath::new(resource)).await
}

/// Creates or replaces the resource with `input`.
///
/// # Errors
///
/// Passes through the backend's error.
pub async fn update(
    backend: &Arc<dyn Backend>,
    resource: &str,
    input: Bytes,
) -> JaxRxResult<String> {
    metrics::counter!("jaxrx_operations_total", "operation" => "update").increment(1);
    backend.update(input, &ResourcePath::new(resource)).await
}

/// Deletes the resource.
///
/// # Errors
///
/// Passes through the backend's error.
pub async fn delete(backend: &Arc<dyn Backend>, resource: &str) -> JaxRxResult<String> {
    metrics::counter!("jaxrx_operations_total", "operation" => "delete").increment(1);
    backend.delete(&ResourcePath::new(resource)).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
