use std::collections::HashSet;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::JaxRxResult;
use crate::output::StreamingOutput;
use crate::parameter::QueryParameter;
use crate::path::ResourcePath;

/// A pluggable query engine reachable through the JAX-RX interface.
///
/// Every method may fail with [`JaxRxError::NotFound`] if the addressed
/// resource does not exist, [`JaxRxError::BadRequest`] if the parameters or
/// input are invalid, or [`JaxRxError::Internal`] on unexpected failures.
///
/// [`JaxRxError::NotFound`]: crate::JaxRxError::NotFound
/// [`JaxRxError::BadRequest`]: crate::JaxRxError::BadRequest
/// [`JaxRxError::Internal`]: crate::JaxRxError::Internal
#[async_trait]
pub trait Backend: Send + Sync {
    /// Query parameters this implementation understands. Requests carrying
    /// any other parameter are rejected before reaching the backend.
    fn parameters(&self) -> &HashSet<QueryParameter>;

    /// Executes a database command against the resource.
    async fn command(&self, command: &str, path: &ResourcePath) -> JaxRxResult<StreamingOutput>;

    /// Runs a server-side query file against the resource.
    async fn run(&self, file: &str, path: &ResourcePath) -> JaxRxResult<StreamingOutput>;

    /// Evaluates a query against the resource.
    async fn query(&self, query: &str, path: &ResourcePath) -> JaxRxResult<StreamingOutput>;

    /// Returns the resource itself. The root path typically lists all
    /// available resources.
    async fn get(&self, path: &ResourcePath) -> JaxRxResult<StreamingOutput>;

    /// Adds new content below the resource. Returns an info message.
    async fn add(&self, input: Bytes, path: &ResourcePath) -> JaxRxResult<String>;

    /// Creates or replaces the resource. Returns an info message.
    async fn update(&self, input: Bytes, path: &ResourcePath) -> JaxRxResult<String>;

    /// Deletes the resource. Returns an info message.
    async fn delete(&self, path: &ResourcePath) -> JaxRxResult<String>;
}
