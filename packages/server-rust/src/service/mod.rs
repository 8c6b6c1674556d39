//! JAX-RX request processing.
//!
//! A request flows through these stages:
//!
//! 1. **Resolution** (`registry`): system name -> shared backend instance
//! 2. **Schema gate** (`schema`): XML request documents are validated
//! 3. **Extraction** (`extract`): query string or document -> canonical parameters
//! 4. **Dispatch** (`operation`): exactly one backend operation is invoked
//!
//! [`JaxRxService`] composes the stages for the transport layer.

pub mod config;
pub mod extract;
pub mod jaxrx;
pub mod operation;
pub mod registry;
pub mod schema;

// Re-export key types for convenient access.
pub use config::{ConfigError, ServerConfig, SystemsConfig};
pub use extract::{add_parameter, ParameterExtractor};
pub use jaxrx::JaxRxService;
pub use operation::{dispatch, Operation, OperationResponse};
pub use registry::{BackendFactories, BackendFactory, SystemRegistry};
pub use schema::{SchemaChecker, POST_SCHEMA};
