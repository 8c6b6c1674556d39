//! HTTP handlers of the JAX-RX listener.
//!
//! `AppState` is the shared state carried through axum extractors; the
//! handler functions are re-exported for router assembly.

pub mod error;
pub mod health;
pub mod resource;
pub mod root;

pub use error::HttpError;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use resource::{
    delete_handler, get_handler, get_root_handler, post_handler, post_root_handler, put_handler,
};
pub use root::{root_handler, system_handler};

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::service::JaxRxService;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Registry, extraction and dispatch.
    pub service: Arc<JaxRxService>,
    /// Lifecycle state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::backends::builtin_factories;
    use crate::service::ServerConfig;

    AppState {
        service: Arc::new(JaxRxService::new(ServerConfig::default(), builtin_factories())),
        shutdown: Arc::new(ShutdownController::new()),
        config: Arc::new(NetworkConfig::default()),
        start_time: Instant::now(),
    }
}
