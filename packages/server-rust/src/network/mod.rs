//! HTTP transport: configuration, middleware, handlers and server lifecycle.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::{NetworkConfig, TlsConfig, DEFAULT_PORT};
pub use handlers::AppState;
pub use module::{router, NetworkModule};
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};
