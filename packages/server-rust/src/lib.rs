//! JAX-RX server: backend registry, request normalization, dispatch and the
//! axum HTTP transport.

pub mod backends;
pub mod network;
pub mod service;
pub mod xml;

pub use backends::{builtin_factories, DomBackend};
pub use network::{NetworkConfig, NetworkModule};
pub use service::{JaxRxService, ServerConfig};
