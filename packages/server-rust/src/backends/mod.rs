//! Built-in [`Backend`](jaxrx_core::Backend) implementations.

pub mod dom;

use std::sync::Arc;

use jaxrx_core::constants::DEFAULT_IMPLEMENTATION;
use jaxrx_core::Backend;

pub use dom::DomBackend;

use crate::service::BackendFactories;

/// Factory table with every built-in implementation registered.
#[must_use]
pub fn builtin_factories() -> BackendFactories {
    BackendFactories::new().with(DEFAULT_IMPLEMENTATION, || {
        Ok(Arc::new(DomBackend::new()) as Arc<dyn Backend>)
    })
}
