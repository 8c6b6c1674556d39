use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use jaxrx_core::{Backend, JaxRxError, JaxRxResult};
use parking_lot::Mutex;
use tracing::info;

use super::config::SystemsConfig;

// ---------------------------------------------------------------------------
// BackendFactories
// ---------------------------------------------------------------------------

/// Constructor for one backend implementation.
pub type BackendFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn Backend>> + Send + Sync>;

/// Explicit table of implementation identifier -> constructor.
///
/// Populated once at startup; the registry only ever instantiates
/// implementations that were registered here.
#[derive(Clone, Default)]
pub struct BackendFactories {
    factories: HashMap<String, BackendFactory>,
}

impl BackendFactories {
    /// Creates an empty factory table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under an implementation identifier, replacing
    /// any earlier one.
    pub fn register<F>(&mut self, implementation: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        self.factories.insert(implementation.into(), Arc::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, implementation: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        self.register(implementation, factory);
        self
    }

    fn get(&self, implementation: &str) -> Option<&BackendFactory> {
        self.factories.get(implementation)
    }
}

impl std::fmt::Debug for BackendFactories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

// ---------------------------------------------------------------------------
// SystemRegistry
// ---------------------------------------------------------------------------

/// Holds one implementation's instance once constructed. Callers resolving
/// the same implementation serialize on this lock, not on the map shard.
type Slot = Arc<Mutex<Option<Arc<dyn Backend>>>>;

/// Resolves system names to backend instances.
///
/// Holds the immutable system -> implementation table and a cache of
/// instantiated backends keyed by implementation identifier. Two names bound
/// to the same identifier share one instance, and each identifier is
/// instantiated at most once for the lifetime of the registry even when
/// several requests race on first use.
pub struct SystemRegistry {
    systems: SystemsConfig,
    factories: BackendFactories,
    instances: DashMap<String, Slot>,
}

impl SystemRegistry {
    /// Creates a registry. No backend is instantiated until first resolved.
    #[must_use]
    pub fn new(systems: SystemsConfig, factories: BackendFactories) -> Self {
        Self {
            systems,
            factories,
            instances: DashMap::new(),
        }
    }

    /// All configured systems, keyed by name.
    #[must_use]
    pub fn systems(&self) -> &BTreeMap<String, String> {
        self.systems.entries()
    }

    /// Returns the backend for a system name, instantiating it on first use.
    ///
    /// # Errors
    ///
    /// - `JaxRxError::NotFound` if the name is not configured
    /// - `JaxRxError::Internal` if the implementation is not registered or its
    ///   constructor fails; nothing is cached in that case
    pub fn resolve(&self, name: &str) -> JaxRxResult<Arc<dyn Backend>> {
        let implementation = self
            .systems
            .entries()
            .get(name)
            .ok_or_else(|| JaxRxError::not_found(format!("Unknown implementation: {name}")))?;

        let slot = self.slot(implementation);
        let mut instance = slot.lock();
        if let Some(existing) = instance.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let created = self.instantiate(implementation)?;
        *instance = Some(Arc::clone(&created));
        Ok(created)
    }

    /// Returns the slot for `implementation`, inserting an empty one if
    /// needed. The map guard is released before the caller locks the slot.
    fn slot(&self, implementation: &str) -> Slot {
        if let Some(slot) = self.instances.get(implementation) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.instances
                .entry(implementation.to_string())
                .or_default()
                .value(),
        )
    }

    /// Number of backends instantiated so far.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|slot| slot.value().lock().is_some())
            .count()
    }

    fn instantiate(&self, implementation: &str) -> JaxRxResult<Arc<dyn Backend>> {
        let factory = self.factories.get(implementation).ok_or_else(|| {
            JaxRxError::internal(format!("Implementation not available: {implementation}"))
        })?;
        let instance = factory().map_err(|e| {
            JaxRxError::Internal(e.context(format!("Failed to instantiate {implementation}")))
        })?;

        info!(implementation, "Backend instantiated");
        metrics::counter!(
            "jaxrx_backend_instances_total",
            "implementation" => implementation.to_string()
        )
        .increment(1);
        Ok(instance)
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("systems", self.systems.entries())
            .field("factories", &self.factories)
            .field("instances", &self.instance_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
