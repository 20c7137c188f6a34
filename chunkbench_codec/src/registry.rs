use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    Filter, FilterCapabilities, FilterId, FilterPlugin, PluginCreateError, RuntimeFilterPlugin,
};

/// A handle to a runtime plugin registered with [`FilterRegistry::register`].
pub type FilterRegistrationHandle = Arc<RuntimeFilterPlugin>;

/// Availability information for a registered filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterInfo {
    /// The filter identifier.
    pub id: FilterId,
    /// The filter name.
    pub name: String,
    /// The directions the filter implements.
    pub capabilities: FilterCapabilities,
}

/// A filter registry.
///
/// Resolves a [`FilterId`] to a [`Filter`] by searching, in order:
///  1. plugins registered on this instance with [`register`](FilterRegistry::register), most recent first,
///  2. compile-time [`FilterPlugin`]s.
///
/// Each registry is independent, so state captured by a runtime plugin never leaks into another registry.
#[derive(Debug, Default)]
pub struct FilterRegistry {
    /// Runtime plugins in registration order.
    runtime: RwLock<Vec<FilterRegistrationHandle>>,
}

impl FilterRegistry {
    /// Create a registry holding only the compile-time plugins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runtime plugin.
    ///
    /// It shadows any compile-time plugin and any earlier runtime plugin with the same identifier.
    pub fn register(&self, plugin: RuntimeFilterPlugin) -> FilterRegistrationHandle {
        log::debug!("registering filter {} ({})", plugin.id(), plugin.name());
        let handle = Arc::new(plugin);
        self.runtime.write().push(Arc::clone(&handle));
        handle
    }

    /// Unregister a runtime plugin.
    ///
    /// Returns `true` if the plugin was found and removed.
    pub fn unregister(&self, handle: &FilterRegistrationHandle) -> bool {
        let mut runtime = self.runtime.write();
        let Some(position) = runtime.iter().position(|plugin| Arc::ptr_eq(plugin, handle)) else {
            return false;
        };
        runtime.remove(position);
        true
    }

    /// Returns true if a plugin is registered for `id`.
    #[must_use]
    pub fn is_available(&self, id: FilterId) -> bool {
        self.runtime.read().iter().any(|plugin| plugin.id() == id)
            || inventory::iter::<FilterPlugin>
                .into_iter()
                .any(|plugin| plugin.id() == id)
    }

    /// Return the name and capabilities of the filter registered for `id`.
    ///
    /// Returns [`None`] if the filter is unavailable or cannot be created without client data.
    #[must_use]
    pub fn filter_info(&self, id: FilterId) -> Option<FilterInfo> {
        let filter = self.create(id, &[]).ok()?;
        Some(FilterInfo {
            id,
            name: filter.name().to_string(),
            capabilities: filter.capabilities(),
        })
    }

    /// Create the filter registered for `id`.
    ///
    /// # Errors
    /// Returns [`PluginCreateError::Unavailable`] if no plugin is registered for `id`,
    /// or another [`PluginCreateError`] if the plugin rejects `client_data`.
    pub fn create(&self, id: FilterId, client_data: &[u32]) -> Result<Filter, PluginCreateError> {
        let runtime = self
            .runtime
            .read()
            .iter()
            .rev()
            .find(|plugin| plugin.id() == id)
            .cloned();
        if let Some(plugin) = runtime {
            return plugin.create(client_data);
        }
        for plugin in inventory::iter::<FilterPlugin> {
            if plugin.id() == id {
                return plugin.create(client_data);
            }
        }
        Err(PluginCreateError::Unavailable(id))
    }

    /// Return the identifiers of all available filters, sorted and deduplicated.
    #[must_use]
    pub fn registered_ids(&self) -> Vec<FilterId> {
        let mut ids: Vec<FilterId> =
            self.runtime.read().iter().map(|plugin| plugin.id()).collect();
        for plugin in inventory::iter::<FilterPlugin> {
            ids.push(plugin.id());
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
