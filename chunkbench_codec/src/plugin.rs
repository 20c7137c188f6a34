use thiserror::Error;

use crate::{Filter, FilterId};

/// A compile-time filter plugin.
///
/// Register with [`inventory::submit!`]:
/// ```ignore
/// inventory::submit! {
///     FilterPlugin::new(MyFilter::ID, MyFilter::NAME, create_my_filter)
/// }
/// ```
pub struct FilterPlugin {
    id: FilterId,
    name: &'static str,
    create_fn: fn(client_data: &[u32]) -> Result<Filter, PluginCreateError>,
}

inventory::collect!(FilterPlugin);

impl FilterPlugin {
    /// Create a new plugin for registration.
    pub const fn new(
        id: FilterId,
        name: &'static str,
        create_fn: fn(client_data: &[u32]) -> Result<Filter, PluginCreateError>,
    ) -> Self {
        Self {
            id,
            name,
            create_fn,
        }
    }

    /// Create a filter from `client_data`.
    ///
    /// # Errors
    /// Returns a [`PluginCreateError`] if the client data is not supported by the filter.
    pub fn create(&self, client_data: &[u32]) -> Result<Filter, PluginCreateError> {
        (self.create_fn)(client_data)
    }

    /// The identifier of the filter created by this plugin.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// The name of the filter created by this plugin.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// A filter plugin registered at runtime.
///
/// Unlike [`FilterPlugin`], the create function is a closure and can capture state,
/// such as a shared filter instance.
#[allow(clippy::type_complexity)]
pub struct RuntimeFilterPlugin {
    id: FilterId,
    name: String,
    create_fn: Box<dyn Fn(&[u32]) -> Result<Filter, PluginCreateError> + Send + Sync>,
}

impl RuntimeFilterPlugin {
    /// Create a new runtime plugin for registration.
    pub fn new<C>(id: FilterId, name: impl Into<String>, create_fn: C) -> Self
    where
        C: Fn(&[u32]) -> Result<Filter, PluginCreateError> + Send + Sync + 'static,
    {
        Self {
            id,
            name: name.into(),
            create_fn: Box::new(create_fn),
        }
    }

    /// Create a filter from `client_data`.
    ///
    /// # Errors
    /// Returns a [`PluginCreateError`] if filter creation fails.
    pub fn create(&self, client_data: &[u32]) -> Result<Filter, PluginCreateError> {
        (self.create_fn)(client_data)
    }

    /// The identifier of the filter created by this plugin.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// The name of the filter created by this plugin.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for RuntimeFilterPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeFilterPlugin")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A filter plugin creation error.
#[derive(Clone, Debug, Error)]
pub enum PluginCreateError {
    /// No plugin is registered for the filter identifier.
    #[error("filter {0} is not available")]
    Unavailable(FilterId),
    /// The client data is not supported by the filter.
    #[error("filter {id} does not accept client data {client_data:?}")]
    ClientDataInvalid {
        /// The filter identifier.
        id: FilterId,
        /// The rejected client data.
        client_data: Vec<u32>,
    },
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for PluginCreateError {
    fn from(err_string: &str) -> Self {
        Self::Other(err_string.to_string())
    }
}

impl From<String> for PluginCreateError {
    fn from(err_string: String) -> Self {
        Self::Other(err_string)
    }
}
