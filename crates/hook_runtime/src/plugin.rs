//! Plugin trait definitions and factories

use crate::context::PluginContext;
use crate::error::PluginError;
use crate::members::MemberTable;
use crate::reference::{PluginRef, ReferenceSpec};
use crate::registry::HookHandler;
use crate::version::VersionNumber;
use std::fmt;

/// Hook called on the plugin's own handlers once its references are bound
pub const HOOK_INIT: &str = "Init";
/// Hooks called on the plugin's own handlers once it is running
pub const HOOK_ON_LOADED: &str = "OnLoaded";
pub const HOOK_LOADED: &str = "Loaded";
/// Hook called on the plugin's own handlers before it is torn down
pub const HOOK_UNLOAD: &str = "Unload";

/// Plugin identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: VersionNumber,
    pub author: String,
    pub description: String,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>, version: VersionNumber) -> Self {
        Self {
            name: name.into(),
            version,
            author: String::new(),
            description: String::new(),
        }
    }

    /// Set author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.author.is_empty() {
            write!(f, "{} v{}", self.name, self.version)
        } else {
            write!(f, "{} v{} by {}", self.name, self.version, self.author)
        }
    }
}

/// A hot-loadable unit of behaviour hosted by the runtime
///
/// Every callback runs on the thread driving the runtime. Panics raised from
/// any callback are caught and turned into a failed lifecycle step.
pub trait Plugin: Send + Sync + 'static {
    fn info(&self) -> PluginInfo;

    /// Concrete type name, used to resolve typed references
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Builds the hook handlers this plugin responds to
    ///
    /// Called once per `Init`; the result is the plugin's hook cache until it
    /// unloads.
    fn hooks(&self) -> Vec<HookHandler> {
        Vec::new()
    }

    /// References to other plugins, resolved during `Init`
    fn references(&self) -> Vec<ReferenceSpec> {
        Vec::new()
    }

    /// Receives a resolved reference, or `None` for an unresolved optional one
    fn bind_reference(&mut self, _field: &str, _target: Option<PluginRef>) {}

    /// Typed setters for configurable members
    fn members(&mut self) -> MemberTable<'_> {
        MemberTable::new()
    }

    /// Configuration written to the plugin's config file when none exists
    fn default_config(&self) -> Option<serde_json::Value> {
        None
    }

    fn on_init(&mut self, _context: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn on_load(&mut self, _context: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn on_unload(&mut self, _context: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Core plugins are not counted among running plugins
    fn is_core(&self) -> bool {
        false
    }
}

/// Trait for plugin factories that can create plugin instances
///
/// The runtime keeps the factory for the plugin's whole registration so an
/// unloaded plugin can be brought back as a fresh instance.
pub trait PluginFactory: Send + Sync {
    /// Create a new plugin instance
    fn create(&self) -> Result<Box<dyn Plugin>, PluginError>;

    fn plugin_name(&self) -> &str;

    fn plugin_version(&self) -> VersionNumber;

    /// Type name of the instances this factory creates
    fn plugin_type(&self) -> &'static str;
}

/// Simple plugin factory that wraps a constructor function
pub struct SimplePluginFactory<T: Plugin> {
    constructor: Box<dyn Fn() -> T + Send + Sync>,
    name: String,
    version: VersionNumber,
}

impl<T: Plugin> SimplePluginFactory<T> {
    /// Create a new simple plugin factory
    pub fn new<F>(name: impl Into<String>, version: VersionNumber, constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            constructor: Box::new(constructor),
            name: name.into(),
            version,
        }
    }
}

impl<T: Plugin> PluginFactory for SimplePluginFactory<T> {
    fn create(&self) -> Result<Box<dyn Plugin>, PluginError> {
        Ok(Box::new((self.constructor)()))
    }

    fn plugin_name(&self) -> &str {
        &self.name
    }

    fn plugin_version(&self) -> VersionNumber {
        self.version
    }

    fn plugin_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}
