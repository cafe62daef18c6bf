//! Mod packages and per-plugin lifecycle slots

use crate::interner::HookHandle;
use crate::plugin::{Plugin, PluginFactory, PluginInfo};
use crate::registry::HookHandler;
use crate::version::VersionNumber;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a registered plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginState {
    Created,
    Initializing,
    Resolving,
    Resolved,
    Failed,
    Loading,
    Running,
    Unloading,
    Disposed,
}

impl PluginState {
    /// States from which `Init` may start
    pub fn can_initialize(self) -> bool {
        matches!(
            self,
            PluginState::Created | PluginState::Failed | PluginState::Disposed
        )
    }

    /// States that hold a live instance which `Unload` must tear down
    pub fn is_active(self) -> bool {
        matches!(self, PluginState::Resolved | PluginState::Running)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One plugin inside a package: its factory, current instance and caches
pub struct PluginSlot {
    pub(crate) name: CompactString,
    pub(crate) factory: Box<dyn PluginFactory>,
    pub(crate) instance: Option<Box<dyn Plugin>>,
    pub(crate) info: PluginInfo,
    pub(crate) state: PluginState,
    /// Handlers built at `Init`
    pub(crate) hook_cache: Vec<HookHandler>,
    /// Handles subscribed at `Load`
    pub(crate) subscribed: Vec<HookHandle>,
    pub(crate) core: bool,
}

impl PluginSlot {
    fn new(factory: Box<dyn PluginFactory>) -> Self {
        let name = CompactString::new(factory.plugin_name());
        let info = PluginInfo::new(factory.plugin_name(), factory.plugin_version());
        Self {
            name,
            factory,
            instance: None,
            info,
            state: PluginState::Created,
            hook_cache: Vec::new(),
            subscribed: Vec::new(),
            core: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    /// Identity reported by the latest instance, or the factory before one exists
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    pub fn version(&self) -> VersionNumber {
        self.info.version
    }

    pub fn plugin_type(&self) -> &'static str {
        self.factory.plugin_type()
    }

    pub fn is_core(&self) -> bool {
        self.core
    }

    /// Drops every cached collection and the instance itself
    pub(crate) fn release(&mut self) {
        self.hook_cache.clear();
        self.subscribed.clear();
        self.instance = None;
    }
}

impl fmt::Debug for PluginSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSlot")
            .field("name", &self.name)
            .field("version", &self.info.version)
            .field("state", &self.state)
            .field("hooks", &self.hook_cache.len())
            .finish()
    }
}

/// Ordered collection of plugins loaded and unloaded together
pub struct ModPackage {
    name: String,
    pub(crate) slots: Vec<PluginSlot>,
}

impl ModPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
        }
    }

    /// Adds a plugin; load order follows insertion order
    pub fn with_plugin(mut self, factory: impl PluginFactory + 'static) -> Self {
        self.add_plugin(Box::new(factory));
        self
    }

    pub fn add_plugin(&mut self, factory: Box<dyn PluginFactory>) {
        self.slots.push(PluginSlot::new(factory));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.to_string()).collect()
    }

    pub fn slot(&self, plugin: &str) -> Option<&PluginSlot> {
        self.slots.iter().find(|s| s.name == plugin)
    }

    pub(crate) fn slot_mut(&mut self, plugin: &str) -> Option<&mut PluginSlot> {
        self.slots.iter_mut().find(|s| s.name == plugin)
    }
}

impl fmt::Debug for ModPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModPackage")
            .field("name", &self.name)
            .field("plugins", &self.slots)
            .finish()
    }
}

/// Outcome of loading a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReport {
    pub package: String,
    /// Plugins running once the load pass and batch resolution finished
    pub loaded: Vec<String>,
    /// Plugins that failed to initialize, load or resolve
    pub failed: Vec<String>,
}

impl PackageReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::SimplePluginFactory;

    struct Empty;

    impl Plugin for Empty {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Empty", VersionNumber::new(1, 0, 0))
        }
    }

    #[test]
    fn test_package_keeps_insertion_order() {
        let package = ModPackage::new("bundle")
            .with_plugin(SimplePluginFactory::new("B", VersionNumber::new(1, 0, 0), || Empty))
            .with_plugin(SimplePluginFactory::new("A", VersionNumber::new(2, 0, 0), || Empty));

        assert_eq!(package.plugin_names(), vec!["B", "A"]);
        let slot = package.slot("A").unwrap();
        assert_eq!(slot.state(), PluginState::Created);
        assert_eq!(slot.version(), VersionNumber::new(2, 0, 0));
        assert!(package.slot("C").is_none());
    }

    #[test]
    fn test_state_predicates() {
        assert!(PluginState::Disposed.can_initialize());
        assert!(!PluginState::Running.can_initialize());
        assert!(PluginState::Running.is_active());
        assert!(!PluginState::Failed.is_active());
    }
}
