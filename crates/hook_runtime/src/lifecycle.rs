//! Plugin lifecycle controller
//!
//! [`PluginRuntime`] drives each registered plugin through
//! `Init -> Load -> Running -> Unload -> Disposed`, wiring the registry,
//! dispatcher and resolver at each transition. Lifecycle calls take
//! `&mut self` and are expected on the host's update thread, serialized with
//! dispatch.

use crate::context::{RuntimeConfig, RuntimeContext};
use crate::dispatch::{invoke_isolated, Dispatcher};
use crate::error::{PluginError, RuntimeError};
use crate::package::{ModPackage, PackageReport, PluginSlot, PluginState};
use crate::plugin::{Plugin, PluginInfo, HOOK_INIT, HOOK_LOADED, HOOK_ON_LOADED, HOOK_UNLOAD};
use crate::registry::HookHandler;
use crate::resolver::PluginDirectory;
use crate::stats::RuntimeStats;
use crate::utils::catch_panic;
use crate::value::{CallOutcome, HookValue};
use compact_str::CompactString;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Name worker tasks scheduled by the host itself are tagged with
const HOST_OWNER: &str = "runtime";

/// Owns a [`RuntimeContext`] and implements every lifecycle entry point
#[derive(Debug)]
pub struct PluginRuntime {
    ctx: RuntimeContext,
    /// Running plugins in the order they reached `Running`
    load_order: Vec<CompactString>,
}

impl PluginRuntime {
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            ctx: RuntimeContext::new(config)?,
            load_order: Vec::new(),
        })
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.ctx
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.ctx.dispatcher
    }

    /// Add a context provider visible to every plugin
    pub fn add_provider<T: Send + Sync + 'static>(&mut self, provider: T) {
        self.ctx.add_provider(provider);
    }

    // ---- dispatch entry points ----

    /// Calls `hook` on every subscriber; `NoResult` if none returned a value
    pub fn call_hook(&self, hook: &str, args: &[HookValue]) -> CallOutcome {
        self.ctx.dispatcher.call_hook(hook, args)
    }

    /// Calls `hook`, converting the first returned value into `T`
    pub fn call_hook_as<T: TryFrom<HookValue>>(&self, hook: &str, args: &[HookValue]) -> Option<T> {
        self.ctx.dispatcher.call_hook_as(hook, args)
    }

    /// Calls `hook` on a single plugin's own handlers
    pub fn call_plugin(&self, plugin: &str, hook: &str, args: &[HookValue]) -> CallOutcome {
        self.ctx.dispatcher.call_plugin(plugin, hook, args)
    }

    // ---- deferred execution ----

    pub fn schedule_next_tick(&self, task: impl FnOnce() + Send + 'static) {
        self.ctx.tick_queue.next_tick(task);
    }

    pub fn schedule_on_worker(&self, task: impl FnOnce() + Send + 'static) {
        let version = crate::HOOK_RUNTIME_VERSION.parse().unwrap_or_default();
        self.ctx
            .workers
            .spawn_tagged(HOST_OWNER.to_string(), version, task);
    }

    /// Runs everything queued for this tick; returns the number of tasks run
    pub fn tick(&self) -> usize {
        self.ctx.tick_queue.drain()
    }

    // ---- queries ----

    pub fn plugin_state(&self, plugin: &str) -> Option<PluginState> {
        self.slot(plugin).map(PluginSlot::state)
    }

    pub fn plugin_info(&self, plugin: &str) -> Option<PluginInfo> {
        self.slot(plugin).map(|slot| slot.info().clone())
    }

    pub fn is_loaded(&self, plugin: &str) -> bool {
        self.plugin_state(plugin) == Some(PluginState::Running)
    }

    /// Running plugins in load order
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.load_order.iter().map(|name| name.to_string()).collect()
    }

    pub fn stats(&self) -> RuntimeStats {
        let slots = || self.ctx.packages.iter().flat_map(|p| p.slots.iter());
        RuntimeStats {
            running_plugins: slots()
                .filter(|s| s.state == PluginState::Running && !s.core)
                .count(),
            registered_plugins: slots().count(),
            interned_hooks: self.ctx.interner.len(),
            subscriptions: self.ctx.registry.subscription_count(),
            pending_requirees: self.ctx.resolver.pending().len(),
            queued_tick_tasks: self.ctx.tick_queue.len(),
            dispatch: self.ctx.dispatcher.stats(),
        }
    }

    // ---- packages ----

    /// Registers a package without initializing any of its plugins
    pub fn register_package(&mut self, package: ModPackage) -> Result<(), RuntimeError> {
        if self.ctx.packages.iter().any(|p| p.name() == package.name()) {
            return Err(RuntimeError::PackageAlreadyExists(package.name().to_string()));
        }
        for slot in &package.slots {
            if self.slot(slot.name()).is_some() {
                return Err(RuntimeError::PluginAlreadyExists(slot.name().to_string()));
            }
        }

        debug!("📦 Registered package '{}' with {} plugins", package.name(), package.len());
        self.ctx.packages.push(package);
        Ok(())
    }

    /// Registers a package, initializes and loads each plugin in order, then
    /// re-resolves every running plugin so nothing runs partially wired
    pub fn load_package(&mut self, package: ModPackage) -> Result<PackageReport, RuntimeError> {
        let package_name = package.name().to_string();
        let plugins = package.plugin_names();
        self.register_package(package)?;

        info!("📦 Loading package '{}' ({} plugins)", package_name, plugins.len());

        for plugin in &plugins {
            // Earlier plugins may already have pulled this one in as a pending dependent.
            if !self.plugin_state(plugin).is_some_and(PluginState::can_initialize) {
                continue;
            }
            if let Err(e) = self.activate(plugin) {
                warn!(plugin = %plugin, "❌ Failed to load plugin '{}': {}", plugin, e);
            }
        }

        self.resolve_all();

        let (loaded, failed): (Vec<_>, Vec<_>) =
            plugins.into_iter().partition(|plugin| self.is_loaded(plugin));

        info!(
            "🎉 Package '{}' loaded: {}/{} plugins running",
            package_name,
            loaded.len(),
            loaded.len() + failed.len()
        );

        Ok(PackageReport {
            package: package_name,
            loaded,
            failed,
        })
    }

    /// Unloads every plugin of a package in reverse order and forgets the package
    ///
    /// Plugins in other packages that depended on it stay registered and
    /// reload once the package is loaded again.
    pub fn unload_package(&mut self, name: &str) -> Result<(), RuntimeError> {
        let plugins = self
            .ctx
            .packages
            .iter()
            .find(|p| p.name() == name)
            .map(ModPackage::plugin_names)
            .ok_or_else(|| RuntimeError::PackageNotFound(name.to_string()))?;

        info!("🛑 Unloading package '{}'", name);

        for plugin in plugins.iter().rev() {
            if self.plugin_state(plugin).is_some_and(PluginState::is_active) {
                if let Err(e) = self.unload_plugin(plugin) {
                    error!(plugin = %plugin, "❌ Failed to unload plugin '{}': {}", plugin, e);
                }
            }
        }

        self.ctx.packages.retain(|p| p.name() != name);
        for plugin in &plugins {
            self.forget(plugin);
        }

        Ok(())
    }

    /// Unloads every package, newest first
    pub fn shutdown(&mut self) {
        let packages: Vec<String> = self
            .ctx
            .packages
            .iter()
            .rev()
            .map(|p| p.name().to_string())
            .collect();

        info!("🛑 Shutting down {} packages", packages.len());
        for package in packages {
            if let Err(e) = self.unload_package(&package) {
                error!("❌ Failed to unload package '{}': {}", package, e);
            }
        }
        info!("🧹 Plugin cleanup completed");
    }

    // ---- lifecycle entry points ----

    /// Creates a fresh instance and takes it through `Init`
    ///
    /// Applies the plugin's config, builds its hook cache, resolves its
    /// references and finally calls its `Init` hook and `on_init`. Any
    /// failure leaves the plugin `Failed` with its instance dropped.
    pub fn initialize_plugin(&mut self, name: &str) -> Result<(), RuntimeError> {
        let slot = self.slot_mut(name)?;
        if !slot.state.can_initialize() {
            return Err(invalid_state(slot, "initialize"));
        }
        slot.state = PluginState::Initializing;

        let created = guarded(name, || slot.factory.create());
        let mut plugin = match created {
            Ok(plugin) => plugin,
            Err(e) => return Err(self.fail(name, e)),
        };

        let mut info = match guarded(name, || Ok(plugin.info())) {
            Ok(info) => info,
            Err(e) => return Err(self.fail(name, e)),
        };
        if info.name != name {
            warn!(plugin = name, "Plugin reports name '{}', keeping '{}'", info.name, name);
            info.name = name.to_string();
        }

        if let Err(e) = guarded(name, || {
            self.apply_config(name, plugin.as_mut());
            Ok(())
        }) {
            return Err(self.fail(name, e));
        }

        let hooks = match guarded(name, || Ok(plugin.hooks())) {
            Ok(hooks) => hooks,
            Err(e) => return Err(self.fail(name, e)),
        };
        debug!(plugin = name, "Built hook cache with {} handlers", hooks.len());

        self.set_state(name, PluginState::Resolving);
        if let Err(e) = self.resolve_plugin(name, plugin.as_mut()) {
            warn!(plugin = name, "⚠️ {} failed reference resolution", info);
            return Err(self.fail(name, e));
        }

        call_own_hooks(name, &hooks, HOOK_INIT);
        let context = self.ctx.plugin_context(&info);
        if let Err(e) = guarded(name, || plugin.on_init(&context)) {
            return Err(self.fail(name, e));
        }

        let core = plugin.is_core();
        let slot = self.slot_mut(name)?;
        slot.info = info;
        slot.core = core;
        slot.hook_cache = hooks;
        slot.instance = Some(plugin);
        slot.state = PluginState::Resolved;
        Ok(())
    }

    /// Subscribes a resolved plugin's hooks, marks it running and calls its
    /// load hooks, then reloads every plugin that was waiting on it
    pub fn load_plugin(&mut self, name: &str) -> Result<(), RuntimeError> {
        let slot = self.slot_mut(name)?;
        if slot.state != PluginState::Resolved {
            return Err(invalid_state(slot, "load"));
        }
        let Some(mut plugin) = slot.instance.take() else {
            return Err(invalid_state(slot, "load"));
        };
        slot.state = PluginState::Loading;
        let hooks = slot.hook_cache.clone();
        let info = slot.info.clone();
        let plugin_type = slot.plugin_type();

        let mut subscribed = Vec::with_capacity(hooks.len());
        for handler in &hooks {
            let handle = self.ctx.interner.intern(handler.hook());
            self.ctx.registry.subscribe(handle, name, handler.clone());
            if !subscribed.contains(&handle) {
                subscribed.push(handle);
            }
        }
        debug!(plugin = name, "Processed {} hooks", subscribed.len());

        let slot = self.slot_mut(name)?;
        slot.subscribed = subscribed;
        slot.state = PluginState::Running;
        self.load_order.push(CompactString::new(name));

        call_own_hooks(name, &hooks, HOOK_ON_LOADED);
        call_own_hooks(name, &hooks, HOOK_LOADED);
        let context = self.ctx.plugin_context(&info);
        let loaded = guarded(name, || plugin.on_load(&context));
        self.slot_mut(name)?.instance = Some(plugin);

        if let Err(e) = loaded {
            error!(plugin = name, "❌ Plugin load failed for {}: {}", info, e);
            if let Err(unload_err) = self.unload_plugin(name) {
                error!(plugin = name, "❌ Rollback of {} failed: {}", info, unload_err);
            }
            self.set_state(name, PluginState::Failed);
            return Err(e);
        }

        info!(plugin = name, version = %info.version, "✅ Loaded plugin {}", info);
        self.load_pending_requirees(name, plugin_type);
        Ok(())
    }

    /// Tears a plugin down: `Unload` hook, unsubscribe, cascade to dependents,
    /// release caches, drop the instance
    ///
    /// Every step runs even if an earlier one failed.
    pub fn unload_plugin(&mut self, name: &str) -> Result<(), RuntimeError> {
        let slot = self.slot_mut(name)?;
        if !slot.state.is_active() {
            return Err(invalid_state(slot, "unload"));
        }
        let was_running = slot.state == PluginState::Running;
        slot.state = PluginState::Unloading;
        let plugin = slot.instance.take();
        let hooks = std::mem::take(&mut slot.hook_cache);
        let subscribed = std::mem::take(&mut slot.subscribed);
        let info = slot.info.clone();

        info!(plugin = name, "🔌 Unloading plugin {}", info);

        if was_running {
            call_own_hooks(name, &hooks, HOOK_UNLOAD);
            if let Some(mut plugin) = plugin {
                let context = self.ctx.plugin_context(&info);
                if let Err(e) = guarded(name, || plugin.on_unload(&context)) {
                    error!(plugin = name, "❌ Failed calling unload on {}: {}", info, e);
                }
                drop_isolated(name, plugin);
            }
        } else if let Some(plugin) = plugin {
            drop_isolated(name, plugin);
        }

        let mut removed = 0;
        for handle in subscribed {
            removed += self.ctx.registry.unsubscribe(handle, name);
        }
        self.load_order.retain(|n| *n != name);
        debug!(plugin = name, "Unprocessed {} hook subscriptions", removed);

        let failures = self.unload_dependents(name);
        if failures > 0 {
            warn!(plugin = name, "{} dependents of {} failed to unload", failures, info);
        }

        self.ctx.resolver.graph_mut().clear_requirements(name);
        let slot = self.slot_mut(name)?;
        slot.release();
        slot.state = PluginState::Disposed;
        Ok(())
    }

    /// Unloads a plugin if needed and removes it from its package
    pub fn uninitialize_plugin(&mut self, name: &str) -> Result<(), RuntimeError> {
        let state = self
            .plugin_state(name)
            .ok_or_else(|| RuntimeError::PluginNotFound(name.to_string()))?;

        if state.is_active() {
            if let Err(e) = self.unload_plugin(name) {
                error!(plugin = name, "❌ Failed to unload '{}' before removal: {}", name, e);
            }
        }

        for package in &mut self.ctx.packages {
            package.slots.retain(|slot| slot.name != name);
        }
        self.forget(name);
        info!(plugin = name, "🧹 Uninitialized plugin '{}'", name);
        Ok(())
    }

    /// Re-resolves every running plugin and unloads the ones that fail
    ///
    /// Returns the failures, in load order.
    pub fn resolve_all(&mut self) -> Vec<(String, RuntimeError)> {
        let mut failures = Vec::new();

        for name in self.load_order.clone() {
            if !self.is_loaded(&name) {
                continue;
            }
            let Some(mut plugin) = self.slot_mut(&name).ok().and_then(|s| s.instance.take()) else {
                continue;
            };

            let result = self.resolve_plugin(&name, plugin.as_mut());
            if let Ok(slot) = self.slot_mut(&name) {
                slot.instance = Some(plugin);
            }

            if let Err(e) = result {
                error!(plugin = %name, "❌ Unloading '{}' after failed resolution: {}", name, e);
                if let Err(unload_err) = self.unload_plugin(&name) {
                    error!(plugin = %name, "❌ Failed to unload '{}': {}", name, unload_err);
                }
                failures.push((name.to_string(), e));
            }
        }

        failures
    }

    // ---- internals ----

    fn activate(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.initialize_plugin(name)?;
        self.load_plugin(name)
    }

    /// Unloads each active dependent of `name`, recording it to come back
    /// once `name` reloads; returns the number that failed
    fn unload_dependents(&mut self, name: &str) -> usize {
        let mut failures = 0;

        for dependent in self.ctx.resolver.graph().dependents_of(name) {
            if !self.plugin_state(&dependent).is_some_and(PluginState::is_active) {
                continue;
            }
            warn!(
                plugin = name,
                "Unloading '{}' because parent '{}' has been unloaded",
                dependent,
                name
            );
            self.ctx.resolver.pending_mut().add(name, &dependent);
            if let Err(e) = self.unload_plugin(&dependent) {
                failures += 1;
                error!(plugin = %dependent, "❌ Failed to unload dependent '{}': {}", dependent, e);
            }
        }

        failures
    }

    /// Re-activates everything that was waiting on `name` (or on its type)
    fn load_pending_requirees(&mut self, name: &str, plugin_type: &'static str) {
        let pending = self.ctx.resolver.pending_mut();
        let mut waiters = pending.take_for_blocker(name);
        for waiter in pending.take_for_blocker(plugin_type) {
            if !waiters.contains(&waiter) {
                waiters.push(waiter);
            }
        }

        for waiter in waiters {
            if waiter == name {
                continue;
            }
            match self.plugin_state(&waiter) {
                Some(state) if state.can_initialize() => {
                    warn!(plugin = name, "Loading '{}' to parent's request: '{}'", waiter, name);
                    if let Err(e) = self.activate(&waiter) {
                        warn!(plugin = %waiter, "❌ Pending plugin '{}' failed to load: {}", waiter, e);
                    }
                }
                Some(state) => debug!(plugin = %waiter, "Pending plugin '{}' is already {}", waiter, state),
                None => debug!(plugin = %waiter, "Pending plugin '{}' is no longer registered", waiter),
            }
        }
    }

    fn resolve_plugin(&mut self, name: &str, plugin: &mut dyn Plugin) -> Result<usize, RuntimeError> {
        let directory = self.directory();
        let dispatcher = self.ctx.dispatcher.clone();
        let resolver = &mut self.ctx.resolver;

        match catch_panic(|| resolver.resolve(name, plugin, &directory, &dispatcher)) {
            Ok(result) => Ok(result?),
            Err(message) => Err(RuntimeError::PluginPanicked {
                plugin: name.to_string(),
                message,
            }),
        }
    }

    /// Snapshot of running plugins and registered plugin types
    fn directory(&self) -> PluginDirectory {
        let mut directory = PluginDirectory::new();
        for slot in self.ctx.packages.iter().flat_map(|p| p.slots.iter()) {
            directory.register_type(slot.plugin_type(), slot.name());
            if slot.state == PluginState::Running {
                directory.mark_running(slot.name(), slot.version());
            }
        }
        directory
    }

    /// Loads the plugin's config file and feeds it to its member table
    fn apply_config(&self, name: &str, plugin: &mut dyn Plugin) {
        let default = plugin.default_config();
        match self.ctx.config_store.load_or_create(name, default.as_ref()) {
            Ok(Some(Value::Object(values))) => {
                let applied = plugin.members().apply(&values);
                debug!(plugin = name, "Applied {} config members", applied);
            }
            Ok(Some(other)) => {
                warn!(plugin = name, "Config for '{}' is not an object ({}); keeping defaults", name, other)
            }
            Ok(None) => {}
            Err(e) => warn!(plugin = name, "Failed to load config for '{}', keeping defaults: {}", name, e),
        }
    }

    fn fail(&mut self, name: &str, error: RuntimeError) -> RuntimeError {
        self.ctx.resolver.graph_mut().clear_requirements(name);
        if let Ok(slot) = self.slot_mut(name) {
            slot.release();
            slot.state = PluginState::Failed;
        }
        error
    }

    /// Drops records that only matter while `name` is registered
    fn forget(&mut self, name: &str) {
        let pending = self.ctx.resolver.pending_mut();
        pending.remove_waiter(name);
        pending.take_for_blocker(name);
        self.ctx.resolver.graph_mut().remove_plugin(name);
    }

    fn set_state(&mut self, name: &str, state: PluginState) {
        if let Ok(slot) = self.slot_mut(name) {
            slot.state = state;
        }
    }

    fn slot(&self, name: &str) -> Option<&PluginSlot> {
        self.ctx.packages.iter().find_map(|p| p.slot(name))
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut PluginSlot, RuntimeError> {
        self.ctx
            .packages
            .iter_mut()
            .find_map(|p| p.slot_mut(name))
            .ok_or_else(|| RuntimeError::PluginNotFound(name.to_string()))
    }
}

fn invalid_state(slot: &PluginSlot, operation: &'static str) -> RuntimeError {
    RuntimeError::InvalidState {
        plugin: slot.name().to_string(),
        state: slot.state().to_string(),
        operation,
    }
}

/// Runs plugin code, converting errors and panics into [`RuntimeError`]
fn guarded<R>(plugin: &str, f: impl FnOnce() -> Result<R, PluginError>) -> Result<R, RuntimeError> {
    match catch_panic(f) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(RuntimeError::Plugin {
            plugin: plugin.to_string(),
            source,
        }),
        Err(message) => Err(RuntimeError::PluginPanicked {
            plugin: plugin.to_string(),
            message,
        }),
    }
}

/// Calls the plugin's own handlers for `hook`, logging failures
fn call_own_hooks(plugin: &str, hooks: &[HookHandler], hook: &str) {
    for handler in hooks.iter().filter(|h| h.hook() == hook) {
        if let Err(e) = invoke_isolated(handler, &[]) {
            error!(plugin, hook, "❌ Failed calling '{}' on '{}': {}", hook, plugin, e);
        }
    }
}

/// Drops an instance, containing any panic from its `Drop`
fn drop_isolated(plugin: &str, instance: Box<dyn Plugin>) {
    if let Err(message) = catch_panic(move || drop(instance)) {
        error!(plugin, "❌ Plugin panicked while being disposed: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::SimplePluginFactory;
    use crate::reference::{PluginRef, ReferenceSpec};
    use crate::version::VersionNumber;
    use tempfile::TempDir;

    struct Basic {
        name: &'static str,
        fail_load: bool,
    }

    impl Plugin for Basic {
        fn info(&self) -> PluginInfo {
            PluginInfo::new(self.name, VersionNumber::new(1, 0, 0))
        }

        fn on_load(&mut self, _context: &crate::context::PluginContext) -> Result<(), PluginError> {
            if self.fail_load {
                return Err(PluginError::ExecutionError("refusing to load".into()));
            }
            Ok(())
        }
    }

    struct Dependent {
        target: Option<PluginRef>,
    }

    impl Plugin for Dependent {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Dependent", VersionNumber::new(1, 0, 0))
        }

        fn references(&self) -> Vec<ReferenceSpec> {
            vec![ReferenceSpec::named("Base").required()]
        }

        fn bind_reference(&mut self, _field: &str, target: Option<PluginRef>) {
            self.target = target;
        }
    }

    fn runtime(dir: &TempDir) -> PluginRuntime {
        PluginRuntime::new(RuntimeConfig {
            worker_threads: 1,
            config_dir: dir.path().to_path_buf(),
            strict_dependencies: true,
        })
        .unwrap()
    }

    fn basic(name: &'static str, fail_load: bool) -> SimplePluginFactory<Basic> {
        SimplePluginFactory::new(name, VersionNumber::new(1, 0, 0), move || Basic { name, fail_load })
    }

    #[test]
    fn test_states_follow_lifecycle() {
        let dir = TempDir::new().unwrap();
        let mut runtime = runtime(&dir);
        runtime
            .register_package(ModPackage::new("core").with_plugin(basic("Base", false)))
            .unwrap();

        assert_eq!(runtime.plugin_state("Base"), Some(PluginState::Created));
        runtime.initialize_plugin("Base").unwrap();
        assert_eq!(runtime.plugin_state("Base"), Some(PluginState::Resolved));
        runtime.load_plugin("Base").unwrap();
        assert_eq!(runtime.plugin_state("Base"), Some(PluginState::Running));
        assert_eq!(runtime.loaded_plugins(), vec!["Base"]);

        runtime.unload_plugin("Base").unwrap();
        assert_eq!(runtime.plugin_state("Base"), Some(PluginState::Disposed));
        assert!(runtime.loaded_plugins().is_empty());

        // Restart always goes through a fresh Init.
        assert!(matches!(
            runtime.load_plugin("Base"),
            Err(RuntimeError::InvalidState { operation: "load", .. })
        ));
        runtime.initialize_plugin("Base").unwrap();
        runtime.load_plugin("Base").unwrap();
        assert!(runtime.is_loaded("Base"));
    }

    #[test]
    fn test_failed_on_load_rolls_back() {
        let dir = TempDir::new().unwrap();
        let mut runtime = runtime(&dir);
        let report = runtime
            .load_package(ModPackage::new("bundle").with_plugin(basic("Grumpy", true)))
            .unwrap();

        assert_eq!(report.failed, vec!["Grumpy"]);
        assert_eq!(runtime.plugin_state("Grumpy"), Some(PluginState::Failed));
        assert_eq!(runtime.stats().running_plugins, 0);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut runtime = runtime(&dir);
        runtime
            .register_package(ModPackage::new("a").with_plugin(basic("Base", false)))
            .unwrap();

        assert!(matches!(
            runtime.register_package(ModPackage::new("a")),
            Err(RuntimeError::PackageAlreadyExists(_))
        ));
        assert!(matches!(
            runtime.register_package(ModPackage::new("b").with_plugin(basic("Base", false))),
            Err(RuntimeError::PluginAlreadyExists(_))
        ));
        assert!(matches!(
            runtime.initialize_plugin("Nobody"),
            Err(RuntimeError::PluginNotFound(_))
        ));
    }

    #[test]
    fn test_dependent_in_same_package_loads_after_its_requirement() {
        let dir = TempDir::new().unwrap();
        let mut runtime = runtime(&dir);
        let package = ModPackage::new("bundle")
            .with_plugin(SimplePluginFactory::new("Dependent", VersionNumber::new(1, 0, 0), || {
                Dependent { target: None }
            }))
            .with_plugin(basic("Base", false));

        let report = runtime.load_package(package).unwrap();

        assert!(report.is_complete());
        assert_eq!(runtime.loaded_plugins(), vec!["Base", "Dependent"]);
        assert_eq!(runtime.stats().pending_requirees, 0);
    }

    #[test]
    fn test_uninitialize_removes_plugin() {
        let dir = TempDir::new().unwrap();
        let mut runtime = runtime(&dir);
        runtime
            .load_package(ModPackage::new("bundle").with_plugin(basic("Base", false)))
            .unwrap();

        runtime.uninitialize_plugin("Base").unwrap();
        assert_eq!(runtime.plugin_state("Base"), None);
        assert_eq!(runtime.stats().registered_plugins, 0);
        assert!(matches!(
            runtime.uninitialize_plugin("Base"),
            Err(RuntimeError::PluginNotFound(_))
        ));
    }
}
