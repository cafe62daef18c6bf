//! Runtime state and the per-plugin context handed to plugin callbacks

use crate::config_store::ConfigStore;
use crate::deferred::{TickQueue, WorkerPool};
use crate::dispatch::Dispatcher;
use crate::error::RuntimeError;
use crate::interner::HookInterner;
use crate::package::ModPackage;
use crate::plugin::PluginInfo;
use crate::registry::HookRegistry;
use crate::resolver::DependencyResolver;
use crate::value::{CallOutcome, HookValue};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

type Providers = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Settings for a [`RuntimeContext`]
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Worker pool size; 0 means one thread per CPU
    pub worker_threads: usize,
    /// Directory holding `<plugin>.json` config files
    pub config_dir: PathBuf,
    /// Fail resolution on outdated optional references too
    pub strict_dependencies: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            config_dir: PathBuf::from("config/plugins"),
            strict_dependencies: true,
        }
    }
}

/// Everything the lifecycle controller mutates, owned in one place
///
/// Independent instances share nothing, so tests can build as many as they
/// like.
#[derive(Debug)]
pub struct RuntimeContext {
    pub(crate) interner: Arc<HookInterner>,
    pub(crate) registry: Arc<HookRegistry>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) resolver: DependencyResolver,
    pub(crate) packages: Vec<ModPackage>,
    pub(crate) tick_queue: Arc<TickQueue>,
    pub(crate) workers: Arc<WorkerPool>,
    pub(crate) config_store: ConfigStore,
    pub(crate) providers: Arc<ProviderMap>,
}

impl RuntimeContext {
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let interner = Arc::new(HookInterner::new());
        let registry = Arc::new(HookRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(interner.clone(), registry.clone()));

        Ok(Self {
            interner,
            registry,
            dispatcher,
            resolver: DependencyResolver::new(config.strict_dependencies),
            packages: Vec::new(),
            tick_queue: Arc::new(TickQueue::new()),
            workers: Arc::new(WorkerPool::new(config.worker_threads)?),
            config_store: ConfigStore::new(config.config_dir),
            providers: Arc::new(ProviderMap::default()),
        })
    }

    pub fn interner(&self) -> &Arc<HookInterner> {
        &self.interner
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    pub fn packages(&self) -> &[ModPackage] {
        &self.packages
    }

    pub fn tick_queue(&self) -> &Arc<TickQueue> {
        &self.tick_queue
    }

    pub fn workers(&self) -> &Arc<WorkerPool> {
        &self.workers
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    /// Add a context provider visible to every plugin
    pub fn add_provider<T: Send + Sync + 'static>(&mut self, provider: T) {
        Arc::make_mut(&mut self.providers)
            .0
            .insert(TypeId::of::<T>(), Arc::new(provider));
    }

    /// Builds the context handed to one plugin's callbacks
    pub(crate) fn plugin_context(&self, owner: &PluginInfo) -> PluginContext {
        PluginContext {
            owner: owner.clone(),
            dispatcher: self.dispatcher.clone(),
            tick_queue: self.tick_queue.clone(),
            workers: self.workers.clone(),
            config_path: self.config_store.path_for(&owner.name),
            providers: self.providers.clone(),
        }
    }
}

/// Type-keyed services shared with plugins
#[derive(Clone, Default)]
pub(crate) struct ProviderMap(Providers);

impl std::fmt::Debug for ProviderMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderMap").field("providers", &self.0.len()).finish()
    }
}

/// Plugin context provides access to services and dependencies
///
/// Cheap to clone; plugins may keep one for use inside hook handlers and
/// deferred tasks.
#[derive(Clone)]
pub struct PluginContext {
    owner: PluginInfo,
    dispatcher: Arc<Dispatcher>,
    tick_queue: Arc<TickQueue>,
    workers: Arc<WorkerPool>,
    config_path: PathBuf,
    providers: Arc<ProviderMap>,
}

impl PluginContext {
    /// Identity of the plugin this context belongs to
    pub fn owner(&self) -> &PluginInfo {
        &self.owner
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn call_hook(&self, hook: &str, args: &[HookValue]) -> CallOutcome {
        self.dispatcher.call_hook(hook, args)
    }

    pub fn call_hook_as<T: TryFrom<HookValue>>(&self, hook: &str, args: &[HookValue]) -> Option<T> {
        self.dispatcher.call_hook_as(hook, args)
    }

    /// Runs `task` on the host thread at the next tick
    pub fn next_tick(&self, task: impl FnOnce() + Send + 'static) {
        self.tick_queue.next_tick(task);
    }

    pub fn next_frame(&self, task: impl FnOnce() + Send + 'static) {
        self.tick_queue.next_frame(task);
    }

    /// Runs `task` on a background worker, tagged with this plugin's identity
    pub fn queue_worker(&self, task: impl FnOnce() + Send + 'static) {
        self.workers.spawn(&self.owner, task);
    }

    /// Queue for handing worker results back to the host thread
    pub fn tick_queue(&self) -> Arc<TickQueue> {
        self.tick_queue.clone()
    }

    /// Where this plugin's configuration lives
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Get a context provider
    pub fn get_provider<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.providers.0.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("owner", &self.owner)
            .field("config_path", &self.config_path)
            .finish()
    }
}
