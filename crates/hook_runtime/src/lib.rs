//! # Hook Runtime
//!
//! An in-process plugin host. Plugins subscribe handlers to named hooks,
//! declare (optionally version-gated) references to each other, and are
//! driven through an explicit lifecycle by a [`PluginRuntime`].
//!
//! ## Key Features
//!
//! - **Interned hooks**: hook names map once to a [`HookHandle`]; dispatch never
//!   compares strings
//! - **First result wins**: the first subscriber returning a value
//!   short-circuits the rest, and a failing subscriber never stops its siblings
//! - **Dependency tracking**: unloading a plugin unloads its dependents and
//!   brings them back when it returns
//! - **Deferred work**: a per-tick queue for the host thread and a worker pool
//!   for background tasks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hook_runtime::*;
//!
//! struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn info(&self) -> PluginInfo {
//!         PluginInfo::new("Greeter", VersionNumber::new(1, 0, 0))
//!     }
//!
//!     fn hooks(&self) -> Vec<HookHandler> {
//!         vec![HookHandler::new("OnPlayerConnected", 1, |args| {
//!             let name = args[0].as_str().unwrap_or("stranger");
//!             Ok(Some(HookValue::from(format!("Welcome, {}!", name))))
//!         })
//!         .expect("arity within limit")]
//!     }
//! }
//!
//! let mut runtime = PluginRuntime::new(RuntimeConfig::default())?;
//! runtime.load_package(ModPackage::new("core").with_plugin(SimplePluginFactory::new(
//!     "Greeter",
//!     VersionNumber::new(1, 0, 0),
//!     || Greeter,
//! )))?;
//!
//! let greeting: Option<String> = runtime.call_hook_as("OnPlayerConnected", &hook_args!["alice"]);
//! assert_eq!(greeting.as_deref(), Some("Welcome, alice!"));
//! # Ok::<(), RuntimeError>(())
//! ```

pub mod config_store;
pub mod context;
pub mod deferred;
pub mod dispatch;
pub mod error;
pub mod interner;
pub mod lifecycle;
pub mod members;
pub mod package;
pub mod plugin;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod stats;
pub mod utils;
pub mod value;
pub mod version;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use config_store::ConfigStore;
pub use context::{PluginContext, RuntimeConfig, RuntimeContext};
pub use deferred::{DeferredTask, TickQueue, WorkerPool};
pub use dispatch::Dispatcher;
pub use error::{ConfigError, HookError, PluginError, ResolutionError, RuntimeError};
pub use interner::{HookHandle, HookInterner};
pub use lifecycle::PluginRuntime;
pub use members::{MemberKind, MemberTable, MemberValue};
pub use package::{ModPackage, PackageReport, PluginState};
pub use plugin::{Plugin, PluginFactory, PluginInfo, SimplePluginFactory};
pub use reference::{PluginRef, ReferenceSpec, ReferenceTarget};
pub use registry::{HookHandler, HookRegistry, MAX_HOOK_ARITY};
pub use stats::{DispatchStatsSnapshot, RuntimeStats};
pub use value::{CallOutcome, HookArgs, HookValue};
pub use version::VersionNumber;

/// Version of this runtime
pub const HOOK_RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the runtime
pub type Result<T> = std::result::Result<T, RuntimeError>;
