//! Error types for the hook runtime

use crate::version::VersionNumber;

/// Main error type returned by lifecycle entry points
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Plugin is not registered in any package
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// A plugin with the same name is already registered
    #[error("Plugin already exists: {0}")]
    PluginAlreadyExists(String),

    /// Package is not registered
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// A package with the same name is already registered
    #[error("Package already exists: {0}")]
    PackageAlreadyExists(String),

    /// Operation is not valid in the plugin's current lifecycle state
    #[error("Cannot {operation} plugin '{plugin}' while it is {state}")]
    InvalidState {
        plugin: String,
        state: String,
        operation: &'static str,
    },

    /// Reference resolution failed
    #[error("Reference resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Hook system error
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    /// A plugin callback reported an error
    #[error("Plugin '{plugin}' failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },

    /// A plugin callback panicked
    #[error("Plugin '{plugin}' panicked: {message}")]
    PluginPanicked { plugin: String, message: String },

    /// Configuration association error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool could not be built
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Errors raised while resolving declared plugin references
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    /// A required reference names a plugin that is not loaded
    #[error("Plugin '{plugin}' references a required plugin which is not loaded: {reference}")]
    MissingRequired { plugin: String, reference: String },

    /// The referenced plugin is loaded but older than the declared minimum
    #[error(
        "Plugin '{plugin}' references a required plugin which is outdated: {reference} v{found} < v{required}"
    )]
    VersionMismatch {
        plugin: String,
        reference: String,
        found: VersionNumber,
        required: VersionNumber,
    },
}

/// Errors that can occur while registering or invoking hook handlers
#[derive(Debug, Clone, thiserror::Error)]
pub enum HookError {
    /// Handler reported a failure
    #[error("Handler execution failed: {0}")]
    HandlerFailed(String),

    /// Handler declared more parameters than the dispatcher supports
    #[error("Handler '{handler}' declares {arity} parameters, maximum is {max}")]
    ArityTooLarge {
        handler: String,
        arity: usize,
        max: usize,
    },

    /// Handler received an argument it cannot convert
    #[error("Invalid argument {index} for handler '{handler}': expected {expected}")]
    InvalidArgument {
        handler: String,
        index: usize,
        expected: &'static str,
    },

    /// Handler panicked
    #[error("Handler '{handler}' panicked: {message}")]
    Panicked { handler: String, message: String },
}

/// Errors reported by plugin callbacks
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Plugin initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Plugin runtime failure
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Hook failure surfaced by the plugin
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Errors around per-plugin configuration files and member binding
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config names a member the plugin does not declare
    #[error("Unknown member: {0}")]
    UnknownMember(String),

    /// Raw value could not be converted for the member's kind
    #[error("Cannot convert value for member '{member}': {reason}")]
    Conversion { member: String, reason: String },
}

impl From<rayon::ThreadPoolBuildError> for RuntimeError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        RuntimeError::WorkerPool(err.to_string())
    }
}
