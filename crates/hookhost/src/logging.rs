//! Logging setup for the host.
//!
//! The filter starts from the configured level and adds per-crate
//! directives for the runtime and the bundled plugins. `RUST_LOG` replaces
//! the whole filter when set.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const RUNTIME_TARGET: &str = "hook_runtime";
const PLUGIN_TARGETS: &[&str] = &["plugin_greeter"];

/// Builds the filter directive string, e.g. `info,hook_runtime=debug`.
pub fn filter_directives(config: &LoggingSettings) -> String {
    let mut directives = vec![config.level.clone()];
    if let Some(level) = &config.runtime_level {
        directives.push(format!("{RUNTIME_TARGET}={level}"));
    }
    if let Some(level) = &config.plugin_level {
        directives.extend(PLUGIN_TARGETS.iter().map(|target| format!("{target}={level}")));
    }
    directives.join(",")
}

/// Installs the global subscriber. `json_format` forces JSON output
/// regardless of the config file.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let directives = filter_directives(config);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directives)?,
    };

    let json = json_format || config.json_format;
    let json_layer = json.then(|| fmt::layer().json().with_thread_names(true));
    let text_layer = (!json).then(|| fmt::layer().with_target(true).with_thread_names(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    info!("🔧 Logging initialized: {}", directives);
    Ok(())
}

/// Displays the startup banner through the logger.
pub fn display_banner() {
    info!("╔══════════════════════════════════════════╗");
    info!("║               🔌 HOOKHOST 🔌             ║");
    info!("║  runtime v{:<31}║", hook_runtime::HOOK_RUNTIME_VERSION);
    info!("║                                          ║");
    info!("║  🎯 Interned hooks, first result wins    ║");
    info!("║  🔗 Version-gated plugin references      ║");
    info!("║  ⏱️  Tick queue + worker pool             ║");
    info!("╚══════════════════════════════════════════╝");
}
