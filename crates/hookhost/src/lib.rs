//! # Hookhost - Plugin Host Entry Point
//!
//! Loads the bundled plugin package into a [`hook_runtime::PluginRuntime`]
//! and ticks it until shutdown.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! hookhost
//!
//! # Specify custom configuration
//! hookhost --config production.toml
//!
//! # Override specific settings
//! hookhost --tick 16 --workers 4 --log-level debug
//!
//! # JSON logging for production
//! hookhost --json-logs
//! ```
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default: `hookhost.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The host shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM. A second
//! signal exits immediately.

use tracing::{error, info};

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

pub use app::{Application, HOOK_ON_TICK};
pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings, PluginSettings, RuntimeSettings};

/// Parses arguments, sets up logging and runs the host to completion.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the config file, so it is read before the
    // subscriber exists and handed to the application as is
    let config = match Application::load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }
    info!("✅ Configuration loaded from {}", args.config_path.display());
    logging::display_banner();

    match Application::with_config(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
