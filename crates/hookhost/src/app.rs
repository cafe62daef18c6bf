//! Main application logic and lifecycle management.
//!
//! The [`Application`] owns the plugin runtime and drives it on a fixed tick
//! until a shutdown signal arrives.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    signals::{wait_for_shutdown, wait_for_shutdown_silent},
};
use hook_runtime::{HookValue, PackageReport, PluginRuntime, RuntimeStats};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Hook called on every host tick with the tick number
pub const HOOK_ON_TICK: &str = "OnTick";

/// The plugin host.
pub struct Application {
    config: AppConfig,
    runtime: PluginRuntime,
    ticks: u64,
}

impl Application {
    /// Loads configuration, applies CLI overrides, validates it and builds
    /// the runtime.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::load_config(&args).await?;
        Self::with_config(config)
    }

    /// Reads the config file once and applies CLI overrides on top of it.
    pub async fn load_config(args: &CliArgs) -> Result<AppConfig, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        apply_overrides(&mut config, args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        Ok(config)
    }

    /// Builds the host from an already validated configuration.
    pub fn with_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let runtime = PluginRuntime::new(config.to_runtime_config())?;
        Ok(Self {
            config,
            runtime,
            ticks: 0,
        })
    }

    pub fn runtime(&self) -> &PluginRuntime {
        &self.runtime
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Registers and loads the bundled plugins the config enables.
    pub fn load_plugins(&mut self) -> Result<PackageReport, Box<dyn std::error::Error>> {
        let plugins = &self.config.plugins;
        let package = plugin_greeter::package_filtered(|name| plugins.is_enabled(name));
        if package.is_empty() {
            warn!("⚠️ No bundled plugins are enabled");
        }

        let report = self.runtime.load_package(package)?;
        for plugin in &report.failed {
            warn!("⚠️ Plugin '{}' did not load", plugin);
        }
        info!(
            "🔌 Package '{}': {} loaded, {} failed",
            report.package,
            report.loaded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Runs one host tick: deferred tasks first, then the tick hook.
    pub fn step(&mut self) {
        self.ticks += 1;
        let drained = self.runtime.tick();
        if drained > 0 {
            debug!("⏱️ Tick {} ran {} deferred tasks", self.ticks, drained);
        }
        let tick = i64::try_from(self.ticks).unwrap_or(i64::MAX);
        self.runtime.call_hook(HOOK_ON_TICK, &[HookValue::Int(tick)]);
    }

    /// Ticks until a shutdown signal arrives, then shuts the runtime down.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting plugin host");
        self.log_configuration_summary();
        self.load_plugins()?;
        log_statistics("📊 Initial Runtime State:", &self.runtime.stats());

        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.runtime.tick_interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let stats_every = self.config.runtime.stats_interval_secs;
        let mut health = tokio::time::interval(Duration::from_secs(stats_every.max(1)));
        health.tick().await;
        let mut last_calls = 0u64;

        info!("✅ Plugin host is now running");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let shutdown = wait_for_shutdown();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                _ = ticker.tick() => self.step(),
                _ = health.tick(), if stats_every > 0 => {
                    let stats = self.runtime.stats();
                    info!(
                        "📊 Runtime Health - {} hook calls | {} subscriptions | {} plugins running",
                        stats.dispatch.calls - last_calls,
                        stats.subscriptions,
                        stats.running_plugins
                    );
                    last_calls = stats.dispatch.calls;
                }
            }
        }

        tokio::spawn(async move {
            if let Err(e) = wait_for_shutdown_silent().await {
                error!("Failed to set up forced shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown signal received again, exiting immediately");
            std::process::exit(1);
        });

        self.shutdown();
        Ok(())
    }

    /// Unloads every plugin and logs final statistics.
    pub fn shutdown(mut self) -> RuntimeStats {
        info!("🔌 Shutting down plugins...");
        self.runtime.shutdown();
        let remaining = self.runtime.tick();
        if remaining > 0 {
            debug!("Ran {} deferred tasks queued during shutdown", remaining);
        }

        let stats = self.runtime.stats();
        log_statistics("📊 Final Statistics:", &stats);
        info!("✅ Plugin host shutdown complete after {} ticks", self.ticks);
        stats
    }

    fn log_configuration_summary(&self) {
        let runtime = &self.config.runtime;
        info!("📋 Configuration Summary:");
        info!("  ⏱️ Tick interval: {}ms", runtime.tick_interval_ms);
        if runtime.worker_threads == 0 {
            info!("  🧵 Worker threads: one per CPU");
        } else {
            info!("  🧵 Worker threads: {}", runtime.worker_threads);
        }
        info!("  📂 Plugin config: {}", runtime.config_dir);
        info!("  🔗 Strict dependencies: {}", runtime.strict_dependencies);
    }
}

fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if let Some(tick) = args.tick_interval_ms {
        config.runtime.tick_interval_ms = tick;
    }
    if let Some(workers) = args.worker_threads {
        config.runtime.worker_threads = workers;
    }
}

fn log_statistics(title: &str, stats: &RuntimeStats) {
    info!("{}", title);
    info!("  - Plugins running: {}/{}", stats.running_plugins, stats.registered_plugins);
    info!("  - Hooks interned: {}", stats.interned_hooks);
    info!("  - Subscriptions: {}", stats.subscriptions);
    info!("  - Hook calls: {}", stats.dispatch.calls);
    info!("  - Handler failures: {}", stats.dispatch.handler_failures);
    if stats.pending_requirees > 0 {
        warn!("  - Plugins waiting on requirements: {}", stats.pending_requirees);
    }
}
