use hook_runtime::plugin::HOOK_LOADED;
use hook_runtime::{
    HookError, HookHandler, HookValue, MemberTable, Plugin, PluginContext, PluginError,
    PluginInfo, VersionNumber,
};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const GREETER_NAME: &str = "Greeter";
pub const GREETER_VERSION: VersionNumber = VersionNumber::new(1, 2, 0);

/// How a greeting is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GreetingStyle {
    #[default]
    Plain,
    Shout,
    Whisper,
}

impl GreetingStyle {
    pub const VARIANTS: [&'static str; 3] = ["Plain", "Shout", "Whisper"];

    fn from_index(index: usize) -> Self {
        match index {
            1 => GreetingStyle::Shout,
            2 => GreetingStyle::Whisper,
            _ => GreetingStyle::Plain,
        }
    }

    pub fn render(self, text: &str) -> String {
        match self {
            GreetingStyle::Plain => text.to_string(),
            GreetingStyle::Shout => text.to_uppercase(),
            GreetingStyle::Whisper => format!("({})", text.to_lowercase()),
        }
    }
}

/// Where greetings are announced, one bit per channel
pub const CHANNELS: [&str; 3] = ["Chat", "Toast", "Log"];
const CHANNEL_LOG: u64 = 1 << 2;

/// Welcomes players and counts how many it has greeted
pub struct GreeterPlugin {
    greeting: String,
    style: GreetingStyle,
    channels: u64,
    greeted: Arc<AtomicU64>,
}

impl GreeterPlugin {
    pub fn new() -> Self {
        debug!("👋 GreeterPlugin: Creating new instance");
        Self {
            greeting: "Welcome".to_string(),
            style: GreetingStyle::Plain,
            channels: 1,
            greeted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn style(&self) -> GreetingStyle {
        self.style
    }

    pub fn channels(&self) -> u64 {
        self.channels
    }
}

impl Default for GreeterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the handlers that were built, logging the ones that were not
pub(crate) fn collect_handlers(
    plugin: &str,
    handlers: impl IntoIterator<Item = Result<HookHandler, HookError>>,
) -> Vec<HookHandler> {
    handlers
        .into_iter()
        .filter_map(|handler| match handler {
            Ok(handler) => Some(handler),
            Err(e) => {
                warn!(plugin, "⚠️ {}: Skipping hook handler: {}", plugin, e);
                None
            }
        })
        .collect()
}

impl Plugin for GreeterPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(GREETER_NAME, GREETER_VERSION)
            .with_author("Hookhost Team")
            .with_description("Greets players as they connect")
    }

    fn hooks(&self) -> Vec<HookHandler> {
        let greeting = self.greeting.clone();
        let style = self.style;
        let log_channel = self.channels & CHANNEL_LOG != 0;
        let greeted = self.greeted.clone();
        let counted = self.greeted.clone();

        collect_handlers(
            GREETER_NAME,
            [
                HookHandler::new("OnPlayerConnected", 1, move |args| {
                    let player = args[0].as_str().ok_or_else(|| HookError::InvalidArgument {
                        handler: "OnPlayerConnected".to_string(),
                        index: 0,
                        expected: "player name",
                    })?;
                    greeted.fetch_add(1, Ordering::Relaxed);
                    let message = style.render(&format!("{}, {}!", greeting, player));
                    if log_channel {
                        info!("👋 GreeterPlugin: {}", message);
                    }
                    Ok(Some(HookValue::from(message)))
                }),
                HookHandler::new("OnPlayerDisconnected", 1, |args| {
                    info!("👋 GreeterPlugin: Player disconnected. Farewell, {:?}!", args[0]);
                    Ok(None)
                }),
                HookHandler::new("GreetedCount", 0, move |_| {
                    let count = counted.load(Ordering::Relaxed);
                    Ok(Some(HookValue::Int(count as i64)))
                }),
                HookHandler::new(HOOK_LOADED, 0, |_| {
                    debug!("👋 GreeterPlugin: Handlers are live");
                    Ok(None)
                }),
            ],
        )
    }

    fn members(&mut self) -> MemberTable<'_> {
        let GreeterPlugin {
            greeting,
            style,
            channels,
            ..
        } = self;

        MemberTable::new()
            .text("greeting", move |text| *greeting = text)
            .enumeration("style", &GreetingStyle::VARIANTS, move |index| {
                *style = GreetingStyle::from_index(index)
            })
            .bitmask("channels", &CHANNELS, move |mask| *channels = mask)
    }

    fn default_config(&self) -> Option<serde_json::Value> {
        Some(json!({
            "greeting": self.greeting,
            "style": GreetingStyle::VARIANTS[0],
            "channels": "Chat",
        }))
    }

    fn on_load(&mut self, context: &PluginContext) -> Result<(), PluginError> {
        if self.greeting.trim().is_empty() {
            return Err(PluginError::InitializationFailed(
                "greeting text must not be empty".to_string(),
            ));
        }
        info!(
            "👋 GreeterPlugin: ✅ {} ready, greeting with '{}' ({:?})",
            context.owner(),
            self.greeting,
            self.style
        );
        Ok(())
    }

    fn on_unload(&mut self, _context: &PluginContext) -> Result<(), PluginError> {
        info!(
            "👋 GreeterPlugin: Greeted {} players, goodbye!",
            self.greeted.load(Ordering::Relaxed)
        );
        Ok(())
    }
}
