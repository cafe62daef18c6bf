use crate::greeter::{collect_handlers, GREETER_NAME};
use hook_runtime::{
    HookHandler, HookValue, Plugin, PluginContext, PluginError, PluginInfo, PluginRef,
    ReferenceSpec, VersionNumber,
};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

pub const BOARD_NAME: &str = "WelcomeBoard";
pub const BOARD_VERSION: VersionNumber = VersionNumber::new(1, 0, 0);

/// Oldest greeter the board knows how to talk to
pub const MIN_GREETER_VERSION: &str = "1.1.0";

/// Keeps a list of arrivals, asking the greeter for each announcement
///
/// The board's banner is rendered on a worker thread when it loads and
/// handed back to the host thread through the tick queue.
pub struct WelcomeBoard {
    greeter: Arc<RwLock<Option<PluginRef>>>,
    arrivals: Arc<Mutex<Vec<String>>>,
    banner: Arc<Mutex<Option<String>>>,
}

impl WelcomeBoard {
    pub fn new() -> Self {
        Self {
            greeter: Arc::new(RwLock::new(None)),
            arrivals: Arc::new(Mutex::new(Vec::new())),
            banner: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for WelcomeBoard {
    fn default() -> Self {
        Self::new()
    }
}

fn render_banner(owner: &PluginInfo) -> String {
    let title = format!("~ {} ~", owner);
    let rule = "=".repeat(title.chars().count());
    format!("{}\n{}\n{}", rule, title, rule)
}

impl Plugin for WelcomeBoard {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(BOARD_NAME, BOARD_VERSION)
            .with_author("Hookhost Team")
            .with_description("Announces arrivals using the greeter")
    }

    fn references(&self) -> Vec<ReferenceSpec> {
        vec![ReferenceSpec::named(GREETER_NAME)
            .field("greeter")
            .required()
            .min_version(MIN_GREETER_VERSION)]
    }

    fn bind_reference(&mut self, field: &str, target: Option<PluginRef>) {
        if field == "greeter" {
            *self.greeter.write().unwrap_or_else(|e| e.into_inner()) = target;
        }
    }

    fn hooks(&self) -> Vec<HookHandler> {
        let greeter = self.greeter.clone();
        let arrivals = self.arrivals.clone();
        let listed = self.arrivals.clone();
        let banner = self.banner.clone();

        collect_handlers(
            BOARD_NAME,
            [
                HookHandler::new("Announce", 1, move |args| {
                    let greeting = {
                        let greeter = greeter.read().unwrap_or_else(|e| e.into_inner());
                        greeter
                            .as_ref()
                            .and_then(|g| g.call_as::<String>("OnPlayerConnected", args))
                    };
                    let Some(greeting) = greeting else {
                        return Ok(None);
                    };

                    let announcement = format!("📣 {}", greeting);
                    arrivals
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(announcement.clone());
                    Ok(Some(HookValue::from(announcement)))
                }),
                HookHandler::new("ArrivalCount", 0, move |_| {
                    let count = listed.lock().unwrap_or_else(|e| e.into_inner()).len();
                    Ok(Some(HookValue::Int(count as i64)))
                }),
                HookHandler::new("Banner", 0, move |_| {
                    let banner = banner.lock().unwrap_or_else(|e| e.into_inner());
                    Ok(banner.clone().map(HookValue::from))
                }),
            ],
        )
    }

    fn on_load(&mut self, context: &PluginContext) -> Result<(), PluginError> {
        let owner = context.owner().clone();
        let queue = context.tick_queue();
        let banner = self.banner.clone();

        context.queue_worker(move || {
            let rendered = render_banner(&owner);
            queue.next_tick(move || {
                *banner.lock().unwrap_or_else(|e| e.into_inner()) = Some(rendered);
            });
        });

        info!("📋 WelcomeBoard: ✅ Board is up");
        Ok(())
    }

    fn on_unload(&mut self, _context: &PluginContext) -> Result<(), PluginError> {
        let arrivals = self.arrivals.lock().unwrap_or_else(|e| e.into_inner()).len();
        if arrivals == 0 {
            warn!("📋 WelcomeBoard: Taken down without announcing anyone");
        } else {
            info!("📋 WelcomeBoard: Taken down after {} arrivals", arrivals);
        }
        Ok(())
    }
}
