//! Sample plugins for the hook runtime
//!
//! [`GreeterPlugin`] answers `OnPlayerConnected` with a configurable
//! greeting. [`WelcomeBoard`] requires a recent greeter and builds
//! announcements on top of it.

mod board;
mod greeter;

pub use board::{WelcomeBoard, BOARD_NAME, BOARD_VERSION, MIN_GREETER_VERSION};
pub use greeter::{GreeterPlugin, GreetingStyle, CHANNELS, GREETER_NAME, GREETER_VERSION};

use hook_runtime::{ModPackage, SimplePluginFactory};

/// Name of the package returned by [`package`]
pub const PACKAGE_NAME: &str = "greetings";

/// The greeter and the board, in load order
pub fn package() -> ModPackage {
    ModPackage::new(PACKAGE_NAME)
        .with_plugin(SimplePluginFactory::new(
            GREETER_NAME,
            GREETER_VERSION,
            GreeterPlugin::new,
        ))
        .with_plugin(SimplePluginFactory::new(
            BOARD_NAME,
            BOARD_VERSION,
            WelcomeBoard::new,
        ))
}

/// Package holding only the plugins whose names pass `enabled`
pub fn package_filtered(enabled: impl Fn(&str) -> bool) -> ModPackage {
    let mut package = ModPackage::new(PACKAGE_NAME);
    if enabled(GREETER_NAME) {
        package.add_plugin(Box::new(SimplePluginFactory::new(
            GREETER_NAME,
            GREETER_VERSION,
            GreeterPlugin::new,
        )));
    }
    if enabled(BOARD_NAME) {
        package.add_plugin(Box::new(SimplePluginFactory::new(
            BOARD_NAME,
            BOARD_VERSION,
            WelcomeBoard::new,
        )));
    }
    package
}
