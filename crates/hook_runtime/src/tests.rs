//! End-to-end runtime tests

use crate::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn runtime(dir: &TempDir) -> PluginRuntime {
    PluginRuntime::new(RuntimeConfig {
        worker_threads: 2,
        config_dir: dir.path().join("plugins"),
        strict_dependencies: true,
    })
    .unwrap()
}

fn factory<T: Plugin>(
    name: &str,
    version: VersionNumber,
    constructor: impl Fn() -> T + Send + Sync + 'static,
) -> SimplePluginFactory<T> {
    SimplePluginFactory::new(name, version, constructor)
}

/// Answers a single hook with a fixed value
struct Responder {
    name: &'static str,
    version: VersionNumber,
    hook: &'static str,
    value: i64,
}

impl Plugin for Responder {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(self.name, self.version)
    }

    fn hooks(&self) -> Vec<HookHandler> {
        let value = self.value;
        vec![HookHandler::new(self.hook, 0, move |_| Ok(Some(HookValue::Int(value)))).unwrap()]
    }
}

fn responder(
    name: &'static str,
    version: VersionNumber,
    hook: &'static str,
    value: i64,
) -> SimplePluginFactory<Responder> {
    factory(name, version, move || Responder {
        name,
        version,
        hook,
        value,
    })
}

/// Requires another plugin by name, optionally with a minimum version
struct Requirer {
    name: &'static str,
    requires: &'static str,
    min_version: &'static str,
    bound: Arc<Mutex<Option<PluginRef>>>,
}

impl Plugin for Requirer {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(self.name, VersionNumber::new(1, 0, 0))
    }

    fn references(&self) -> Vec<ReferenceSpec> {
        vec![ReferenceSpec::named(self.requires)
            .required()
            .min_version(self.min_version)]
    }

    fn bind_reference(&mut self, _field: &str, target: Option<PluginRef>) {
        *self.bound.lock().unwrap() = target;
    }

    fn hooks(&self) -> Vec<HookHandler> {
        let name = self.name;
        vec![HookHandler::new("Describe", 0, move |_| Ok(Some(HookValue::from(name)))).unwrap()]
    }
}

fn requirer(
    name: &'static str,
    requires: &'static str,
    min_version: &'static str,
) -> (SimplePluginFactory<Requirer>, Arc<Mutex<Option<PluginRef>>>) {
    let bound = Arc::new(Mutex::new(None));
    let shared = bound.clone();
    let factory = factory(name, VersionNumber::new(1, 0, 0), move || Requirer {
        name,
        requires,
        min_version,
        bound: shared.clone(),
    });
    (factory, bound)
}

#[test_log::test]
fn test_hook_visible_only_while_plugin_is_loaded() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    runtime
        .register_package(ModPackage::new("tests").with_plugin(responder(
            "A",
            VersionNumber::new(1, 0, 0),
            "OnTest",
            7,
        )))
        .unwrap();

    assert_eq!(runtime.call_hook("OnTest", &[]), CallOutcome::NoResult);

    runtime.initialize_plugin("A").unwrap();
    // Hooks are subscribed at Load, not Init.
    assert_eq!(runtime.call_hook("OnTest", &[]), CallOutcome::NoResult);

    runtime.load_plugin("A").unwrap();
    assert_eq!(runtime.call_hook("OnTest", &[]), CallOutcome::Returned(HookValue::Int(7)));
    assert_eq!(runtime.call_hook_as::<i64>("OnTest", &[]), Some(7));

    runtime.unload_plugin("A").unwrap();
    assert_eq!(runtime.call_hook("OnTest", &[]), CallOutcome::NoResult);
    assert_eq!(runtime.stats().subscriptions, 0);
}

#[test_log::test]
fn test_earlier_plugin_overrides_later_one() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let package = ModPackage::new("tests")
        .with_plugin(responder("First", VersionNumber::new(1, 0, 0), "CanLoot", 1))
        .with_plugin(responder("Second", VersionNumber::new(1, 0, 0), "CanLoot", 2));

    runtime.load_package(package).unwrap();

    assert_eq!(runtime.call_hook_as::<i64>("CanLoot", &[]), Some(1));
    assert_eq!(runtime.call_plugin("Second", "CanLoot", &[]).into_typed::<i64>(), Some(2));

    runtime.unload_plugin("First").unwrap();
    assert_eq!(runtime.call_hook_as::<i64>("CanLoot", &[]), Some(2));
}

#[test_log::test]
fn test_panicking_subscriber_does_not_hide_later_result() {
    struct Exploder;

    impl Plugin for Exploder {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Exploder", VersionNumber::new(1, 0, 0))
        }

        fn hooks(&self) -> Vec<HookHandler> {
            vec![HookHandler::new("OnTest", 2, |_| panic!("exploded")).unwrap()]
        }
    }

    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let package = ModPackage::new("tests")
        .with_plugin(factory("Exploder", VersionNumber::new(1, 0, 0), || Exploder))
        .with_plugin(responder("Calm", VersionNumber::new(1, 0, 0), "OnTest", 3));

    runtime.load_package(package).unwrap();

    assert_eq!(runtime.call_hook_as::<i64>("OnTest", &hook_args![1]), Some(3));
    assert_eq!(runtime.stats().dispatch.handler_failures, 1);
    assert!(runtime.is_loaded("Exploder"));
}

#[test_log::test]
fn test_outdated_requirement_keeps_dependent_inactive() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let (shop, bound) = requirer("Shop", "Economics", "1.1.0");
    let package = ModPackage::new("tests")
        .with_plugin(responder("Economics", VersionNumber::new(1, 0, 0), "Balance", 100))
        .with_plugin(shop);

    let report = runtime.load_package(package).unwrap();

    assert_eq!(report.loaded, vec!["Economics"]);
    assert_eq!(report.failed, vec!["Shop"]);
    assert_eq!(runtime.plugin_state("Shop"), Some(PluginState::Failed));
    assert!(bound.lock().unwrap().is_none());
    assert_eq!(runtime.call_plugin("Shop", "Describe", &[]), CallOutcome::NoResult);
}

#[test_log::test]
fn test_satisfied_requirement_binds_callable_reference() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let (shop, bound) = requirer("Shop", "Economics", "1.1.0");
    let package = ModPackage::new("tests")
        .with_plugin(responder("Economics", VersionNumber::new(1, 2, 0), "Balance", 100))
        .with_plugin(shop);

    let report = runtime.load_package(package).unwrap();
    assert!(report.is_complete());

    let economics = bound.lock().unwrap().clone().unwrap();
    assert_eq!(economics.name(), "Economics");
    assert_eq!(economics.version(), VersionNumber::new(1, 2, 0));
    assert_eq!(economics.call_as::<i64>("Balance", &[]), Some(100));
    assert_eq!(
        runtime.context().resolver().graph().dependents_of("Economics"),
        vec!["Shop"]
    );
}

#[test_log::test]
fn test_unloading_requirement_cascades_and_reloads_dependents() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let (d1, _) = requirer("D1", "P", "");
    let (d2, _) = requirer("D2", "P", "");
    let package = ModPackage::new("tests")
        .with_plugin(responder("P", VersionNumber::new(2, 0, 0), "Ping", 1))
        .with_plugin(d1)
        .with_plugin(d2);

    runtime.load_package(package).unwrap();
    assert_eq!(runtime.loaded_plugins(), vec!["P", "D1", "D2"]);

    runtime.unload_plugin("P").unwrap();

    assert_eq!(runtime.plugin_state("D1"), Some(PluginState::Disposed));
    assert_eq!(runtime.plugin_state("D2"), Some(PluginState::Disposed));
    assert!(runtime.loaded_plugins().is_empty());
    let pending = runtime.context().resolver().pending();
    assert_eq!(pending.waiting_on("P"), vec!["D1", "D2"]);
    assert_eq!(runtime.call_plugin("D1", "Describe", &[]), CallOutcome::NoResult);

    runtime.initialize_plugin("P").unwrap();
    runtime.load_plugin("P").unwrap();

    assert_eq!(runtime.loaded_plugins(), vec!["P", "D1", "D2"]);
    assert!(runtime.context().resolver().pending().is_empty());
    assert_eq!(
        runtime.call_plugin("D2", "Describe", &[]).into_typed::<String>(),
        Some("D2".to_string())
    );
}

#[test_log::test]
fn test_dependents_across_packages_return_with_their_requirement() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let (shop, _) = requirer("Shop", "Economics", "");

    runtime
        .load_package(ModPackage::new("economy").with_plugin(responder(
            "Economics",
            VersionNumber::new(1, 0, 0),
            "Balance",
            5,
        )))
        .unwrap();
    runtime
        .load_package(ModPackage::new("shop").with_plugin(shop))
        .unwrap();
    assert!(runtime.is_loaded("Shop"));

    runtime.unload_package("economy").unwrap();
    assert_eq!(runtime.plugin_state("Economics"), None);
    assert_eq!(runtime.plugin_state("Shop"), Some(PluginState::Disposed));

    let report = runtime
        .load_package(ModPackage::new("economy").with_plugin(responder(
            "Economics",
            VersionNumber::new(1, 0, 0),
            "Balance",
            5,
        )))
        .unwrap();
    assert!(report.is_complete());
    assert!(runtime.is_loaded("Shop"));

    runtime.shutdown();
    assert!(runtime.context().packages().is_empty());
    assert_eq!(runtime.stats().subscriptions, 0);
}

#[test_log::test]
fn test_lifecycle_hooks_run_in_order() {
    struct Chatty {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Plugin for Chatty {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Chatty", VersionNumber::new(1, 0, 0))
        }

        fn hooks(&self) -> Vec<HookHandler> {
            [plugin::HOOK_INIT, plugin::HOOK_ON_LOADED, plugin::HOOK_LOADED, plugin::HOOK_UNLOAD]
                .into_iter()
                .map(|hook| {
                    let log = self.log.clone();
                    HookHandler::new(hook, 0, move |_| {
                        log.lock().unwrap().push(hook);
                        Ok(None)
                    })
                    .unwrap()
                })
                .collect()
        }

        fn on_init(&mut self, _context: &PluginContext) -> std::result::Result<(), PluginError> {
            self.log.lock().unwrap().push("on_init");
            Ok(())
        }

        fn on_load(&mut self, _context: &PluginContext) -> std::result::Result<(), PluginError> {
            self.log.lock().unwrap().push("on_load");
            Ok(())
        }

        fn on_unload(&mut self, _context: &PluginContext) -> std::result::Result<(), PluginError> {
            self.log.lock().unwrap().push("on_unload");
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = log.clone();
    runtime
        .load_package(ModPackage::new("tests").with_plugin(factory(
            "Chatty",
            VersionNumber::new(1, 0, 0),
            move || Chatty { log: shared.clone() },
        )))
        .unwrap();
    runtime.unload_plugin("Chatty").unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["Init", "on_init", "OnLoaded", "Loaded", "on_load", "Unload", "on_unload"]
    );
}

#[test_log::test]
fn test_config_file_is_created_and_applied_through_members() {
    struct Configurable {
        greeting: String,
        radius: f64,
        seen: Arc<Mutex<Option<(String, f64)>>>,
    }

    impl Plugin for Configurable {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Configurable", VersionNumber::new(1, 0, 0))
        }

        fn members(&mut self) -> MemberTable<'_> {
            MemberTable::new()
                .text("greeting", |s| self.greeting = s)
                .numeric("radius", |x| self.radius = x)
        }

        fn default_config(&self) -> Option<serde_json::Value> {
            Some(json!({ "greeting": "hello", "radius": 5.0 }))
        }

        fn on_init(&mut self, _context: &PluginContext) -> std::result::Result<(), PluginError> {
            *self.seen.lock().unwrap() = Some((self.greeting.clone(), self.radius));
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(None));
    let make = |seen: Arc<Mutex<Option<(String, f64)>>>| {
        factory("Configurable", VersionNumber::new(1, 0, 0), move || Configurable {
            greeting: String::new(),
            radius: 0.0,
            seen: seen.clone(),
        })
    };

    let mut first = runtime(&dir);
    first
        .load_package(ModPackage::new("tests").with_plugin(make(seen.clone())))
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(("hello".to_string(), 5.0)));
    let path = first.context().config_store().path_for("Configurable");
    assert!(path.is_file());

    std::fs::write(&path, r#"{ "greeting": "howdy", "radius": "not a number" }"#).unwrap();
    let mut second = runtime(&dir);
    second
        .load_package(ModPackage::new("tests").with_plugin(make(seen.clone())))
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(("howdy".to_string(), 0.0)));
}

#[test_log::test]
fn test_worker_results_come_back_through_tick_queue() {
    struct Background {
        context: Arc<Mutex<Option<PluginContext>>>,
    }

    impl Plugin for Background {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Background", VersionNumber::new(1, 0, 0))
        }

        fn on_load(&mut self, context: &PluginContext) -> std::result::Result<(), PluginError> {
            *self.context.lock().unwrap() = Some(context.clone());
            Ok(())
        }
    }

    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let slot = Arc::new(Mutex::new(None));
    let shared = slot.clone();
    runtime
        .load_package(ModPackage::new("tests").with_plugin(factory(
            "Background",
            VersionNumber::new(1, 0, 0),
            move || Background {
                context: shared.clone(),
            },
        )))
        .unwrap();

    let context = slot.lock().unwrap().clone().unwrap();
    assert_eq!(context.owner().name, "Background");

    let applied = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    context.queue_worker(|| panic!("first task fails"));
    let queue = context.tick_queue();
    let target = applied.clone();
    context.queue_worker(move || {
        let computed = 6 * 7;
        queue.next_tick(move || {
            target.store(computed, Ordering::SeqCst);
        });
        tx.send(()).unwrap();
    });

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(applied.load(Ordering::SeqCst), 0);
    assert_eq!(runtime.stats().queued_tick_tasks, 1);
    assert_eq!(runtime.tick(), 1);
    assert_eq!(applied.load(Ordering::SeqCst), 42);
}

#[test_log::test]
fn test_core_plugins_are_not_counted_as_running() {
    struct Core;

    impl Plugin for Core {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Core", VersionNumber::new(1, 0, 0))
        }

        fn is_core(&self) -> bool {
            true
        }
    }

    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    runtime
        .load_package(
            ModPackage::new("tests")
                .with_plugin(factory("Core", VersionNumber::new(1, 0, 0), || Core))
                .with_plugin(responder("Other", VersionNumber::new(1, 0, 0), "Ping", 1)),
        )
        .unwrap();

    let stats = runtime.stats();
    assert_eq!(stats.running_plugins, 1);
    assert_eq!(stats.registered_plugins, 2);
    assert_eq!(runtime.loaded_plugins(), vec!["Core", "Other"]);
}

#[test_log::test]
fn test_independent_runtimes_share_nothing() {
    let dir = TempDir::new().unwrap();
    let mut one = runtime(&dir);
    let two = runtime(&dir);

    one.load_package(ModPackage::new("tests").with_plugin(responder(
        "A",
        VersionNumber::new(1, 0, 0),
        "OnTest",
        1,
    )))
    .unwrap();

    assert_eq!(one.call_hook_as::<i64>("OnTest", &[]), Some(1));
    assert_eq!(two.call_hook("OnTest", &[]), CallOutcome::NoResult);
    assert_eq!(two.stats().registered_plugins, 0);
}

#[test_log::test]
fn test_panicking_dependent_does_not_stop_cascade() {
    struct Grumpy;

    impl Plugin for Grumpy {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("G", VersionNumber::new(1, 0, 0))
        }

        fn references(&self) -> Vec<ReferenceSpec> {
            vec![ReferenceSpec::named("P").required()]
        }

        fn on_unload(&mut self, _context: &PluginContext) -> std::result::Result<(), PluginError> {
            panic!("refusing to unload");
        }
    }

    impl Drop for Grumpy {
        fn drop(&mut self) {
            panic!("refusing to drop");
        }
    }

    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let (d2, _) = requirer("D2", "P", "");
    let package = ModPackage::new("tests")
        .with_plugin(responder("P", VersionNumber::new(1, 0, 0), "Ping", 1))
        .with_plugin(factory("G", VersionNumber::new(1, 0, 0), || Grumpy))
        .with_plugin(d2);

    runtime.load_package(package).unwrap();
    assert_eq!(runtime.loaded_plugins(), vec!["P", "G", "D2"]);

    runtime.unload_plugin("P").unwrap();

    for name in ["P", "G", "D2"] {
        assert_eq!(runtime.plugin_state(name), Some(PluginState::Disposed));
    }
    assert_eq!(
        runtime.context().resolver().pending().waiting_on("P"),
        vec!["G", "D2"]
    );
    assert_eq!(runtime.stats().subscriptions, 0);
}

#[test_log::test]
fn test_later_package_invalidates_outdated_optional_reference() {
    struct Optional;

    impl Plugin for Optional {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("O", VersionNumber::new(1, 0, 0))
        }

        fn references(&self) -> Vec<ReferenceSpec> {
            vec![ReferenceSpec::named("X").min_version("2.0.0")]
        }
    }

    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    runtime
        .load_package(
            ModPackage::new("a").with_plugin(factory("O", VersionNumber::new(1, 0, 0), || Optional)),
        )
        .unwrap();
    assert!(runtime.is_loaded("O"));

    let report = runtime
        .load_package(ModPackage::new("b").with_plugin(responder(
            "X",
            VersionNumber::new(1, 0, 0),
            "Ping",
            1,
        )))
        .unwrap();

    assert_eq!(report.loaded, vec!["X"]);
    assert_eq!(runtime.plugin_state("X"), Some(PluginState::Running));
    assert_eq!(runtime.plugin_state("O"), Some(PluginState::Disposed));
    assert_eq!(runtime.loaded_plugins(), vec!["X"]);
}

#[test_log::test]
fn test_failed_init_leaves_no_dependency_edges() {
    struct Brittle;

    impl Plugin for Brittle {
        fn info(&self) -> PluginInfo {
            PluginInfo::new("Brittle", VersionNumber::new(1, 0, 0))
        }

        fn references(&self) -> Vec<ReferenceSpec> {
            vec![ReferenceSpec::named("P").required()]
        }

        fn on_init(&mut self, _context: &PluginContext) -> std::result::Result<(), PluginError> {
            Err(PluginError::InitializationFailed("missing assets".to_string()))
        }
    }

    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let package = ModPackage::new("tests")
        .with_plugin(responder("P", VersionNumber::new(1, 0, 0), "Ping", 1))
        .with_plugin(factory("Brittle", VersionNumber::new(1, 0, 0), || Brittle));

    let report = runtime.load_package(package).unwrap();
    assert_eq!(report.failed, vec!["Brittle"]);
    assert_eq!(runtime.plugin_state("Brittle"), Some(PluginState::Failed));

    let graph = runtime.context().resolver().graph();
    assert!(graph.requirements_of("Brittle").is_empty());
    assert!(graph.dependents_of("P").is_empty());

    runtime.unload_plugin("P").unwrap();
    assert!(runtime.context().resolver().pending().is_empty());
}

#[test_log::test]
fn test_uninitialized_requirement_drops_its_waiters() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime(&dir);
    let (d1, _) = requirer("D1", "P", "");
    let package = ModPackage::new("tests")
        .with_plugin(responder("P", VersionNumber::new(1, 0, 0), "Ping", 1))
        .with_plugin(d1);

    runtime.load_package(package).unwrap();
    runtime.unload_plugin("P").unwrap();
    assert_eq!(runtime.context().resolver().pending().waiting_on("P"), vec!["D1"]);

    runtime.uninitialize_plugin("P").unwrap();

    let pending = runtime.context().resolver().pending();
    assert!(pending.waiting_on("P").is_empty());
    assert!(pending.blockers_of("D1").is_empty());
    assert!(pending.is_empty());
    assert_eq!(runtime.plugin_state("P"), None);
    assert_eq!(runtime.plugin_state("D1"), Some(PluginState::Disposed));
}
