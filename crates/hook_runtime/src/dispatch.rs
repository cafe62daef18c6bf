//! Hook dispatch
//!
//! The [`Dispatcher`] runs every subscriber of a hook on the calling thread,
//! in registry order. Each handler sees the arguments adapted to its own
//! declared arity. A failing or panicking handler is logged and skipped; the
//! first handler that returns a non-null value wins and the remaining
//! handlers are not invoked.

use crate::interner::{HookHandle, HookInterner};
use crate::registry::{HookHandler, HookRegistry, Subscription};
use crate::stats::{DispatchStats, DispatchStatsSnapshot};
use crate::utils::catch_panic;
use crate::value::{CallOutcome, HookValue};
use crate::error::HookError;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Synchronous hook dispatcher shared by the runtime and its plugins
pub struct Dispatcher {
    interner: Arc<HookInterner>,
    registry: Arc<HookRegistry>,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(interner: Arc<HookInterner>, registry: Arc<HookRegistry>) -> Self {
        Self {
            interner,
            registry,
            stats: DispatchStats::default(),
        }
    }

    pub fn interner(&self) -> &Arc<HookInterner> {
        &self.interner
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Interns a hook name
    pub fn handle(&self, hook: &str) -> HookHandle {
        self.interner.intern(hook)
    }

    /// Invokes every subscriber of `handle` until one returns a value
    pub fn invoke(&self, handle: HookHandle, args: &[HookValue]) -> CallOutcome {
        let subscribers = self.registry.subscribers(handle);
        self.run(handle, &subscribers, args)
    }

    /// Like [`invoke`](Self::invoke), converting the winning value into `T`
    ///
    /// A returned value of the wrong type yields `None`.
    pub fn invoke_as<T: TryFrom<HookValue>>(&self, handle: HookHandle, args: &[HookValue]) -> Option<T> {
        self.invoke(handle, args).into_typed()
    }

    /// Invokes only the subscribers owned by `requester`
    pub fn invoke_for(&self, handle: HookHandle, requester: &str, args: &[HookValue]) -> CallOutcome {
        let subscribers = self.registry.subscribers_of(handle, requester);
        self.run(handle, &subscribers, args)
    }

    /// Calls a hook by name on every subscriber
    pub fn call_hook(&self, hook: &str, args: &[HookValue]) -> CallOutcome {
        self.invoke(self.interner.intern(hook), args)
    }

    /// Calls a hook by name, returning the first result converted to `T`
    pub fn call_hook_as<T: TryFrom<HookValue>>(&self, hook: &str, args: &[HookValue]) -> Option<T> {
        self.call_hook(hook, args).into_typed()
    }

    /// Calls a hook by name on a single plugin's own handlers
    pub fn call_plugin(&self, plugin: &str, hook: &str, args: &[HookValue]) -> CallOutcome {
        self.invoke_for(self.interner.intern(hook), plugin, args)
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    fn run(&self, handle: HookHandle, subscribers: &[Subscription], args: &[HookValue]) -> CallOutcome {
        if subscribers.is_empty() {
            return CallOutcome::NoResult;
        }
        self.stats.record_call();

        for subscription in subscribers {
            self.stats.record_invocation();
            match invoke_isolated(&subscription.handler, args) {
                Ok(Some(value)) if !value.is_null() => {
                    self.stats.record_short_circuit();
                    return CallOutcome::Returned(value);
                }
                Ok(_) => {}
                Err(e) => {
                    self.stats.record_failure();
                    let hook = self
                        .interner
                        .name_of(handle)
                        .unwrap_or_else(|| handle.to_string().into());
                    error!(
                        hook = %hook,
                        requester = %subscription.requester,
                        "❌ Failed to call hook '{}' on '{}': {}",
                        hook,
                        subscription.requester,
                        e
                    );
                }
            }
        }

        CallOutcome::NoResult
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("interner", &self.interner)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Runs one handler with its arity-adapted arguments, converting panics
pub(crate) fn invoke_isolated(
    handler: &HookHandler,
    args: &[HookValue],
) -> Result<Option<HookValue>, HookError> {
    let adapted = adapt_args(args, handler.arity());
    match catch_panic(|| handler.call(&adapted)) {
        Ok(result) => result,
        Err(message) => Err(HookError::Panicked {
            handler: handler.name().to_string(),
            message,
        }),
    }
}

/// Pads missing trailing arguments with `Null` and drops extra ones
fn adapt_args(args: &[HookValue], arity: usize) -> Cow<'_, [HookValue]> {
    if args.len() >= arity {
        return Cow::Borrowed(&args[..arity]);
    }
    let mut padded = args.to_vec();
    padded.resize(arity, HookValue::Null);
    Cow::Owned(padded)
}
