//! Hook subscriber registry

use crate::error::HookError;
use crate::interner::HookHandle;
use crate::value::HookValue;
use compact_str::CompactString;
use dashmap::DashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Maximum number of declared parameters a handler may take
pub const MAX_HOOK_ARITY: usize = 13;

/// Identity of the plugin that owns a subscription
pub type RequesterId = CompactString;

type HandlerFn = dyn Fn(&[HookValue]) -> Result<Option<HookValue>, HookError> + Send + Sync;

/// A callable hook target with a declared parameter count
///
/// Returning `Ok(None)` (or `Ok(Some(HookValue::Null))`) means "no result";
/// the dispatcher moves on to the next subscriber.
#[derive(Clone)]
pub struct HookHandler {
    hook: CompactString,
    name: CompactString,
    arity: usize,
    func: Arc<HandlerFn>,
}

impl HookHandler {
    /// Creates a handler for `hook` that receives exactly `arity` arguments
    pub fn new<F>(hook: &str, arity: usize, func: F) -> Result<Self, HookError>
    where
        F: Fn(&[HookValue]) -> Result<Option<HookValue>, HookError> + Send + Sync + 'static,
    {
        Self::named(hook, hook, arity, func)
    }

    /// Creates a handler with an explicit target name
    ///
    /// The target name distinguishes several handlers one plugin registers
    /// for the same hook.
    pub fn named<F>(hook: &str, name: &str, arity: usize, func: F) -> Result<Self, HookError>
    where
        F: Fn(&[HookValue]) -> Result<Option<HookValue>, HookError> + Send + Sync + 'static,
    {
        if arity > MAX_HOOK_ARITY {
            return Err(HookError::ArityTooLarge {
                handler: name.to_string(),
                arity,
                max: MAX_HOOK_ARITY,
            });
        }

        Ok(Self {
            hook: CompactString::new(hook),
            name: CompactString::new(name),
            arity,
            func: Arc::new(func),
        })
    }

    /// Hook name this handler responds to
    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// Target name, unique per requester and hook
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn call(&self, args: &[HookValue]) -> Result<Option<HookValue>, HookError> {
        (self.func)(args)
    }
}

impl fmt::Debug for HookHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookHandler")
            .field("hook", &self.hook)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// A handler registered against a hook handle by a requester
#[derive(Debug, Clone)]
pub struct Subscription {
    pub requester: RequesterId,
    pub handler: HookHandler,
}

/// Subscriber snapshot handed to the dispatcher
pub type Subscribers = SmallVec<[Subscription; 4]>;

/// Per-handle, insertion-ordered subscriber lists
///
/// Registry operations never fail; unknown handles simply have no
/// subscribers.
#[derive(Default)]
pub struct HookRegistry {
    subscriptions: DashMap<HookHandle, Subscribers>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `handle` on behalf of `requester`
    ///
    /// Subscribing the same `(handle, requester, target name)` again is a no-op.
    /// Returns whether a new subscription was added.
    pub fn subscribe(&self, handle: HookHandle, requester: &str, handler: HookHandler) -> bool {
        let mut entry = self.subscriptions.entry(handle).or_default();
        let exists = entry
            .iter()
            .any(|s| s.requester == requester && s.handler.name == handler.name);
        if exists {
            return false;
        }

        trace!(hook = %handler.hook, requester, "📝 Subscribed handler {}", handler.name);
        entry.push(Subscription {
            requester: CompactString::new(requester),
            handler,
        });
        true
    }

    /// Removes every target `requester` registered for `handle`
    ///
    /// Returns the number of subscriptions removed.
    pub fn unsubscribe(&self, handle: HookHandle, requester: &str) -> usize {
        let mut removed = 0;
        if let Some(mut entry) = self.subscriptions.get_mut(&handle) {
            let before = entry.len();
            entry.retain(|s| s.requester != requester);
            removed = before - entry.len();
        }
        self.subscriptions
            .remove_if(&handle, |_, subscribers| subscribers.is_empty());
        removed
    }

    /// Snapshot of the subscribers for `handle`, in insertion order
    pub fn subscribers(&self, handle: HookHandle) -> Subscribers {
        self.subscriptions
            .get(&handle)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Snapshot of the subscribers `requester` owns for `handle`
    pub fn subscribers_of(&self, handle: HookHandle, requester: &str) -> Subscribers {
        self.subscriptions
            .get(&handle)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|s| s.requester == requester)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, handle: HookHandle, requester: &str) -> bool {
        self.subscriptions
            .get(&handle)
            .is_some_and(|entry| entry.iter().any(|s| s.requester == requester))
    }

    /// Total subscriptions across all hooks
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.iter().map(|entry| entry.len()).sum()
    }

    /// Handles with at least one subscriber
    pub fn active_hooks(&self) -> Vec<HookHandle> {
        let mut handles: Vec<_> = self.subscriptions.iter().map(|entry| *entry.key()).collect();
        handles.sort();
        handles
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.subscriptions.len())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
