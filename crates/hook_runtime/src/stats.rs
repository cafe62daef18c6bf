//! Statistics tracking for the hook runtime

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live dispatch counters, updated without locking
#[derive(Debug, Default)]
pub struct DispatchStats {
    calls: AtomicU64,
    handler_invocations: AtomicU64,
    handler_failures: AtomicU64,
    short_circuits: AtomicU64,
}

impl DispatchStats {
    pub(crate) fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invocation(&self) {
        self.handler_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_short_circuit(&self) {
        self.short_circuits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStatsSnapshot {
    /// Hook calls that reached at least one subscriber
    pub calls: u64,
    /// Individual handler invocations
    pub handler_invocations: u64,
    /// Handlers that returned an error or panicked
    pub handler_failures: u64,
    /// Calls that returned early with a handler result
    pub short_circuits: u64,
}

/// Runtime-wide statistics for monitoring
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RuntimeStats {
    /// Plugins currently running
    pub running_plugins: usize,
    /// Plugins registered across all packages, in any state
    pub registered_plugins: usize,
    /// Distinct hook names interned
    pub interned_hooks: usize,
    /// Active subscriptions
    pub subscriptions: usize,
    /// Dependents waiting for a plugin to come back
    pub pending_requirees: usize,
    /// Tasks waiting for the next tick
    pub queued_tick_tasks: usize,
    /// Dispatch counters
    pub dispatch: DispatchStatsSnapshot,
}
