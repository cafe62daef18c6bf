//! Hook name interning
//!
//! Hook dispatch is the hottest path in the runtime, so hook names are mapped
//! once to a [`HookHandle`] and everything downstream keys on the handle.
//! Handles are append-only and are never recycled for the lifetime of the
//! interner.

use compact_str::CompactString;
use dashmap::DashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Opaque, stable identifier for an interned hook name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookHandle(u32);

impl HookHandle {
    /// Raw index of this handle
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread-safe string-to-handle pool
///
/// Lookups of known names only touch the sharded map. First-time inserts
/// go through the map's entry lock, so exactly one handle is created per
/// distinct name even when several threads race on the same string.
pub struct HookInterner {
    handles: DashMap<CompactString, HookHandle>,
    names: RwLock<Vec<CompactString>>,
}

impl HookInterner {
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
            names: RwLock::new(Vec::new()),
        }
    }

    /// Returns the handle for `name`, creating it on first use
    pub fn intern(&self, name: &str) -> HookHandle {
        if let Some(handle) = self.handles.get(name) {
            return *handle;
        }

        *self
            .handles
            .entry(CompactString::new(name))
            .or_insert_with(|| {
                // `names` is only ever locked inside a map entry, never the other way round.
                let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
                let handle = HookHandle(names.len() as u32);
                names.push(CompactString::new(name));
                handle
            })
    }

    /// Returns the handle for `name` without creating one
    pub fn lookup(&self, name: &str) -> Option<HookHandle> {
        self.handles.get(name).map(|handle| *handle)
    }

    /// Returns the name a handle was created from
    pub fn name_of(&self, handle: HookHandle) -> Option<CompactString> {
        let names = self.names.read().unwrap_or_else(PoisonError::into_inner);
        names.get(handle.0 as usize).cloned()
    }

    /// Number of distinct names interned so far
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Default for HookInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookInterner")
            .field("interned", &self.handles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_same_name_yields_same_handle() {
        let interner = HookInterner::new();
        let first = interner.intern("OnPlayerConnected");
        let second = interner.intern("OnPlayerConnected");
        assert_eq!(first, second);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_distinct_names_never_collide() {
        let interner = HookInterner::new();
        let names = ["Init", "Loaded", "OnTick", "init", "Loaded "];
        let handles: HashSet<_> = names.iter().map(|name| interner.intern(name)).collect();
        assert_eq!(handles.len(), names.len());
        for name in names {
            let handle = interner.lookup(name).unwrap();
            assert_eq!(interner.name_of(handle).unwrap(), name);
        }
    }

    #[test]
    fn test_lookup_does_not_insert() {
        let interner = HookInterner::new();
        assert!(interner.lookup("Missing").is_none());
        assert!(interner.is_empty());
    }

    #[test]
    fn test_concurrent_first_inserts_create_one_handle_per_name() {
        let interner = Arc::new(HookInterner::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let interner = interner.clone();
                std::thread::spawn(move || {
                    (0..64)
                        .map(|i| interner.intern(&format!("hook_{}", i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<HookHandle>> =
            threads.into_iter().map(|t| t.join().unwrap()).collect();

        for other in &results[1..] {
            assert_eq!(&results[0], other);
        }
        assert_eq!(interner.len(), 64);
        let unique: HashSet<_> = results[0].iter().copied().collect();
        assert_eq!(unique.len(), 64);
        // Handles index straight into the name table.
        for handle in unique {
            assert!(interner.name_of(handle).is_some());
        }
    }
}
