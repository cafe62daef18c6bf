//! Reference resolution and the plugin dependency graph
//!
//! Edges and pending records name plugins by their stable name, so they stay
//! valid across reloads even though each reload creates a new instance.

use crate::dispatch::Dispatcher;
use crate::error::ResolutionError;
use crate::plugin::Plugin;
use crate::reference::{PluginRef, ReferenceTarget};
use crate::version::VersionNumber;
use compact_str::CompactString;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Directed `required -> dependent` edges
#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependents: HashMap<CompactString, Vec<CompactString>>,
    requirements: HashMap<CompactString, Vec<CompactString>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `dependent` requires `required`; repeated edges are ignored
    pub fn add_edge(&mut self, required: &str, dependent: &str) {
        let dependents = self.dependents.entry(CompactString::new(required)).or_default();
        if dependents.iter().any(|d| *d == dependent) {
            return;
        }
        dependents.push(CompactString::new(dependent));
        self.requirements
            .entry(CompactString::new(dependent))
            .or_default()
            .push(CompactString::new(required));
    }

    /// Plugins requiring `required`, in the order their edges were created
    pub fn dependents_of(&self, required: &str) -> Vec<CompactString> {
        self.dependents.get(required).cloned().unwrap_or_default()
    }

    /// Plugins `dependent` requires
    pub fn requirements_of(&self, dependent: &str) -> Vec<CompactString> {
        self.requirements.get(dependent).cloned().unwrap_or_default()
    }

    /// Removes every edge where `dependent` is the dependent
    pub fn clear_requirements(&mut self, dependent: &str) {
        let Some(required) = self.requirements.remove(dependent) else {
            return;
        };
        for name in required {
            if let Some(dependents) = self.dependents.get_mut(&name) {
                dependents.retain(|d| *d != dependent);
                if dependents.is_empty() {
                    self.dependents.remove(&name);
                }
            }
        }
    }

    /// Removes every edge touching `plugin`
    pub fn remove_plugin(&mut self, plugin: &str) {
        self.clear_requirements(plugin);
        if let Some(dependents) = self.dependents.remove(plugin) {
            for dependent in dependents {
                if let Some(required) = self.requirements.get_mut(&dependent) {
                    required.retain(|r| *r != plugin);
                    if required.is_empty() {
                        self.requirements.remove(&dependent);
                    }
                }
            }
        }
    }

    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(Vec::len).sum()
    }
}

/// Dependents waiting for a blocker to (re)load
///
/// Indexed both by blocker and by waiter so either side can be cleared
/// without scanning.
#[derive(Debug, Default)]
pub struct PendingRequirees {
    by_blocker: HashMap<CompactString, Vec<CompactString>>,
    by_waiter: HashMap<CompactString, Vec<CompactString>>,
}

impl PendingRequirees {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `waiter` should be reloaded once `blocker` loads
    pub fn add(&mut self, blocker: &str, waiter: &str) {
        let waiters = self.by_blocker.entry(CompactString::new(blocker)).or_default();
        if waiters.iter().any(|w| *w == waiter) {
            return;
        }
        waiters.push(CompactString::new(waiter));
        self.by_waiter
            .entry(CompactString::new(waiter))
            .or_default()
            .push(CompactString::new(blocker));
    }

    /// Removes and returns everything waiting on `blocker`, in record order
    pub fn take_for_blocker(&mut self, blocker: &str) -> Vec<CompactString> {
        let waiters = self.by_blocker.remove(blocker).unwrap_or_default();
        for waiter in &waiters {
            if let Some(blockers) = self.by_waiter.get_mut(waiter) {
                blockers.retain(|b| *b != blocker);
                if blockers.is_empty() {
                    self.by_waiter.remove(waiter);
                }
            }
        }
        waiters
    }

    /// Drops every record for `waiter`
    pub fn remove_waiter(&mut self, waiter: &str) {
        let Some(blockers) = self.by_waiter.remove(waiter) else {
            return;
        };
        for blocker in blockers {
            if let Some(waiters) = self.by_blocker.get_mut(&blocker) {
                waiters.retain(|w| *w != waiter);
                if waiters.is_empty() {
                    self.by_blocker.remove(&blocker);
                }
            }
        }
    }

    pub fn waiting_on(&self, blocker: &str) -> Vec<CompactString> {
        self.by_blocker.get(blocker).cloned().unwrap_or_default()
    }

    pub fn blockers_of(&self, waiter: &str) -> Vec<CompactString> {
        self.by_waiter.get(waiter).cloned().unwrap_or_default()
    }

    /// Number of `(blocker, waiter)` records
    pub fn len(&self) -> usize {
        self.by_blocker.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_blocker.is_empty()
    }
}

/// Snapshot of what references can resolve against
#[derive(Debug, Default)]
pub struct PluginDirectory {
    running: HashMap<CompactString, VersionNumber>,
    types: HashMap<&'static str, CompactString>,
}

impl PluginDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin type so typed references can find it by name
    pub fn register_type(&mut self, type_name: &'static str, plugin: &str) {
        self.types.insert(type_name, CompactString::new(plugin));
    }

    /// Marks a plugin as available to resolve against
    pub fn mark_running(&mut self, plugin: &str, version: VersionNumber) {
        self.running.insert(CompactString::new(plugin), version);
    }

    /// Name a reference target resolves to; unknown types map to their type name
    pub fn target_name(&self, target: &ReferenceTarget) -> CompactString {
        match target {
            ReferenceTarget::Name(name) => name.clone(),
            ReferenceTarget::Type(type_name) => self
                .types
                .get(type_name)
                .cloned()
                .unwrap_or_else(|| CompactString::new(type_name)),
        }
    }

    pub fn running_version(&self, plugin: &str) -> Option<VersionNumber> {
        self.running.get(plugin).copied()
    }
}

/// Owns the dependency graph and pending records and resolves plugin references
#[derive(Debug)]
pub struct DependencyResolver {
    graph: DependencyGraph,
    pending: PendingRequirees,
    strict: bool,
}

impl DependencyResolver {
    /// `strict` makes version mismatches on optional references fatal too
    pub fn new(strict: bool) -> Self {
        Self {
            graph: DependencyGraph::new(),
            pending: PendingRequirees::new(),
            strict,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut DependencyGraph {
        &mut self.graph
    }

    pub fn pending(&self) -> &PendingRequirees {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingRequirees {
        &mut self.pending
    }

    /// Resolves every reference `plugin` declares
    ///
    /// Nothing is bound unless every reference resolves. A missing required
    /// target records `plugin` as waiting on it. On success the plugin's
    /// dependency edges are replaced with the freshly resolved ones and it
    /// stops waiting on anything. Returns the number of bound references.
    pub fn resolve(
        &mut self,
        owner: &str,
        plugin: &mut dyn Plugin,
        directory: &PluginDirectory,
        dispatcher: &Arc<Dispatcher>,
    ) -> Result<usize, ResolutionError> {
        let mut bindings = Vec::new();
        let mut required = Vec::new();

        for spec in plugin.references() {
            let target = directory.target_name(&spec.target);

            let Some(found) = directory.running_version(&target) else {
                if spec.required {
                    self.pending.add(&target, owner);
                    let err = ResolutionError::MissingRequired {
                        plugin: owner.to_string(),
                        reference: target.to_string(),
                    };
                    warn!(plugin = owner, "⚠️ {}", err);
                    return Err(err);
                }
                debug!(plugin = owner, "Optional reference '{}' is not loaded", target);
                bindings.push((spec.field, None));
                continue;
            };

            if let Some(min) = spec.min_version.filter(VersionNumber::is_valid) {
                if !found.satisfies(&min) {
                    let err = ResolutionError::VersionMismatch {
                        plugin: owner.to_string(),
                        reference: target.to_string(),
                        found,
                        required: min,
                    };
                    warn!(plugin = owner, "⚠️ {}", err);
                    if spec.required || self.strict {
                        return Err(err);
                    }
                    bindings.push((spec.field, None));
                    continue;
                }
            }

            if spec.required {
                required.push(target.clone());
            }
            bindings.push((
                spec.field,
                Some(PluginRef::new(target, found, dispatcher.clone())),
            ));
        }

        let bound = bindings.iter().filter(|(_, r)| r.is_some()).count();
        for (field, reference) in bindings {
            plugin.bind_reference(&field, reference);
        }

        self.graph.clear_requirements(owner);
        for target in &required {
            self.graph.add_edge(target, owner);
        }
        self.pending.remove_waiter(owner);

        debug!(plugin = owner, "Assigned {} plugin references", bound);
        Ok(bound)
    }
}
