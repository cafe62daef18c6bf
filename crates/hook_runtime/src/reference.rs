//! Declared references between plugins

use crate::dispatch::Dispatcher;
use crate::plugin::Plugin;
use crate::value::{CallOutcome, HookValue};
use crate::version::VersionNumber;
use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;

/// How a reference names its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Resolve by plugin name
    Name(CompactString),
    /// Resolve by the plugin's concrete type
    Type(&'static str),
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceTarget::Name(name) => write!(f, "{}", name),
            ReferenceTarget::Type(type_name) => write!(f, "{}", type_name),
        }
    }
}

/// A reference a plugin declares to another plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpec {
    /// Field the resolved reference is bound to
    pub field: CompactString,
    pub target: ReferenceTarget,
    /// Minimum acceptable version of the target, if any
    pub min_version: Option<VersionNumber>,
    /// Whether the plugin may run without the target
    pub required: bool,
}

impl ReferenceSpec {
    /// Optional reference resolved by plugin name; the field is named after the target
    pub fn named(name: &str) -> Self {
        Self {
            field: CompactString::new(name),
            target: ReferenceTarget::Name(CompactString::new(name)),
            min_version: None,
            required: false,
        }
    }

    /// Optional reference resolved by the target's plugin type
    pub fn typed<T: Plugin>(field: &str) -> Self {
        Self {
            field: CompactString::new(field),
            target: ReferenceTarget::Type(std::any::type_name::<T>()),
            min_version: None,
            required: false,
        }
    }

    /// Binds the resolved target to `field` instead of the default
    pub fn field(mut self, field: &str) -> Self {
        self.field = CompactString::new(field);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the minimum version; unset or all-zero constraints are ignored
    pub fn min_version(mut self, constraint: &str) -> Self {
        self.min_version = VersionNumber::parse_constraint(constraint);
        self
    }
}

/// Handle to a resolved plugin
///
/// Refers to the target by name, never by instance: once the target is
/// unloaded its handlers are gone and calls return [`CallOutcome::NoResult`].
#[derive(Clone)]
pub struct PluginRef {
    name: CompactString,
    version: VersionNumber,
    dispatcher: Arc<Dispatcher>,
}

impl PluginRef {
    pub(crate) fn new(name: CompactString, version: VersionNumber, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            name,
            version,
            dispatcher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version the target had when the reference was resolved
    pub fn version(&self) -> VersionNumber {
        self.version
    }

    /// Calls one of the target's own handlers
    pub fn call(&self, hook: &str, args: &[HookValue]) -> CallOutcome {
        self.dispatcher.call_plugin(&self.name, hook, args)
    }

    pub fn call_as<T: TryFrom<HookValue>>(&self, hook: &str, args: &[HookValue]) -> Option<T> {
        self.call(hook, args).into_typed()
    }
}

impl fmt::Debug for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRef")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

impl PartialEq for PluginRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_constraint_and_flag() {
        let spec = ReferenceSpec::named("Economics").required().min_version("1.1");
        assert_eq!(spec.field, "Economics");
        assert!(spec.required);
        assert_eq!(spec.min_version, Some(VersionNumber::new(1, 1, 0)));
        assert_eq!(spec.target.to_string(), "Economics");
    }

    #[test]
    fn test_unset_constraints_are_dropped() {
        assert_eq!(ReferenceSpec::named("A").min_version("0.0.0").min_version, None);
        assert_eq!(ReferenceSpec::named("A").min_version("garbage").min_version, None);
        assert_eq!(ReferenceSpec::named("A").field("economy").field, "economy");
    }
}
