//! Typed member binding
//!
//! A [`MemberTable`] maps configurable member names to a conversion strategy
//! and a setter. Plugins build one from `Plugin::members`, borrowing the
//! fields they expose, and the runtime feeds it raw configuration values.

use crate::error::ConfigError;
use compact_str::CompactString;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Separator between flag names in a bitmask string
const FLAG_SEPARATOR: char = '|';

/// Conversion strategy for a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// One of a fixed set of named variants
    Enum { variants: Vec<CompactString> },
    /// Combination of named single-bit flags, `flags[i]` being bit `i`
    Bitmask { flags: Vec<CompactString> },
    Numeric,
    Text,
    Flag,
}

/// A raw value converted for a member's kind
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    Enum(usize),
    Bitmask(u64),
    Numeric(f64),
    Text(String),
    Flag(bool),
}

impl MemberKind {
    /// Converts a raw configuration value
    pub fn convert(&self, raw: &Value) -> Result<MemberValue, String> {
        match self {
            MemberKind::Enum { variants } => convert_enum(variants, raw).map(MemberValue::Enum),
            MemberKind::Bitmask { flags } => convert_bitmask(flags, raw).map(MemberValue::Bitmask),
            MemberKind::Numeric => match raw {
                Value::Number(n) => n.as_f64().ok_or_else(|| format!("{} is not representable", n)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| format!("'{}' is not a number: {}", s, e)),
                other => Err(format!("expected a number, got {}", other)),
            }
            .map(MemberValue::Numeric),
            MemberKind::Text => match raw {
                Value::String(s) => Ok(s.clone()),
                Value::Number(_) | Value::Bool(_) => Ok(raw.to_string()),
                other => Err(format!("expected text, got {}", other)),
            }
            .map(MemberValue::Text),
            MemberKind::Flag => match raw {
                Value::Bool(b) => Ok(*b),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
                Value::Number(n) => Ok(n.as_f64().is_some_and(|x| x != 0.0)),
                other => Err(format!("expected a flag, got {}", other)),
            }
            .map(MemberValue::Flag),
        }
    }
}

fn convert_enum(variants: &[CompactString], raw: &Value) -> Result<usize, String> {
    match raw {
        Value::String(s) => variants
            .iter()
            .position(|v| v.eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("'{}' is not one of [{}]", s, variants.join(", "))),
        Value::Number(n) => n
            .as_u64()
            .map(|i| i as usize)
            .filter(|i| *i < variants.len())
            .ok_or_else(|| format!("index {} out of range for {} variants", n, variants.len())),
        other => Err(format!("expected a variant name, got {}", other)),
    }
}

fn convert_bitmask(flags: &[CompactString], raw: &Value) -> Result<u64, String> {
    match raw {
        Value::String(s) => {
            let mut mask = 0u64;
            for part in s.split(FLAG_SEPARATOR).map(str::trim).filter(|p| !p.is_empty()) {
                let bit = flags
                    .iter()
                    .position(|f| f.eq_ignore_ascii_case(part))
                    .ok_or_else(|| format!("unknown flag '{}'", part))?;
                mask |= 1u64
                    .checked_shl(bit as u32)
                    .ok_or_else(|| format!("flag '{}' does not fit in a 64-bit mask", part))?;
            }
            Ok(mask)
        }
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("{} is not a valid mask", n)),
        other => Err(format!("expected flag names or a mask, got {}", other)),
    }
}

type Setter<'a> = Box<dyn FnMut(MemberValue) + Send + 'a>;

struct Member<'a> {
    kind: MemberKind,
    setter: Setter<'a>,
}

/// Member name to typed setter table
#[derive(Default)]
pub struct MemberTable<'a> {
    members: HashMap<CompactString, Member<'a>>,
}

impl<'a> MemberTable<'a> {
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
        }
    }

    fn insert(mut self, name: &str, kind: MemberKind, setter: Setter<'a>) -> Self {
        self.members
            .insert(CompactString::new(name), Member { kind, setter });
        self
    }

    /// Member holding the index of one of `variants`
    pub fn enumeration<F>(self, name: &str, variants: &[&str], mut set: F) -> Self
    where
        F: FnMut(usize) + Send + 'a,
    {
        let kind = MemberKind::Enum {
            variants: variants.iter().map(|v| CompactString::new(v)).collect(),
        };
        self.insert(
            name,
            kind,
            Box::new(move |value| {
                if let MemberValue::Enum(index) = value {
                    set(index)
                }
            }),
        )
    }

    /// Member holding a combination of `flags`, bit `i` standing for `flags[i]`
    pub fn bitmask<F>(self, name: &str, flags: &[&str], mut set: F) -> Self
    where
        F: FnMut(u64) + Send + 'a,
    {
        let kind = MemberKind::Bitmask {
            flags: flags.iter().map(|f| CompactString::new(f)).collect(),
        };
        self.insert(
            name,
            kind,
            Box::new(move |value| {
                if let MemberValue::Bitmask(mask) = value {
                    set(mask)
                }
            }),
        )
    }

    pub fn numeric<F>(self, name: &str, mut set: F) -> Self
    where
        F: FnMut(f64) + Send + 'a,
    {
        self.insert(
            name,
            MemberKind::Numeric,
            Box::new(move |value| {
                if let MemberValue::Numeric(x) = value {
                    set(x)
                }
            }),
        )
    }

    pub fn text<F>(self, name: &str, mut set: F) -> Self
    where
        F: FnMut(String) + Send + 'a,
    {
        self.insert(
            name,
            MemberKind::Text,
            Box::new(move |value| {
                if let MemberValue::Text(s) = value {
                    set(s)
                }
            }),
        )
    }

    pub fn flag<F>(self, name: &str, mut set: F) -> Self
    where
        F: FnMut(bool) + Send + 'a,
    {
        self.insert(
            name,
            MemberKind::Flag,
            Box::new(move |value| {
                if let MemberValue::Flag(b) = value {
                    set(b)
                }
            }),
        )
    }

    pub fn kind_of(&self, name: &str) -> Option<&MemberKind> {
        self.members.get(name).map(|m| &m.kind)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Converts `raw` for member `name` and calls its setter
    pub fn set(&mut self, name: &str, raw: &Value) -> Result<(), ConfigError> {
        let member = self
            .members
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownMember(name.to_string()))?;
        let value = member.kind.convert(raw).map_err(|reason| ConfigError::Conversion {
            member: name.to_string(),
            reason,
        })?;
        (member.setter)(value);
        Ok(())
    }

    /// Applies every entry of `values`, skipping the ones that fail
    ///
    /// Returns the number of members set.
    pub fn apply(&mut self, values: &Map<String, Value>) -> usize {
        let mut applied = 0;
        for (name, raw) in values {
            match self.set(name, raw) {
                Ok(()) => applied += 1,
                Err(e) => warn!(member = %name, "⚠️ Skipping config member: {}", e),
            }
        }
        debug!("Applied {}/{} config members", applied, values.len());
        applied
    }
}

impl fmt::Debug for MemberTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.members.keys().collect();
        names.sort();
        f.debug_struct("MemberTable").field("members", &names).finish()
    }
}
