//! Hook argument and return values

use compact_str::CompactString;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A single positional argument or return value crossing the hook boundary
#[derive(Clone)]
pub enum HookValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(CompactString),
    Json(serde_json::Value),
    /// Host object handed through untouched (players, entities, ...)
    Opaque(Arc<dyn Any + Send + Sync>),
}

/// Ordered argument list for a hook call
///
/// Most hooks take a handful of arguments, so they stay inline.
pub type HookArgs = SmallVec<[HookValue; 4]>;

impl HookValue {
    pub fn is_null(&self) -> bool {
        matches!(self, HookValue::Null)
    }

    /// Name of the variant, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            HookValue::Null => "null",
            HookValue::Bool(_) => "bool",
            HookValue::Int(_) => "int",
            HookValue::Float(_) => "float",
            HookValue::Str(_) => "string",
            HookValue::Json(_) => "json",
            HookValue::Opaque(_) => "opaque",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HookValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HookValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HookValue::Float(f) => Some(*f),
            HookValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HookValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Downcasts an opaque host object
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            HookValue::Opaque(object) => object.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn opaque<T: Any + Send + Sync>(object: T) -> Self {
        HookValue::Opaque(Arc::new(object))
    }
}

impl fmt::Debug for HookValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookValue::Null => write!(f, "Null"),
            HookValue::Bool(b) => write!(f, "Bool({})", b),
            HookValue::Int(i) => write!(f, "Int({})", i),
            HookValue::Float(x) => write!(f, "Float({})", x),
            HookValue::Str(s) => write!(f, "Str({:?})", s),
            HookValue::Json(v) => write!(f, "Json({})", v),
            HookValue::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for HookValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HookValue::Null, HookValue::Null) => true,
            (HookValue::Bool(a), HookValue::Bool(b)) => a == b,
            (HookValue::Int(a), HookValue::Int(b)) => a == b,
            (HookValue::Float(a), HookValue::Float(b)) => a == b,
            (HookValue::Str(a), HookValue::Str(b)) => a == b,
            (HookValue::Json(a), HookValue::Json(b)) => a == b,
            (HookValue::Opaque(a), HookValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for HookValue {
    fn from(value: bool) -> Self {
        HookValue::Bool(value)
    }
}

impl From<i64> for HookValue {
    fn from(value: i64) -> Self {
        HookValue::Int(value)
    }
}

impl From<i32> for HookValue {
    fn from(value: i32) -> Self {
        HookValue::Int(value as i64)
    }
}

impl From<u32> for HookValue {
    fn from(value: u32) -> Self {
        HookValue::Int(value as i64)
    }
}

impl From<f64> for HookValue {
    fn from(value: f64) -> Self {
        HookValue::Float(value)
    }
}

impl From<&str> for HookValue {
    fn from(value: &str) -> Self {
        HookValue::Str(CompactString::new(value))
    }
}

impl From<String> for HookValue {
    fn from(value: String) -> Self {
        HookValue::Str(CompactString::from(value))
    }
}

impl From<CompactString> for HookValue {
    fn from(value: CompactString) -> Self {
        HookValue::Str(value)
    }
}

impl From<serde_json::Value> for HookValue {
    fn from(value: serde_json::Value) -> Self {
        HookValue::Json(value)
    }
}

impl<T: Into<HookValue>> From<Option<T>> for HookValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(HookValue::Null)
    }
}

/// Typed extraction; the rejected value is handed back on mismatch.
macro_rules! impl_try_from_hook_value {
    ($ty:ty, $variant:ident) => {
        impl TryFrom<HookValue> for $ty {
            type Error = HookValue;

            fn try_from(value: HookValue) -> Result<Self, Self::Error> {
                match value {
                    HookValue::$variant(inner) => Ok(inner.into()),
                    other => Err(other),
                }
            }
        }
    };
}

impl_try_from_hook_value!(bool, Bool);
impl_try_from_hook_value!(i64, Int);
impl_try_from_hook_value!(String, Str);
impl_try_from_hook_value!(CompactString, Str);
impl_try_from_hook_value!(serde_json::Value, Json);

/// Integers widen to floats, matching [`HookValue::as_float`].
impl TryFrom<HookValue> for f64 {
    type Error = HookValue;

    fn try_from(value: HookValue) -> Result<Self, Self::Error> {
        match value {
            HookValue::Float(f) => Ok(f),
            HookValue::Int(i) => Ok(i as f64),
            other => Err(other),
        }
    }
}

/// Result of a hook call
///
/// `NoResult` means no subscriber produced a value (or none ran at all).
/// It is distinct from `Returned(Bool(false))` or `Returned(Int(0))`.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    NoResult,
    Returned(HookValue),
}

impl CallOutcome {
    pub fn is_returned(&self) -> bool {
        matches!(self, CallOutcome::Returned(_))
    }

    pub fn value(&self) -> Option<&HookValue> {
        match self {
            CallOutcome::Returned(value) => Some(value),
            CallOutcome::NoResult => None,
        }
    }

    pub fn into_value(self) -> Option<HookValue> {
        match self {
            CallOutcome::Returned(value) => Some(value),
            CallOutcome::NoResult => None,
        }
    }

    /// Converts the returned value into `T`, discarding it on mismatch
    pub fn into_typed<T: TryFrom<HookValue>>(self) -> Option<T> {
        self.into_value().and_then(|value| T::try_from(value).ok())
    }
}

/// Builds a [`HookArgs`] list from anything convertible into [`HookValue`]
///
/// ```rust
/// use hook_runtime::hook_args;
///
/// let args = hook_args!["alice", 42, true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! hook_args {
    () => {
        $crate::value::HookArgs::new()
    };
    ($($arg:expr),+ $(,)?) => {{
        let mut args = $crate::value::HookArgs::new();
        $(args.push($crate::value::HookValue::from($arg));)+
        args
    }};
}
