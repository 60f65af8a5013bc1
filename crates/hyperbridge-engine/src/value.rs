//! Script-side values
//!
//! [`ScriptValue`] is what the scripting engine hands to, and receives
//! from, the bridge. Numbers arrive as `Int` or `Double` the way a dynamic
//! language would produce them; native `byte` and `char` have no script
//! counterpart and are widened to `Short` and single-character strings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BridgeResult;
use crate::proxy::{ClassHandle, InstanceHandle};

/// A script function the bridge can call back into
pub trait ScriptFunction: Send + Sync {
    /// Call with `receiver` as `this`
    fn call(&self, receiver: &ScriptValue, args: &[ScriptValue]) -> BridgeResult<ScriptValue>;
}

impl<F> ScriptFunction for F
where
    F: Fn(&ScriptValue, &[ScriptValue]) -> BridgeResult<ScriptValue> + Send + Sync,
{
    fn call(&self, receiver: &ScriptValue, args: &[ScriptValue]) -> BridgeResult<ScriptValue> {
        self(receiver, args)
    }
}

/// Typed script array produced from a native primitive array
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveArray {
    /// From `boolean[]`
    Boolean(Vec<bool>),
    /// From `byte[]` (widened) or `short[]`
    Short(Vec<i16>),
    /// From `int[]`
    Int(Vec<i32>),
    /// From `long[]`
    Long(Vec<i64>),
    /// From `float[]`
    Float(Vec<f32>),
    /// From `double[]`
    Double(Vec<f64>),
}

impl PrimitiveArray {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            PrimitiveArray::Boolean(v) => v.len(),
            PrimitiveArray::Short(v) => v.len(),
            PrimitiveArray::Int(v) => v.len(),
            PrimitiveArray::Long(v) => v.len(),
            PrimitiveArray::Float(v) => v.len(),
            PrimitiveArray::Double(v) => v.len(),
        }
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value on the script side of the bridge
#[derive(Clone)]
pub enum ScriptValue {
    /// `null` / `undefined`
    Null,
    /// Boolean
    Bool(bool),
    /// 16-bit integer (native `byte` and `short`)
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Single precision number
    Float(f32),
    /// Double precision number
    Double(f64),
    /// String
    String(String),
    /// Generic script array
    Array(Vec<ScriptValue>),
    /// Typed array
    PrimitiveArray(PrimitiveArray),
    /// Dictionary (ordered by key)
    Dict(BTreeMap<String, ScriptValue>),
    /// Callable script function
    Function(Arc<dyn ScriptFunction>),
    /// Handle around a native class
    Class(Arc<ClassHandle>),
    /// Handle around a native object
    Instance(Arc<InstanceHandle>),
}

impl ScriptValue {
    /// Build a string value
    pub fn string(s: impl Into<String>) -> Self {
        ScriptValue::String(s.into())
    }

    /// Build a dictionary from key/value pairs
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ScriptValue)>,
    {
        ScriptValue::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wrap a callable
    pub fn function<F>(function: F) -> Self
    where
        F: Fn(&ScriptValue, &[ScriptValue]) -> BridgeResult<ScriptValue> + Send + Sync + 'static,
    {
        ScriptValue::Function(Arc::new(function))
    }

    /// Whether this is null
    pub fn is_null(&self) -> bool {
        matches!(self, ScriptValue::Null)
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral payload
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScriptValue::Short(v) => Some(*v as i64),
            ScriptValue::Int(v) => Some(*v as i64),
            ScriptValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Float(v) => Some(*v as f64),
            ScriptValue::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Instance handle payload
    pub fn as_instance(&self) -> Option<&Arc<InstanceHandle>> {
        match self {
            ScriptValue::Instance(handle) => Some(handle),
            _ => None,
        }
    }

    /// Class handle payload
    pub fn as_class(&self) -> Option<&Arc<ClassHandle>> {
        match self {
            ScriptValue::Class(handle) => Some(handle),
            _ => None,
        }
    }

    /// Dictionary payload
    pub fn as_dict(&self) -> Option<&BTreeMap<String, ScriptValue>> {
        match self {
            ScriptValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Short type label for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Short(_) | ScriptValue::Int(_) | ScriptValue::Long(_) => "integer",
            ScriptValue::Float(_) | ScriptValue::Double(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Array(_) => "array",
            ScriptValue::PrimitiveArray(_) => "typed array",
            ScriptValue::Dict(_) => "dictionary",
            ScriptValue::Function(_) => "function",
            ScriptValue::Class(_) => "class proxy",
            ScriptValue::Instance(_) => "instance proxy",
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Short(a), ScriptValue::Short(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Long(a), ScriptValue::Long(b)) => a == b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a == b,
            (ScriptValue::Double(a), ScriptValue::Double(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => a == b,
            (ScriptValue::PrimitiveArray(a), ScriptValue::PrimitiveArray(b)) => a == b,
            (ScriptValue::Dict(a), ScriptValue::Dict(b)) => a == b,
            (ScriptValue::Function(a), ScriptValue::Function(b)) => Arc::ptr_eq(a, b),
            (ScriptValue::Class(a), ScriptValue::Class(b)) => Arc::ptr_eq(a, b),
            (ScriptValue::Instance(a), ScriptValue::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(v) => write!(f, "{}", v),
            ScriptValue::Short(v) => write!(f, "{}", v),
            ScriptValue::Int(v) => write!(f, "{}", v),
            ScriptValue::Long(v) => write!(f, "{}", v),
            ScriptValue::Float(v) => write!(f, "{}", v),
            ScriptValue::Double(v) => write!(f, "{}", v),
            ScriptValue::String(s) => write!(f, "{:?}", s),
            ScriptValue::Array(items) => f.debug_list().entries(items).finish(),
            ScriptValue::PrimitiveArray(array) => write!(f, "{:?}", array),
            ScriptValue::Dict(entries) => f.debug_map().entries(entries).finish(),
            ScriptValue::Function(_) => write!(f, "[function]"),
            ScriptValue::Class(handle) => write!(f, "[class {}]", handle.api_name()),
            ScriptValue::Instance(handle) => write!(f, "[instance {}]", handle.api_name()),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        ScriptValue::Int(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Double(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::String(v.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::String(v)
    }
}

impl From<Arc<InstanceHandle>> for ScriptValue {
    fn from(handle: Arc<InstanceHandle>) -> Self {
        ScriptValue::Instance(handle)
    }
}

impl From<Arc<ClassHandle>> for ScriptValue {
    fn from(handle: Arc<ClassHandle>) -> Self {
        ScriptValue::Class(handle)
    }
}
