//! Native values and heap objects
//!
//! [`NativeValue`] is what flows across the host side of the bridge:
//! primitives are carried unboxed, strings are immutable shared text and
//! everything else is an [`ObjectRef`]. Boxed primitives are never
//! allocated; a primitive value reports its boxed class as its runtime
//! type instead (see `TypeRegistry::runtime_type`).

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::handler::InvocationHandler;
use crate::ty::{PrimitiveKind, TypeId};

/// Shared reference to a native heap object
pub type ObjectRef = Arc<NativeObject>;

/// A value on the native side of the bridge
#[derive(Clone)]
pub enum NativeValue {
    /// Null reference
    Null,
    /// Result of a `void` method
    Void,
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `char` (UTF-16 code unit)
    Char(u16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Immutable string
    String(Arc<str>),
    /// Object or array reference
    Object(ObjectRef),
}

impl NativeValue {
    /// Build a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        NativeValue::String(Arc::from(s.as_ref()))
    }

    /// Whether this is the null reference
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Primitive kind carried by this value, if it is a primitive
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            NativeValue::Boolean(_) => Some(PrimitiveKind::Boolean),
            NativeValue::Byte(_) => Some(PrimitiveKind::Byte),
            NativeValue::Short(_) => Some(PrimitiveKind::Short),
            NativeValue::Char(_) => Some(PrimitiveKind::Char),
            NativeValue::Int(_) => Some(PrimitiveKind::Int),
            NativeValue::Long(_) => Some(PrimitiveKind::Long),
            NativeValue::Float(_) => Some(PrimitiveKind::Float),
            NativeValue::Double(_) => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Integral payload of byte/short/int/long values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Byte(v) => Some(*v as i64),
            NativeValue::Short(v) => Some(*v as i64),
            NativeValue::Int(v) => Some(*v as i64),
            NativeValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload of any numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Float(v) => Some(*v as f64),
            NativeValue::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            NativeValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeValue::Null, NativeValue::Null) => true,
            (NativeValue::Void, NativeValue::Void) => true,
            (NativeValue::Boolean(a), NativeValue::Boolean(b)) => a == b,
            (NativeValue::Byte(a), NativeValue::Byte(b)) => a == b,
            (NativeValue::Short(a), NativeValue::Short(b)) => a == b,
            (NativeValue::Char(a), NativeValue::Char(b)) => a == b,
            (NativeValue::Int(a), NativeValue::Int(b)) => a == b,
            (NativeValue::Long(a), NativeValue::Long(b)) => a == b,
            (NativeValue::Float(a), NativeValue::Float(b)) => a == b,
            (NativeValue::Double(a), NativeValue::Double(b)) => a == b,
            (NativeValue::String(a), NativeValue::String(b)) => a == b,
            (NativeValue::Object(a), NativeValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => write!(f, "null"),
            NativeValue::Void => write!(f, "void"),
            NativeValue::Boolean(v) => write!(f, "{}", v),
            NativeValue::Byte(v) => write!(f, "{}b", v),
            NativeValue::Short(v) => write!(f, "{}s", v),
            NativeValue::Char(v) => write!(f, "'\\u{{{:04x}}}'", v),
            NativeValue::Int(v) => write!(f, "{}", v),
            NativeValue::Long(v) => write!(f, "{}L", v),
            NativeValue::Float(v) => write!(f, "{}f", v),
            NativeValue::Double(v) => write!(f, "{}d", v),
            NativeValue::String(s) => write!(f, "{:?}", s),
            NativeValue::Object(o) => write!(f, "{:?}", o),
        }
    }
}

/// Storage behind a native object
enum ObjectStorage {
    /// Instance fields by name
    Fields(RwLock<FxHashMap<String, NativeValue>>),
    /// Array elements
    Array(RwLock<Vec<NativeValue>>),
}

/// A native heap object: a class instance or an array
pub struct NativeObject {
    class: TypeId,
    storage: ObjectStorage,
    handler: OnceCell<Arc<dyn InvocationHandler>>,
}

impl NativeObject {
    pub(crate) fn with_fields(class: TypeId, fields: FxHashMap<String, NativeValue>) -> Self {
        Self {
            class,
            storage: ObjectStorage::Fields(RwLock::new(fields)),
            handler: OnceCell::new(),
        }
    }

    pub(crate) fn with_elements(class: TypeId, elements: Vec<NativeValue>) -> Self {
        Self {
            class,
            storage: ObjectStorage::Array(RwLock::new(elements)),
            handler: OnceCell::new(),
        }
    }

    /// Runtime class of the object
    pub fn class(&self) -> TypeId {
        self.class
    }

    /// Address-based identity, stable for the object's lifetime
    pub fn identity(&self) -> usize {
        self as *const NativeObject as usize
    }

    /// Identity hash in the `int` range
    pub fn identity_hash(&self) -> i32 {
        identity_hash(self.identity())
    }

    /// Whether this object is an array
    pub fn is_array(&self) -> bool {
        matches!(self.storage, ObjectStorage::Array(_))
    }

    /// Read an instance field
    pub fn get_field(&self, name: &str) -> Option<NativeValue> {
        match &self.storage {
            ObjectStorage::Fields(fields) => fields.read().get(name).cloned(),
            ObjectStorage::Array(_) => None,
        }
    }

    /// Write an instance field; returns false if the object has no such field
    pub fn set_field(&self, name: &str, value: NativeValue) -> bool {
        match &self.storage {
            ObjectStorage::Fields(fields) => match fields.write().get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            ObjectStorage::Array(_) => false,
        }
    }

    /// Array length (0 for non-arrays)
    pub fn array_len(&self) -> usize {
        match &self.storage {
            ObjectStorage::Array(elements) => elements.read().len(),
            ObjectStorage::Fields(_) => 0,
        }
    }

    /// Snapshot of the array elements (empty for non-arrays)
    pub fn array_elements(&self) -> Vec<NativeValue> {
        match &self.storage {
            ObjectStorage::Array(elements) => elements.read().clone(),
            ObjectStorage::Fields(_) => Vec::new(),
        }
    }

    /// Read one array element
    pub fn array_get(&self, index: usize) -> Option<NativeValue> {
        match &self.storage {
            ObjectStorage::Array(elements) => elements.read().get(index).cloned(),
            ObjectStorage::Fields(_) => None,
        }
    }

    /// Invocation handler attached at construction, if any
    pub fn handler(&self) -> Option<&Arc<dyn InvocationHandler>> {
        self.handler.get()
    }

    pub(crate) fn attach_handler(&self, handler: Arc<dyn InvocationHandler>) -> bool {
        self.handler.set(handler).is_ok()
    }

    pub(crate) fn array_set(&self, index: usize, value: NativeValue) -> bool {
        match &self.storage {
            ObjectStorage::Array(elements) => match elements.write().get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            ObjectStorage::Fields(_) => false,
        }
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeObject({}@{:x})", self.class, self.identity_hash())
    }
}

/// Fold an address into the `int` range
pub fn identity_hash(address: usize) -> i32 {
    let folded = (address as u64) ^ ((address as u64) >> 32);
    (folded as u32 >> 3) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(NativeValue::Int(3), NativeValue::Int(3));
        assert_ne!(NativeValue::Int(3), NativeValue::Long(3));
        assert_eq!(NativeValue::string("a"), NativeValue::string("a"));
        assert_ne!(NativeValue::Null, NativeValue::Void);
    }

    #[test]
    fn test_object_equality_is_identity() {
        let a = Arc::new(NativeObject::with_fields(TypeId(0), FxHashMap::default()));
        let b = Arc::new(NativeObject::with_fields(TypeId(0), FxHashMap::default()));
        assert_eq!(NativeValue::Object(a.clone()), NativeValue::Object(a.clone()));
        assert_ne!(NativeValue::Object(a), NativeValue::Object(b));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(NativeValue::Byte(-2).as_i64(), Some(-2));
        assert_eq!(NativeValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(NativeValue::Char(65).as_i64(), None);
        assert_eq!(NativeValue::Short(7).primitive_kind(), Some(PrimitiveKind::Short));
        assert_eq!(NativeValue::string("x").primitive_kind(), None);
    }

    #[test]
    fn test_field_storage() {
        let mut fields = FxHashMap::default();
        fields.insert("count".to_string(), NativeValue::Int(0));
        let obj = NativeObject::with_fields(TypeId(1), fields);
        assert!(obj.set_field("count", NativeValue::Int(5)));
        assert!(!obj.set_field("missing", NativeValue::Int(5)));
        assert_eq!(obj.get_field("count"), Some(NativeValue::Int(5)));
        assert!(!obj.is_array());
    }

    #[test]
    fn test_array_storage() {
        let arr = NativeObject::with_elements(TypeId(2), vec![NativeValue::Int(1), NativeValue::Int(2)]);
        assert!(arr.is_array());
        assert_eq!(arr.array_len(), 2);
        assert!(arr.array_set(1, NativeValue::Int(9)));
        assert!(!arr.array_set(2, NativeValue::Int(9)));
        assert_eq!(arr.array_get(1), Some(NativeValue::Int(9)));
        assert_eq!(arr.get_field("length"), None);
    }
}
