//! Member descriptors: methods, constructors and fields

use std::fmt;
use std::sync::Arc;

use crate::error::{NativeError, NativeResult};
use crate::registry::TypeRegistry;
use crate::ty::{Modifiers, TypeId};
use crate::value::{NativeValue, ObjectRef};

/// Native implementation of a method
pub type MethodBody = Arc<dyn Fn(&CallContext<'_>) -> NativeResult<NativeValue> + Send + Sync>;

/// Native initializer run by a constructor after field defaults are in place
pub type ConstructorBody = Arc<dyn Fn(&CallContext<'_>) -> NativeResult<()> + Send + Sync>;

/// Common view over invocable members, used by overload resolution
pub trait Signature {
    /// Declared parameter types, in order
    fn parameter_types(&self) -> &[TypeId];
    /// Whether the last parameter collects trailing arguments
    fn is_varargs(&self) -> bool;
    /// Member modifiers
    fn modifiers(&self) -> Modifiers;
    /// Declaring type
    fn declaring_type(&self) -> TypeId;
}

// ============================================================================
// Method
// ============================================================================

/// A method declared by a native type
pub struct Method {
    pub(crate) name: String,
    pub(crate) declaring: TypeId,
    pub(crate) params: Vec<TypeId>,
    pub(crate) return_type: TypeId,
    pub(crate) modifiers: Modifiers,
    pub(crate) varargs: bool,
    pub(crate) body: Option<MethodBody>,
}

impl Method {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared return type (`void` for none)
    pub fn return_type(&self) -> TypeId {
        self.return_type
    }

    /// `static`
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    /// `final`
    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }

    /// No body is attached
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    /// Same name and parameter list
    pub fn same_signature(&self, other: &Method) -> bool {
        self.name == other.name && self.params == other.params
    }

    pub(crate) fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }
}

impl Signature for Method {
    fn parameter_types(&self) -> &[TypeId] {
        &self.params
    }

    fn is_varargs(&self) -> bool {
        self.varargs
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn declaring_type(&self) -> TypeId {
        self.declaring
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("declaring", &self.declaring)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("modifiers", &self.modifiers.names())
            .field("varargs", &self.varargs)
            .field("abstract", &self.body.is_none())
            .finish()
    }
}

// ============================================================================
// Constructor
// ============================================================================

/// A constructor declared by a native class
pub struct Constructor {
    pub(crate) declaring: TypeId,
    pub(crate) params: Vec<TypeId>,
    pub(crate) modifiers: Modifiers,
    pub(crate) varargs: bool,
    pub(crate) body: Option<ConstructorBody>,
}

impl Constructor {
    pub(crate) fn body(&self) -> Option<&ConstructorBody> {
        self.body.as_ref()
    }
}

impl Signature for Constructor {
    fn parameter_types(&self) -> &[TypeId] {
        &self.params
    }

    fn is_varargs(&self) -> bool {
        self.varargs
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn declaring_type(&self) -> TypeId {
        self.declaring
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("declaring", &self.declaring)
            .field("params", &self.params)
            .field("modifiers", &self.modifiers.names())
            .field("varargs", &self.varargs)
            .finish()
    }
}

// ============================================================================
// Field
// ============================================================================

/// A field declared by a native type
#[derive(Debug)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) declaring: TypeId,
    pub(crate) ty: TypeId,
    pub(crate) modifiers: Modifiers,
    pub(crate) default: NativeValue,
}

impl Field {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaring type
    pub fn declaring_type(&self) -> TypeId {
        self.declaring
    }

    /// Declared field type
    pub fn field_type(&self) -> TypeId {
        self.ty
    }

    /// Field modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// `static`
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    /// Initial value given to new instances (or the static slot)
    pub fn default_value(&self) -> &NativeValue {
        &self.default
    }
}

// ============================================================================
// CallContext
// ============================================================================

/// What a native body sees when it runs
pub struct CallContext<'a> {
    registry: &'a TypeRegistry,
    receiver: Option<&'a ObjectRef>,
    args: &'a [NativeValue],
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        registry: &'a TypeRegistry,
        receiver: Option<&'a ObjectRef>,
        args: &'a [NativeValue],
    ) -> Self {
        Self {
            registry,
            receiver,
            args,
        }
    }

    /// Registry the invocation runs against
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Receiver of an instance member
    pub fn this(&self) -> NativeResult<&'a ObjectRef> {
        self.receiver.ok_or_else(|| NativeError::NullReceiver {
            member: "this".to_string(),
        })
    }

    /// All arguments
    pub fn args(&self) -> &'a [NativeValue] {
        self.args
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> NativeResult<&'a NativeValue> {
        self.args.get(index).ok_or_else(|| {
            NativeError::illegal_argument(format!(
                "missing argument {} (got {})",
                index,
                self.args.len()
            ))
        })
    }

    /// Read a field of the receiver
    pub fn get_field(&self, name: &str) -> NativeResult<NativeValue> {
        self.this()?
            .get_field(name)
            .ok_or_else(|| NativeError::NoSuchMember {
                member: name.to_string(),
            })
    }

    /// Write a field of the receiver
    pub fn set_field(&self, name: &str, value: NativeValue) -> NativeResult<()> {
        if self.this()?.set_field(name, value) {
            Ok(())
        } else {
            Err(NativeError::NoSuchMember {
                member: name.to_string(),
            })
        }
    }

    /// Virtually invoke a method on the receiver, honoring its handler
    pub fn call_this(&self, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        self.registry.invoke_virtual(self.this()?, name, args)
    }

    /// Virtually invoke a method on another object
    pub fn call(&self, target: &NativeValue, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        match target {
            NativeValue::Object(object) => self.registry.invoke_virtual(object, name, args),
            _ => Err(NativeError::NullReceiver {
                member: name.to_string(),
            }),
        }
    }
}
