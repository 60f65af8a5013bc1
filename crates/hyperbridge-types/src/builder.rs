//! Declarative builders for native types
//!
//! A [`TypeBuilder`] collects a type's shape and members; the registry
//! validates it and assigns ids in `TypeRegistry::define`.
//!
//! ```ignore
//! let point = registry.define(
//!     TypeBuilder::class("geo.Point")
//!         .field(FieldBuilder::new("x", registry.primitive(PrimitiveKind::Int)))
//!         .constructor(ConstructorBuilder::new())
//!         .method(MethodBuilder::new("getX").returns(int).body(|ctx| ctx.get_field("x"))),
//! )?;
//! ```

use std::sync::Arc;

use crate::error::NativeResult;
use crate::member::{CallContext, ConstructorBody, MethodBody};
use crate::ty::{Modifiers, TypeId};
use crate::value::NativeValue;

/// Kind of type a builder declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclaredKind {
    Class,
    Interface,
}

/// Definition of a class or interface awaiting registration
pub struct TypeBuilder {
    pub(crate) name: String,
    pub(crate) kind: DeclaredKind,
    pub(crate) modifiers: Modifiers,
    pub(crate) superclass: Option<TypeId>,
    pub(crate) interfaces: Vec<TypeId>,
    pub(crate) methods: Vec<MethodBuilder>,
    pub(crate) constructors: Vec<ConstructorBuilder>,
    pub(crate) fields: Vec<FieldBuilder>,
}

impl TypeBuilder {
    /// Start a public class; its superclass defaults to `core.Object`
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DeclaredKind::Class,
            modifiers: Modifiers::PUBLIC,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Start a public interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: DeclaredKind::Interface,
            modifiers: Modifiers::PUBLIC | Modifiers::ABSTRACT,
            ..Self::class(name)
        }
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: TypeId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Add an implemented (or, for interfaces, extended) interface
    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Replace the type modifiers
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: ConstructorBuilder) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field);
        self
    }

    /// Type name being declared
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Definition of a method
pub struct MethodBuilder {
    pub(crate) name: String,
    pub(crate) params: Vec<TypeId>,
    pub(crate) returns: Option<TypeId>,
    pub(crate) modifiers: Modifiers,
    pub(crate) varargs: bool,
    pub(crate) body: Option<MethodBody>,
}

impl MethodBuilder {
    /// Start a public, void, parameterless method without a body
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            modifiers: Modifiers::PUBLIC,
            varargs: false,
            body: None,
        }
    }

    /// Append a parameter
    pub fn param(mut self, ty: TypeId) -> Self {
        self.params.push(ty);
        self
    }

    /// Append several parameters
    pub fn params(mut self, types: impl IntoIterator<Item = TypeId>) -> Self {
        self.params.extend(types);
        self
    }

    /// Set the return type
    pub fn returns(mut self, ty: TypeId) -> Self {
        self.returns = Some(ty);
        self
    }

    /// Replace the modifiers
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::STATIC;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::FINAL;
        self
    }

    /// Last parameter (an array type) collects trailing arguments
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Attach the implementation
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> NativeResult<NativeValue> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }
}

/// Definition of a constructor
pub struct ConstructorBuilder {
    pub(crate) params: Vec<TypeId>,
    pub(crate) modifiers: Modifiers,
    pub(crate) varargs: bool,
    pub(crate) body: Option<ConstructorBody>,
}

impl ConstructorBuilder {
    /// Start a public, parameterless constructor
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            modifiers: Modifiers::PUBLIC,
            varargs: false,
            body: None,
        }
    }

    /// Append a parameter
    pub fn param(mut self, ty: TypeId) -> Self {
        self.params.push(ty);
        self
    }

    /// Append several parameters
    pub fn params(mut self, types: impl IntoIterator<Item = TypeId>) -> Self {
        self.params.extend(types);
        self
    }

    /// Replace the modifiers
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Last parameter (an array type) collects trailing arguments
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Attach the initializer
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> NativeResult<()> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }
}

impl Default for ConstructorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of a field
pub struct FieldBuilder {
    pub(crate) name: String,
    pub(crate) ty: TypeId,
    pub(crate) modifiers: Modifiers,
    pub(crate) default: Option<NativeValue>,
}

impl FieldBuilder {
    /// Start a public instance field
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers: Modifiers::PUBLIC,
            default: None,
        }
    }

    /// Replace the modifiers
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::STATIC;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.modifiers = self.modifiers | Modifiers::FINAL;
        self
    }

    /// Initial value; defaults to the zero of the field type
    pub fn default_value(mut self, value: NativeValue) -> Self {
        self.default = Some(value);
        self
    }
}
