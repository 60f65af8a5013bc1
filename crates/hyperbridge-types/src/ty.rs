//! Core type definitions for the native object model

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::member::{Constructor, Field, Method};
use crate::value::NativeValue;

/// Unique identifier for a type in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Slot index of this type in the registry
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Primitive kinds of the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `byte` (signed 8-bit)
    Byte,
    /// `short` (signed 16-bit)
    Short,
    /// `char` (UTF-16 code unit)
    Char,
    /// `int` (signed 32-bit)
    Int,
    /// `long` (signed 64-bit)
    Long,
    /// `float` (IEEE 754 single precision)
    Float,
    /// `double` (IEEE 754 double precision)
    Double,
    /// `void` (method return only)
    Void,
}

impl PrimitiveKind {
    /// Every primitive kind, in registration order
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Void,
    ];

    /// Name of the primitive as registered
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    /// Name of the boxed counterpart class, if any
    pub const fn boxed_name(self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Boolean => Some("core.Boolean"),
            PrimitiveKind::Byte => Some("core.Byte"),
            PrimitiveKind::Short => Some("core.Short"),
            PrimitiveKind::Char => Some("core.Character"),
            PrimitiveKind::Int => Some("core.Integer"),
            PrimitiveKind::Long => Some("core.Long"),
            PrimitiveKind::Float => Some("core.Float"),
            PrimitiveKind::Double => Some("core.Double"),
            PrimitiveKind::Void => None,
        }
    }

    /// Position in the widening order byte < short < int < long < float < double
    pub const fn numeric_rank(self) -> Option<usize> {
        match self {
            PrimitiveKind::Byte => Some(0),
            PrimitiveKind::Short => Some(1),
            PrimitiveKind::Int => Some(2),
            PrimitiveKind::Long => Some(3),
            PrimitiveKind::Float => Some(4),
            PrimitiveKind::Double => Some(5),
            _ => None,
        }
    }

    /// Whether this kind is one of the six numeric kinds
    pub const fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Default value of a field of this kind
    pub fn zero(self) -> NativeValue {
        match self {
            PrimitiveKind::Boolean => NativeValue::Boolean(false),
            PrimitiveKind::Byte => NativeValue::Byte(0),
            PrimitiveKind::Short => NativeValue::Short(0),
            PrimitiveKind::Char => NativeValue::Char(0),
            PrimitiveKind::Int => NativeValue::Int(0),
            PrimitiveKind::Long => NativeValue::Long(0),
            PrimitiveKind::Float => NativeValue::Float(0.0),
            PrimitiveKind::Double => NativeValue::Double(0.0),
            PrimitiveKind::Void => NativeValue::Void,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// One of the primitive kinds
    Primitive(PrimitiveKind),
    /// Concrete or abstract class
    Class,
    /// Interface (abstract method set, no state)
    Interface,
    /// Array with the given component type
    Array(TypeId),
}

/// Access and inheritance modifiers (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    /// No modifiers (package-private)
    pub const NONE: Self = Self(0x0000);
    /// Accessible from anywhere
    pub const PUBLIC: Self = Self(0x0001);
    /// Accessible from subclasses
    pub const PROTECTED: Self = Self(0x0002);
    /// Accessible only from the declaring type
    pub const PRIVATE: Self = Self(0x0004);
    /// Belongs to the type rather than an instance
    pub const STATIC: Self = Self(0x0008);
    /// Cannot be overridden or extended
    pub const FINAL: Self = Self(0x0010);
    /// Has no implementation / cannot be instantiated
    pub const ABSTRACT: Self = Self(0x0020);

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if all flags of `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of modifiers
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove flags
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// `public`
    pub const fn is_public(&self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// `protected`
    pub const fn is_protected(&self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// `private`
    pub const fn is_private(&self) -> bool {
        self.contains(Self::PRIVATE)
    }

    /// `static`
    pub const fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    /// `final`
    pub const fn is_final(&self) -> bool {
        self.contains(Self::FINAL)
    }

    /// `abstract`
    pub const fn is_abstract(&self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    /// Public or protected: visible to the bridge
    pub const fn is_accessible(&self) -> bool {
        self.is_public() || self.is_protected()
    }

    /// Names of the set flags, in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        const FLAGS: [(Modifiers, &str); 6] = [
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::ABSTRACT, "abstract"),
        ];
        FLAGS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A registered native type with its declared members
pub struct NativeType {
    pub(crate) id: TypeId,
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) modifiers: Modifiers,
    pub(crate) superclass: Option<TypeId>,
    pub(crate) interfaces: Vec<TypeId>,
    pub(crate) methods: Vec<Arc<Method>>,
    pub(crate) constructors: Vec<Arc<Constructor>>,
    pub(crate) fields: Vec<Arc<Field>>,
    pub(crate) statics: RwLock<FxHashMap<String, NativeValue>>,
    pub(crate) generated: bool,
}

impl NativeType {
    /// Registry id
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of the type
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Type modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Direct superclass (`None` for primitives, interfaces and the root)
    pub fn superclass(&self) -> Option<TypeId> {
        self.superclass
    }

    /// Directly implemented (or extended, for interfaces) interfaces
    pub fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    /// Methods declared by this type, in declaration order
    pub fn declared_methods(&self) -> &[Arc<Method>] {
        &self.methods
    }

    /// Constructors declared by this type
    pub fn declared_constructors(&self) -> &[Arc<Constructor>] {
        &self.constructors
    }

    /// Fields declared by this type
    pub fn declared_fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    /// Primitive kind, if this is a primitive type
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Component type, if this is an array type
    pub fn component_type(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Whether this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    /// Whether this is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Whether this is a class (arrays excluded)
    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }

    /// Whether this is an array type
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// Whether values of this type are object references
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Whether the type was generated at runtime by the registry
    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

impl fmt::Debug for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("modifiers", &self.modifiers.names())
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .field("fields", &self.fields.len())
            .field("generated", &self.generated)
            .finish()
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
