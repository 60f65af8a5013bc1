//! Hyperbridge Type System
//!
//! The host side of the bridge: a reflective registry of native classes,
//! interfaces, arrays and primitives, together with the objects they
//! describe and the virtual dispatch rules used to invoke them.
//!
//! Types are declared with [`TypeBuilder`] and registered in a
//! [`TypeRegistry`], which then answers every reflective question the
//! bridge asks: member enumeration, assignability, hierarchy distance,
//! construction, invocation and field access.

#![warn(missing_docs)]

pub mod builder;
pub mod catalog;
pub mod error;
pub mod handler;
pub mod member;
pub mod registry;
pub mod subtyping;
pub mod ty;
pub mod value;

pub use builder::{ConstructorBuilder, FieldBuilder, MethodBuilder, TypeBuilder};
pub use catalog::{Catalog, CatalogError};
pub use error::{NativeError, NativeResult};
pub use handler::InvocationHandler;
pub use member::{CallContext, Constructor, ConstructorBody, Field, Method, MethodBody, Signature};
pub use registry::TypeRegistry;
pub use ty::{Modifiers, NativeType, PrimitiveKind, TypeId, TypeKind};
pub use value::{NativeObject, NativeValue, ObjectRef};
