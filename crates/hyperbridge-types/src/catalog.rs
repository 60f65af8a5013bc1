//! Class catalog snapshot
//!
//! A serializable listing of the classes and interfaces in a registry and
//! the members the bridge can reach on them. Primitive and array types are
//! left out; private and package-private members are left out.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::member::Signature;
use crate::registry::TypeRegistry;
use crate::ty::TypeKind;

/// Errors that can occur while persisting a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Snapshot of a registry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    /// Classes and interfaces in registration order
    pub classes: Vec<ClassEntry>,
}

/// One class or interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassEntry {
    /// Fully qualified name
    pub name: String,
    /// `class` or `interface`
    pub kind: String,
    /// Modifier names
    pub modifiers: Vec<String>,
    /// Superclass name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    /// Implemented interface names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    /// Whether the type was generated at runtime
    #[serde(default)]
    pub generated: bool,
    /// Declared accessible constructors
    #[serde(default)]
    pub constructors: Vec<MemberEntry>,
    /// Declared accessible methods
    #[serde(default)]
    pub methods: Vec<MemberEntry>,
    /// Declared accessible fields
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// A method or constructor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberEntry {
    /// Member name (`<init>` for constructors)
    pub name: String,
    /// Parameter type names
    pub parameters: Vec<String>,
    /// Return type name (constructors report the declaring class)
    pub returns: String,
    /// Modifier names
    pub modifiers: Vec<String>,
    /// Whether trailing arguments are collected into the last parameter
    #[serde(default)]
    pub varargs: bool,
}

/// A field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldEntry {
    /// Field name
    pub name: String,
    /// Field type name
    #[serde(rename = "type")]
    pub ty: String,
    /// Modifier names
    pub modifiers: Vec<String>,
}

fn modifier_names(names: Vec<&'static str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

impl Catalog {
    /// Capture the current state of `registry`
    pub fn capture(registry: &TypeRegistry) -> Self {
        let mut classes = Vec::new();
        for ty in registry.types() {
            let kind = match ty.kind() {
                TypeKind::Class => "class",
                TypeKind::Interface => "interface",
                TypeKind::Primitive(_) | TypeKind::Array(_) => continue,
            };
            let param_names = |member: &dyn Signature| -> Vec<String> {
                member
                    .parameter_types()
                    .iter()
                    .map(|p| registry.type_name(*p))
                    .collect()
            };

            let constructors = ty
                .declared_constructors()
                .iter()
                .filter(|c| c.modifiers().is_accessible())
                .map(|c| MemberEntry {
                    name: "<init>".to_string(),
                    parameters: param_names(c.as_ref()),
                    returns: ty.name().to_string(),
                    modifiers: modifier_names(c.modifiers().names()),
                    varargs: c.is_varargs(),
                })
                .collect();
            let methods = ty
                .declared_methods()
                .iter()
                .filter(|m| m.modifiers().is_accessible())
                .map(|m| MemberEntry {
                    name: m.name().to_string(),
                    parameters: param_names(m.as_ref()),
                    returns: registry.type_name(m.return_type()),
                    modifiers: modifier_names(m.modifiers().names()),
                    varargs: m.is_varargs(),
                })
                .collect();
            let fields = ty
                .declared_fields()
                .iter()
                .filter(|f| f.modifiers().is_accessible())
                .map(|f| FieldEntry {
                    name: f.name().to_string(),
                    ty: registry.type_name(f.field_type()),
                    modifiers: modifier_names(f.modifiers().names()),
                })
                .collect();

            classes.push(ClassEntry {
                name: ty.name().to_string(),
                kind: kind.to_string(),
                modifiers: modifier_names(ty.modifiers().names()),
                superclass: ty.superclass().map(|s| registry.type_name(s)),
                interfaces: ty.interfaces().iter().map(|i| registry.type_name(*i)).collect(),
                generated: ty.is_generated(),
                constructors,
                methods,
                fields,
            });
        }
        Catalog { classes }
    }

    /// Find a class entry by name
    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a catalog previously produced by [`Catalog::to_json`]
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save as JSON
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl TypeRegistry {
    /// Snapshot of the registered classes and interfaces
    pub fn catalog(&self) -> Catalog {
        Catalog::capture(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{FieldBuilder, MethodBuilder, TypeBuilder};
    use crate::ty::{Modifiers, PrimitiveKind};

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        let int = registry.primitive(PrimitiveKind::Int);
        let shape = registry
            .define(TypeBuilder::interface("geo.Shape").method(MethodBuilder::new("area").returns(int)))
            .unwrap();
        registry
            .define(
                TypeBuilder::class("geo.Square")
                    .implements(shape)
                    .field(FieldBuilder::new("side", int))
                    .field(FieldBuilder::new("secret", int).modifiers(Modifiers::PRIVATE))
                    .method(MethodBuilder::new("area").returns(int).body(|ctx| ctx.get_field("side"))),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_capture_skips_primitives_and_private_members() {
        let catalog = registry().catalog();
        assert!(catalog.class("int").is_none());
        let square = catalog.class("geo.Square").unwrap();
        assert_eq!(square.kind, "class");
        assert_eq!(square.superclass.as_deref(), Some("core.Object"));
        assert_eq!(square.interfaces, vec!["geo.Shape".to_string()]);
        assert_eq!(square.fields.len(), 1);
        assert_eq!(square.methods[0].returns, "int");

        let shape = catalog.class("geo.Shape").unwrap();
        assert_eq!(shape.kind, "interface");
        assert!(shape.methods[0].modifiers.contains(&"abstract".to_string()));
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let catalog = registry().catalog();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        catalog.save(&path).unwrap();
        let loaded = Catalog::load(&path).unwrap();
        assert_eq!(loaded, catalog);
    }
}
