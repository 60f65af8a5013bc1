//! Subtyping rules for native types
//!
//! Implements assignability `from <: to` and the hierarchy distance used
//! by overload scoring: the minimum number of supertype edges between two
//! reference types.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::registry::TypeRegistry;
use crate::ty::{TypeId, TypeKind};
use crate::value::NativeValue;

impl TypeRegistry {
    /// Direct supertypes: superclass first, then interfaces.
    ///
    /// Interfaces have `core.Object` as an implicit supertype.
    pub fn direct_supertypes(&self, ty: TypeId) -> Vec<TypeId> {
        let Some(native) = self.get(ty) else {
            return Vec::new();
        };
        let mut supers = Vec::with_capacity(native.interfaces().len() + 1);
        match (native.kind(), native.superclass()) {
            (_, Some(sup)) => supers.push(sup),
            (TypeKind::Interface, None) => supers.push(self.object_type()),
            _ => {}
        }
        supers.extend_from_slice(native.interfaces());
        supers
    }

    /// Minimum number of supertype edges from `from` up to `to`.
    ///
    /// `Some(0)` for identical types, `None` when `to` is not a supertype.
    /// Primitive types only relate to themselves. Arrays of references are
    /// covariant in their component; every array is one hop from `core.Object`.
    pub fn hierarchy_hops(&self, from: TypeId, to: TypeId) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let from_ty = self.get(from)?;
        let to_ty = self.get(to)?;
        if from_ty.is_primitive() || to_ty.is_primitive() {
            return None;
        }

        if let (TypeKind::Array(from_component), TypeKind::Array(to_component)) = (from_ty.kind(), to_ty.kind()) {
            let from_component_ty = self.get(from_component)?;
            let to_component_ty = self.get(to_component)?;
            if from_component_ty.is_primitive() || to_component_ty.is_primitive() {
                return None;
            }
            return self.hierarchy_hops(from_component, to_component);
        }

        let mut queue = VecDeque::from([(from, 0u32)]);
        let mut seen = FxHashSet::default();
        seen.insert(from);
        while let Some((current, depth)) = queue.pop_front() {
            for sup in self.direct_supertypes(current) {
                if sup == to {
                    return Some(depth + 1);
                }
                if seen.insert(sup) {
                    queue.push_back((sup, depth + 1));
                }
            }
        }
        None
    }

    /// Whether a value of type `from` can be used where `to` is expected
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        self.hierarchy_hops(from, to).is_some()
    }

    /// Whether `value` can be stored in a slot of type `ty` without conversion
    pub fn check_value(&self, ty: TypeId, value: &NativeValue) -> bool {
        let Some(target) = self.get(ty) else {
            return false;
        };
        if let Some(kind) = target.primitive_kind() {
            return value.primitive_kind() == Some(kind);
        }
        match self.runtime_type(value) {
            None => value.is_null(),
            Some(actual) => self.is_assignable(actual, ty),
        }
    }

    /// Whether `value` is a non-null instance of `ty`
    pub fn is_instance(&self, value: &NativeValue, ty: TypeId) -> bool {
        self.runtime_type(value)
            .map(|actual| self.is_assignable(actual, ty))
            .unwrap_or(false)
    }
}
