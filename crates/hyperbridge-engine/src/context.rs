//! Shared bridge state
//!
//! Every handle holds an `Arc<BridgeContext>`: the type registry, the
//! type matcher and the instance identity cache. The context never refers
//! back to handles except weakly, through the cache.

use std::sync::Arc;

use hyperbridge_types::{ObjectRef, TypeId, TypeRegistry};

use crate::cache::InstanceCache;
use crate::config::BridgeConfig;
use crate::matcher::TypeMatcher;
use crate::proxy::InstanceHandle;
use crate::resolver::OverloadResolver;

/// State shared by a bridge and all handles it produces
#[derive(Debug)]
pub struct BridgeContext {
    registry: Arc<TypeRegistry>,
    matcher: TypeMatcher,
    instances: InstanceCache,
}

impl BridgeContext {
    /// Create a context over `registry`
    pub fn new(registry: Arc<TypeRegistry>, config: &BridgeConfig) -> Arc<Self> {
        Arc::new(Self {
            registry,
            matcher: TypeMatcher::new(config.memoize_distances),
            instances: InstanceCache::new(),
        })
    }

    /// Host type registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Shared handle to the registry
    pub fn registry_arc(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Type matcher
    pub fn matcher(&self) -> &TypeMatcher {
        &self.matcher
    }

    /// Overload resolver over this context's registry
    pub fn resolver(&self) -> OverloadResolver<'_> {
        OverloadResolver::new(&self.registry, &self.matcher)
    }

    /// Instance identity cache
    pub fn instances(&self) -> &InstanceCache {
        &self.instances
    }

    /// Handle for `object`, reusing the live one if it exists.
    ///
    /// A new handle reports the object's runtime class, or for an instance
    /// of a generated type, the type it was generated from.
    pub fn wrap_object(self: &Arc<Self>, object: ObjectRef) -> Arc<InstanceHandle> {
        self.instances.get_or_insert_with(&object, || {
            let view = self.visible_class(object.class());
            InstanceHandle::new(self.clone(), object.clone(), view)
        })
    }

    /// `class`, or for a generated type the type it was generated from
    pub fn visible_class(&self, class: TypeId) -> TypeId {
        match self.registry.get(class) {
            Some(ty) if ty.is_generated() => ty
                .interfaces()
                .first()
                .copied()
                .or(ty.superclass())
                .unwrap_or(class),
            _ => class,
        }
    }
}
