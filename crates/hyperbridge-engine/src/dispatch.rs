//! Override dispatch for generated types
//!
//! Instances of dynamically generated subclasses and interface
//! implementations carry an [`OverrideDispatcher`] in their invocation
//! handler slot. Every virtual call on such an object lands here and is
//! either routed to a script callback from the override map or forwarded
//! to the native implementation.
//!
//! A super view reaches the native implementation through
//! [`OverrideDispatcher::invoke_super`], which carries the bypass with the
//! call itself. The dispatcher holds no per-call state, so the main handle
//! and any number of super views can call concurrently.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use hyperbridge_types::value::identity_hash;
use hyperbridge_types::{
    InvocationHandler, Method, NativeError, NativeResult, NativeValue, ObjectRef, Signature, TypeRegistry,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::context::BridgeContext;
use crate::error::{BridgeError, BridgeResult};
use crate::marshal;
use crate::proxy::InstanceHandle;
use crate::value::{ScriptFunction, ScriptValue};

// ============================================================================
// OverrideMap
// ============================================================================

/// Script callbacks keyed by method name
#[derive(Clone, Default)]
pub struct OverrideMap {
    functions: FxHashMap<String, Arc<dyn ScriptFunction>>,
}

impl OverrideMap {
    /// Empty map: every call reaches the native implementation
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a script dictionary; every value must be a function
    pub fn from_script(entries: &BTreeMap<String, ScriptValue>) -> BridgeResult<Self> {
        let mut map = Self::new();
        for (name, value) in entries {
            match value {
                ScriptValue::Function(function) => map.insert(name.clone(), function.clone()),
                other => {
                    return Err(BridgeError::invalid_argument(format!(
                        "override `{}` must be a function, got {}",
                        name,
                        other.type_name()
                    )))
                }
            }
        }
        Ok(map)
    }

    /// Register `function` for `name`, replacing any previous override
    pub fn insert(&mut self, name: impl Into<String>, function: Arc<dyn ScriptFunction>) {
        self.functions.insert(name.into(), function);
    }

    /// Override for `name`
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ScriptFunction>> {
        self.functions.get(name)
    }

    /// Whether `name` is overridden
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no method is overridden
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for OverrideMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("OverrideMap").field("methods", &names).finish()
    }
}

// ============================================================================
// OverrideDispatcher
// ============================================================================

/// Invocation handler routing virtual calls to script overrides
pub struct OverrideDispatcher {
    ctx: Arc<BridgeContext>,
    overrides: RwLock<Arc<OverrideMap>>,
    handle: RwLock<Weak<InstanceHandle>>,
}

impl OverrideDispatcher {
    fn new(ctx: Arc<BridgeContext>, overrides: OverrideMap) -> Self {
        Self {
            ctx,
            overrides: RwLock::new(Arc::new(overrides)),
            handle: RwLock::new(Weak::new()),
        }
    }

    /// Construct an object whose handler is a fresh dispatcher over
    /// `overrides`, then wrap it and link the dispatcher to the handle.
    ///
    /// `construct` receives the handler to attach; the handle is only
    /// returned once the back-reference is bound.
    pub fn create_bound_pair<F>(
        ctx: &Arc<BridgeContext>,
        overrides: OverrideMap,
        construct: F,
    ) -> BridgeResult<Arc<InstanceHandle>>
    where
        F: FnOnce(Arc<dyn InvocationHandler>) -> BridgeResult<ObjectRef>,
    {
        let dispatcher = Arc::new(Self::new(ctx.clone(), overrides));
        let object = construct(dispatcher.clone())?;
        let handle = ctx.wrap_object(object);
        dispatcher.bind(&handle);
        Ok(handle)
    }

    fn bind(&self, handle: &Arc<InstanceHandle>) {
        *self.handle.write() = Arc::downgrade(handle);
    }

    /// Current override map
    pub fn overrides(&self) -> Arc<OverrideMap> {
        self.overrides.read().clone()
    }

    /// Replace the override map; calls already in flight keep the old one
    pub fn set_overrides(&self, overrides: OverrideMap) {
        *self.overrides.write() = Arc::new(overrides);
    }

    /// Invoke the native implementation of `method`, ignoring overrides.
    ///
    /// Abstract methods answer void or null instead of failing.
    pub fn invoke_super(
        &self,
        registry: &TypeRegistry,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        tracing::trace!(method = %method.name(), "forced native dispatch");
        Self::abstract_default(registry, method, registry.invoke_forced(method, receiver, args))
    }

    fn identity_hash(&self) -> i32 {
        identity_hash(self as *const Self as usize)
    }

    /// Fixed behavior for the identity methods declared by `core.Object`
    fn identity_method(
        &self,
        registry: &TypeRegistry,
        receiver: &ObjectRef,
        method: &Method,
        args: &[NativeValue],
    ) -> Option<NativeValue> {
        if method.declaring_type() != registry.object_type() {
            return None;
        }
        match (method.name(), args) {
            ("equals", [other]) => {
                let same = other
                    .as_object()
                    .and_then(|object| object.handler())
                    .map(|handler| std::ptr::eq(Arc::as_ptr(handler) as *const (), self as *const Self as *const ()))
                    .unwrap_or(false);
                Some(NativeValue::Boolean(same))
            }
            ("hashCode", []) => Some(NativeValue::Int(self.identity_hash())),
            ("toString", []) => Some(NativeValue::string(format!(
                "{}@{:x}",
                registry.type_name(receiver.class()),
                self.identity_hash()
            ))),
            _ => None,
        }
    }

    fn forward_native(
        &self,
        registry: &TypeRegistry,
        receiver: &ObjectRef,
        method: &Arc<Method>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        Self::abstract_default(registry, method, registry.invoke_direct(method, receiver, args))
    }

    fn abstract_default(
        registry: &TypeRegistry,
        method: &Method,
        result: NativeResult<NativeValue>,
    ) -> NativeResult<NativeValue> {
        match result {
            Err(NativeError::AbstractMethod { .. }) if method.return_type() == registry.void_type() => {
                Ok(NativeValue::Void)
            }
            Err(NativeError::AbstractMethod { .. })
                if registry.get(method.return_type()).map(|t| t.is_reference()).unwrap_or(false) =>
            {
                Ok(NativeValue::Null)
            }
            other => other,
        }
    }

    fn receiver_value(&self, receiver: &ObjectRef) -> ScriptValue {
        let bound = self.handle.read().upgrade();
        let handle = bound.unwrap_or_else(|| self.ctx.wrap_object(receiver.clone()));
        ScriptValue::Instance(handle)
    }

    fn call_override(
        &self,
        registry: &TypeRegistry,
        receiver: &ObjectRef,
        method: &Arc<Method>,
        function: &Arc<dyn ScriptFunction>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        let this = self.receiver_value(receiver);
        let script_args = marshal::to_script_arguments(&self.ctx, args);
        let result = function
            .call(&this, &script_args)
            .map_err(|err| NativeError::thrown(format!("override {} failed: {}", method.name(), err)))?;

        if method.return_type() == registry.void_type() {
            return Ok(NativeValue::Void);
        }
        marshal::unwrap_argument(registry, &result)
            .and_then(|value| marshal::convert_to(registry, value, method.return_type()))
            .map_err(|err| {
                NativeError::illegal_argument(format!(
                    "override {} returned an unusable value: {}",
                    method.name(),
                    err
                ))
            })
    }
}

impl InvocationHandler for OverrideDispatcher {
    fn invoke(
        &self,
        registry: &TypeRegistry,
        receiver: &ObjectRef,
        method: &Arc<Method>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        if let Some(value) = self.identity_method(registry, receiver, method, args) {
            return Ok(value);
        }

        // snapshot so a concurrent set_overrides cannot change this call
        let overrides = self.overrides();
        match overrides.get(method.name()) {
            Some(function) => {
                tracing::trace!(method = %method.name(), "dispatching to script override");
                self.call_override(registry, receiver, method, function, args)
            }
            None => self.forward_native(registry, receiver, method, args),
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl fmt::Debug for OverrideDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideDispatcher")
            .field("overrides", &*self.overrides.read())
            .field("bound", &(self.handle.read().strong_count() > 0))
            .finish()
    }
}
