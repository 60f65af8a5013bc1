//! Instance handles

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hyperbridge_types::{Method, NativeResult, NativeValue, ObjectRef, TypeId};
use parking_lot::RwLock;

use super::NativeProxy;
use crate::context::BridgeContext;
use crate::dispatch::{OverrideDispatcher, OverrideMap};
use crate::error::{BridgeError, BridgeResult};
use crate::value::ScriptValue;

/// Script-visible handle for one native object.
///
/// The handle reports a *view* type that the object is always an instance
/// of; [`cast`](Self::cast) moves the view along the hierarchy. Instances
/// of generated types also carry their [`OverrideDispatcher`].
pub struct InstanceHandle {
    ctx: Arc<BridgeContext>,
    target: ObjectRef,
    view: RwLock<TypeId>,
    dispatcher: Option<Arc<OverrideDispatcher>>,
    super_call: AtomicBool,
}

impl InstanceHandle {
    pub(crate) fn new(ctx: Arc<BridgeContext>, target: ObjectRef, view: TypeId) -> Self {
        let dispatcher = target
            .handler()
            .cloned()
            .and_then(|handler| handler.into_any().downcast::<OverrideDispatcher>().ok());
        Self {
            ctx,
            target,
            view: RwLock::new(view),
            dispatcher,
            super_call: AtomicBool::new(false),
        }
    }

    /// Wrapped native object
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Type the object is currently viewed as
    pub fn reported_type(&self) -> TypeId {
        *self.view.read()
    }

    /// Qualified name of the view type
    pub fn api_name(&self) -> String {
        self.ctx.registry().type_name(self.reported_type())
    }

    /// Always true; lets script code tell instances from class handles
    pub fn is_instance_proxy(&self) -> bool {
        true
    }

    /// Whether this is a super view
    pub fn is_super_view(&self) -> bool {
        self.super_call.load(Ordering::Acquire)
    }

    /// Dispatcher of a generated-type instance
    pub fn dispatcher(&self) -> Option<&Arc<OverrideDispatcher>> {
        self.dispatcher.as_ref()
    }

    /// View the object as `ty`.
    ///
    /// Rebinds this handle in place and returns it; fails without touching
    /// the view when the object is not an instance of `ty`.
    pub fn cast(self: &Arc<Self>, ty: TypeId) -> BridgeResult<Arc<Self>> {
        let registry = self.ctx.registry();
        if !registry.is_assignable(self.target.class(), ty) {
            return Err(BridgeError::CastFailure {
                from: self.api_name(),
                to: registry.type_name(ty),
            });
        }
        *self.view.write() = ty;
        tracing::trace!(to = %registry.type_name(ty), "cast instance handle");
        Ok(self.clone())
    }

    /// Whether the object is an instance of the type called `name`.
    ///
    /// Unknown names are logged and answer false.
    pub fn is_instance_of(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        if self.api_name() == name {
            return true;
        }
        let registry = self.ctx.registry();
        match registry.lookup(name) {
            Some(ty) => registry.is_assignable(self.target.class(), ty),
            None => {
                tracing::error!(class = %name, "cannot test instanceof against an unknown class");
                false
            }
        }
    }

    /// Replace the script overrides of a generated-type instance
    pub fn set_overrides(&self, overrides: &ScriptValue) -> BridgeResult<()> {
        let dispatcher = self.dispatcher.as_ref().ok_or_else(|| {
            BridgeError::invalid_argument(format!("{} is not an instance of a generated type", self.api_name()))
        })?;
        let entries = overrides.as_dict().ok_or_else(|| {
            BridgeError::invalid_argument(format!("overrides must be a dictionary, got {}", overrides.type_name()))
        })?;
        dispatcher.set_overrides(OverrideMap::from_script(entries)?);
        Ok(())
    }

    /// A separate handle on the same object whose next call skips script
    /// overrides and reaches the native implementation.
    ///
    /// Objects of non-generated types have no overrides, so their handle is
    /// returned as is.
    pub fn get_super(self: &Arc<Self>) -> Arc<Self> {
        if self.dispatcher.is_none() {
            return self.clone();
        }
        Arc::new(Self {
            ctx: self.ctx.clone(),
            target: self.target.clone(),
            view: RwLock::new(self.reported_type()),
            dispatcher: self.dispatcher.clone(),
            super_call: AtomicBool::new(true),
        })
    }

    /// Drop this handle's identity cache entry now
    pub fn release(&self) {
        self.ctx.instances().forget(self.target.identity(), self as *const Self);
    }
}

impl NativeProxy for InstanceHandle {
    fn context(&self) -> &Arc<BridgeContext> {
        &self.ctx
    }

    fn member_type(&self) -> TypeId {
        self.reported_type()
    }

    fn receiver(&self) -> Option<&ObjectRef> {
        Some(&self.target)
    }

    fn api_name(&self) -> String {
        InstanceHandle::api_name(self)
    }

    fn invoke_resolved(
        &self,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        let registry = self.ctx.registry();
        let forced = receiver.is_some() && self.super_call.swap(false, Ordering::AcqRel);
        match &self.dispatcher {
            Some(dispatcher) if forced => dispatcher.invoke_super(registry, method, receiver, args),
            _ => registry.invoke(method, receiver, args),
        }
    }
}

impl Drop for InstanceHandle {
    fn drop(&mut self) {
        self.ctx.instances().forget(self.target.identity(), self as *const Self);
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("view", &self.api_name())
            .field("target", &self.target)
            .field("generated", &self.dispatcher.is_some())
            .field("super_view", &self.is_super_view())
            .finish()
    }
}
