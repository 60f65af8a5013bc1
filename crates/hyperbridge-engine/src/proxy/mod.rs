//! Proxy model: script-visible handles over native classes and objects
//!
//! A [`ClassHandle`] stands for a native type (optionally a generated
//! subclass or interface implementation) and an [`InstanceHandle`] for a
//! single native object. Both resolve members through the overload
//! resolver, marshal arguments in and results out, and share the
//! [`NativeProxy`] operations for method calls and field access.

mod class;
mod instance;

pub use class::{ClassHandle, ClassHandleKind};
pub use instance::InstanceHandle;

use std::sync::Arc;

use hyperbridge_types::{Field, Method, NativeResult, NativeValue, ObjectRef, Signature, TypeId};

use crate::call::CallSite;
use crate::context::BridgeContext;
use crate::error::{report, BridgeError, BridgeResult};
use crate::marshal;
use crate::resolver::Dispatch;
use crate::value::ScriptValue;

/// Operations shared by class and instance handles
pub trait NativeProxy {
    /// Bridge state the handle belongs to
    fn context(&self) -> &Arc<BridgeContext>;

    /// Type members are resolved against
    fn member_type(&self) -> TypeId;

    /// Object instance members run on; `None` for class handles
    fn receiver(&self) -> Option<&ObjectRef>;

    /// Name reported to script code
    fn api_name(&self) -> String;

    /// Run a resolved method with converted arguments
    fn invoke_resolved(
        &self,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        self.context().registry().invoke(method, receiver, args)
    }

    /// Resolve, convert, invoke and marshal the result of `call`
    fn try_call(&self, call: &CallSite) -> BridgeResult<ScriptValue> {
        let ctx = self.context();
        let registry = ctx.registry();
        let dispatch = if call.instance_method {
            Dispatch::Instance
        } else {
            Dispatch::Static
        };

        let args = marshal::unwrap_arguments(registry, &call.args)?;
        let method = ctx
            .resolver()
            .resolve_method(self.member_type(), &call.func, &args, dispatch)?;
        let member = registry.describe(method.name(), method.as_ref());
        tracing::debug!(member = %member, arguments = args.len(), "resolved native method");

        let args = marshal::convert_arguments(registry, args, method.parameter_types(), method.is_varargs())?;
        let receiver = if call.instance_method { self.receiver() } else { None };
        let result = self
            .invoke_resolved(&method, receiver, &args)
            .map_err(|err| BridgeError::from_native(member, err))?;
        Ok(marshal::to_script(ctx, result))
    }

    /// Script-facing [`try_call`](Self::try_call): failures are logged and yield null
    fn call_native_function(&self, call: &CallSite) -> ScriptValue {
        report("call_native_function", self.try_call(call)).unwrap_or(ScriptValue::Null)
    }

    /// Read a public or protected field
    fn try_get_field(&self, name: &str) -> BridgeResult<ScriptValue> {
        let ctx = self.context();
        let registry = ctx.registry();
        let field = accessible_field(ctx, self.member_type(), name)?;
        let value = registry
            .get_field(&field, self.receiver())
            .map_err(|err| BridgeError::from_native(field.name(), err))?;
        Ok(marshal::to_script(ctx, value))
    }

    /// Script-facing [`try_get_field`](Self::try_get_field)
    fn get_native_field(&self, name: &str) -> ScriptValue {
        report("get_native_field", self.try_get_field(name)).unwrap_or(ScriptValue::Null)
    }

    /// Write a public or protected field, converting `value` to its type
    fn try_set_field(&self, name: &str, value: &ScriptValue) -> BridgeResult<()> {
        let ctx = self.context();
        let registry = ctx.registry();
        let field = accessible_field(ctx, self.member_type(), name)?;
        let native = marshal::unwrap_argument(registry, value)?;
        let native = marshal::convert_to(registry, native, field.field_type())?;
        registry
            .set_field(&field, self.receiver(), native)
            .map_err(|err| BridgeError::from_native(field.name(), err))
    }

    /// Script-facing [`try_set_field`](Self::try_set_field); returns whether the write happened
    fn set_native_field(&self, name: &str, value: &ScriptValue) -> bool {
        report("set_native_field", self.try_set_field(name, value)).is_some()
    }
}

fn accessible_field(
    ctx: &BridgeContext,
    ty: TypeId,
    name: &str,
) -> BridgeResult<Arc<Field>> {
    let registry = ctx.registry();
    let field = registry
        .field(ty, name)
        .ok_or_else(|| BridgeError::not_found(format!("field {} on {}", name, registry.type_name(ty))))?;
    if !field.modifiers().is_accessible() {
        return Err(BridgeError::access(format!(
            "field {} on {} is not public or protected",
            name,
            registry.type_name(ty)
        )));
    }
    Ok(field)
}
