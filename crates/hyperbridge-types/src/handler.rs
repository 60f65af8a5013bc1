//! InvocationHandler trait: interception slot for virtual dispatch
//!
//! An object constructed with a handler routes every non-final,
//! non-static method invocation through it. The handler decides whether
//! to run something else or to fall through to the regular
//! implementation via `TypeRegistry::invoke_direct`.

use std::any::Any;
use std::sync::Arc;

use crate::error::NativeResult;
use crate::member::Method;
use crate::registry::TypeRegistry;
use crate::value::{NativeValue, ObjectRef};

/// Receives intercepted method invocations on an object
pub trait InvocationHandler: Send + Sync {
    /// Handle an invocation of `method` on `receiver` with already converted `args`
    fn invoke(
        &self,
        registry: &TypeRegistry,
        receiver: &ObjectRef,
        method: &Arc<Method>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue>;

    /// Upcast for downcasting to the concrete handler type
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
