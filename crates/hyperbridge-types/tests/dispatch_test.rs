//! Virtual dispatch through invocation handlers on generated types

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use hyperbridge_types::{
    ConstructorBuilder, FieldBuilder, InvocationHandler, Method, MethodBuilder, NativeError,
    NativeResult, NativeValue, ObjectRef, PrimitiveKind, TypeBuilder, TypeId, TypeRegistry,
};

/// Records intercepted method names; answers `greet` itself and forwards the rest
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl InvocationHandler for Recorder {
    fn invoke(
        &self,
        registry: &TypeRegistry,
        receiver: &ObjectRef,
        method: &Arc<Method>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        self.calls.lock().push(method.name().to_string());
        if method.name() == "greet" {
            return Ok(NativeValue::string("intercepted"));
        }
        registry.invoke_direct(method, receiver, args)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn greeter(registry: &TypeRegistry) -> TypeId {
    let string = registry.string_type();
    let int = registry.primitive(PrimitiveKind::Int);
    registry
        .define(
            TypeBuilder::class("demo.Greeter")
                .field(FieldBuilder::new("greeted", int))
                .constructor(ConstructorBuilder::new().body(|ctx| {
                    ctx.call_this("greet", &[])?;
                    Ok(())
                }))
                .method(MethodBuilder::new("greet").returns(string).body(|ctx| {
                    let count = ctx.get_field("greeted")?.as_i64().unwrap_or(0) as i32;
                    ctx.set_field("greeted", NativeValue::Int(count + 1))?;
                    Ok(NativeValue::string("hello"))
                }))
                .method(
                    MethodBuilder::new("welcome")
                        .returns(string)
                        .as_final()
                        .body(|ctx| ctx.call_this("greet", &[])),
                ),
        )
        .unwrap()
}

fn method(registry: &TypeRegistry, ty: TypeId, name: &str) -> Arc<Method> {
    registry
        .methods(ty)
        .into_iter()
        .find(|m| m.name() == name)
        .unwrap()
}

mod handlers {
    use super::*;

    #[test]
    fn test_plain_object_runs_native_body() {
        let registry = TypeRegistry::new();
        let ty = greeter(&registry);
        let ctor = registry.constructors(ty).remove(0);
        let object = registry.construct(&ctor, &[], None).unwrap();
        assert_eq!(object.get_field("greeted"), Some(NativeValue::Int(1)));
        let result = registry.invoke(&method(&registry, ty, "welcome"), Some(&object), &[]).unwrap();
        assert_eq!(result, NativeValue::string("hello"));
    }

    #[test]
    fn test_handler_sees_calls_made_during_construction() {
        let registry = TypeRegistry::new();
        let base = greeter(&registry);
        let sub = registry.generate_subclass(base).unwrap();
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        });
        let ctor = registry.constructors(sub).remove(0);
        let object = registry.construct(&ctor, &[], Some(recorder.clone())).unwrap();

        assert_eq!(*recorder.calls.lock(), vec!["greet".to_string()]);
        assert_eq!(object.get_field("greeted"), Some(NativeValue::Int(0)));
    }

    #[test]
    fn test_final_method_bypasses_handler_but_inner_calls_do_not() {
        let registry = TypeRegistry::new();
        let base = greeter(&registry);
        let sub = registry.generate_subclass(base).unwrap();
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        });
        let ctor = registry.constructors(sub).remove(0);
        let object = registry.construct(&ctor, &[], Some(recorder.clone())).unwrap();
        recorder.calls.lock().clear();

        let result = registry.invoke(&method(&registry, base, "welcome"), Some(&object), &[]).unwrap();
        assert_eq!(result, NativeValue::string("intercepted"));
        assert_eq!(*recorder.calls.lock(), vec!["greet".to_string()]);
    }

    #[test]
    fn test_invoke_direct_skips_handler() {
        let registry = TypeRegistry::new();
        let base = greeter(&registry);
        let sub = registry.generate_subclass(base).unwrap();
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        });
        let ctor = registry.constructors(sub).remove(0);
        let object = registry.construct(&ctor, &[], Some(recorder.clone())).unwrap();

        let greet = method(&registry, base, "greet");
        let result = registry.invoke_direct(&greet, &object, &[]).unwrap();
        assert_eq!(result, NativeValue::string("hello"));
        assert_eq!(object.get_field("greeted"), Some(NativeValue::Int(1)));
    }

    #[test]
    fn test_forced_invoke_skips_handler_for_that_call_only() {
        let registry = TypeRegistry::new();
        let base = greeter(&registry);
        let sub = registry.generate_subclass(base).unwrap();
        let recorder = Arc::new(Recorder {
            calls: Mutex::new(Vec::new()),
        });
        let ctor = registry.constructors(sub).remove(0);
        let object = registry.construct(&ctor, &[], Some(recorder.clone())).unwrap();
        recorder.calls.lock().clear();

        let greet = method(&registry, base, "greet");
        let forced = registry.invoke_forced(&greet, Some(&object), &[]).unwrap();
        assert_eq!(forced, NativeValue::string("hello"));
        assert!(recorder.calls.lock().is_empty());

        let virtual_call = registry.invoke(&greet, Some(&object), &[]).unwrap();
        assert_eq!(virtual_call, NativeValue::string("intercepted"));
        assert_eq!(*recorder.calls.lock(), vec!["greet".to_string()]);
    }

    #[test]
    fn test_forced_invoke_still_checks_the_call() {
        let registry = TypeRegistry::new();
        let base = greeter(&registry);
        let greet = method(&registry, base, "greet");
        let err = registry.invoke_forced(&greet, None, &[]).unwrap_err();
        assert!(matches!(err, NativeError::NullReceiver { .. }));
        let err = registry
            .invoke_forced(&greet, None, &[NativeValue::Int(1)])
            .unwrap_err();
        assert!(matches!(err, NativeError::IllegalArgument { .. }));
    }
}

mod interfaces {
    use super::*;

    #[test]
    fn test_generated_implementation_has_abstract_methods() {
        let registry = TypeRegistry::new();
        let runnable = registry
            .define(TypeBuilder::interface("demo.Runnable").method(MethodBuilder::new("run")))
            .unwrap();
        let implementation = registry.generate_implementation(runnable).unwrap();
        assert_eq!(registry.generate_implementation(runnable).unwrap(), implementation);
        assert!(registry.is_assignable(implementation, runnable));
        assert_eq!(registry.type_name(implementation), "demo.Runnable$Implementation");

        let ctor = registry.constructors(implementation).remove(0);
        let object = registry.construct(&ctor, &[], None).unwrap();
        let run = method(&registry, runnable, "run");
        let err = registry.invoke(&run, Some(&object), &[]).unwrap_err();
        assert!(matches!(err, NativeError::AbstractMethod { .. }));
    }

    #[test]
    fn test_interfaces_cannot_be_subclassed() {
        let registry = TypeRegistry::new();
        let runnable = registry.define(TypeBuilder::interface("demo.Runnable")).unwrap();
        assert!(matches!(
            registry.generate_subclass(runnable),
            Err(NativeError::NotInheritable { .. })
        ));
        assert!(registry.generate_implementation(registry.object_type()).is_err());
    }
}
