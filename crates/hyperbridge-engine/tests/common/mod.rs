//! Shared fixture: a demo registry and a bridge over it
//!
//! `demo.PrimitiveHolder` has a public field plus a getter/setter pair for
//! every primitive and primitive array type. The remaining classes cover
//! overloads, inheritance, virtual calls from native code, interfaces and
//! access restrictions.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyperbridge_engine::{Bridge, CallSite, ClassHandle, InstanceHandle, NativeProxy, ScriptValue};
use hyperbridge_types::{
    CallContext, ConstructorBuilder, FieldBuilder, MethodBuilder, Modifiers, NativeError, NativeResult,
    NativeValue, PrimitiveKind, TypeBuilder, TypeId, TypeRegistry,
};

/// Ids of the fixture types
pub struct Demo {
    pub holder: TypeId,
    pub pet: TypeId,
    pub animal: TypeId,
    pub dog: TypeId,
    pub puppy: TypeId,
    pub overloads: TypeId,
    pub view: TypeId,
    pub widget: TypeId,
    pub runnable: TypeId,
    pub runner: TypeId,
}

pub fn bridge() -> (Bridge, Demo) {
    let registry = TypeRegistry::new();
    let demo = define_demo(&registry);
    (Bridge::new(Arc::new(registry)), demo)
}

pub fn define_demo(registry: &TypeRegistry) -> Demo {
    let holder = primitive_holder(registry);
    let (pet, animal, dog, puppy) = animals(registry);
    let overloads = overloads(registry, animal, dog);
    let view = view(registry);
    let widget = widget(registry);
    let (runnable, runner) = runnables(registry);
    restricted(registry);
    Demo {
        holder,
        pet,
        animal,
        dog,
        puppy,
        overloads,
        view,
        widget,
        runnable,
        runner,
    }
}

// ============================================================================
// demo.PrimitiveHolder
// ============================================================================

fn accessors(builder: TypeBuilder, suffix: &str, field: &'static str, ty: TypeId) -> TypeBuilder {
    builder
        .method(
            MethodBuilder::new(format!("get{}", suffix))
                .returns(ty)
                .body(move |ctx| ctx.get_field(field)),
        )
        .method(MethodBuilder::new(format!("set{}", suffix)).param(ty).body(move |ctx| {
            ctx.set_field(field, ctx.arg(0)?.clone())?;
            Ok(NativeValue::Void)
        }))
}

fn primitive_holder(registry: &TypeRegistry) -> TypeId {
    use PrimitiveKind::*;

    let array = |kind: PrimitiveKind| registry.array_of(registry.primitive(kind)).unwrap();
    let scalars: [(&str, &'static str, PrimitiveKind, NativeValue); 8] = [
        ("Boolean", "primitiveBoolean", Boolean, NativeValue::Boolean(true)),
        ("Byte", "primitiveByte", Byte, NativeValue::Byte(3)),
        ("Char", "primitiveChar", Char, NativeValue::Char('a' as u16)),
        ("Double", "primitiveDouble", Double, NativeValue::Double(0.3)),
        ("Float", "primitiveFloat", Float, NativeValue::Float(2.75)),
        ("Int", "primitiveInt", Int, NativeValue::Int(1)),
        ("Long", "primitiveLong", Long, NativeValue::Long(123)),
        ("Short", "primitiveShort", Short, NativeValue::Short(2)),
    ];
    let arrays: [(&str, &'static str, PrimitiveKind); 8] = [
        ("BooleanArray", "primitiveBooleanArray", Boolean),
        ("ByteArray", "primitiveByteArray", Byte),
        ("CharArray", "primitiveCharArray", Char),
        ("DoubleArray", "primitiveDoubleArray", Double),
        ("FloatArray", "primitiveFloatArray", Float),
        ("IntArray", "primitiveIntArray", Int),
        ("LongArray", "primitiveLongArray", Long),
        ("ShortArray", "primitiveShortArray", Short),
    ];

    let mut builder = TypeBuilder::class("demo.PrimitiveHolder");
    for (suffix, field, kind, default) in scalars {
        let ty = registry.primitive(kind);
        builder = builder.field(FieldBuilder::new(field, ty).default_value(default));
        builder = accessors(builder, suffix, field, ty);
    }
    for (suffix, field, kind) in arrays {
        let ty = array(kind);
        builder = builder.field(FieldBuilder::new(field, ty));
        builder = accessors(builder, suffix, field, ty);
    }

    let int = registry.primitive(Int);
    builder = builder
        .field(
            FieldBuilder::new("VERSION", int)
                .as_static()
                .as_final()
                .default_value(NativeValue::Int(7)),
        )
        .field(FieldBuilder::new("counter", int).as_static())
        .field(FieldBuilder::new("secret", int).modifiers(Modifiers::PRIVATE))
        .constructor(ConstructorBuilder::new().body(|ctx| {
            let registry = ctx.registry();
            let fill = |field: &str, kind: PrimitiveKind, elements: Vec<NativeValue>| {
                let array = registry.new_array(registry.primitive(kind), elements)?;
                ctx.set_field(field, NativeValue::Object(array))
            };
            fill(
                "primitiveBooleanArray",
                Boolean,
                vec![NativeValue::Boolean(true), NativeValue::Boolean(false)],
            )?;
            fill("primitiveByteArray", Byte, vec![NativeValue::Byte(0), NativeValue::Byte(2)])?;
            fill(
                "primitiveCharArray",
                Char,
                "abc".encode_utf16().map(NativeValue::Char).collect(),
            )?;
            fill(
                "primitiveDoubleArray",
                Double,
                vec![NativeValue::Double(1.3), NativeValue::Double(2.4)],
            )?;
            fill(
                "primitiveFloatArray",
                Float,
                vec![NativeValue::Float(100.5), NativeValue::Float(123.456)],
            )?;
            fill(
                "primitiveIntArray",
                Int,
                vec![NativeValue::Int(1), NativeValue::Int(2), NativeValue::Int(3)],
            )?;
            fill(
                "primitiveLongArray",
                Long,
                (7..=10).map(NativeValue::Long).collect(),
            )?;
            fill(
                "primitiveShortArray",
                Short,
                vec![NativeValue::Short(3), NativeValue::Short(2), NativeValue::Short(1)],
            )?;
            Ok(())
        }));
    registry.define(builder).unwrap()
}

// ============================================================================
// Hierarchy: Pet <- Dog, Animal <- Dog <- Puppy
// ============================================================================

fn animals(registry: &TypeRegistry) -> (TypeId, TypeId, TypeId, TypeId) {
    let string = registry.string_type();
    let pet = registry
        .define(TypeBuilder::interface("demo.Pet").method(MethodBuilder::new("owner").returns(string)))
        .unwrap();
    let animal = registry
        .define(
            TypeBuilder::class("demo.Animal")
                .constructor(ConstructorBuilder::new())
                .method(
                    MethodBuilder::new("speak")
                        .returns(string)
                        .body(|_| Ok(NativeValue::string("..."))),
                ),
        )
        .unwrap();
    let dog = registry
        .define(
            TypeBuilder::class("demo.Dog")
                .extends(animal)
                .implements(pet)
                .constructor(ConstructorBuilder::new())
                .method(
                    MethodBuilder::new("speak")
                        .returns(string)
                        .body(|_| Ok(NativeValue::string("woof"))),
                )
                .method(
                    MethodBuilder::new("owner")
                        .returns(string)
                        .body(|_| Ok(NativeValue::string("alice"))),
                ),
        )
        .unwrap();
    let puppy = registry
        .define(
            TypeBuilder::class("demo.Puppy")
                .extends(dog)
                .constructor(ConstructorBuilder::new()),
        )
        .unwrap();
    (pet, animal, dog, puppy)
}

// ============================================================================
// demo.Overloads
// ============================================================================

fn label(text: &'static str) -> impl Fn(&CallContext<'_>) -> NativeResult<NativeValue> + Send + Sync + 'static {
    move |_| Ok(NativeValue::string(text))
}

fn origin(text: &'static str) -> impl Fn(&CallContext<'_>) -> NativeResult<()> + Send + Sync + 'static {
    move |ctx| ctx.set_field("origin", NativeValue::string(text))
}

fn overloads(registry: &TypeRegistry, animal: TypeId, dog: TypeId) -> TypeId {
    let string = registry.string_type();
    let object = registry.object_type();
    let int = registry.primitive(PrimitiveKind::Int);
    let long = registry.primitive(PrimitiveKind::Long);
    let double = registry.primitive(PrimitiveKind::Double);
    let ints = registry.array_of(int).unwrap();

    registry
        .define(
            TypeBuilder::class("demo.Overloads")
                .field(FieldBuilder::new("origin", string))
                .constructor(ConstructorBuilder::new().body(origin("default")))
                .constructor(ConstructorBuilder::new().param(int).body(origin("int")))
                .constructor(ConstructorBuilder::new().param(string).body(origin("string")))
                .method(MethodBuilder::new("pick").param(int).returns(string).body(label("int")))
                .method(MethodBuilder::new("pick").param(long).returns(string).body(label("long")))
                .method(MethodBuilder::new("pick").param(double).returns(string).body(label("double")))
                .method(MethodBuilder::new("pick").param(object).returns(string).body(label("Object")))
                .method(MethodBuilder::new("pick").param(string).returns(string).body(label("String")))
                .method(MethodBuilder::new("describe").param(animal).returns(string).body(label("animal")))
                .method(MethodBuilder::new("describe").param(dog).returns(string).body(label("dog")))
                .method(MethodBuilder::new("only").param(string).returns(string).body(label("only")))
                .method(
                    MethodBuilder::new("sum")
                        .params([string, ints])
                        .varargs()
                        .returns(string)
                        .body(|ctx| {
                            let label = ctx.arg(0)?.as_str().unwrap_or_default().to_string();
                            let values = ctx
                                .arg(1)?
                                .as_object()
                                .ok_or_else(|| NativeError::illegal_argument("values"))?
                                .array_elements();
                            let total: i64 = values.iter().filter_map(NativeValue::as_i64).sum();
                            Ok(NativeValue::string(format!("{}:{}", label, total)))
                        }),
                )
                .method(
                    MethodBuilder::new("twice")
                        .param(int)
                        .returns(int)
                        .as_static()
                        .body(|ctx| Ok(NativeValue::Int(ctx.arg(0)?.as_i64().unwrap_or(0) as i32 * 2))),
                )
                .method(
                    MethodBuilder::new("fail")
                        .returns(int)
                        .body(|_| Err(NativeError::thrown("boom"))),
                ),
        )
        .unwrap()
}

// ============================================================================
// demo.View: render() calls draw() virtually
// ============================================================================

fn view(registry: &TypeRegistry) -> TypeId {
    let string = registry.string_type();
    let int = registry.primitive(PrimitiveKind::Int);
    registry
        .define_with(|this| {
            TypeBuilder::class("demo.View")
                .field(FieldBuilder::new("drawCount", int))
                .constructor(ConstructorBuilder::new())
                .method(MethodBuilder::new("draw").returns(string).body(|ctx| {
                    let count = ctx.get_field("drawCount")?.as_i64().unwrap_or(0) as i32;
                    ctx.set_field("drawCount", NativeValue::Int(count + 1))?;
                    Ok(NativeValue::string("native draw"))
                }))
                .method(MethodBuilder::new("render").returns(string).body(|ctx| {
                    let drawn = ctx.call_this("draw", &[])?;
                    Ok(NativeValue::string(format!("render:{}", drawn.as_str().unwrap_or_default())))
                }))
                .method(
                    MethodBuilder::new("scale")
                        .param(int)
                        .returns(int)
                        .body(|ctx| Ok(NativeValue::Int(ctx.arg(0)?.as_i64().unwrap_or(0) as i32 * 2))),
                )
                .method(
                    MethodBuilder::new("title")
                        .returns(string)
                        .as_final()
                        .body(|_| Ok(NativeValue::string("View"))),
                )
                .method(MethodBuilder::new("me").returns(this).body(|ctx| {
                    Ok(NativeValue::Object(ctx.this()?.clone()))
                }))
        })
        .unwrap()
}

// ============================================================================
// demo.Widget: its constructor calls init() virtually
// ============================================================================

fn widget(registry: &TypeRegistry) -> TypeId {
    let string = registry.string_type();
    registry
        .define(
            TypeBuilder::class("demo.Widget")
                .field(FieldBuilder::new("label", string))
                .constructor(ConstructorBuilder::new().body(|ctx| {
                    ctx.call_this("init", &[])?;
                    Ok(())
                }))
                .method(
                    MethodBuilder::new("init")
                        .modifiers(Modifiers::PROTECTED)
                        .body(|ctx| {
                            ctx.set_field("label", NativeValue::string("native"))?;
                            Ok(NativeValue::Void)
                        }),
                ),
        )
        .unwrap()
}

// ============================================================================
// demo.Runnable and demo.Runner
// ============================================================================

fn runnables(registry: &TypeRegistry) -> (TypeId, TypeId) {
    let string = registry.string_type();
    let runnable = registry
        .define(
            TypeBuilder::interface("demo.Runnable")
                .method(MethodBuilder::new("run"))
                .method(MethodBuilder::new("describe").returns(string)),
        )
        .unwrap();
    let runner = registry
        .define(
            TypeBuilder::class("demo.Runner")
                .method(
                    MethodBuilder::new("runTwice")
                        .param(runnable)
                        .as_static()
                        .body(|ctx| {
                            let target = ctx.arg(0)?;
                            ctx.call(target, "run", &[])?;
                            ctx.call(target, "run", &[])?;
                            Ok(NativeValue::Void)
                        }),
                )
                .method(
                    MethodBuilder::new("describeWith")
                        .param(runnable)
                        .returns(string)
                        .as_static()
                        .body(|ctx| ctx.call(ctx.arg(0)?, "describe", &[])),
                ),
        )
        .unwrap();
    (runnable, runner)
}

// ============================================================================
// Access restrictions
// ============================================================================

fn restricted(registry: &TypeRegistry) {
    let string = registry.string_type();
    registry
        .define(
            TypeBuilder::class("demo.Sealed")
                .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
                .constructor(ConstructorBuilder::new()),
        )
        .unwrap();
    registry
        .define(
            TypeBuilder::class("demo.Secret")
                .modifiers(Modifiers::PRIVATE)
                .constructor(ConstructorBuilder::new()),
        )
        .unwrap();
    registry
        .define(
            TypeBuilder::class("demo.Internal")
                .modifiers(Modifiers::NONE)
                .constructor(ConstructorBuilder::new()),
        )
        .unwrap();
    registry
        .define(
            TypeBuilder::class("demo.Hidden")
                .constructor(ConstructorBuilder::new().modifiers(Modifiers::PRIVATE))
                .method(
                    MethodBuilder::new("peek")
                        .returns(string)
                        .modifiers(Modifiers::PRIVATE)
                        .body(|_| Ok(NativeValue::string("peeked"))),
                ),
        )
        .unwrap();
}

// ============================================================================
// Helpers
// ============================================================================

/// A fresh instance handle of class `name` built with no arguments
pub fn instance(bridge: &Bridge, name: &str) -> Arc<InstanceHandle> {
    bridge.get_class(name).unwrap().new_instance(&[]).unwrap()
}

/// Call an instance method by name
pub fn call(handle: &InstanceHandle, func: &str, args: Vec<ScriptValue>) -> ScriptValue {
    handle.try_call(&CallSite::instance(func, args)).unwrap()
}

/// Call a static method by name
pub fn call_static(class: &ClassHandle, func: &str, args: Vec<ScriptValue>) -> ScriptValue {
    class.try_call(&CallSite::static_call(func, args)).unwrap()
}

/// Script callback returning `value` and counting its calls
pub fn counting(value: ScriptValue) -> (ScriptValue, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let function = ScriptValue::function(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value.clone())
    });
    (function, calls)
}

pub fn count(calls: &AtomicUsize) -> usize {
    calls.load(Ordering::SeqCst)
}
