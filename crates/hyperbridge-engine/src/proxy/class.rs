//! Class handles

use std::fmt;
use std::sync::Arc;

use hyperbridge_types::{InvocationHandler, NativeValue, ObjectRef, Signature, TypeId};

use super::{InstanceHandle, NativeProxy};
use crate::context::BridgeContext;
use crate::dispatch::{OverrideDispatcher, OverrideMap};
use crate::error::{report, BridgeError, BridgeResult};
use crate::marshal;
use crate::value::ScriptValue;

/// What a class handle instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassHandleKind {
    /// The native class itself
    Plain,
    /// A generated subclass whose virtual methods script code may override
    DynamicSubclass,
    /// A generated implementation of an interface, driven by script overrides
    InterfaceImplementation,
}

/// Script-visible handle for a native type
pub struct ClassHandle {
    ctx: Arc<BridgeContext>,
    /// Type that gets instantiated (the generated one for dynamic kinds)
    ty: TypeId,
    /// Type the handle reports and resolves static members against
    reported: TypeId,
    name: String,
    kind: ClassHandleKind,
}

impl ClassHandle {
    /// Handle for `ty` itself
    pub fn new(ctx: Arc<BridgeContext>, ty: TypeId) -> Self {
        let name = ctx.registry().type_name(ty);
        Self {
            ctx,
            ty,
            reported: ty,
            name,
            kind: ClassHandleKind::Plain,
        }
    }

    /// Handle that instantiates a generated subclass of `base`
    pub fn dynamic_subclass(ctx: Arc<BridgeContext>, base: TypeId) -> BridgeResult<Self> {
        let name = ctx.registry().type_name(base);
        let generated = ctx
            .registry()
            .generate_subclass(base)
            .map_err(|err| BridgeError::from_native(name.as_str(), err))?;
        Ok(Self {
            ctx,
            ty: generated,
            reported: base,
            name,
            kind: ClassHandleKind::DynamicSubclass,
        })
    }

    /// Handle that instantiates a generated implementation of `interface`
    pub fn interface_implementation(ctx: Arc<BridgeContext>, interface: TypeId) -> BridgeResult<Self> {
        let name = ctx.registry().type_name(interface);
        let generated = ctx
            .registry()
            .generate_implementation(interface)
            .map_err(|err| BridgeError::from_native(name.as_str(), err))?;
        Ok(Self {
            ctx,
            ty: generated,
            reported: interface,
            name,
            kind: ClassHandleKind::InterfaceImplementation,
        })
    }

    /// Qualified name of the reported type
    pub fn api_name(&self) -> &str {
        &self.name
    }

    /// Always true; lets script code tell class handles from instances
    pub fn is_class_proxy(&self) -> bool {
        true
    }

    /// Type actually instantiated
    pub fn wrapped_type(&self) -> TypeId {
        self.ty
    }

    /// Type reported to script code
    pub fn reported_type(&self) -> TypeId {
        self.reported
    }

    /// Handle flavor
    pub fn kind(&self) -> ClassHandleKind {
        self.kind
    }

    /// Construct an instance.
    ///
    /// Interface implementations take exactly one dictionary of overrides.
    /// Otherwise a single dictionary keyed by argument indices is spread
    /// into positional arguments first.
    pub fn try_new_instance(&self, args: &[ScriptValue]) -> BridgeResult<Arc<InstanceHandle>> {
        match self.kind {
            ClassHandleKind::Plain => {
                let args = positional_arguments(args);
                let object = self.construct(&args, None)?;
                Ok(self.ctx.wrap_object(object))
            }
            ClassHandleKind::DynamicSubclass => self.construct_bound(OverrideMap::new(), &positional_arguments(args)),
            ClassHandleKind::InterfaceImplementation => match args {
                [ScriptValue::Dict(entries)] => self.construct_bound(OverrideMap::from_script(entries)?, &[]),
                _ => Err(BridgeError::invalid_argument(format!(
                    "an instance of {} takes exactly one dictionary of method overrides",
                    self.name
                ))),
            },
        }
    }

    /// Script-facing [`try_new_instance`](Self::try_new_instance)
    pub fn new_instance(&self, args: &[ScriptValue]) -> Option<Arc<InstanceHandle>> {
        report("new_instance", self.try_new_instance(args))
    }

    /// Construct an instance of a generated type with `overrides` in place
    /// from the first virtual call, including calls made by constructors
    pub fn try_new_instance_with_overrides(
        &self,
        overrides: &ScriptValue,
        args: &[ScriptValue],
    ) -> BridgeResult<Arc<InstanceHandle>> {
        if self.kind == ClassHandleKind::Plain {
            return Err(BridgeError::invalid_argument(format!(
                "{} is not a generated type and cannot take overrides",
                self.name
            )));
        }
        let entries = overrides.as_dict().ok_or_else(|| {
            BridgeError::invalid_argument(format!("overrides must be a dictionary, got {}", overrides.type_name()))
        })?;
        self.construct_bound(OverrideMap::from_script(entries)?, &positional_arguments(args))
    }

    /// Script-facing [`try_new_instance_with_overrides`](Self::try_new_instance_with_overrides)
    pub fn new_instance_with_overrides(
        &self,
        overrides: &ScriptValue,
        args: &[ScriptValue],
    ) -> Option<Arc<InstanceHandle>> {
        report(
            "new_instance_with_overrides",
            self.try_new_instance_with_overrides(overrides, args),
        )
    }

    fn construct_bound(&self, overrides: OverrideMap, args: &[ScriptValue]) -> BridgeResult<Arc<InstanceHandle>> {
        tracing::debug!(class = %self.name, overrides = overrides.len(), "constructing generated instance");
        OverrideDispatcher::create_bound_pair(&self.ctx, overrides, |handler| {
            self.construct(args, Some(handler))
        })
    }

    fn construct(
        &self,
        args: &[ScriptValue],
        handler: Option<Arc<dyn InvocationHandler>>,
    ) -> BridgeResult<ObjectRef> {
        let registry = self.ctx.registry();
        let native = marshal::unwrap_arguments(registry, args)?;
        let ctor = self.ctx.resolver().resolve_constructor(self.ty, &native)?;
        let native: Vec<NativeValue> =
            marshal::convert_arguments(registry, native, ctor.parameter_types(), ctor.is_varargs())?;
        registry
            .construct(&ctor, &native, handler)
            .map_err(|err| BridgeError::from_native(registry.describe("<init>", ctor.as_ref()), err))
    }
}

/// Highest parameter count a native member can declare
const MAX_PARAMETERS: usize = 255;

/// Spread `[{0: a, 2: c}]` into `[a, null, c]`; anything else is returned as is
fn positional_arguments(args: &[ScriptValue]) -> Vec<ScriptValue> {
    let [ScriptValue::Dict(entries)] = args else {
        return args.to_vec();
    };
    let indexed: Option<Vec<(usize, &ScriptValue)>> = entries
        .iter()
        .map(|(key, value)| {
            key.parse::<usize>()
                .ok()
                .filter(|index| *index < MAX_PARAMETERS)
                .map(|index| (index, value))
        })
        .collect();
    let Some(indexed) = indexed else {
        return args.to_vec();
    };
    let len = indexed.iter().map(|(index, _)| index + 1).max().unwrap_or(0);
    let mut spread = vec![ScriptValue::Null; len];
    for (index, value) in indexed {
        spread[index] = value.clone();
    }
    spread
}

impl NativeProxy for ClassHandle {
    fn context(&self) -> &Arc<BridgeContext> {
        &self.ctx
    }

    fn member_type(&self) -> TypeId {
        self.reported
    }

    fn receiver(&self) -> Option<&ObjectRef> {
        None
    }

    fn api_name(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassHandle")
            .field("name", &self.name)
            .field("type", &self.ty)
            .field("kind", &self.kind)
            .finish()
    }
}
