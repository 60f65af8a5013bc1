//! Type registry: the host reflection facility
//!
//! Owns every registered [`NativeType`] and answers the reflective
//! questions the bridge asks about them. The registry is bootstrapped
//! with the primitive kinds, `core.Object`, `core.String`, `core.Number`
//! and the boxed primitive classes; user types are added with
//! [`TypeRegistry::define`].
//!
//! Ids are assigned in registration order. While a definition is being
//! validated its id resolves to a placeholder, so members may name the
//! type itself (or arrays of it). A failed definition hands its id, and
//! the ids of any arrays of it, back for reuse.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builder::{DeclaredKind, FieldBuilder, MethodBuilder, TypeBuilder};
use crate::error::{NativeError, NativeResult};
use crate::handler::InvocationHandler;
use crate::member::{CallContext, Constructor, Field, Method, Signature};
use crate::ty::{Modifiers, NativeType, PrimitiveKind, TypeId, TypeKind};
use crate::value::{NativeObject, NativeValue, ObjectRef};

/// Kind of runtime-generated type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GeneratedKind {
    Subclass,
    Implementation,
}

/// Ids of the bootstrap types
#[derive(Debug, Clone, Copy)]
struct Builtins {
    object: TypeId,
    string: TypeId,
    number: TypeId,
    primitives: [TypeId; 9],
    boxes: [Option<TypeId>; 9],
}

impl Builtins {
    const fn placeholder() -> Self {
        Self {
            object: TypeId(0),
            string: TypeId(0),
            number: TypeId(0),
            primitives: [TypeId(0); 9],
            boxes: [None; 9],
        }
    }
}

fn primitive_slot(kind: PrimitiveKind) -> usize {
    PrimitiveKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(PrimitiveKind::ALL.len() - 1)
}

/// Registry of native types
pub struct TypeRegistry {
    types: RwLock<Vec<Option<Arc<NativeType>>>>,
    names: DashMap<String, TypeId>,
    arrays: DashMap<TypeId, TypeId>,
    generated: DashMap<(TypeId, GeneratedKind), TypeId>,
    /// Ids under definition, plus arrays of them awaiting a name
    pending: DashSet<TypeId>,
    free: Mutex<Vec<TypeId>>,
    builtins: Builtins,
}

impl TypeRegistry {
    /// Create a registry holding only the bootstrap types
    pub fn new() -> Self {
        let mut registry = Self {
            types: RwLock::new(Vec::new()),
            names: DashMap::new(),
            arrays: DashMap::new(),
            generated: DashMap::new(),
            pending: DashSet::new(),
            free: Mutex::new(Vec::new()),
            builtins: Builtins::placeholder(),
        };
        registry.bootstrap();
        registry
    }

    // ========================================================================
    // Bootstrap
    // ========================================================================

    fn bootstrap(&mut self) {
        for kind in PrimitiveKind::ALL {
            let id = self.reserve_slot();
            self.install_bootstrap(NativeType {
                id,
                name: kind.name().to_string(),
                kind: TypeKind::Primitive(kind),
                modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
                ..Self::blank(id)
            });
            self.builtins.primitives[primitive_slot(kind)] = id;
        }

        let object = self.reserve_slot();
        let string = self.reserve_slot();
        self.builtins.object = object;
        self.builtins.string = string;
        let boolean = self.primitive(PrimitiveKind::Boolean);
        let int = self.primitive(PrimitiveKind::Int);
        let identity_methods = vec![
            MethodBuilder::new("equals")
                .param(object)
                .returns(boolean)
                .body(|ctx| {
                    let this = ctx.this()?;
                    Ok(NativeValue::Boolean(matches!(
                        ctx.arg(0)?,
                        NativeValue::Object(other) if Arc::ptr_eq(other, this)
                    )))
                }),
            MethodBuilder::new("hashCode")
                .returns(int)
                .body(|ctx| Ok(NativeValue::Int(ctx.this()?.identity_hash()))),
            MethodBuilder::new("toString").returns(string).body(|ctx| {
                let this = ctx.this()?;
                Ok(NativeValue::string(format!(
                    "{}@{:x}",
                    ctx.registry().type_name(this.class()),
                    this.identity_hash()
                )))
            }),
        ];
        let methods = identity_methods
            .into_iter()
            .map(|m| Arc::new(self.build_method(object, m, false)))
            .collect();
        self.install_bootstrap(NativeType {
            name: "core.Object".to_string(),
            methods,
            constructors: vec![Arc::new(Constructor {
                declaring: object,
                params: Vec::new(),
                modifiers: Modifiers::PUBLIC,
                varargs: false,
                body: None,
            })],
            ..Self::blank(object)
        });

        self.install_bootstrap(NativeType {
            name: "core.String".to_string(),
            modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
            superclass: Some(object),
            ..Self::blank(string)
        });
        self.builtins.number = self.bootstrap_class("core.Number", object, Modifiers::PUBLIC | Modifiers::ABSTRACT);

        for kind in PrimitiveKind::ALL {
            let Some(name) = kind.boxed_name() else { continue };
            let superclass = if kind.is_numeric() { self.builtins.number } else { object };
            let id = self.bootstrap_class(name, superclass, Modifiers::PUBLIC | Modifiers::FINAL);
            self.builtins.boxes[primitive_slot(kind)] = Some(id);
        }
    }

    fn bootstrap_class(&self, name: &str, superclass: TypeId, modifiers: Modifiers) -> TypeId {
        let id = self.reserve_slot();
        self.install_bootstrap(NativeType {
            name: name.to_string(),
            modifiers,
            superclass: Some(superclass),
            ..Self::blank(id)
        });
        id
    }

    fn install_bootstrap(&self, ty: NativeType) {
        if let Err(err) = self.install(ty) {
            tracing::error!(error = %err, "bootstrap type collided");
        }
    }

    fn blank(id: TypeId) -> NativeType {
        NativeType {
            id,
            name: String::new(),
            kind: TypeKind::Class,
            modifiers: Modifiers::PUBLIC,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            statics: RwLock::new(FxHashMap::default()),
            generated: false,
        }
    }

    fn reserve_slot(&self) -> TypeId {
        let mut types = self.types.write();
        if let Some(id) = self.free.lock().pop() {
            return id;
        }
        let id = TypeId(types.len() as u32);
        types.push(None);
        id
    }

    /// Fill a slot without publishing the name
    fn fill_slot(&self, ty: NativeType) {
        let mut types = self.types.write();
        if let Some(slot) = types.get_mut(ty.id.index()) {
            *slot = Some(Arc::new(ty));
        }
    }

    /// Give a failed definition's id back, along with any arrays of it
    fn release(&self, id: TypeId) {
        let mut doomed = vec![id];
        let mut current = id;
        while let Some((_, array)) = self.arrays.remove(&current) {
            doomed.push(array);
            current = array;
        }
        let mut types = self.types.write();
        let mut free = self.free.lock();
        for id in doomed {
            self.pending.remove(&id);
            if let Some(slot) = types.get_mut(id.index()) {
                *slot = None;
            }
            free.push(id);
        }
    }

    /// Name the arrays of a freshly installed type
    fn publish_arrays(&self, component: TypeId) {
        self.pending.remove(&component);
        let mut current = component;
        while let Some(array) = self.arrays.get(&current).map(|entry| *entry) {
            if self.pending.remove(&array).is_none() {
                break;
            }
            let name = format!("{}[]", self.type_name(current));
            if let Err(err) = self.install(self.array_type(array, current, name)) {
                tracing::warn!(error = %err, "array type name already taken");
            }
            current = array;
        }
    }

    fn install(&self, ty: NativeType) -> NativeResult<TypeId> {
        let id = ty.id;
        match self.names.entry(ty.name.clone()) {
            Entry::Occupied(_) => return Err(NativeError::DuplicateType { name: ty.name }),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        let mut types = self.types.write();
        if let Some(slot) = types.get_mut(id.index()) {
            *slot = Some(Arc::new(ty));
        }
        Ok(id)
    }

    // ========================================================================
    // Definition
    // ========================================================================

    /// Register a class or interface
    pub fn define(&self, builder: TypeBuilder) -> NativeResult<TypeId> {
        if self.names.contains_key(builder.name()) {
            return Err(NativeError::DuplicateType {
                name: builder.name().to_string(),
            });
        }
        self.define_with(|_| builder)
    }

    /// Register a type whose members need to refer to its own id
    pub fn define_with<F>(&self, build: F) -> NativeResult<TypeId>
    where
        F: FnOnce(TypeId) -> TypeBuilder,
    {
        let id = self.reserve_slot();
        self.pending.insert(id);
        self.fill_slot(Self::blank(id));
        let builder = build(id);
        self.fill_slot(NativeType {
            name: builder.name.clone(),
            kind: match builder.kind {
                DeclaredKind::Interface => TypeKind::Interface,
                DeclaredKind::Class => TypeKind::Class,
            },
            ..Self::blank(id)
        });

        let installed = self
            .materialize(id, builder)
            .and_then(|ty| {
                tracing::trace!(name = %ty.name, id = %id, "defined native type");
                self.install(ty)
            });
        match installed {
            Ok(id) => {
                self.publish_arrays(id);
                Ok(id)
            }
            Err(err) => {
                tracing::debug!(id = %id, error = %err, "released failed definition");
                self.release(id);
                Err(err)
            }
        }
    }

    fn materialize(&self, id: TypeId, builder: TypeBuilder) -> NativeResult<NativeType> {
        let interface = builder.kind == DeclaredKind::Interface;

        let superclass = if interface {
            if let Some(sup) = builder.superclass {
                return Err(NativeError::illegal_argument(format!(
                    "interface {} cannot extend class {}",
                    builder.name,
                    self.type_name(sup)
                )));
            }
            None
        } else {
            let sup = builder.superclass.unwrap_or(self.builtins.object);
            if sup == id {
                return Err(NativeError::NotInheritable {
                    name: builder.name,
                    reason: "a class cannot extend itself".to_string(),
                });
            }
            let sup_ty = self.require(sup)?;
            if !sup_ty.is_class() {
                return Err(NativeError::NotInheritable {
                    name: sup_ty.name.clone(),
                    reason: "not a class".to_string(),
                });
            }
            if sup_ty.modifiers.is_final() {
                return Err(NativeError::NotInheritable {
                    name: sup_ty.name.clone(),
                    reason: "final".to_string(),
                });
            }
            Some(sup)
        };

        for iface in &builder.interfaces {
            if *iface == id {
                return Err(NativeError::illegal_argument(format!(
                    "{} cannot implement itself",
                    builder.name
                )));
            }
            if !self.require(*iface)?.is_interface() {
                return Err(NativeError::illegal_argument(format!(
                    "{} is not an interface",
                    self.type_name(*iface)
                )));
            }
        }

        if interface && !builder.constructors.is_empty() {
            return Err(NativeError::illegal_argument(format!(
                "interface {} cannot declare constructors",
                builder.name
            )));
        }

        let mut methods = Vec::with_capacity(builder.methods.len());
        for method in builder.methods {
            self.check_signature(&method.params, method.varargs, &method.name)?;
            if let Some(ret) = method.returns {
                self.require(ret)?;
            }
            methods.push(Arc::new(self.build_method(id, method, interface)));
        }

        let mut constructors = Vec::with_capacity(builder.constructors.len());
        for ctor in builder.constructors {
            self.check_signature(&ctor.params, ctor.varargs, "<init>")?;
            constructors.push(Arc::new(Constructor {
                declaring: id,
                params: ctor.params,
                modifiers: ctor.modifiers,
                varargs: ctor.varargs,
                body: ctor.body,
            }));
        }

        let mut statics = FxHashMap::default();
        let mut fields = Vec::with_capacity(builder.fields.len());
        for field in builder.fields {
            let field = self.build_field(id, field)?;
            if field.is_static() {
                statics.insert(field.name.clone(), field.default.clone());
            }
            fields.push(Arc::new(field));
        }

        Ok(NativeType {
            id,
            name: builder.name,
            kind: if interface { TypeKind::Interface } else { TypeKind::Class },
            modifiers: builder.modifiers,
            superclass,
            interfaces: builder.interfaces,
            methods,
            constructors,
            fields,
            statics: RwLock::new(statics),
            generated: false,
        })
    }

    fn build_method(&self, declaring: TypeId, method: MethodBuilder, interface: bool) -> Method {
        let mut modifiers = method.modifiers;
        if interface && method.body.is_none() && !modifiers.is_static() {
            modifiers = modifiers | Modifiers::ABSTRACT;
        }
        Method {
            name: method.name,
            declaring,
            params: method.params,
            return_type: method.returns.unwrap_or(self.void_type()),
            modifiers,
            varargs: method.varargs,
            body: method.body,
        }
    }

    fn build_field(&self, declaring: TypeId, field: FieldBuilder) -> NativeResult<Field> {
        let ty = self.require(field.ty)?;
        let default = match field.default {
            Some(value) => {
                if !self.check_value(field.ty, &value) {
                    return Err(NativeError::illegal_argument(format!(
                        "default of field {} is not a {}",
                        field.name, ty.name
                    )));
                }
                value
            }
            None => ty.primitive_kind().map(PrimitiveKind::zero).unwrap_or(NativeValue::Null),
        };
        Ok(Field {
            name: field.name,
            declaring,
            ty: field.ty,
            modifiers: field.modifiers,
            default,
        })
    }

    fn check_signature(&self, params: &[TypeId], varargs: bool, member: &str) -> NativeResult<()> {
        for param in params {
            let ty = self.require(*param)?;
            if ty.primitive_kind() == Some(PrimitiveKind::Void) {
                return Err(NativeError::illegal_argument(format!(
                    "{}: void is not a parameter type",
                    member
                )));
            }
        }
        if varargs {
            let last = params.last().and_then(|p| self.component_type(*p));
            if last.is_none() {
                return Err(NativeError::illegal_argument(format!(
                    "{}: varargs member must end with an array parameter",
                    member
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Look up a type by id
    pub fn get(&self, id: TypeId) -> Option<Arc<NativeType>> {
        self.types.read().get(id.index()).and_then(|slot| slot.clone())
    }

    /// Look up a type by id, failing with [`NativeError::TypeNotFound`]
    pub fn require(&self, id: TypeId) -> NativeResult<Arc<NativeType>> {
        self.get(id).ok_or_else(|| NativeError::TypeNotFound {
            name: id.to_string(),
        })
    }

    /// Look up a type by name; `T[]` names resolve (and register) array types
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        if let Some(id) = self.names.get(name) {
            return Some(*id);
        }
        let component = name.strip_suffix("[]")?;
        let component = self.lookup(component)?;
        self.array_of(component).ok()
    }

    /// Name of a type, or a placeholder for unknown ids
    pub fn type_name(&self, id: TypeId) -> String {
        self.get(id)
            .map(|ty| ty.name.clone())
            .unwrap_or_else(|| format!("<unknown {}>", id))
    }

    /// Number of type slots in use
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether the registry holds no types (never true after bootstrap)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered types, in id order
    pub fn types(&self) -> Vec<Arc<NativeType>> {
        self.types.read().iter().flatten().cloned().collect()
    }

    /// `core.Object`
    pub fn object_type(&self) -> TypeId {
        self.builtins.object
    }

    /// `core.String`
    pub fn string_type(&self) -> TypeId {
        self.builtins.string
    }

    /// `core.Number`
    pub fn number_type(&self) -> TypeId {
        self.builtins.number
    }

    /// `void`
    pub fn void_type(&self) -> TypeId {
        self.primitive(PrimitiveKind::Void)
    }

    /// Type id of a primitive kind
    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        self.builtins.primitives[primitive_slot(kind)]
    }

    /// Boxed class of a primitive kind (`None` for void)
    pub fn boxed(&self, kind: PrimitiveKind) -> Option<TypeId> {
        self.builtins.boxes[primitive_slot(kind)]
    }

    /// Primitive kind of a primitive type or its boxed class
    pub fn unboxed_kind(&self, ty: TypeId) -> Option<PrimitiveKind> {
        PrimitiveKind::ALL.iter().copied().find(|kind| {
            self.builtins.primitives[primitive_slot(*kind)] == ty
                || self.builtins.boxes[primitive_slot(*kind)] == Some(ty)
        })
    }

    /// Component type of an array type
    pub fn component_type(&self, ty: TypeId) -> Option<TypeId> {
        self.get(ty).and_then(|t| t.component_type())
    }

    /// Runtime type of a value; primitives report their boxed class, null has none
    pub fn runtime_type(&self, value: &NativeValue) -> Option<TypeId> {
        match value {
            NativeValue::Null | NativeValue::Void => None,
            NativeValue::String(_) => Some(self.builtins.string),
            NativeValue::Object(object) => Some(object.class()),
            other => other.primitive_kind().and_then(|kind| self.boxed(kind)),
        }
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Array type with the given component, registered on first use
    pub fn array_of(&self, component: TypeId) -> NativeResult<TypeId> {
        if let Some(existing) = self.arrays.get(&component) {
            return Ok(*existing);
        }
        let component_ty = self.require(component)?;
        if component_ty.primitive_kind() == Some(PrimitiveKind::Void) {
            return Err(NativeError::illegal_argument("void[] is not a type"));
        }
        match self.arrays.entry(component) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                let id = self.reserve_slot();
                let ty = self.array_type(id, component, format!("{}[]", component_ty.name));
                if self.pending.contains(&component) {
                    // named once the component is installed
                    self.pending.insert(id);
                    self.fill_slot(ty);
                } else {
                    self.install(ty)?;
                }
                slot.insert(id);
                Ok(id)
            }
        }
    }

    fn array_type(&self, id: TypeId, component: TypeId, name: String) -> NativeType {
        NativeType {
            name,
            kind: TypeKind::Array(component),
            modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
            superclass: Some(self.builtins.object),
            ..Self::blank(id)
        }
    }

    /// Allocate an array of `component` holding `elements`
    pub fn new_array(&self, component: TypeId, elements: Vec<NativeValue>) -> NativeResult<ObjectRef> {
        let array = self.array_of(component)?;
        for (index, element) in elements.iter().enumerate() {
            if !self.check_value(component, element) {
                return Err(NativeError::illegal_argument(format!(
                    "element {} is not a {}: {:?}",
                    index,
                    self.type_name(component),
                    element
                )));
            }
        }
        Ok(Arc::new(NativeObject::with_elements(array, elements)))
    }

    /// Store one element into an array, checking the component type
    pub fn store_element(&self, array: &ObjectRef, index: usize, value: NativeValue) -> NativeResult<()> {
        let component = self.component_type(array.class()).ok_or_else(|| {
            NativeError::illegal_argument(format!("{} is not an array", self.type_name(array.class())))
        })?;
        if !self.check_value(component, &value) {
            return Err(NativeError::illegal_argument(format!(
                "cannot store {:?} into {}",
                value,
                self.type_name(array.class())
            )));
        }
        if array.array_set(index, value) {
            Ok(())
        } else {
            Err(NativeError::illegal_argument(format!(
                "index {} out of bounds for length {}",
                index,
                array.array_len()
            )))
        }
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// `ty`, its superclass chain and its interfaces, most derived first.
    /// Interfaces see `core.Object` after their own supertypes.
    pub(crate) fn linearize(&self, ty: TypeId) -> Vec<Arc<NativeType>> {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        self.linearize_into(ty, &mut order, &mut seen);
        order
    }

    fn linearize_into(&self, ty: TypeId, order: &mut Vec<Arc<NativeType>>, seen: &mut FxHashSet<TypeId>) {
        if !seen.insert(ty) {
            return;
        }
        let Some(native) = self.get(ty) else { return };
        order.push(native.clone());
        if let Some(sup) = native.superclass {
            self.linearize_into(sup, order, seen);
        }
        for iface in &native.interfaces {
            self.linearize_into(*iface, order, seen);
        }
        if native.is_interface() {
            self.linearize_into(self.builtins.object, order, seen);
        }
    }

    fn all_methods(&self, ty: TypeId) -> Vec<Arc<Method>> {
        let mut methods: Vec<Arc<Method>> = Vec::new();
        for native in self.linearize(ty) {
            for method in &native.methods {
                if !methods.iter().any(|m| m.same_signature(method)) {
                    methods.push(method.clone());
                }
            }
        }
        methods
    }

    /// Public and protected methods of `ty` including inherited ones;
    /// overridden declarations are reported once, most derived first
    pub fn methods(&self, ty: TypeId) -> Vec<Arc<Method>> {
        self.all_methods(ty)
            .into_iter()
            .filter(|m| m.modifiers.is_accessible())
            .collect()
    }

    /// Whether `ty` has a method called `name` that the bridge may not call
    pub fn has_restricted_method(&self, ty: TypeId, name: &str) -> bool {
        self.all_methods(ty)
            .iter()
            .any(|m| m.name == name && !m.modifiers.is_accessible())
    }

    /// Public and protected constructors declared by `ty`
    pub fn constructors(&self, ty: TypeId) -> Vec<Arc<Constructor>> {
        self.get(ty)
            .map(|t| {
                t.constructors
                    .iter()
                    .filter(|c| c.modifiers.is_accessible())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `ty` declares constructors the bridge may not call
    pub fn has_restricted_constructor(&self, ty: TypeId) -> bool {
        self.get(ty)
            .map(|t| t.constructors.iter().any(|c| !c.modifiers.is_accessible()))
            .unwrap_or(false)
    }

    /// Field called `name`, searching the superclass chain then interfaces
    pub fn field(&self, ty: TypeId, name: &str) -> Option<Arc<Field>> {
        self.linearize(ty)
            .iter()
            .find_map(|native| native.fields.iter().find(|f| f.name == name).cloned())
    }

    fn instance_defaults(&self, ty: TypeId) -> FxHashMap<String, NativeValue> {
        let mut values = FxHashMap::default();
        for native in self.linearize(ty) {
            for field in native.fields.iter().filter(|f| !f.is_static()) {
                values
                    .entry(field.name.clone())
                    .or_insert_with(|| field.default.clone());
            }
        }
        values
    }

    /// `Type.member(param, ...)` for messages
    pub fn describe(&self, name: &str, member: &dyn Signature) -> String {
        let params: Vec<String> = member
            .parameter_types()
            .iter()
            .map(|p| self.type_name(*p))
            .collect();
        format!(
            "{}.{}({})",
            self.type_name(member.declaring_type()),
            name,
            params.join(", ")
        )
    }

    // ========================================================================
    // Construction and invocation
    // ========================================================================

    fn check_arguments(&self, params: &[TypeId], args: &[NativeValue], member: &dyn Fn() -> String) -> NativeResult<()> {
        if params.len() != args.len() {
            return Err(NativeError::illegal_argument(format!(
                "wrong number of arguments for {}: expected {}, got {}",
                member(),
                params.len(),
                args.len()
            )));
        }
        for (index, (param, arg)) in params.iter().zip(args).enumerate() {
            if !self.check_value(*param, arg) {
                return Err(NativeError::illegal_argument(format!(
                    "argument {} of {}: expected {}, got {:?}",
                    index,
                    member(),
                    self.type_name(*param),
                    arg
                )));
            }
        }
        Ok(())
    }

    /// Run `ctor` on a fresh instance of its declaring class.
    ///
    /// `handler` is attached before the initializer runs, so virtual calls
    /// made from the initializer are already intercepted.
    pub fn construct(
        &self,
        ctor: &Arc<Constructor>,
        args: &[NativeValue],
        handler: Option<Arc<dyn InvocationHandler>>,
    ) -> NativeResult<ObjectRef> {
        let ty = self.require(ctor.declaring)?;
        if !ty.is_class() || ty.modifiers.is_abstract() {
            return Err(NativeError::NotInstantiable { name: ty.name.clone() });
        }
        self.check_arguments(&ctor.params, args, &|| self.describe("<init>", ctor.as_ref()))?;

        let object = Arc::new(NativeObject::with_fields(ty.id, self.instance_defaults(ty.id)));
        if let Some(handler) = handler {
            object.attach_handler(handler);
        }
        if let Some(body) = ctor.body() {
            body(&CallContext::new(self, Some(&object), args))?;
        }
        tracing::trace!(class = %ty.name, "constructed native object");
        Ok(object)
    }

    /// Invoke `method` with virtual dispatch on `receiver`.
    ///
    /// Non-final instance methods of an object carrying a handler go to
    /// the handler; everything else runs the most derived implementation.
    pub fn invoke(
        &self,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        self.dispatch(method, receiver, args, true)
    }

    /// Invoke `method` like [`invoke`](Self::invoke) but never hand the
    /// call to the receiver's handler
    pub fn invoke_forced(
        &self,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        self.dispatch(method, receiver, args, false)
    }

    fn dispatch(
        &self,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[NativeValue],
        through_handler: bool,
    ) -> NativeResult<NativeValue> {
        self.check_arguments(&method.params, args, &|| self.describe(&method.name, method.as_ref()))?;
        if method.is_static() {
            return self.run_body(method, None, args);
        }
        let receiver = receiver.ok_or_else(|| NativeError::NullReceiver {
            member: self.describe(&method.name, method.as_ref()),
        })?;
        if !self.is_assignable(receiver.class(), method.declaring) {
            return Err(NativeError::illegal_argument(format!(
                "{} is not an instance of {}",
                self.type_name(receiver.class()),
                self.type_name(method.declaring)
            )));
        }
        if through_handler && !method.is_final() {
            if let Some(handler) = receiver.handler() {
                return handler.invoke(self, receiver, method, args);
            }
        }
        self.invoke_direct(method, receiver, args)
    }

    /// Run the most derived implementation of `method`, bypassing any handler
    pub fn invoke_direct(
        &self,
        method: &Arc<Method>,
        receiver: &ObjectRef,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        let target = self
            .find_implementation(receiver.class(), method)
            .unwrap_or_else(|| method.clone());
        self.run_body(&target, Some(receiver), args)
    }

    /// Whether some type in `class`'s hierarchy implements `method`
    pub fn has_implementation(&self, class: TypeId, method: &Method) -> bool {
        self.find_implementation(class, method).is_some()
    }

    fn find_implementation(&self, class: TypeId, method: &Method) -> Option<Arc<Method>> {
        self.linearize(class).iter().find_map(|native| {
            native
                .methods
                .iter()
                .find(|m| m.same_signature(method) && m.body.is_some() && !m.is_static())
                .cloned()
        })
    }

    fn run_body(
        &self,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[NativeValue],
    ) -> NativeResult<NativeValue> {
        let body = method.body().ok_or_else(|| NativeError::AbstractMethod {
            method: self.describe(&method.name, method.as_ref()),
        })?;
        let result = body(&CallContext::new(self, receiver, args))?;
        if method.return_type == self.void_type() {
            Ok(NativeValue::Void)
        } else {
            Ok(result)
        }
    }

    /// Invoke the first instance method called `name` that accepts `args`
    pub fn invoke_virtual(&self, receiver: &ObjectRef, name: &str, args: &[NativeValue]) -> NativeResult<NativeValue> {
        let method = self
            .all_methods(receiver.class())
            .into_iter()
            .find(|m| {
                m.name == name
                    && !m.is_static()
                    && m.params.len() == args.len()
                    && m.params.iter().zip(args).all(|(p, a)| self.check_value(*p, a))
            })
            .ok_or_else(|| NativeError::NoSuchMember {
                member: format!("{}.{}", self.type_name(receiver.class()), name),
            })?;
        self.invoke(&method, Some(receiver), args)
    }

    // ========================================================================
    // Fields
    // ========================================================================

    /// Read a field; static fields ignore `receiver`
    pub fn get_field(&self, field: &Field, receiver: Option<&ObjectRef>) -> NativeResult<NativeValue> {
        if field.is_static() {
            let owner = self.require(field.declaring)?;
            let value = owner.statics.read().get(&field.name).cloned();
            return Ok(value.unwrap_or_else(|| field.default.clone()));
        }
        let receiver = receiver.ok_or_else(|| NativeError::NullReceiver {
            member: field.name.clone(),
        })?;
        receiver.get_field(&field.name).ok_or_else(|| NativeError::NoSuchMember {
            member: format!("{}.{}", self.type_name(receiver.class()), field.name),
        })
    }

    /// Write a field; the value must already have the field's type
    pub fn set_field(&self, field: &Field, receiver: Option<&ObjectRef>, value: NativeValue) -> NativeResult<()> {
        if field.modifiers.is_final() {
            return Err(NativeError::IllegalAccess {
                message: format!("field {} is final", field.name),
            });
        }
        if !self.check_value(field.ty, &value) {
            return Err(NativeError::illegal_argument(format!(
                "cannot assign {:?} to field {} of type {}",
                value,
                field.name,
                self.type_name(field.ty)
            )));
        }
        if field.is_static() {
            let owner = self.require(field.declaring)?;
            owner.statics.write().insert(field.name.clone(), value);
            return Ok(());
        }
        let receiver = receiver.ok_or_else(|| NativeError::NullReceiver {
            member: field.name.clone(),
        })?;
        if receiver.set_field(&field.name, value) {
            Ok(())
        } else {
            Err(NativeError::NoSuchMember {
                member: format!("{}.{}", self.type_name(receiver.class()), field.name),
            })
        }
    }

    // ========================================================================
    // Runtime type generation
    // ========================================================================

    /// Generate (once per base) a subclass of `base` whose instances accept
    /// an invocation handler. Accessible constructors are mirrored as public.
    pub fn generate_subclass(&self, base: TypeId) -> NativeResult<TypeId> {
        let base_ty = self.require(base)?;
        let refuse = |reason: &str| NativeError::NotInheritable {
            name: base_ty.name.clone(),
            reason: reason.to_string(),
        };
        if base_ty.is_interface() {
            return Err(refuse("interfaces are implemented, not extended"));
        }
        if !base_ty.is_class() {
            return Err(refuse("not a class"));
        }
        if base_ty.modifiers.is_final() {
            return Err(refuse("final"));
        }
        if base_ty.modifiers.is_private() {
            return Err(refuse("private"));
        }

        match self.generated.entry((base, GeneratedKind::Subclass)) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                let id = self.reserve_slot();
                let constructors = self
                    .constructors(base)
                    .iter()
                    .map(|c| {
                        Arc::new(Constructor {
                            declaring: id,
                            params: c.params.clone(),
                            modifiers: Modifiers::PUBLIC,
                            varargs: c.varargs,
                            body: c.body.clone(),
                        })
                    })
                    .collect();
                self.install(NativeType {
                    name: format!("{}$Subclass", base_ty.name),
                    superclass: Some(base),
                    constructors,
                    generated: true,
                    ..Self::blank(id)
                })?;
                tracing::debug!(base = %base_ty.name, id = %id, "generated subclass");
                slot.insert(id);
                Ok(id)
            }
        }
    }

    /// Generate (once per interface) a class implementing `interface` with
    /// a single public no-argument constructor and no method bodies
    pub fn generate_implementation(&self, interface: TypeId) -> NativeResult<TypeId> {
        let iface = self.require(interface)?;
        if !iface.is_interface() {
            return Err(NativeError::illegal_argument(format!(
                "{} is not an interface",
                iface.name
            )));
        }

        match self.generated.entry((interface, GeneratedKind::Implementation)) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                let id = self.reserve_slot();
                self.install(NativeType {
                    name: format!("{}$Implementation", iface.name),
                    superclass: Some(self.builtins.object),
                    interfaces: vec![interface],
                    constructors: vec![Arc::new(Constructor {
                        declaring: id,
                        params: Vec::new(),
                        modifiers: Modifiers::PUBLIC,
                        varargs: false,
                        body: None,
                    })],
                    generated: true,
                    ..Self::blank(id)
                })?;
                tracing::debug!(interface = %iface.name, id = %id, "generated interface implementation");
                slot.insert(id);
                Ok(id)
            }
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .field("arrays", &self.arrays.len())
            .field("generated", &self.generated.len())
            .finish()
    }
}
