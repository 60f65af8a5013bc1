//! Value marshalling between script and native representations
//!
//! Inbound, script values are first *unwrapped* into native values
//! (handles give up their object, script arrays become `core.Object[]`),
//! then *converted* to the exact declared parameter type once overload
//! resolution has picked a member. Outbound, native values are reshaped
//! for script code: `char` becomes a one-character string, `char[]` a
//! string, `byte` and `byte[]` widen to short, and every other object is
//! wrapped in an instance handle.

use std::sync::Arc;

use hyperbridge_types::{NativeValue, ObjectRef, PrimitiveKind, TypeId, TypeKind, TypeRegistry};

use crate::context::BridgeContext;
use crate::error::{BridgeError, BridgeResult};
use crate::value::{PrimitiveArray, ScriptValue};

// ============================================================================
// Script -> native
// ============================================================================

/// Unwrap one script value into its native form
pub fn unwrap_argument(registry: &TypeRegistry, value: &ScriptValue) -> BridgeResult<NativeValue> {
    Ok(match value {
        ScriptValue::Null => NativeValue::Null,
        ScriptValue::Bool(v) => NativeValue::Boolean(*v),
        ScriptValue::Short(v) => NativeValue::Short(*v),
        ScriptValue::Int(v) => NativeValue::Int(*v),
        ScriptValue::Long(v) => NativeValue::Long(*v),
        ScriptValue::Float(v) => NativeValue::Float(*v),
        ScriptValue::Double(v) => NativeValue::Double(*v),
        ScriptValue::String(s) => NativeValue::string(s),
        ScriptValue::Instance(handle) => NativeValue::Object(handle.target().clone()),
        ScriptValue::Array(items) => {
            let elements = unwrap_arguments(registry, items)?;
            NativeValue::Object(new_array(registry, registry.object_type(), elements)?)
        }
        ScriptValue::PrimitiveArray(array) => {
            let (kind, elements) = primitive_array_elements(array);
            NativeValue::Object(new_array(registry, registry.primitive(kind), elements)?)
        }
        ScriptValue::Class(handle) => {
            return Err(BridgeError::marshal(format!(
                "class proxy {} cannot be passed as a native value",
                handle.api_name()
            )))
        }
        ScriptValue::Dict(_) | ScriptValue::Function(_) => {
            return Err(BridgeError::marshal(format!(
                "a script {} has no native counterpart",
                value.type_name()
            )))
        }
    })
}

/// Unwrap every script value in order
pub fn unwrap_arguments(registry: &TypeRegistry, values: &[ScriptValue]) -> BridgeResult<Vec<NativeValue>> {
    values.iter().map(|v| unwrap_argument(registry, v)).collect()
}

fn primitive_array_elements(array: &PrimitiveArray) -> (PrimitiveKind, Vec<NativeValue>) {
    match array {
        PrimitiveArray::Boolean(v) => (PrimitiveKind::Boolean, v.iter().map(|x| NativeValue::Boolean(*x)).collect()),
        PrimitiveArray::Short(v) => (PrimitiveKind::Short, v.iter().map(|x| NativeValue::Short(*x)).collect()),
        PrimitiveArray::Int(v) => (PrimitiveKind::Int, v.iter().map(|x| NativeValue::Int(*x)).collect()),
        PrimitiveArray::Long(v) => (PrimitiveKind::Long, v.iter().map(|x| NativeValue::Long(*x)).collect()),
        PrimitiveArray::Float(v) => (PrimitiveKind::Float, v.iter().map(|x| NativeValue::Float(*x)).collect()),
        PrimitiveArray::Double(v) => (PrimitiveKind::Double, v.iter().map(|x| NativeValue::Double(*x)).collect()),
    }
}

fn new_array(registry: &TypeRegistry, component: TypeId, elements: Vec<NativeValue>) -> BridgeResult<ObjectRef> {
    registry
        .new_array(component, elements)
        .map_err(|err| BridgeError::marshal(err.to_string()))
}

/// Numeric payload of a native value
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Integral(i64),
    Floating(f64),
}

impl Numeric {
    fn of(value: &NativeValue) -> Option<Self> {
        match value {
            NativeValue::Float(v) => Some(Numeric::Floating(*v as f64)),
            NativeValue::Double(v) => Some(Numeric::Floating(*v)),
            other => other.as_i64().map(Numeric::Integral),
        }
    }

    fn to_kind(self, kind: PrimitiveKind) -> Option<NativeValue> {
        // narrowing truncates integrals and saturates floating values
        Some(match (kind, self) {
            (PrimitiveKind::Byte, Numeric::Integral(v)) => NativeValue::Byte(v as i8),
            (PrimitiveKind::Byte, Numeric::Floating(v)) => NativeValue::Byte(v as i32 as i8),
            (PrimitiveKind::Short, Numeric::Integral(v)) => NativeValue::Short(v as i16),
            (PrimitiveKind::Short, Numeric::Floating(v)) => NativeValue::Short(v as i32 as i16),
            (PrimitiveKind::Int, Numeric::Integral(v)) => NativeValue::Int(v as i32),
            (PrimitiveKind::Int, Numeric::Floating(v)) => NativeValue::Int(v as i32),
            (PrimitiveKind::Long, Numeric::Integral(v)) => NativeValue::Long(v),
            (PrimitiveKind::Long, Numeric::Floating(v)) => NativeValue::Long(v as i64),
            (PrimitiveKind::Float, Numeric::Integral(v)) => NativeValue::Float(v as f32),
            (PrimitiveKind::Float, Numeric::Floating(v)) => NativeValue::Float(v as f32),
            (PrimitiveKind::Double, Numeric::Integral(v)) => NativeValue::Double(v as f64),
            (PrimitiveKind::Double, Numeric::Floating(v)) => NativeValue::Double(v),
            _ => return None,
        })
    }
}

fn mismatch(registry: &TypeRegistry, value: &NativeValue, target: TypeId) -> BridgeError {
    BridgeError::marshal(format!(
        "cannot convert {:?} to {}",
        value,
        registry.type_name(target)
    ))
}

/// Convert an unwrapped value to exactly `target`
pub fn convert_to(registry: &TypeRegistry, value: NativeValue, target: TypeId) -> BridgeResult<NativeValue> {
    let target_ty = registry
        .get(target)
        .ok_or_else(|| BridgeError::not_found(format!("type {}", target)))?;
    match target_ty.kind() {
        TypeKind::Primitive(kind) => convert_primitive(registry, value, kind, target),
        TypeKind::Array(component) => convert_array(registry, value, target, component),
        TypeKind::Class | TypeKind::Interface => {
            if registry.check_value(target, &value) {
                Ok(value)
            } else {
                Err(mismatch(registry, &value, target))
            }
        }
    }
}

fn convert_primitive(
    registry: &TypeRegistry,
    value: NativeValue,
    kind: PrimitiveKind,
    target: TypeId,
) -> BridgeResult<NativeValue> {
    let converted = match kind {
        PrimitiveKind::Boolean => value.as_bool().map(NativeValue::Boolean),
        PrimitiveKind::Char => char_of(&value),
        PrimitiveKind::Void => None,
        numeric => Numeric::of(&value).and_then(|n| n.to_kind(numeric)),
    };
    converted.ok_or_else(|| mismatch(registry, &value, target))
}

/// A single UTF-16 unit from a char, a one-unit string, or an integer code
fn char_of(value: &NativeValue) -> Option<NativeValue> {
    match value {
        NativeValue::Char(c) => Some(NativeValue::Char(*c)),
        NativeValue::String(s) => {
            let mut units = s.encode_utf16();
            match (units.next(), units.next()) {
                (Some(unit), None) => Some(NativeValue::Char(unit)),
                _ => None,
            }
        }
        other => other
            .as_i64()
            .and_then(|code| u16::try_from(code).ok())
            .map(NativeValue::Char),
    }
}

fn convert_array(
    registry: &TypeRegistry,
    value: NativeValue,
    target: TypeId,
    component: TypeId,
) -> BridgeResult<NativeValue> {
    match &value {
        NativeValue::Null => Ok(NativeValue::Null),
        NativeValue::Object(array) if array.class() == target => Ok(value),
        NativeValue::Object(array) if array.is_array() => {
            let elements = array
                .array_elements()
                .into_iter()
                .map(|element| convert_to(registry, element, component))
                .collect::<BridgeResult<Vec<_>>>()?;
            Ok(NativeValue::Object(new_array(registry, component, elements)?))
        }
        NativeValue::String(s) if is_char_type(registry, component) => {
            let units = s.encode_utf16().map(NativeValue::Char).collect();
            Ok(NativeValue::Object(new_array(registry, component, units)?))
        }
        _ => Err(mismatch(registry, &value, target)),
    }
}

fn is_char_type(registry: &TypeRegistry, ty: TypeId) -> bool {
    registry.get(ty).and_then(|t| t.primitive_kind()) == Some(PrimitiveKind::Char)
}

/// Convert arguments to a resolved member's parameter types, packing
/// trailing arguments into one array for a varargs member
pub fn convert_arguments(
    registry: &TypeRegistry,
    args: Vec<NativeValue>,
    params: &[TypeId],
    varargs: bool,
) -> BridgeResult<Vec<NativeValue>> {
    if !varargs {
        if args.len() != params.len() {
            return Err(BridgeError::invalid_argument(format!(
                "expected {} arguments, got {}",
                params.len(),
                args.len()
            )));
        }
        return args
            .into_iter()
            .zip(params)
            .map(|(arg, param)| convert_to(registry, arg, *param))
            .collect();
    }

    let Some((array_param, fixed_params)) = params.split_last() else {
        return Err(BridgeError::invalid_argument("varargs member without parameters"));
    };
    if args.len() < fixed_params.len() {
        return Err(BridgeError::invalid_argument(format!(
            "expected at least {} arguments, got {}",
            fixed_params.len(),
            args.len()
        )));
    }
    let component = registry
        .component_type(*array_param)
        .ok_or_else(|| BridgeError::invalid_argument("varargs parameter is not an array"))?;

    let mut args = args.into_iter();
    let mut converted = Vec::with_capacity(params.len());
    for param in fixed_params {
        if let Some(arg) = args.next() {
            converted.push(convert_to(registry, arg, *param)?);
        }
    }
    let rest = args
        .map(|arg| convert_to(registry, arg, component))
        .collect::<BridgeResult<Vec<_>>>()?;
    converted.push(NativeValue::Object(new_array(registry, component, rest)?));
    Ok(converted)
}

// ============================================================================
// Native -> script
// ============================================================================

/// Reshape a native value for script code
pub fn to_script(ctx: &Arc<BridgeContext>, value: NativeValue) -> ScriptValue {
    match value {
        NativeValue::Null | NativeValue::Void => ScriptValue::Null,
        NativeValue::Boolean(v) => ScriptValue::Bool(v),
        NativeValue::Byte(v) => ScriptValue::Short(v as i16),
        NativeValue::Short(v) => ScriptValue::Short(v),
        NativeValue::Char(v) => ScriptValue::String(String::from_utf16_lossy(&[v])),
        NativeValue::Int(v) => ScriptValue::Int(v),
        NativeValue::Long(v) => ScriptValue::Long(v),
        NativeValue::Float(v) => ScriptValue::Float(v),
        NativeValue::Double(v) => ScriptValue::Double(v),
        NativeValue::String(s) => ScriptValue::String(s.to_string()),
        NativeValue::Object(object) => object_to_script(ctx, object),
    }
}

/// Reshape arguments passed to a script callback
pub fn to_script_arguments(ctx: &Arc<BridgeContext>, args: &[NativeValue]) -> Vec<ScriptValue> {
    args.iter().cloned().map(|arg| to_script(ctx, arg)).collect()
}

fn object_to_script(ctx: &Arc<BridgeContext>, object: ObjectRef) -> ScriptValue {
    let registry = ctx.registry();
    let component_kind = registry
        .component_type(object.class())
        .and_then(|component| registry.get(component))
        .and_then(|component| component.primitive_kind());
    let Some(kind) = component_kind else {
        return ScriptValue::Instance(ctx.wrap_object(object));
    };

    let elements = object.array_elements();
    macro_rules! collect {
        ($pattern:pat => $out:expr) => {
            elements
                .iter()
                .filter_map(|element| match element {
                    $pattern => Some($out),
                    _ => None,
                })
                .collect()
        };
    }
    match kind {
        PrimitiveKind::Char => {
            let units: Vec<u16> = collect!(NativeValue::Char(c) => *c);
            ScriptValue::String(String::from_utf16_lossy(&units))
        }
        PrimitiveKind::Boolean => ScriptValue::PrimitiveArray(PrimitiveArray::Boolean(
            collect!(NativeValue::Boolean(v) => *v),
        )),
        PrimitiveKind::Byte => ScriptValue::PrimitiveArray(PrimitiveArray::Short(
            collect!(NativeValue::Byte(v) => *v as i16),
        )),
        PrimitiveKind::Short => ScriptValue::PrimitiveArray(PrimitiveArray::Short(
            collect!(NativeValue::Short(v) => *v),
        )),
        PrimitiveKind::Int => ScriptValue::PrimitiveArray(PrimitiveArray::Int(
            collect!(NativeValue::Int(v) => *v),
        )),
        PrimitiveKind::Long => ScriptValue::PrimitiveArray(PrimitiveArray::Long(
            collect!(NativeValue::Long(v) => *v),
        )),
        PrimitiveKind::Float => ScriptValue::PrimitiveArray(PrimitiveArray::Float(
            collect!(NativeValue::Float(v) => *v),
        )),
        PrimitiveKind::Double => ScriptValue::PrimitiveArray(PrimitiveArray::Double(
            collect!(NativeValue::Double(v) => *v),
        )),
        PrimitiveKind::Void => ScriptValue::Null,
    }
}
