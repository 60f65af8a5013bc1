//! Native call requests

use crate::error::{BridgeError, BridgeResult};
use crate::value::ScriptValue;

/// A request to call a native method by name
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    /// Method name
    pub func: String,
    /// Script arguments, in order
    pub args: Vec<ScriptValue>,
    /// Instance dispatch (`true`) or static dispatch (`false`)
    pub instance_method: bool,
}

impl CallSite {
    /// Instance method call
    pub fn instance(func: impl Into<String>, args: Vec<ScriptValue>) -> Self {
        Self {
            func: func.into(),
            args,
            instance_method: true,
        }
    }

    /// Static method call
    pub fn static_call(func: impl Into<String>, args: Vec<ScriptValue>) -> Self {
        Self {
            func: func.into(),
            args,
            instance_method: false,
        }
    }

    /// Decode the dictionary form `{func, args, instanceMethod}`.
    ///
    /// `args` may be omitted; `instanceMethod` defaults to true.
    pub fn from_dict(value: &ScriptValue) -> BridgeResult<Self> {
        let entries = value.as_dict().ok_or_else(|| {
            BridgeError::invalid_argument(format!(
                "call descriptor must be a dictionary, got {}",
                value.type_name()
            ))
        })?;
        let func = entries
            .get("func")
            .and_then(ScriptValue::as_str)
            .ok_or_else(|| BridgeError::invalid_argument("call descriptor is missing `func`"))?;
        let args = match entries.get("args") {
            None | Some(ScriptValue::Null) => Vec::new(),
            Some(ScriptValue::Array(items)) => items.clone(),
            Some(other) => {
                return Err(BridgeError::invalid_argument(format!(
                    "`args` must be an array, got {}",
                    other.type_name()
                )))
            }
        };
        let instance_method = match entries.get("instanceMethod") {
            None | Some(ScriptValue::Null) => true,
            Some(ScriptValue::Bool(flag)) => *flag,
            Some(other) => {
                return Err(BridgeError::invalid_argument(format!(
                    "`instanceMethod` must be a boolean, got {}",
                    other.type_name()
                )))
            }
        };
        Ok(Self {
            func: func.to_string(),
            args,
            instance_method,
        })
    }
}
