//! Hyperbridge Engine
//!
//! Lets dynamically typed script code drive a reflective native object
//! model: look up classes, construct objects, call overloaded methods,
//! read and write fields, and subclass or implement native types with
//! script callbacks standing in for overridden methods.
//!
//! # Components
//!
//! - [`matcher`]: distance between a parameter type and an argument
//! - [`resolver`]: picks the best overload for a set of arguments
//! - [`marshal`]: converts values between script and native form
//! - [`cache`]: class handle LRU and the instance identity cache
//! - [`proxy`]: class and instance handles
//! - [`dispatch`]: routes virtual calls on generated types to script overrides
//! - [`bridge`]: the entry points handed to the scripting engine

#![warn(missing_docs)]

pub mod bridge;
pub mod cache;
pub mod call;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod marshal;
pub mod matcher;
pub mod proxy;
pub mod resolver;
pub mod value;

pub use bridge::Bridge;
pub use cache::{ClassCache, InstanceCache};
pub use call::CallSite;
pub use config::{BridgeConfig, ConfigError};
pub use context::BridgeContext;
pub use dispatch::{OverrideDispatcher, OverrideMap};
pub use error::{BridgeError, BridgeResult};
pub use gate::{AlwaysRegistered, RegistrationGate};
pub use matcher::TypeMatcher;
pub use proxy::{ClassHandle, ClassHandleKind, InstanceHandle, NativeProxy};
pub use resolver::{Dispatch, OverloadResolver};
pub use value::{PrimitiveArray, ScriptFunction, ScriptValue};
