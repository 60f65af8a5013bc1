//! Bridge entry points
//!
//! [`Bridge`] is the surface the scripting engine talks to: class lookup,
//! dynamic subclassing, interface implementation, casting and wrapping.
//! Each entry point comes in a `try_*` form returning [`BridgeResult`] and
//! a script-facing form that logs failures and returns `None`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use hyperbridge_types::{NativeValue, TypeId, TypeRegistry};

use crate::cache::ClassCache;
use crate::config::BridgeConfig;
use crate::context::BridgeContext;
use crate::error::{report, BridgeError, BridgeResult};
use crate::gate::{AlwaysRegistered, RegistrationGate};
use crate::marshal;
use crate::proxy::{ClassHandle, InstanceHandle};
use crate::value::ScriptValue;

/// The bridge between script code and a native type registry
pub struct Bridge {
    ctx: Arc<BridgeContext>,
    classes: ClassCache,
    gate: Arc<dyn RegistrationGate>,
    config: BridgeConfig,
}

impl Bridge {
    /// Bridge over `registry` with the default configuration
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::build(registry, BridgeConfig::default())
    }

    /// Bridge over `registry` with a validated `config`
    pub fn with_config(registry: Arc<TypeRegistry>, config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self::build(registry, config))
    }

    /// Bridge over `registry` configured from a TOML file
    pub fn from_config_file(registry: Arc<TypeRegistry>, path: &Path) -> BridgeResult<Self> {
        let config = BridgeConfig::from_file(path)?;
        Self::with_config(registry, config)
    }

    fn build(registry: Arc<TypeRegistry>, config: BridgeConfig) -> Self {
        tracing::debug!(
            class_cache_size = config.class_cache_size,
            memoize_distances = config.memoize_distances,
            "creating bridge"
        );
        Self {
            ctx: BridgeContext::new(registry, &config),
            classes: ClassCache::new(config.class_cache_size),
            gate: Arc::new(AlwaysRegistered),
            config,
        }
    }

    /// Replace the registration gate
    pub fn with_gate(mut self, gate: impl RegistrationGate + 'static) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    /// Shared bridge state
    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.ctx
    }

    /// Native type registry
    pub fn registry(&self) -> &TypeRegistry {
        self.ctx.registry()
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Class handle cache
    pub fn class_cache(&self) -> &ClassCache {
        &self.classes
    }

    /// Whether the registration gate currently allows use
    pub fn is_registered(&self) -> bool {
        self.gate.is_registered()
    }

    fn check_gate(&self) -> BridgeResult<()> {
        if self.gate.is_registered() {
            Ok(())
        } else {
            Err(BridgeError::NotRegistered)
        }
    }

    fn require_type(&self, name: &str) -> BridgeResult<TypeId> {
        if name.is_empty() {
            return Err(BridgeError::invalid_argument("class name cannot be empty"));
        }
        self.registry()
            .lookup(name)
            .ok_or_else(|| BridgeError::not_found(format!("class {}", name)))
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Class handle for `name`, shared while it stays in the class cache
    pub fn try_get_class(&self, name: &str) -> BridgeResult<Arc<ClassHandle>> {
        self.check_gate()?;
        self.classes.get_or_insert_with(name, || {
            let ty = self.require_type(name)?;
            Ok(Arc::new(ClassHandle::new(self.ctx.clone(), ty)))
        })
    }

    /// Script-facing [`try_get_class`](Self::try_get_class)
    pub fn get_class(&self, name: &str) -> Option<Arc<ClassHandle>> {
        report("get_class", self.try_get_class(name))
    }

    /// Handle instantiating a generated subclass of class `name`.
    ///
    /// Interfaces go through [`try_implement`](Self::try_implement); final
    /// and private classes cannot be extended.
    pub fn try_extend(&self, name: &str) -> BridgeResult<Arc<ClassHandle>> {
        self.check_gate()?;
        let ty = self.require_type(name)?;
        if self.registry().get(ty).map(|t| t.is_interface()).unwrap_or(false) {
            return Err(BridgeError::invalid_argument(format!(
                "{} is an interface; implement it instead",
                name
            )));
        }
        Ok(Arc::new(ClassHandle::dynamic_subclass(self.ctx.clone(), ty)?))
    }

    /// Script-facing [`try_extend`](Self::try_extend)
    pub fn extend(&self, name: &str) -> Option<Arc<ClassHandle>> {
        report("extend", self.try_extend(name))
    }

    /// Handle instantiating a generated implementation of interface `name`
    pub fn try_implement(&self, name: &str) -> BridgeResult<Arc<ClassHandle>> {
        self.check_gate()?;
        let ty = self.require_type(name)?;
        if !self.registry().get(ty).map(|t| t.is_interface()).unwrap_or(false) {
            return Err(BridgeError::invalid_argument(format!(
                "{} is not an interface",
                name
            )));
        }
        Ok(Arc::new(ClassHandle::interface_implementation(self.ctx.clone(), ty)?))
    }

    /// Script-facing [`try_implement`](Self::try_implement)
    pub fn implement(&self, name: &str) -> Option<Arc<ClassHandle>> {
        report("implement", self.try_implement(name))
    }

    /// View the instance handle in `value` as class `name`
    pub fn try_cast(&self, name: &str, value: &ScriptValue) -> BridgeResult<Arc<InstanceHandle>> {
        self.check_gate()?;
        let handle = value.as_instance().ok_or_else(|| {
            BridgeError::invalid_argument(format!(
                "only instance handles can be cast, got {}",
                value.type_name()
            ))
        })?;
        let ty = self.require_type(name)?;
        handle.cast(ty)
    }

    /// Script-facing [`try_cast`](Self::try_cast)
    pub fn cast(&self, name: &str, value: &ScriptValue) -> Option<Arc<InstanceHandle>> {
        report("cast", self.try_cast(name, value))
    }

    /// Expose a native value to script code
    pub fn try_wrap(&self, value: NativeValue) -> BridgeResult<ScriptValue> {
        self.check_gate()?;
        Ok(marshal::to_script(&self.ctx, value))
    }

    /// Script-facing [`try_wrap`](Self::try_wrap)
    pub fn wrap(&self, value: NativeValue) -> ScriptValue {
        report("wrap", self.try_wrap(value)).unwrap_or(ScriptValue::Null)
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("cached_classes", &self.classes.len())
            .field("live_instances", &self.ctx.instances().len())
            .finish()
    }
}
