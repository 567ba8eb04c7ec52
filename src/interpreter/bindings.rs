//! Name resolution
//!
//! Environment record operations that need the object model (object and
//! global records), identifier resolution, GetValue/PutValue on references,
//! and the declaration instantiation of scripts and blocks.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::ast::{BlockScope, FunctionNode, Program};
use crate::environment::{EnvId, EnvironmentKind};
use crate::error::{JsError, JsResult};
use crate::object::{Property, PropertyDescriptor};
use crate::reference::{Reference, ReferenceBase};
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

use super::Interpreter;

/// How a record stores a name, for dispatching binding operations.
enum RecordShape {
    Declarative,
    Object { object: ObjectId, with: bool },
    Global { object: ObjectId },
}

fn not_defined(name: &JsString) -> JsError {
    JsError::reference_error(format!("{name} is not defined"))
}

pub(crate) fn already_declared(name: &JsString) -> JsError {
    JsError::syntax_error(format!("Identifier '{name}' has already been declared"), 0, 0)
}

/// The last declaration of each function name wins, in source order of
/// first appearance of the winner.
pub(crate) fn functions_to_initialize(functions: &[std::rc::Rc<FunctionNode>]) -> Vec<std::rc::Rc<FunctionNode>> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for func in functions.iter().rev() {
        let Some(name) = &func.id else {
            continue;
        };
        if seen.insert(name.cheap_clone()) {
            out.push(func.cheap_clone());
        }
    }
    out.reverse();
    out
}

impl Interpreter {
    fn shape(&self, env: EnvId) -> RecordShape {
        match &self.envs.get(env).kind {
            EnvironmentKind::Object {
                binding_object,
                with_environment,
            } => RecordShape::Object {
                object: *binding_object,
                with: *with_environment,
            },
            EnvironmentKind::Global { global_object, .. } => RecordShape::Global {
                object: *global_object,
            },
            _ => RecordShape::Declarative,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Environment record operations
    // ═══════════════════════════════════════════════════════════════════════

    /// HasBinding
    pub(crate) fn has_binding(&mut self, env: EnvId, name: &JsString) -> JsResult<bool> {
        match self.shape(env) {
            RecordShape::Declarative => Ok(self.envs.has_declarative(env, name)),
            RecordShape::Global { object } => {
                if self.envs.has_declarative(env, name) {
                    return Ok(true);
                }
                self.has_property(object, &PropertyKey::String(name.cheap_clone()))
            }
            RecordShape::Object { object, with } => {
                let key = PropertyKey::String(name.cheap_clone());
                if !self.has_property(object, &key)? {
                    return Ok(false);
                }
                if !with {
                    return Ok(true);
                }
                let unscopables_key = PropertyKey::Symbol(self.symbols.unscopables.cheap_clone());
                let unscopables = self.get(object, &unscopables_key, JsValue::Object(object))?;
                if let JsValue::Object(list) = unscopables {
                    let blocked = self.get(list, &key, unscopables)?;
                    return Ok(!blocked.to_boolean());
                }
                Ok(true)
            }
        }
    }

    /// GetBindingValue
    pub(crate) fn get_binding_value(&mut self, env: EnvId, name: &JsString, strict: bool) -> JsResult<JsValue> {
        let object = match self.shape(env) {
            RecordShape::Declarative => return self.envs.get_declarative(env, name),
            RecordShape::Global { object } => {
                if self.envs.has_declarative(env, name) {
                    return self.envs.get_declarative(env, name);
                }
                object
            }
            RecordShape::Object { object, .. } => object,
        };
        let key = PropertyKey::String(name.cheap_clone());
        if !self.has_property(object, &key)? {
            return if strict {
                Err(not_defined(name))
            } else {
                Ok(JsValue::Undefined)
            };
        }
        self.get(object, &key, JsValue::Object(object))
    }

    /// SetMutableBinding
    pub(crate) fn set_mutable_binding(
        &mut self,
        env: EnvId,
        name: &JsString,
        value: JsValue,
        strict: bool,
    ) -> JsResult<()> {
        let object = match self.shape(env) {
            RecordShape::Declarative => return self.envs.set_declarative(env, name, value, strict),
            RecordShape::Global { object } => {
                if self.envs.has_declarative(env, name) {
                    return self.envs.set_declarative(env, name, value, strict);
                }
                object
            }
            RecordShape::Object { object, .. } => object,
        };
        let key = PropertyKey::String(name.cheap_clone());
        if strict && !self.has_property(object, &key)? {
            return Err(not_defined(name));
        }
        self.set_property(object, key, value, strict)
    }

    /// InitializeBinding
    pub(crate) fn initialize_binding(&mut self, env: EnvId, name: &JsString, value: JsValue) -> JsResult<()> {
        let object = match self.shape(env) {
            RecordShape::Declarative => return self.envs.initialize_declarative(env, name, value),
            RecordShape::Global { object } => {
                if self.envs.has_declarative(env, name) {
                    return self.envs.initialize_declarative(env, name, value);
                }
                object
            }
            RecordShape::Object { object, .. } => object,
        };
        self.set_property(object, PropertyKey::String(name.cheap_clone()), value, false)
    }

    /// DeleteBinding
    pub(crate) fn delete_binding(&mut self, env: EnvId, name: &JsString) -> JsResult<bool> {
        match self.shape(env) {
            RecordShape::Declarative => Ok(self.envs.delete_declarative(env, name)),
            RecordShape::Object { object, .. } => self.delete(object, &PropertyKey::String(name.cheap_clone())),
            RecordShape::Global { object } => {
                if self.envs.has_declarative(env, name) {
                    return Ok(self.envs.delete_declarative(env, name));
                }
                let key = PropertyKey::String(name.cheap_clone());
                if !self.has_own_property(object, &key)? {
                    return Ok(true);
                }
                let deleted = self.delete(object, &key)?;
                if deleted && let EnvironmentKind::Global { var_names, .. } = &mut self.envs.get_mut(env).kind {
                    var_names.remove(name);
                }
                Ok(deleted)
            }
        }
    }

    /// WithBaseObject: the receiver of calls through a `with` binding.
    pub(crate) fn with_base_object(&self, env: EnvId) -> JsValue {
        match &self.envs.get(env).kind {
            EnvironmentKind::Object {
                binding_object,
                with_environment: true,
            } => JsValue::Object(*binding_object),
            _ => JsValue::Undefined,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Resolution and references
    // ═══════════════════════════════════════════════════════════════════════

    /// ResolveBinding starting at `env`, or at the running lexical environment.
    pub(crate) fn resolve_binding(&mut self, name: &JsString, env: Option<EnvId>, strict: bool) -> JsResult<Reference> {
        let mut current = Some(env.unwrap_or_else(|| self.lexical_env()));
        while let Some(env) = current {
            if self.has_binding(env, name)? {
                return Ok(Reference::environment(env, name.cheap_clone(), strict));
            }
            current = self.envs.outer(env);
        }
        Ok(Reference::unresolvable(name.cheap_clone(), strict))
    }

    /// GetValue
    pub(crate) fn get_value(&mut self, reference: &Reference) -> JsResult<JsValue> {
        match &reference.base {
            ReferenceBase::Unresolvable => Err(not_defined(&reference.name_string())),
            ReferenceBase::Value(base) => {
                let base = base.cheap_clone();
                match base.as_object() {
                    Some(id) => self.get(id, &reference.name, reference.this_value()),
                    None if reference.is_super_reference() => Err(JsError::type_error(
                        "Cannot read properties of a super base that is not an object",
                    )),
                    None => self.get_v(&base, &reference.name),
                }
            }
            ReferenceBase::Environment(env) => {
                let env = *env;
                self.get_binding_value(env, &reference.name_string(), reference.strict)
            }
        }
    }

    /// PutValue
    pub(crate) fn put_value(&mut self, reference: &Reference, value: JsValue) -> JsResult<()> {
        match &reference.base {
            ReferenceBase::Unresolvable => {
                let name = reference.name_string();
                if reference.strict {
                    return Err(not_defined(&name));
                }
                trace!(name = %name, "implicit global binding");
                let global = self.global_object();
                self.set_property(global, PropertyKey::String(name), value, false)
            }
            ReferenceBase::Value(base) => {
                let base = base.cheap_clone();
                if base.is_null_or_undefined() {
                    return Err(JsError::type_error(format!(
                        "Cannot set properties of {} (setting '{}')",
                        if base.is_undefined() { "undefined" } else { "null" },
                        reference.name
                    )));
                }
                let object = self.to_object(&base)?;
                let ok = self.set(object, reference.name.cheap_clone(), value, reference.this_value())?;
                if !ok && reference.strict {
                    return Err(JsError::type_error(format!(
                        "Cannot assign to read only property '{}' of object",
                        reference.name
                    )));
                }
                Ok(())
            }
            ReferenceBase::Environment(env) => {
                let env = *env;
                self.set_mutable_binding(env, &reference.name_string(), value, reference.strict)
            }
        }
    }

    /// GetThisEnvironment
    pub(crate) fn this_environment(&self) -> JsResult<EnvId> {
        let mut current = Some(self.lexical_env());
        while let Some(env) = current {
            if self.envs.has_this_binding(env) {
                return Ok(env);
            }
            current = self.envs.outer(env);
        }
        Err(JsError::internal("no environment provides a this binding"))
    }

    /// ResolveThisBinding
    pub(crate) fn resolve_this_binding(&self) -> JsResult<JsValue> {
        let env = self.this_environment()?;
        self.envs.get_this_binding(env)
    }

    /// GetNewTarget
    pub(crate) fn new_target(&self) -> JsResult<JsValue> {
        let env = self.this_environment()?;
        Ok(self
            .envs
            .function_slots(env)
            .map(|slots| slots.new_target.cheap_clone())
            .unwrap_or_default())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Global environment records
    // ═══════════════════════════════════════════════════════════════════════

    fn global_parts(&self, env: EnvId) -> JsResult<ObjectId> {
        match &self.envs.get(env).kind {
            EnvironmentKind::Global { global_object, .. } => Ok(*global_object),
            _ => Err(JsError::internal("expected a global environment")),
        }
    }

    pub(crate) fn is_global_env(&self, env: EnvId) -> bool {
        matches!(self.envs.get(env).kind, EnvironmentKind::Global { .. })
    }

    /// HasVarDeclaration
    fn has_var_declaration(&self, env: EnvId, name: &JsString) -> bool {
        match &self.envs.get(env).kind {
            EnvironmentKind::Global { var_names, .. } => var_names.contains(name),
            _ => false,
        }
    }

    /// HasRestrictedGlobalProperty
    fn has_restricted_global_property(&mut self, env: EnvId, name: &JsString) -> JsResult<bool> {
        let global = self.global_parts(env)?;
        let prop = self.get_own_property(global, &PropertyKey::String(name.cheap_clone()))?;
        Ok(prop.is_some_and(|p| !p.configurable()))
    }

    /// CanDeclareGlobalVar
    pub(crate) fn can_declare_global_var(&mut self, env: EnvId, name: &JsString) -> JsResult<bool> {
        let global = self.global_parts(env)?;
        if self.has_own_property(global, &PropertyKey::String(name.cheap_clone()))? {
            return Ok(true);
        }
        Ok(self.heap.get(global).extensible)
    }

    /// CanDeclareGlobalFunction
    pub(crate) fn can_declare_global_function(&mut self, env: EnvId, name: &JsString) -> JsResult<bool> {
        let global = self.global_parts(env)?;
        match self.get_own_property(global, &PropertyKey::String(name.cheap_clone()))? {
            None => Ok(self.heap.get(global).extensible),
            Some(prop) if prop.configurable() => Ok(true),
            Some(Property::Data {
                writable, enumerable, ..
            }) => Ok(writable && enumerable),
            Some(Property::Accessor { .. }) => Ok(false),
        }
    }

    fn record_var_name(&mut self, env: EnvId, name: &JsString) {
        if let EnvironmentKind::Global { var_names, .. } = &mut self.envs.get_mut(env).kind {
            var_names.insert(name.cheap_clone());
        }
    }

    /// CreateGlobalVarBinding
    pub(crate) fn create_global_var_binding(&mut self, env: EnvId, name: &JsString, deletable: bool) -> JsResult<()> {
        let global = self.global_parts(env)?;
        let key = PropertyKey::String(name.cheap_clone());
        if !self.has_own_property(global, &key)? && self.heap.get(global).extensible {
            self.define_property_or_throw(
                global,
                key.cheap_clone(),
                PropertyDescriptor::data(JsValue::Undefined, true, true, deletable),
            )?;
            self.set_property(global, key, JsValue::Undefined, false)?;
        }
        self.record_var_name(env, name);
        Ok(())
    }

    /// CreateGlobalFunctionBinding
    pub(crate) fn create_global_function_binding(
        &mut self,
        env: EnvId,
        name: &JsString,
        value: JsValue,
        deletable: bool,
    ) -> JsResult<()> {
        let global = self.global_parts(env)?;
        let key = PropertyKey::String(name.cheap_clone());
        let existing = self.get_own_property(global, &key)?;
        let desc = match existing {
            Some(prop) if !prop.configurable() => PropertyDescriptor {
                value: Some(value.cheap_clone()),
                ..PropertyDescriptor::default()
            },
            _ => PropertyDescriptor::data(value.cheap_clone(), true, true, deletable),
        };
        self.define_property_or_throw(global, key.cheap_clone(), desc)?;
        self.set_property(global, key, value, false)?;
        self.record_var_name(env, name);
        Ok(())
    }

    /// GlobalDeclarationInstantiation
    pub(crate) fn global_declaration_instantiation(&mut self, script: &Program, env: EnvId) -> JsResult<()> {
        let scope = &script.scope;
        for binding in &scope.lexical {
            let name = &binding.name;
            if self.has_var_declaration(env, name) || self.envs.has_declarative(env, name) {
                return Err(already_declared(name));
            }
            if self.has_restricted_global_property(env, name)? {
                return Err(already_declared(name));
            }
        }
        let function_names: Vec<JsString> = scope.functions.iter().filter_map(|f| f.id.clone()).collect();
        for name in scope.var_names.iter().chain(&function_names) {
            if self.envs.has_declarative(env, name) {
                return Err(already_declared(name));
            }
        }

        let functions = functions_to_initialize(&scope.functions);
        for func in &functions {
            let name = func.id.clone().unwrap_or_default();
            if !self.can_declare_global_function(env, &name)? {
                return Err(JsError::type_error(format!("Cannot redefine global function '{name}'")));
            }
        }
        let mut declared_vars: Vec<JsString> = Vec::new();
        for name in &scope.var_names {
            if function_names.contains(name) || declared_vars.contains(name) {
                continue;
            }
            if !self.can_declare_global_var(env, name)? {
                return Err(JsError::type_error(format!("Cannot declare global variable '{name}'")));
            }
            declared_vars.push(name.cheap_clone());
        }

        for binding in &scope.lexical {
            if binding.constant {
                self.envs.create_immutable_binding(env, binding.name.cheap_clone(), true);
            } else {
                self.envs.create_mutable_binding(env, binding.name.cheap_clone(), false);
            }
        }
        for func in functions {
            let name = func.id.clone().unwrap_or_default();
            let object = self.instantiate_function_object(&func, env);
            self.create_global_function_binding(env, &name, JsValue::Object(object), false)?;
        }
        for name in &declared_vars {
            self.create_global_var_binding(env, name, false)?;
        }
        Ok(())
    }

    /// BlockDeclarationInstantiation
    pub(crate) fn block_declaration_instantiation(&mut self, scope: &BlockScope, env: EnvId) -> JsResult<()> {
        for binding in &scope.lexical {
            if binding.constant {
                self.envs.create_immutable_binding(env, binding.name.cheap_clone(), true);
            } else {
                self.envs.create_mutable_binding(env, binding.name.cheap_clone(), false);
            }
        }
        for func in &scope.functions {
            let Some(name) = func.id.clone() else {
                continue;
            };
            let object = JsValue::Object(self.instantiate_function_object(func, env));
            let initialized = self
                .envs
                .get(env)
                .bindings
                .get(&name)
                .is_some_and(|binding| binding.initialized);
            if initialized {
                self.envs.set_declarative(env, &name, object, false)?;
            } else {
                if !self.envs.has_declarative(env, &name) {
                    self.envs.create_mutable_binding(env, name.cheap_clone(), false);
                }
                self.envs.initialize_declarative(env, &name, object)?;
            }
        }
        Ok(())
    }
}
