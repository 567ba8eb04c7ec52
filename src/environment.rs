//! Environment records
//!
//! Environments form a tree through their `outer` links. Closures and
//! suspended coroutines keep environments alive after their creator
//! returned, so records live in an arena and are addressed by `EnvId`
//! handles instead of being owned by the call stack.
//!
//! This module owns the declarative part of every record. Operations on
//! object-backed records (the global object, `with` targets) may run guest
//! accessors and are dispatched by the interpreter.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::error::{JsError, JsResult};
use crate::value::{CheapClone, JsString, JsValue, ObjectId};

/// Handle to an environment record in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnvId(u32);

impl EnvId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single name binding in a declarative record.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
    pub initialized: bool,
    /// Immutable bindings created strict throw on assignment even from sloppy code.
    pub strict: bool,
    pub deletable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisBindingStatus {
    /// Arrow functions: `this` comes from the enclosing environment.
    Lexical,
    Initialized,
    /// Derived constructors before `super()` returns.
    Uninitialized,
}

/// Slots specific to function environments.
#[derive(Debug, Clone)]
pub struct FunctionSlots {
    pub function_object: ObjectId,
    pub this_status: ThisBindingStatus,
    pub this_value: JsValue,
    pub new_target: JsValue,
}

/// An import binding that forwards to a binding in another module's environment.
#[derive(Debug, Clone)]
pub struct IndirectBinding {
    pub env: EnvId,
    pub name: JsString,
}

#[derive(Debug, Clone)]
pub enum EnvironmentKind {
    Declarative,
    Function(FunctionSlots),
    /// Backed by an object's properties.
    Object {
        binding_object: ObjectId,
        with_environment: bool,
    },
    /// The global object plus a declarative part for let/const/class.
    Global {
        global_object: ObjectId,
        this_value: ObjectId,
        var_names: FxHashSet<JsString>,
    },
    Module {
        imports: FxHashMap<JsString, IndirectBinding>,
    },
}

#[derive(Debug, Clone)]
pub struct EnvironmentRecord {
    pub outer: Option<EnvId>,
    pub bindings: FxHashMap<JsString, Binding>,
    pub kind: EnvironmentKind,
}

impl EnvironmentRecord {
    pub fn is_object_backed(&self) -> bool {
        matches!(self.kind, EnvironmentKind::Object { .. })
    }
}

fn uninitialized_error(name: &JsString) -> JsError {
    JsError::reference_error(format!("Cannot access '{name}' before initialization"))
}

fn not_defined_error(name: &JsString) -> JsError {
    JsError::reference_error(format!("{name} is not defined"))
}

/// Arena of environment records. Slots of collected records are reused.
#[derive(Debug, Default)]
pub struct EnvironmentArena {
    records: Vec<EnvironmentRecord>,
    free: Vec<u32>,
    allocations: usize,
    per_iteration_copies: usize,
}

impl EnvironmentArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, outer: Option<EnvId>, kind: EnvironmentKind) -> EnvId {
        self.allocations += 1;
        let record = EnvironmentRecord {
            outer,
            bindings: FxHashMap::default(),
            kind,
        };
        if let Some(index) = self.free.pop() {
            self.records[index as usize] = record;
            return EnvId(index);
        }
        let id = EnvId(self.records.len() as u32);
        self.records.push(record);
        id
    }

    /// NewDeclarativeEnvironment
    pub fn new_declarative(&mut self, outer: EnvId) -> EnvId {
        self.alloc(Some(outer), EnvironmentKind::Declarative)
    }

    pub fn get(&self, id: EnvId) -> &EnvironmentRecord {
        &self.records[id.index()]
    }

    pub fn get_mut(&mut self, id: EnvId) -> &mut EnvironmentRecord {
        &mut self.records[id.index()]
    }

    pub fn outer(&self, id: EnvId) -> Option<EnvId> {
        self.get(id).outer
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn capacity(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn allocations(&self) -> usize {
        self.allocations
    }

    pub(crate) fn reset_allocations(&mut self) {
        self.allocations = 0;
    }

    /// Reset every record not set in `marks` and make its slot available
    /// to `alloc`. Returns how many live records were freed.
    pub(crate) fn sweep(&mut self, marks: &[bool]) -> usize {
        let before = self.len();
        self.free.clear();
        for (index, record) in self.records.iter_mut().enumerate() {
            if !marks.get(index).copied().unwrap_or(false) {
                record.outer = None;
                record.bindings = FxHashMap::default();
                record.kind = EnvironmentKind::Declarative;
                self.free.push(index as u32);
            }
        }
        self.free.reverse();
        self.allocations = 0;
        before - self.len()
    }

    pub fn per_iteration_copies(&self) -> usize {
        self.per_iteration_copies
    }

    // ───────────────────────────────────────────────────────────────────────
    // Declarative part
    // ───────────────────────────────────────────────────────────────────────

    pub fn has_declarative(&self, id: EnvId, name: &JsString) -> bool {
        let record = self.get(id);
        if record.bindings.contains_key(name) {
            return true;
        }
        match &record.kind {
            EnvironmentKind::Module { imports } => imports.contains_key(name),
            _ => false,
        }
    }

    /// CreateMutableBinding: the binding starts uninitialized.
    pub fn create_mutable_binding(&mut self, id: EnvId, name: JsString, deletable: bool) {
        self.get_mut(id).bindings.insert(
            name,
            Binding {
                value: JsValue::Undefined,
                mutable: true,
                initialized: false,
                strict: false,
                deletable,
            },
        );
    }

    /// CreateImmutableBinding: the binding starts uninitialized.
    pub fn create_immutable_binding(&mut self, id: EnvId, name: JsString, strict: bool) {
        self.get_mut(id).bindings.insert(
            name,
            Binding {
                value: JsValue::Undefined,
                mutable: false,
                initialized: false,
                strict,
                deletable: false,
            },
        );
    }

    /// InitializeBinding on the declarative part.
    pub fn initialize_declarative(
        &mut self,
        id: EnvId,
        name: &JsString,
        value: JsValue,
    ) -> JsResult<()> {
        match self.get_mut(id).bindings.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                binding.initialized = true;
                Ok(())
            }
            None => Err(JsError::internal(format!(
                "initializing missing binding '{name}'"
            ))),
        }
    }

    /// SetMutableBinding on the declarative part.
    pub fn set_declarative(
        &mut self,
        id: EnvId,
        name: &JsString,
        value: JsValue,
        strict: bool,
    ) -> JsResult<()> {
        if let EnvironmentKind::Module { imports } = &self.get(id).kind {
            if imports.contains_key(name) {
                return Err(JsError::type_error("Assignment to constant variable."));
            }
        }
        let record = self.get_mut(id);
        let Some(binding) = record.bindings.get_mut(name) else {
            if strict {
                return Err(not_defined_error(name));
            }
            self.create_mutable_binding(id, name.cheap_clone(), true);
            return self.initialize_declarative(id, name, value);
        };
        let strict = strict || binding.strict;
        if !binding.initialized {
            return Err(uninitialized_error(name));
        }
        if binding.mutable {
            binding.value = value;
            Ok(())
        } else if strict {
            Err(JsError::type_error("Assignment to constant variable."))
        } else {
            Ok(())
        }
    }

    /// GetBindingValue on the declarative part, following import bindings.
    pub fn get_declarative(&self, id: EnvId, name: &JsString) -> JsResult<JsValue> {
        let record = self.get(id);
        if let Some(binding) = record.bindings.get(name) {
            if !binding.initialized {
                return Err(uninitialized_error(name));
            }
            return Ok(binding.value.cheap_clone());
        }
        if let EnvironmentKind::Module { imports } = &record.kind {
            if let Some(indirect) = imports.get(name) {
                return self.get_declarative(indirect.env, &indirect.name);
            }
        }
        Err(not_defined_error(name))
    }

    /// DeleteBinding on the declarative part.
    pub fn delete_declarative(&mut self, id: EnvId, name: &JsString) -> bool {
        let record = self.get_mut(id);
        match record.bindings.get(name) {
            Some(binding) if binding.deletable => {
                record.bindings.remove(name);
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    /// CreateImportBinding
    pub fn create_import_binding(&mut self, id: EnvId, name: JsString, target: IndirectBinding) {
        if let EnvironmentKind::Module { imports } = &mut self.get_mut(id).kind {
            imports.insert(name, target);
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // `this` and `super`
    // ───────────────────────────────────────────────────────────────────────

    pub fn has_this_binding(&self, id: EnvId) -> bool {
        match &self.get(id).kind {
            EnvironmentKind::Function(slots) => slots.this_status != ThisBindingStatus::Lexical,
            EnvironmentKind::Global { .. } | EnvironmentKind::Module { .. } => true,
            EnvironmentKind::Declarative | EnvironmentKind::Object { .. } => false,
        }
    }

    /// BindThisValue for function environments.
    pub fn bind_this_value(&mut self, id: EnvId, value: JsValue) -> JsResult<()> {
        match &mut self.get_mut(id).kind {
            EnvironmentKind::Function(slots) => {
                if slots.this_status == ThisBindingStatus::Initialized {
                    return Err(JsError::reference_error(
                        "Super constructor may only be called once",
                    ));
                }
                slots.this_value = value;
                slots.this_status = ThisBindingStatus::Initialized;
                Ok(())
            }
            _ => Err(JsError::internal("binding this on a non-function environment")),
        }
    }

    /// GetThisBinding
    pub fn get_this_binding(&self, id: EnvId) -> JsResult<JsValue> {
        match &self.get(id).kind {
            EnvironmentKind::Function(slots) => match slots.this_status {
                ThisBindingStatus::Initialized => Ok(slots.this_value.cheap_clone()),
                ThisBindingStatus::Uninitialized => Err(JsError::reference_error(
                    "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
                )),
                ThisBindingStatus::Lexical => {
                    Err(JsError::internal("arrow environment has no this binding"))
                }
            },
            EnvironmentKind::Global { this_value, .. } => Ok(JsValue::Object(*this_value)),
            EnvironmentKind::Module { .. } => Ok(JsValue::Undefined),
            _ => Err(JsError::internal("environment has no this binding")),
        }
    }

    pub fn function_slots(&self, id: EnvId) -> Option<&FunctionSlots> {
        match &self.get(id).kind {
            EnvironmentKind::Function(slots) => Some(slots),
            _ => None,
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Per-iteration copies
    // ───────────────────────────────────────────────────────────────────────

    /// CreatePerIterationEnvironment: copy the current values of `names`
    /// from `last` into a fresh declarative record with the same outer.
    pub fn copy_for_iteration(&mut self, last: EnvId, names: &[JsString]) -> JsResult<EnvId> {
        let outer = self
            .outer(last)
            .ok_or_else(|| JsError::internal("loop environment without outer"))?;
        let next = self.new_declarative(outer);
        for name in names {
            let value = self.get_declarative(last, name)?;
            self.create_mutable_binding(next, name.cheap_clone(), false);
            self.initialize_declarative(next, name, value)?;
        }
        self.per_iteration_copies += 1;
        trace!(from = last.0, to = next.0, bindings = names.len(), "per-iteration environment copy");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(arena: &mut EnvironmentArena) -> EnvId {
        arena.alloc(None, EnvironmentKind::Declarative)
    }

    #[test]
    fn test_uninitialized_binding_is_tdz() {
        let mut arena = EnvironmentArena::new();
        let env = root(&mut arena);
        let x = JsString::from("x");
        arena.create_mutable_binding(env, x.cheap_clone(), false);
        let err = arena.get_declarative(env, &x).unwrap_err();
        assert!(matches!(err, JsError::ReferenceError { .. }));
        arena
            .initialize_declarative(env, &x, JsValue::Number(1.0))
            .unwrap();
        assert_eq!(arena.get_declarative(env, &x).unwrap(), JsValue::Number(1.0));
    }

    #[test]
    fn test_const_assignment() {
        let mut arena = EnvironmentArena::new();
        let env = root(&mut arena);
        let c = JsString::from("c");
        arena.create_immutable_binding(env, c.cheap_clone(), true);
        arena.initialize_declarative(env, &c, JsValue::Null).unwrap();
        let err = arena
            .set_declarative(env, &c, JsValue::Number(2.0), false)
            .unwrap_err();
        assert!(matches!(err, JsError::TypeError { .. }));
    }

    #[test]
    fn test_sloppy_immutable_assignment_is_ignored() {
        let mut arena = EnvironmentArena::new();
        let env = root(&mut arena);
        let f = JsString::from("f");
        arena.create_immutable_binding(env, f.cheap_clone(), false);
        arena.initialize_declarative(env, &f, JsValue::Null).unwrap();
        arena
            .set_declarative(env, &f, JsValue::Number(2.0), false)
            .unwrap();
        assert_eq!(arena.get_declarative(env, &f).unwrap(), JsValue::Null);
    }

    #[test]
    fn test_per_iteration_copy_is_independent() {
        let mut arena = EnvironmentArena::new();
        let outer = root(&mut arena);
        let loop_env = arena.new_declarative(outer);
        let i = JsString::from("i");
        arena.create_mutable_binding(loop_env, i.cheap_clone(), false);
        arena
            .initialize_declarative(loop_env, &i, JsValue::Number(0.0))
            .unwrap();

        let copy = arena.copy_for_iteration(loop_env, &[i.cheap_clone()]).unwrap();
        assert_ne!(copy, loop_env);
        assert_eq!(arena.outer(copy), Some(outer));
        arena
            .set_declarative(copy, &i, JsValue::Number(1.0), true)
            .unwrap();
        assert_eq!(arena.get_declarative(loop_env, &i).unwrap(), JsValue::Number(0.0));
        assert_eq!(arena.get_declarative(copy, &i).unwrap(), JsValue::Number(1.0));
        assert_eq!(arena.per_iteration_copies(), 1);
    }

    #[test]
    fn test_swept_record_slot_is_reused_empty() {
        let mut arena = EnvironmentArena::new();
        let outer = root(&mut arena);
        let inner = arena.new_declarative(outer);
        arena.create_mutable_binding(inner, JsString::from("x"), false);
        assert_eq!(arena.sweep(&[true, false]), 1);
        assert_eq!(arena.len(), 1);

        let fresh = arena.alloc(None, EnvironmentKind::Declarative);
        assert_eq!(fresh, inner);
        assert!(arena.get(fresh).bindings.is_empty());
        assert_eq!(arena.outer(fresh), None);
        assert_eq!(arena.capacity(), 2);
    }

    #[test]
    fn test_import_binding_forwards() {
        let mut arena = EnvironmentArena::new();
        let exporter = root(&mut arena);
        let importer = arena.alloc(
            None,
            EnvironmentKind::Module {
                imports: FxHashMap::default(),
            },
        );
        let value = JsString::from("value");
        arena.create_mutable_binding(exporter, value.cheap_clone(), false);
        arena
            .initialize_declarative(exporter, &value, JsValue::Number(7.0))
            .unwrap();
        arena.create_import_binding(
            importer,
            JsString::from("v"),
            IndirectBinding {
                env: exporter,
                name: value,
            },
        );
        let v = JsString::from("v");
        assert!(arena.has_declarative(importer, &v));
        assert_eq!(arena.get_declarative(importer, &v).unwrap(), JsValue::Number(7.0));
        assert!(arena.set_declarative(importer, &v, JsValue::Null, true).is_err());
    }
}
