//! Modules
//!
//! Source text is registered under a specifier and parsed eagerly. Linking
//! creates the module environment, instantiates its declarations and wires
//! imports as indirect bindings into the exporting module's environment.
//! Evaluation runs each module body once, dependencies first.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ast::{FunctionKind, ImportName, Program};
use crate::completion::Completion;
use crate::context::ExecutionContext;
use crate::environment::{EnvId, EnvironmentKind, IndirectBinding};
use crate::error::{JsError, JsResult};
use crate::object::{JsObject, ObjectKind, Property};
use crate::parser::parse_module;
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

use super::bindings::functions_to_initialize;
use super::jobs::{Job, JobKind};
use super::machine::{Activation, RunOutcome};
use super::promise::PromiseCapability;
use super::Interpreter;

/// Handle to a registered module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum ModuleStatus {
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    Evaluated,
    /// Evaluation threw; every later import rethrows the same value.
    Errored(JsValue),
}

#[derive(Debug)]
pub struct ModuleRecord {
    pub specifier: String,
    pub(crate) program: Rc<Program>,
    pub(crate) env: Option<EnvId>,
    pub(crate) namespace: Option<ObjectId>,
    pub status: ModuleStatus,
}

/// Every module registered with an agent.
#[derive(Debug, Default)]
pub struct ModuleMap {
    records: Vec<ModuleRecord>,
    by_specifier: FxHashMap<String, ModuleId>,
}

impl ModuleMap {
    pub fn lookup(&self, specifier: &str) -> Option<ModuleId> {
        self.by_specifier.get(specifier).copied()
    }

    pub fn get(&self, id: ModuleId) -> &ModuleRecord {
        &self.records[id.index()]
    }

    fn get_mut(&mut self, id: ModuleId) -> &mut ModuleRecord {
        &mut self.records[id.index()]
    }

    pub(crate) fn records(&self) -> &[ModuleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Interpreter {
    /// Parse `source` and register it under `specifier`.
    pub fn register_module(&mut self, specifier: &str, source: &str) -> JsResult<ModuleId> {
        if self.modules.lookup(specifier).is_some() {
            return Err(JsError::module_error(format!(
                "Module '{specifier}' is already registered"
            )));
        }
        let program = parse_module(source, &mut self.string_dict)?;
        let id = ModuleId(self.modules.records.len() as u32);
        debug!(specifier, statements = program.body.len(), "register module");
        self.modules.records.push(ModuleRecord {
            specifier: specifier.to_string(),
            program: Rc::new(program),
            env: None,
            namespace: None,
            status: ModuleStatus::Unlinked,
        });
        self.modules.by_specifier.insert(specifier.to_string(), id);
        Ok(id)
    }

    fn requested_module(&self, specifier: &JsString) -> JsResult<ModuleId> {
        let name = specifier.to_rust_string();
        self.modules
            .lookup(&name)
            .ok_or_else(|| JsError::module_error(format!("Cannot find module '{name}'")))
    }

    fn module_env(&self, id: ModuleId) -> JsResult<EnvId> {
        self.modules
            .get(id)
            .env
            .ok_or_else(|| JsError::internal("module environment used before linking"))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Linking
    // ═══════════════════════════════════════════════════════════════════════

    /// Create the environments of `id` and everything it imports.
    pub(crate) fn link_module(&mut self, id: ModuleId) -> JsResult<()> {
        if !matches!(self.modules.get(id).status, ModuleStatus::Unlinked) {
            return Ok(());
        }
        let program = Rc::clone(&self.modules.get(id).program);
        let Some(facts) = program.module.clone() else {
            return Err(JsError::internal("module record without module facts"));
        };
        debug!(specifier = %self.modules.get(id).specifier, "link module");

        let global_env = self.realm().global_env;
        let env = self.envs.alloc(
            Some(global_env),
            EnvironmentKind::Module {
                imports: FxHashMap::default(),
            },
        );
        let record = self.modules.get_mut(id);
        record.env = Some(env);
        record.status = ModuleStatus::Linking;

        let result = self.link_requests(id, env, &program, &facts);
        match result {
            Ok(()) => {
                self.modules.get_mut(id).status = ModuleStatus::Linked;
                Ok(())
            }
            Err(err) => {
                let record = self.modules.get_mut(id);
                record.status = ModuleStatus::Unlinked;
                record.env = None;
                Err(err)
            }
        }
    }

    fn link_requests(
        &mut self,
        id: ModuleId,
        env: EnvId,
        program: &Program,
        facts: &crate::ast::ModuleFacts,
    ) -> JsResult<()> {
        for request in &facts.requests {
            let target = self.requested_module(request)?;
            self.link_module(target)?;
        }

        for import in &facts.imports {
            let target = self.requested_module(&import.module)?;
            match &import.import_name {
                ImportName::Named(name) => {
                    let Some(binding) = self.resolve_export(target, name, &mut FxHashSet::default())? else {
                        return Err(JsError::syntax_error(
                            format!(
                                "The requested module '{}' does not provide an export named '{name}'",
                                import.module
                            ),
                            0,
                            0,
                        ));
                    };
                    self.envs
                        .create_import_binding(env, import.local.cheap_clone(), binding);
                }
                ImportName::Namespace => {
                    let namespace = self.get_namespace(target);
                    self.envs
                        .create_immutable_binding(env, import.local.cheap_clone(), true);
                    self.envs
                        .initialize_declarative(env, &import.local, JsValue::Object(namespace))?;
                }
            }
        }

        let scope = &program.scope;
        let mut declared: Vec<JsString> = Vec::new();
        for name in &scope.var_names {
            if declared.contains(name) {
                continue;
            }
            declared.push(name.cheap_clone());
            self.envs.create_mutable_binding(env, name.cheap_clone(), false);
            self.envs.initialize_declarative(env, name, JsValue::Undefined)?;
        }
        for binding in &scope.lexical {
            if binding.constant {
                self.envs
                    .create_immutable_binding(env, binding.name.cheap_clone(), true);
            } else {
                self.envs
                    .create_mutable_binding(env, binding.name.cheap_clone(), false);
            }
        }

        // Hoisted functions close over the module and must see it as their
        // script-or-module.
        let realm = self.current_realm();
        let functions = functions_to_initialize(&scope.functions);
        self.with_context(ExecutionContext::top_level(realm, env, Some(id)), |interp| {
            for func in &functions {
                let Some(name) = &func.id else {
                    continue;
                };
                let closure = interp.instantiate_function_object(func, env);
                if !interp.envs.get(env).bindings.contains_key(name) {
                    interp.envs.create_mutable_binding(env, name.cheap_clone(), false);
                }
                interp
                    .envs
                    .initialize_declarative(env, name, JsValue::Object(closure))?;
            }
            Ok(())
        })
    }

    /// ResolveExport: the binding `name` of module `id` refers to, following
    /// local re-exports of imported names. `None` when nothing is exported
    /// under that name or the re-exports form a cycle.
    pub(crate) fn resolve_export(
        &mut self,
        id: ModuleId,
        name: &JsString,
        visited: &mut FxHashSet<(ModuleId, JsString)>,
    ) -> JsResult<Option<IndirectBinding>> {
        if !visited.insert((id, name.cheap_clone())) {
            return Ok(None);
        }
        self.link_module(id)?;
        let env = self.module_env(id)?;
        let Some(facts) = self.modules.get(id).program.module.clone() else {
            return Ok(None);
        };
        let Some(export) = facts.exports.iter().find(|e| e.export_name == *name) else {
            return Ok(None);
        };
        let import = facts.imports.iter().find(|i| i.local == export.local);
        match import {
            Some(import) => match &import.import_name {
                ImportName::Named(imported) => {
                    let target = self.requested_module(&import.module)?;
                    self.resolve_export(target, imported, visited)
                }
                ImportName::Namespace => Ok(Some(IndirectBinding {
                    env,
                    name: export.local.cheap_clone(),
                })),
            },
            None => Ok(Some(IndirectBinding {
                env,
                name: export.local.cheap_clone(),
            })),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Evaluation
    // ═══════════════════════════════════════════════════════════════════════

    /// Link and evaluate `id`, dependencies first. A module body runs at
    /// most once; a module that threw rethrows the same value.
    pub(crate) fn evaluate_module(&mut self, id: ModuleId) -> JsResult<()> {
        match &self.modules.get(id).status {
            ModuleStatus::Evaluated | ModuleStatus::Evaluating => return Ok(()),
            ModuleStatus::Errored(value) => return Err(JsError::thrown(value.cheap_clone())),
            ModuleStatus::Unlinked | ModuleStatus::Linking => self.link_module(id)?,
            ModuleStatus::Linked => {}
        }
        self.modules.get_mut(id).status = ModuleStatus::Evaluating;

        let program = Rc::clone(&self.modules.get(id).program);
        let requests = program
            .module
            .as_ref()
            .map(|facts| facts.requests.clone())
            .unwrap_or_default();
        for request in &requests {
            let target = self.requested_module(request)?;
            if let Err(err) = self.evaluate_module(target) {
                return Err(self.module_failed(id, err));
            }
        }

        let env = self.module_env(id)?;
        let realm = self.current_realm();
        debug!(specifier = %self.modules.get(id).specifier, "evaluate module");
        let outcome = self.with_context(ExecutionContext::top_level(realm, env, Some(id)), |interp| {
            let mut act = Activation::new(FunctionKind::Normal, true);
            act.push_statement_list(&program.body);
            interp.run_activation(&mut act)
        });
        let result = match outcome {
            Ok(RunOutcome::Complete(Completion::Throw(value))) => Err(JsError::thrown(value)),
            Ok(RunOutcome::Complete(_)) => Ok(()),
            Ok(RunOutcome::Yield { .. } | RunOutcome::Await(_)) => {
                Err(JsError::internal("module body suspended"))
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                self.modules.get_mut(id).status = ModuleStatus::Evaluated;
                Ok(())
            }
            Err(err) => Err(self.module_failed(id, err)),
        }
    }

    fn module_failed(&mut self, id: ModuleId, err: JsError) -> JsError {
        if !err.is_catchable() {
            return err;
        }
        let value = self.error_to_value(err);
        self.modules.get_mut(id).status = ModuleStatus::Errored(value.cheap_clone());
        JsError::thrown(value)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Namespace objects
    // ═══════════════════════════════════════════════════════════════════════

    /// GetModuleNamespace. Created once per module.
    pub(crate) fn get_namespace(&mut self, id: ModuleId) -> ObjectId {
        if let Some(namespace) = self.modules.get(id).namespace {
            return namespace;
        }
        let mut object = JsObject::new(None, ObjectKind::ModuleNamespace(id));
        object.extensible = false;
        let tag = self.intern("Module");
        object.properties.insert(
            PropertyKey::Symbol(self.symbols.to_string_tag.cheap_clone()),
            Property::data(JsValue::String(tag), false, false, false),
        );
        let namespace = self.alloc(object);
        self.modules.get_mut(id).namespace = Some(namespace);
        namespace
    }

    /// Export names of `id`, sorted by code units.
    pub(crate) fn namespace_exports(&self, id: ModuleId) -> Vec<JsString> {
        let mut names: Vec<JsString> = self
            .modules
            .get(id)
            .program
            .module
            .as_ref()
            .map(|facts| {
                facts
                    .exports
                    .iter()
                    .map(|e| e.export_name.cheap_clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names.dedup();
        names
    }

    /// [[GetOwnProperty]] of a namespace: the live value of the export,
    /// which throws while the binding is still uninitialized.
    pub(crate) fn namespace_get_own_property(
        &mut self,
        id: ModuleId,
        name: &JsString,
    ) -> JsResult<Option<Property>> {
        let Some(binding) = self.resolve_export(id, name, &mut FxHashSet::default())? else {
            return Ok(None);
        };
        let value = self.envs.get_declarative(binding.env, &binding.name)?;
        Ok(Some(Property::data(value, true, true, false)))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // import()
    // ═══════════════════════════════════════════════════════════════════════

    /// Evaluate `import(specifier)`: always returns a promise; loading
    /// happens in a job.
    pub(crate) fn dynamic_import(&mut self, specifier: JsValue) -> JsResult<JsValue> {
        let capability = self.new_intrinsic_capability();
        let promise = JsValue::Object(capability.promise);
        let specifier = match self.to_string(&specifier) {
            Ok(specifier) => specifier.to_rust_string(),
            Err(err) => {
                self.reject_with(&capability, err)?;
                return Ok(promise);
            }
        };
        let referrer = self
            .running()
            .script_or_module
            .map(|module| self.modules.get(module).specifier.clone());
        self.enqueue_job(Job(JobKind::DynamicImport {
            specifier,
            referrer,
            capability,
        }));
        Ok(promise)
    }

    /// The job behind `import()`: resolve through the host, then link,
    /// evaluate and settle the promise with the namespace.
    pub(crate) fn run_dynamic_import(
        &mut self,
        specifier: &str,
        referrer: Option<&str>,
        capability: PromiseCapability,
    ) -> JsResult<()> {
        let resolved = match self.host.resolve_dynamic_import(specifier, referrer) {
            Ok(resolved) => resolved,
            Err(message) => return self.reject_with(&capability, JsError::module_error(message)),
        };
        debug!(specifier, resolved = %resolved, "dynamic import");
        let loaded = self
            .modules
            .lookup(&resolved)
            .ok_or_else(|| JsError::module_error(format!("Cannot find module '{resolved}'")))
            .and_then(|id| self.evaluate_module(id).map(|()| id));
        match loaded {
            Ok(id) => {
                let namespace = self.get_namespace(id);
                self.call(&capability.resolve, JsValue::Undefined, &[JsValue::Object(namespace)])?;
                Ok(())
            }
            Err(err) => self.reject_with(&capability, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::error::JsError;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    fn interp() -> Interpreter {
        Interpreter::new(RuntimeConfig::default())
    }

    #[test]
    fn test_modules_evaluate_once_in_dependency_order() {
        let mut interp = interp();
        interp
            .register_module("a", "globalThis.order = (globalThis.order || '') + 'a'; export let x = 1;")
            .unwrap();
        interp
            .register_module("b", "import { x } from 'a'; globalThis.order += 'b' + x;")
            .unwrap();
        let c = interp
            .register_module("c", "import 'a'; import 'b'; globalThis.order += 'c';")
            .unwrap();
        interp.evaluate_module(c).unwrap();
        interp.evaluate_module(c).unwrap();
        assert_eq!(interp.run_script("order").unwrap(), JsValue::from("ab1c"));
    }

    #[test]
    fn test_import_bindings_are_live() {
        let mut interp = interp();
        interp
            .register_module("counter", "export let count = 0; export function bump() { count++; }")
            .unwrap();
        let main = interp
            .register_module(
                "main",
                "import { count, bump } from 'counter'; bump(); bump(); globalThis.seen = count;",
            )
            .unwrap();
        interp.evaluate_module(main).unwrap();
        assert_eq!(interp.run_script("seen").unwrap(), JsValue::Number(2.0));
    }

    #[test]
    fn test_local_reexport_of_import() {
        let mut interp = interp();
        interp.register_module("base", "export const value = 7;").unwrap();
        interp
            .register_module("relay", "import { value } from 'base'; export { value as relayed };")
            .unwrap();
        let main = interp
            .register_module(
                "main",
                "import { relayed } from 'relay'; import * as ns from 'relay'; globalThis.got = relayed + ns.relayed;",
            )
            .unwrap();
        interp.evaluate_module(main).unwrap();
        assert_eq!(interp.run_script("got").unwrap(), JsValue::Number(14.0));
    }

    #[test]
    fn test_missing_module_is_a_module_error() {
        let mut interp = interp();
        let main = interp.register_module("main", "import { a } from 'nowhere';").unwrap();
        let err = interp.evaluate_module(main).unwrap_err();
        assert!(matches!(err, JsError::ModuleError { .. }));
    }

    #[test]
    fn test_namespace_keys_are_sorted() {
        let mut interp = interp();
        interp
            .register_module("m", "export const b = 1; export const a = 2; export default 3;")
            .unwrap();
        let main = interp
            .register_module("main", "import * as ns from 'm'; globalThis.keys = Object.keys(ns).join(',');")
            .unwrap();
        interp.evaluate_module(main).unwrap();
        assert_eq!(interp.run_script("keys").unwrap(), JsValue::from("a,b,default"));
    }
}
