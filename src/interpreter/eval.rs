//! `eval`
//!
//! PerformEval for direct and indirect calls. Direct eval sees the caller's
//! environments; indirect eval runs against the global environment. Strict
//! eval code always gets a variable environment of its own, so its `var`s
//! never leak out.

use tracing::debug;

use crate::ast::{FunctionForm, FunctionKind, Program};
use crate::completion::Completion;
use crate::context::ExecutionContext;
use crate::environment::EnvId;
use crate::error::{JsError, JsResult};
use crate::parser::{EvalContext, parse_eval};
use crate::value::{CheapClone, JsString, JsValue};

use super::bindings::{already_declared, functions_to_initialize};
use super::machine::{Activation, RunOutcome};
use super::Interpreter;

impl Interpreter {
    /// Where a direct eval runs: inside which kind of function, if any.
    fn eval_context(&self, strict: bool) -> JsResult<EvalContext> {
        let mut context = EvalContext {
            strict,
            ..EvalContext::default()
        };
        let this_env = self.this_environment()?;
        if let Some(slots) = self.envs.function_slots(this_env) {
            context.in_function = true;
            if let Some(data) = self.heap.get(slots.function_object).function_data() {
                context.in_method = data.home_object.is_some();
                context.in_derived_constructor =
                    matches!(data.node.form, FunctionForm::ClassConstructor { derived: true });
            }
        }
        Ok(context)
    }

    /// PerformEval
    pub(crate) fn perform_eval(&mut self, source: JsValue, direct: bool, strict_caller: bool) -> JsResult<JsValue> {
        let JsValue::String(text) = source else {
            return Ok(source);
        };
        let realm = self.current_realm();
        if !self.host.may_compile_dynamic_code(realm) {
            return Err(JsError::EvalError {
                message: "Code generation from strings disallowed for this context".to_string(),
            });
        }

        let context = if direct {
            self.eval_context(strict_caller)?
        } else {
            EvalContext::default()
        };
        let program = parse_eval(&text.to_rust_string(), &mut self.string_dict, context)?;
        let strict = (direct && strict_caller) || program.strict;
        debug!(direct, strict, statements = program.body.len(), "eval");

        let running = self.running().clone();
        let (outer_lex, outer_var) = if direct {
            (running.lexical_env, running.variable_env)
        } else {
            let global_env = self.realm().global_env;
            (global_env, global_env)
        };
        let lex_env = self.envs.new_declarative(outer_lex);
        let var_env = if strict { lex_env } else { outer_var };

        let ctx = ExecutionContext {
            function: None,
            realm,
            script_or_module: running.script_or_module,
            lexical_env: lex_env,
            variable_env: var_env,
            coroutine: None,
        };
        let outcome = self.with_context(ctx, |interp| {
            interp.eval_declaration_instantiation(&program, var_env, lex_env, strict)?;
            let mut act = Activation::new(FunctionKind::Normal, strict);
            act.push_statement_list(&program.body);
            interp.run_activation(&mut act)
        })?;
        match outcome {
            RunOutcome::Complete(Completion::Throw(value)) => Err(JsError::thrown(value)),
            RunOutcome::Complete(completion) => Ok(completion.value_or_undefined()),
            RunOutcome::Yield { .. } | RunOutcome::Await(_) => Err(JsError::internal("eval code suspended")),
        }
    }

    /// EvalDeclarationInstantiation
    fn eval_declaration_instantiation(
        &mut self,
        program: &Program,
        var_env: EnvId,
        lex_env: EnvId,
        strict: bool,
    ) -> JsResult<()> {
        let scope = &program.scope;
        let global_var_env = self.is_global_env(var_env);
        let functions = functions_to_initialize(&scope.functions);
        let function_names: Vec<JsString> = functions.iter().filter_map(|f| f.id.clone()).collect();

        if !strict {
            let hoisted: Vec<&JsString> = scope.var_names.iter().chain(&function_names).collect();
            if global_var_env {
                for name in &hoisted {
                    if self.envs.has_declarative(var_env, name) {
                        return Err(already_declared(name));
                    }
                }
            }
            // A hoisted var must not cross a lexical declaration of the
            // same name between the eval and its variable environment.
            let mut current = self.envs.outer(lex_env);
            while let Some(env) = current
                && env != var_env
            {
                if !self.envs.get(env).is_object_backed() {
                    for name in &hoisted {
                        if self.envs.has_declarative(env, name) {
                            return Err(already_declared(name));
                        }
                    }
                }
                current = self.envs.outer(env);
            }
        }

        if global_var_env {
            for name in &function_names {
                if !self.can_declare_global_function(var_env, name)? {
                    return Err(JsError::type_error(format!("Cannot redefine global function '{name}'")));
                }
            }
        }
        let mut declared_vars: Vec<JsString> = Vec::new();
        for name in &scope.var_names {
            if function_names.contains(name) || declared_vars.contains(name) {
                continue;
            }
            if global_var_env && !self.can_declare_global_var(var_env, name)? {
                return Err(JsError::type_error(format!("Cannot declare global variable '{name}'")));
            }
            declared_vars.push(name.cheap_clone());
        }

        for binding in &scope.lexical {
            if binding.constant {
                self.envs.create_immutable_binding(lex_env, binding.name.cheap_clone(), true);
            } else {
                self.envs.create_mutable_binding(lex_env, binding.name.cheap_clone(), false);
            }
        }

        for func in &functions {
            let Some(name) = &func.id else {
                continue;
            };
            let closure = JsValue::Object(self.instantiate_function_object(func, lex_env));
            if global_var_env {
                self.create_global_function_binding(var_env, name, closure, true)?;
            } else if self.has_binding(var_env, name)? {
                self.set_mutable_binding(var_env, name, closure, false)?;
            } else {
                self.envs.create_mutable_binding(var_env, name.cheap_clone(), true);
                self.envs.initialize_declarative(var_env, name, closure)?;
            }
        }

        for name in &declared_vars {
            if global_var_env {
                self.create_global_var_binding(var_env, name, true)?;
            } else if !self.has_binding(var_env, name)? {
                self.envs.create_mutable_binding(var_env, name.cheap_clone(), true);
                self.envs.initialize_declarative(var_env, name, JsValue::Undefined)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    fn run(source: &str) -> JsValue {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        interp.run_script(source).unwrap()
    }

    #[test]
    fn test_direct_eval_sees_local_scope() {
        let source = "function f() { var x = 5; return eval('x * 2'); } f()";
        assert_eq!(run(source), JsValue::Number(10.0));
    }

    #[test]
    fn test_indirect_eval_uses_global_scope() {
        let source = "var x = 'global'; function f() { var x = 'local'; return (0, eval)('x'); } f()";
        assert_eq!(run(source), JsValue::from("global"));
    }

    #[test]
    fn test_sloppy_direct_eval_declares_var_in_caller() {
        let source = "function f() { eval('var y = 3'); return y; } f()";
        assert_eq!(run(source), JsValue::Number(3.0));
    }

    #[test]
    fn test_strict_eval_keeps_vars_private() {
        let source = "function f() { 'use strict'; eval('var z = 1'); return typeof z; } f()";
        assert_eq!(run(source), JsValue::from("undefined"));
    }

    #[test]
    fn test_non_string_argument_is_returned() {
        assert_eq!(run("eval(42)"), JsValue::Number(42.0));
    }

    #[test]
    fn test_var_conflicting_with_let_is_rejected() {
        let source = "let q = 1; try { eval('var q = 2'); 'no error' } catch (e) { e instanceof SyntaxError }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }
}
