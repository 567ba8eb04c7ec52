//! Statement evaluation
//!
//! Every statement starts as a `Frame::Stmt`; compound statements push the
//! frames of their parts. Statement lists fold their items' completions
//! with UpdateEmpty and stop at the first abrupt one.

use std::rc::Rc;

use crate::ast::{
    BlockStatement, ExportDeclaration, IfStatement, Statement, SwitchStatement, TryStatement,
    VariableDeclaration, VariableKind, WithStatement,
};
use crate::completion::Completion;
use crate::environment::EnvironmentKind;
use crate::error::{JsError, JsResult};
use crate::value::{CheapClone, JsValue};

use super::machine::{
    Activation, BindingMode, Frame, FrameResult, LoopPhase, SwitchState, WhileState,
};
use super::Interpreter;

impl Interpreter {
    /// Start evaluating `stmt`.
    pub(crate) fn exec_statement(&mut self, act: &mut Activation, stmt: Statement) -> JsResult<FrameResult> {
        match stmt {
            Statement::VariableDeclaration(decl) => {
                act.push(Frame::Declarator { decl, index: 0 });
            }
            Statement::FunctionDeclaration(_) | Statement::Empty | Statement::Debugger | Statement::Import(_) => {
                act.set_empty();
            }
            Statement::ClassDeclaration(class) => {
                let Some(name) = class.id.clone() else {
                    return Err(JsError::internal("class declaration without a name"));
                };
                act.push(Frame::InitializeBinding(name));
                self.push_class_definition(act, class);
            }
            Statement::Expression(expr) => act.push(Frame::Expr(expr)),
            Statement::Block(block) => self.enter_block(act, &block)?,
            Statement::If(stmt) => {
                let test = stmt.test.cheap_clone();
                act.push(Frame::IfBranch(stmt));
                act.push(Frame::Expr(test));
            }
            Statement::For(stmt) => self.exec_for(act, stmt)?,
            Statement::ForIn(stmt) => self.exec_for_in_of(act, stmt, true),
            Statement::ForOf(stmt) => self.exec_for_in_of(act, stmt, false),
            Statement::While(stmt) => self.push_while(act, stmt, false),
            Statement::DoWhile(stmt) => self.push_while(act, stmt, true),
            Statement::Switch(stmt) => {
                let discriminant = stmt.discriminant.cheap_clone();
                act.push(Frame::BreakableExit);
                act.push(Frame::SwitchStart(stmt));
                act.push(Frame::Expr(discriminant));
            }
            Statement::Labeled(stmt) => {
                act.push(Frame::LabelExit(stmt.label.cheap_clone()));
                act.push(Frame::Stmt(stmt.body.cheap_clone()));
            }
            Statement::Break(target) => {
                act.acc = Completion::Break {
                    target,
                    value: None,
                };
            }
            Statement::Continue(target) => {
                act.acc = Completion::Continue {
                    target,
                    value: None,
                };
            }
            Statement::Return(None) => act.acc = Completion::Return(JsValue::Undefined),
            Statement::Return(Some(expr)) => {
                act.push(Frame::ReturnValue);
                act.push(Frame::Expr(expr));
            }
            Statement::Throw(expr) => {
                act.push(Frame::ThrowValue);
                act.push(Frame::Expr(expr));
            }
            Statement::Try(stmt) => {
                act.push(Frame::UpdateEmptyUndefined);
                if stmt.finalizer.is_some() {
                    act.push(Frame::TryFinally(stmt.cheap_clone()));
                }
                if stmt.handler.is_some() {
                    act.push(Frame::TryCatch(stmt.cheap_clone()));
                }
                act.push(Frame::Stmt(Statement::Block(stmt.block.cheap_clone())));
            }
            Statement::With(stmt) => {
                let object = stmt.object.cheap_clone();
                act.push(Frame::WithEnter(stmt));
                act.push(Frame::Expr(object));
            }
            Statement::Export(decl) => match &*decl {
                ExportDeclaration::Declaration(stmt) | ExportDeclaration::DefaultDeclaration(stmt) => {
                    act.push(Frame::Stmt(stmt.cheap_clone()));
                }
                ExportDeclaration::DefaultExpression(expr) => {
                    let local = self.intern("*default*");
                    act.push(Frame::InitializeBinding(local));
                    act.push(Frame::Expr(expr.cheap_clone()));
                }
                ExportDeclaration::List => act.set_empty(),
            },
        }
        Ok(FrameResult::Continue)
    }

    /// Block evaluation: a fresh declarative environment when the block
    /// declares anything, restored when the block completes in any way.
    pub(crate) fn enter_block(&mut self, act: &mut Activation, block: &Rc<BlockStatement>) -> JsResult<()> {
        if !block.scope.is_empty() {
            let old_env = self.lexical_env();
            let block_env = self.envs.new_declarative(old_env);
            self.block_declaration_instantiation(&block.scope, block_env)?;
            self.set_lexical_env(block_env);
            act.push(Frame::RestoreEnv(old_env));
        }
        act.push_statement_list(&block.body);
        Ok(())
    }

    /// Fold the completion of item `next - 1` into the list's value and
    /// start item `next`.
    pub(crate) fn step_statement_list(
        &mut self,
        act: &mut Activation,
        list: Rc<[Statement]>,
        next: usize,
        value: Option<JsValue>,
    ) -> JsResult<FrameResult> {
        let completion = std::mem::take(&mut act.acc).update_empty(value);
        if completion.is_abrupt() {
            act.acc = completion;
            return Ok(FrameResult::Continue);
        }
        match list.get(next) {
            Some(stmt) => {
                let stmt = stmt.cheap_clone();
                let value = completion.value().cloned();
                act.push(Frame::StmtList {
                    list,
                    next: next + 1,
                    value,
                });
                act.push(Frame::Stmt(stmt));
            }
            None => act.acc = completion,
        }
        Ok(FrameResult::Continue)
    }

    pub(crate) fn step_if(&mut self, act: &mut Activation, stmt: Rc<IfStatement>) -> JsResult<FrameResult> {
        let test = act.take_value();
        let branch = if test.to_boolean() {
            Some(stmt.consequent.cheap_clone())
        } else {
            stmt.alternate.clone()
        };
        match branch {
            Some(branch) => {
                act.push(Frame::UpdateEmptyUndefined);
                act.push(Frame::Stmt(branch));
            }
            None => act.set_value(JsValue::Undefined),
        }
        Ok(FrameResult::Continue)
    }

    /// Evaluate declarator `index` of a variable declaration. The frame for
    /// the following declarator is pushed first; past the end it leaves the
    /// empty completion of the whole declaration.
    pub(crate) fn step_declarator(
        &mut self,
        act: &mut Activation,
        decl: Rc<VariableDeclaration>,
        index: usize,
    ) -> JsResult<FrameResult> {
        let Some(declarator) = decl.declarations.get(index).cloned() else {
            act.set_empty();
            return Ok(FrameResult::Continue);
        };
        let kind = decl.kind;
        act.push(Frame::Declarator {
            decl,
            index: index + 1,
        });
        match (kind, declarator.init) {
            (VariableKind::Var, None) => {}
            (_, None) => {
                let Some(id) = declarator.target.as_identifier() else {
                    return Err(JsError::internal("lexical declaration without initializer"));
                };
                let env = self.lexical_env();
                self.initialize_binding(env, &id.name, JsValue::Undefined)?;
            }
            (VariableKind::Var, Some(init)) => match declarator.target.as_identifier() {
                Some(id) => {
                    let reference = self.resolve_binding(&id.name, None, act.strict)?;
                    act.push(Frame::PutReference(Box::new(reference)));
                    act.push(Frame::Expr(init));
                }
                None => {
                    act.push(Frame::BindPattern {
                        pattern: declarator.target,
                        mode: BindingMode::Put,
                    });
                    act.push(Frame::Expr(init));
                }
            },
            (_, Some(init)) => {
                let env = self.lexical_env();
                act.push(Frame::BindPattern {
                    pattern: declarator.target,
                    mode: BindingMode::Initialize(env),
                });
                act.push(Frame::Expr(init));
            }
        }
        Ok(FrameResult::Continue)
    }

    fn push_while(&mut self, act: &mut Activation, stmt: Rc<crate::ast::WhileStatement>, do_while: bool) {
        act.push(Frame::BreakableExit);
        act.push(Frame::WhileLoop(Box::new(WhileState {
            stmt,
            do_while,
            value: JsValue::Undefined,
            phase: LoopPhase::Start,
        })));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // switch
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn step_switch_start(&mut self, act: &mut Activation, stmt: Rc<SwitchStatement>) -> JsResult<FrameResult> {
        let discriminant = act.take_value();
        let old_env = self.lexical_env();
        let block_env = self.envs.new_declarative(old_env);
        self.block_declaration_instantiation(&stmt.scope, block_env)?;
        self.set_lexical_env(block_env);
        act.push(Frame::RestoreEnv(old_env));
        self.step_switch_match(
            act,
            Box::new(SwitchState {
                stmt,
                discriminant,
                next: 0,
                testing: false,
            }),
        )
    }

    /// Try the case clauses in source order, skipping `default`.
    pub(crate) fn step_switch_match(&mut self, act: &mut Activation, mut state: Box<SwitchState>) -> JsResult<FrameResult> {
        if state.testing {
            let candidate = act.take_value();
            if state.discriminant.strict_equals(&candidate) {
                return self.start_switch_run(act, state.stmt, state.next);
            }
            state.testing = false;
            state.next += 1;
        }
        while let Some(case) = state.stmt.cases.get(state.next) {
            if let Some(test) = &case.test {
                let test = test.cheap_clone();
                state.testing = true;
                act.push(Frame::SwitchMatch(state));
                act.push(Frame::Expr(test));
                return Ok(FrameResult::Continue);
            }
            state.next += 1;
        }
        match state.stmt.cases.iter().position(|case| case.test.is_none()) {
            Some(default) => self.start_switch_run(act, state.stmt, default),
            None => {
                act.set_value(JsValue::Undefined);
                Ok(FrameResult::Continue)
            }
        }
    }

    fn start_switch_run(&mut self, act: &mut Activation, stmt: Rc<SwitchStatement>, from: usize) -> JsResult<FrameResult> {
        act.set_empty();
        act.push(Frame::SwitchRun {
            stmt,
            next: from,
            value: JsValue::Undefined,
        });
        Ok(FrameResult::Continue)
    }

    /// Run the clause bodies from `next` on, falling through.
    pub(crate) fn step_switch_run(
        &mut self,
        act: &mut Activation,
        stmt: Rc<SwitchStatement>,
        next: usize,
        mut value: JsValue,
    ) -> JsResult<FrameResult> {
        let completion = std::mem::take(&mut act.acc);
        if let Some(v) = completion.value() {
            value = v.cheap_clone();
        }
        if completion.is_abrupt() {
            act.acc = completion.update_empty(Some(value));
            return Ok(FrameResult::Continue);
        }
        match stmt.cases.get(next) {
            Some(case) => {
                let body = case.body.cheap_clone();
                act.push(Frame::SwitchRun {
                    stmt,
                    next: next + 1,
                    value,
                });
                act.push_statement_list(&body);
            }
            None => act.set_value(value),
        }
        Ok(FrameResult::Continue)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // return, try, with
    // ═══════════════════════════════════════════════════════════════════════

    /// `return expr`. Async generators await the operand.
    pub(crate) fn step_return_value(&mut self, act: &mut Activation) -> JsResult<FrameResult> {
        let value = act.take_value();
        if act.kind == crate::ast::FunctionKind::AsyncGenerator {
            act.push(Frame::ReturnAwaited);
            return Ok(FrameResult::Await(value));
        }
        act.acc = Completion::Return(value);
        Ok(FrameResult::Continue)
    }

    /// The try block finished. A throw runs the catch clause with the
    /// thrown value bound in a fresh environment.
    pub(crate) fn step_try_catch(&mut self, act: &mut Activation, stmt: Rc<TryStatement>) -> JsResult<FrameResult> {
        let Completion::Throw(thrown) = &act.acc else {
            return Ok(FrameResult::Continue);
        };
        let thrown = thrown.cheap_clone();
        let Some(handler) = &stmt.handler else {
            return Ok(FrameResult::Continue);
        };
        act.set_empty();
        let body = Statement::Block(handler.body.cheap_clone());
        match &handler.param {
            None => act.push(Frame::Stmt(body)),
            Some(param) => {
                let old_env = self.lexical_env();
                let catch_env = self.envs.new_declarative(old_env);
                let mut names = Vec::new();
                param.bound_names(&mut names);
                for name in names {
                    self.envs.create_mutable_binding(catch_env, name, false);
                }
                self.set_lexical_env(catch_env);
                act.push(Frame::RestoreEnv(old_env));
                act.push(Frame::Stmt(body));
                act.push(Frame::BindPattern {
                    pattern: param.cheap_clone(),
                    mode: BindingMode::Initialize(catch_env),
                });
                act.set_value(thrown);
            }
        }
        Ok(FrameResult::Continue)
    }

    /// Run the finally block. Its own abrupt completion replaces the saved
    /// one; otherwise `FinallyExit` restores the saved completion.
    pub(crate) fn step_try_finally(&mut self, act: &mut Activation, stmt: Rc<TryStatement>) -> JsResult<FrameResult> {
        let Some(finalizer) = &stmt.finalizer else {
            return Ok(FrameResult::Continue);
        };
        let saved = std::mem::take(&mut act.acc);
        act.push(Frame::FinallyExit(saved));
        act.push(Frame::Stmt(Statement::Block(finalizer.cheap_clone())));
        Ok(FrameResult::Continue)
    }

    pub(crate) fn step_with_enter(&mut self, act: &mut Activation, stmt: Rc<WithStatement>) -> JsResult<FrameResult> {
        let value = act.take_value();
        let object = self.to_object(&value)?;
        let old_env = self.lexical_env();
        let env = self.envs.alloc(
            Some(old_env),
            EnvironmentKind::Object {
                binding_object: object,
                with_environment: true,
            },
        );
        self.set_lexical_env(env);
        act.push(Frame::UpdateEmptyUndefined);
        act.push(Frame::RestoreEnv(old_env));
        act.push(Frame::Stmt(stmt.body.cheap_clone()));
        Ok(FrameResult::Continue)
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
    fn test_statement_list_keeps_last_non_empty_value() {
        assert_eq!(run("1; var x;"), JsValue::Number(1.0));
        assert_eq!(run("2; ;"), JsValue::Number(2.0));
        assert_eq!(run(""), JsValue::Undefined);
    }

    #[test]
    fn test_if_without_else_completes_with_undefined() {
        assert_eq!(run("3; if (false) 4;"), JsValue::Undefined);
    }

    #[test]
    fn test_switch_falls_through_from_default() {
        let source = "var log = ''; switch (9) { case 1: log += 'a'; default: log += 'd'; case 2: log += 'b'; } log";
        assert_eq!(run(source), JsValue::from("db"));
    }
}
