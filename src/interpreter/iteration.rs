//! Iteration statements
//!
//! while, do-while, for, for-in, for-of and for-await-of. Each loop keeps
//! its state in a single frame that sees the completion of every test,
//! body and update it started, including abrupt ones.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::ast::{ForHead, ForInOfStatement, ForInit, ForStatement, Statement, VariableKind};
use crate::completion::Completion;
use crate::error::{JsError, JsResult};
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

use super::machine::{
    Activation, BindingMode, ForInOfPhase, ForInOfState, ForState, Frame, FrameResult, LoopPhase,
    LoopSource, WhileState,
};
use super::{Interpreter, IteratorHint};

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // while / do-while
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn step_while(&mut self, act: &mut Activation, mut state: Box<WhileState>) -> JsResult<FrameResult> {
        if act.acc.is_abrupt() && state.phase != LoopPhase::Body {
            return Ok(FrameResult::Continue);
        }
        match state.phase {
            LoopPhase::Start if state.do_while => {
                self.while_body(act, state);
            }
            LoopPhase::Start | LoopPhase::Update => self.while_test(act, state),
            LoopPhase::Test => {
                if !act.take_value().to_boolean() {
                    act.set_value(state.value);
                    return Ok(FrameResult::Continue);
                }
                self.while_body(act, state);
            }
            LoopPhase::Body => {
                let completion = std::mem::take(&mut act.acc);
                if let Some(value) = completion.value() {
                    state.value = value.cheap_clone();
                }
                if !completion.loop_continues(&state.stmt.labels) {
                    act.acc = completion.update_empty(Some(state.value));
                    return Ok(FrameResult::Continue);
                }
                self.while_test(act, state);
            }
        }
        Ok(FrameResult::Continue)
    }

    fn while_test(&mut self, act: &mut Activation, mut state: Box<WhileState>) {
        let test = state.stmt.test.cheap_clone();
        state.phase = LoopPhase::Test;
        act.push(Frame::WhileLoop(state));
        act.push(Frame::Expr(test));
    }

    fn while_body(&mut self, act: &mut Activation, mut state: Box<WhileState>) {
        let body = state.stmt.body.cheap_clone();
        state.phase = LoopPhase::Body;
        act.set_empty();
        act.push(Frame::WhileLoop(state));
        act.push(Frame::Stmt(body));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // for
    // ═══════════════════════════════════════════════════════════════════════

    /// ForStatement. A `let` head gets a loop environment whose bindings are
    /// copied into a fresh environment before every iteration, so closures
    /// created in different iterations observe different bindings.
    pub(crate) fn exec_for(&mut self, act: &mut Activation, stmt: Rc<ForStatement>) -> JsResult<()> {
        let old_env = self.lexical_env();
        act.push(Frame::BreakableExit);
        let mut per_iteration = Vec::new();
        let init = match &stmt.init {
            Some(ForInit::Variable(decl)) if decl.kind.is_lexical() => {
                let loop_env = self.envs.new_declarative(old_env);
                let mut names = Vec::new();
                for declarator in decl.declarations.iter() {
                    declarator.target.bound_names(&mut names);
                }
                for name in &names {
                    if decl.kind == VariableKind::Const {
                        self.envs.create_immutable_binding(loop_env, name.cheap_clone(), true);
                    } else {
                        self.envs.create_mutable_binding(loop_env, name.cheap_clone(), false);
                    }
                }
                self.set_lexical_env(loop_env);
                act.push(Frame::RestoreEnv(old_env));
                if decl.kind == VariableKind::Let {
                    per_iteration = names;
                }
                Some(Frame::Stmt(Statement::VariableDeclaration(decl.cheap_clone())))
            }
            Some(ForInit::Variable(decl)) => {
                Some(Frame::Stmt(Statement::VariableDeclaration(decl.cheap_clone())))
            }
            Some(ForInit::Expression(expr)) => Some(Frame::Expr(expr.cheap_clone())),
            None => None,
        };
        act.push(Frame::ForLoop(Box::new(ForState {
            stmt,
            per_iteration,
            value: JsValue::Undefined,
            phase: LoopPhase::Start,
        })));
        if let Some(init) = init {
            act.push(init);
        }
        Ok(())
    }

    pub(crate) fn step_for(&mut self, act: &mut Activation, mut state: Box<ForState>) -> JsResult<FrameResult> {
        if act.acc.is_abrupt() && state.phase != LoopPhase::Body {
            return Ok(FrameResult::Continue);
        }
        match state.phase {
            LoopPhase::Start => {
                act.set_empty();
                self.next_iteration_env(&state)?;
            }
            LoopPhase::Test => {
                if !act.take_value().to_boolean() {
                    act.set_value(state.value);
                    return Ok(FrameResult::Continue);
                }
                self.for_body(act, state);
                return Ok(FrameResult::Continue);
            }
            LoopPhase::Body => {
                let completion = std::mem::take(&mut act.acc);
                if let Some(value) = completion.value() {
                    state.value = value.cheap_clone();
                }
                if !completion.loop_continues(&state.stmt.labels) {
                    act.acc = completion.update_empty(Some(state.value));
                    return Ok(FrameResult::Continue);
                }
                self.next_iteration_env(&state)?;
                if let Some(update) = &state.stmt.update {
                    let update = update.cheap_clone();
                    state.phase = LoopPhase::Update;
                    act.push(Frame::ForLoop(state));
                    act.push(Frame::Expr(update));
                    return Ok(FrameResult::Continue);
                }
            }
            LoopPhase::Update => act.set_empty(),
        }
        match &state.stmt.test {
            Some(test) => {
                let test = test.cheap_clone();
                state.phase = LoopPhase::Test;
                act.push(Frame::ForLoop(state));
                act.push(Frame::Expr(test));
            }
            None => self.for_body(act, state),
        }
        Ok(FrameResult::Continue)
    }

    fn for_body(&mut self, act: &mut Activation, mut state: Box<ForState>) {
        let body = state.stmt.body.cheap_clone();
        state.phase = LoopPhase::Body;
        act.set_empty();
        act.push(Frame::ForLoop(state));
        act.push(Frame::Stmt(body));
    }

    /// CreatePerIterationEnvironment
    fn next_iteration_env(&mut self, state: &ForState) -> JsResult<()> {
        if state.per_iteration.is_empty() {
            return Ok(());
        }
        let last = self.lexical_env();
        let next = self.envs.copy_for_iteration(last, &state.per_iteration)?;
        self.set_lexical_env(next);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // for-in / for-of / for-await-of
    // ═══════════════════════════════════════════════════════════════════════

    /// ForIn/OfHeadEvaluation starts here: a lexical head's names are in
    /// their temporal dead zone while the right-hand side is evaluated.
    pub(crate) fn exec_for_in_of(&mut self, act: &mut Activation, stmt: Rc<ForInOfStatement>, for_in: bool) {
        let old_env = self.lexical_env();
        act.push(Frame::BreakableExit);
        act.push(Frame::RestoreEnv(old_env));
        if let ForHead::Declaration { kind, target } = &stmt.head
            && kind.is_lexical()
        {
            let mut names = Vec::new();
            target.bound_names(&mut names);
            if !names.is_empty() {
                let tdz_env = self.envs.new_declarative(old_env);
                for name in names {
                    self.envs.create_mutable_binding(tdz_env, name, false);
                }
                self.set_lexical_env(tdz_env);
            }
        }
        let right = stmt.right.cheap_clone();
        act.push(Frame::ForInOfHead {
            stmt,
            old_env,
            for_in,
        });
        act.push(Frame::Expr(right));
    }

    pub(crate) fn step_for_in_of_head(
        &mut self,
        act: &mut Activation,
        stmt: Rc<ForInOfStatement>,
        old_env: crate::environment::EnvId,
        for_in: bool,
    ) -> JsResult<FrameResult> {
        let value = act.take_value();
        self.set_lexical_env(old_env);
        let source = if for_in {
            if value.is_null_or_undefined() {
                act.acc = Completion::Break {
                    target: None,
                    value: None,
                };
                return Ok(FrameResult::Continue);
            }
            let object = self.to_object(&value)?;
            let keys = self.enumerable_keys_for_in(object)?;
            LoopSource::Keys {
                object,
                keys,
                next: 0,
            }
        } else if stmt.is_await {
            LoopSource::Async(self.get_iterator(&value, IteratorHint::Async)?)
        } else {
            LoopSource::Sync(self.get_iterator(&value, IteratorHint::Sync)?)
        };
        let state = Box::new(ForInOfState {
            stmt,
            source,
            value: JsValue::Undefined,
            old_env,
            phase: ForInOfPhase::Next,
        });
        self.for_in_of_next(act, state)
    }

    /// The string keys a for-in visits: enumerable own keys first, then
    /// those of each prototype not shadowed by a key already seen.
    fn enumerable_keys_for_in(&mut self, object: ObjectId) -> JsResult<Vec<PropertyKey>> {
        let mut seen: FxHashSet<JsString> = FxHashSet::default();
        let mut keys = Vec::new();
        let mut current = Some(object);
        while let Some(id) = current {
            for key in self.own_property_keys(id) {
                let PropertyKey::String(name) = &key else {
                    continue;
                };
                if !seen.insert(name.cheap_clone()) {
                    continue;
                }
                if let Some(prop) = self.get_own_property(id, &key)?
                    && prop.enumerable()
                {
                    keys.push(key);
                }
            }
            current = self.heap.get(id).prototype;
        }
        Ok(keys)
    }

    pub(crate) fn step_for_in_of(&mut self, act: &mut Activation, mut state: Box<ForInOfState>) -> JsResult<FrameResult> {
        let phase = std::mem::replace(&mut state.phase, ForInOfPhase::Next);
        match phase {
            ForInOfPhase::Next => self.for_in_of_next(act, state),
            ForInOfPhase::AwaitNext => {
                if act.acc.is_abrupt() {
                    return Ok(FrameResult::Continue);
                }
                let result = act.take_value();
                if !result.is_object() {
                    let shown = self.describe_value(&result);
                    return Err(JsError::type_error(format!("Iterator result {shown} is not an object")));
                }
                if self.iterator_complete(&result)? {
                    act.set_value(state.value);
                    return Ok(FrameResult::Continue);
                }
                let value = self.iterator_value(&result)?;
                self.for_in_of_body(act, state, value)
            }
            ForInOfPhase::Body => {
                let completion = std::mem::take(&mut act.acc);
                if let Some(value) = completion.value() {
                    state.value = value.cheap_clone();
                }
                self.set_lexical_env(state.old_env);
                if completion.loop_continues(&state.stmt.labels) {
                    return self.for_in_of_next(act, state);
                }
                let completion = completion.update_empty(Some(state.value.cheap_clone()));
                self.close_loop_source(act, state, completion)
            }
            ForInOfPhase::AwaitClose(completion) => {
                let awaited = std::mem::take(&mut act.acc);
                if completion.is_throw() || awaited.is_abrupt() {
                    act.acc = if completion.is_throw() { completion } else { awaited };
                    return Ok(FrameResult::Continue);
                }
                if !awaited.value().is_some_and(JsValue::is_object) {
                    return Err(JsError::type_error("Iterator result is not an object"));
                }
                act.acc = completion;
                Ok(FrameResult::Continue)
            }
        }
    }

    /// Fetch the next value and start the body, or finish the loop.
    fn for_in_of_next(&mut self, act: &mut Activation, mut state: Box<ForInOfState>) -> JsResult<FrameResult> {
        let value = match &mut state.source {
            LoopSource::Keys { object, keys, next } => loop {
                let Some(key) = keys.get(*next).cloned() else {
                    act.set_value(state.value);
                    return Ok(FrameResult::Continue);
                };
                *next += 1;
                if self.has_property(*object, &key)? {
                    break key.to_value();
                }
            },
            LoopSource::Sync(record) => match self.iterator_step_value(record)? {
                Some(value) => value,
                None => {
                    act.set_value(state.value);
                    return Ok(FrameResult::Continue);
                }
            },
            LoopSource::Async(record) => {
                let result = self.call(&record.next_method, record.iterator.cheap_clone(), &[])?;
                state.phase = ForInOfPhase::AwaitNext;
                act.push(Frame::ForInOf(state));
                return Ok(FrameResult::Await(result));
            }
        };
        self.for_in_of_body(act, state, value)
    }

    /// Bind the iteration value to the head, then run the body.
    fn for_in_of_body(&mut self, act: &mut Activation, mut state: Box<ForInOfState>, value: JsValue) -> JsResult<FrameResult> {
        let (pattern, mode) = match &state.stmt.head {
            ForHead::Declaration { kind, target } if kind.is_lexical() => {
                let iteration_env = self.envs.new_declarative(state.old_env);
                let mut names = Vec::new();
                target.bound_names(&mut names);
                for name in names {
                    if *kind == VariableKind::Const {
                        self.envs.create_immutable_binding(iteration_env, name, true);
                    } else {
                        self.envs.create_mutable_binding(iteration_env, name, false);
                    }
                }
                self.set_lexical_env(iteration_env);
                (target.cheap_clone(), BindingMode::Initialize(iteration_env))
            }
            ForHead::Declaration { target, .. } | ForHead::Target(target) => {
                (target.cheap_clone(), BindingMode::Put)
            }
        };
        let body = state.stmt.body.cheap_clone();
        state.phase = ForInOfPhase::Body;
        act.push(Frame::ForInOf(state));
        act.push(Frame::Stmt(body));
        act.push(Frame::BindPattern { pattern, mode });
        act.set_value(value);
        Ok(FrameResult::Continue)
    }

    /// Leave the loop with `completion`, closing the iterator first.
    fn close_loop_source(
        &mut self,
        act: &mut Activation,
        mut state: Box<ForInOfState>,
        completion: Completion,
    ) -> JsResult<FrameResult> {
        match &state.source {
            LoopSource::Keys { .. } => act.acc = completion,
            LoopSource::Sync(record) => {
                act.acc = self.iterator_close(record, completion)?;
            }
            LoopSource::Async(record) => {
                let iterator = record.iterator.cheap_clone();
                let key = self.key("return");
                let inner = self.get_method(&iterator, &key).and_then(|method| match method {
                    Some(method) => self.call(&method, iterator.cheap_clone(), &[]).map(Some),
                    None => Ok(None),
                });
                match inner {
                    Ok(Some(result)) => {
                        state.phase = ForInOfPhase::AwaitClose(completion);
                        act.push(Frame::ForInOf(state));
                        return Ok(FrameResult::Await(result));
                    }
                    Ok(None) => act.acc = completion,
                    Err(err) if completion.is_throw() && err.is_catchable() => act.acc = completion,
                    Err(err) => return Err(err),
                }
            }
        }
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
    fn test_for_let_creates_binding_per_iteration() {
        let source = "var fs = []; for (let i = 0; i < 3; i++) fs.push(() => i); fs[0]() + fs[1]() + fs[2]()";
        assert_eq!(run(source), JsValue::Number(3.0));
    }

    #[test]
    fn test_for_in_skips_keys_deleted_during_iteration() {
        let source = "var o = {a: 1, b: 2, c: 3}; var seen = ''; for (var k in o) { seen += k; delete o.c; } seen";
        assert_eq!(run(source), JsValue::from("ab"));
    }

    #[test]
    fn test_for_in_over_null_does_nothing() {
        assert_eq!(run("var n = 0; for (var k in null) n++; n"), JsValue::Number(0.0));
    }

    #[test]
    fn test_break_out_of_for_of_closes_iterator() {
        let source = "
            var closed = false;
            var it = { [Symbol.iterator]() { return this; },
                       next() { return { value: 1, done: false }; },
                       return() { closed = true; return {}; } };
            for (var x of it) break;
            closed";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_loop_completion_value() {
        assert_eq!(run("var i = 0; while (i < 3) { i++; }"), JsValue::Number(2.0));
        assert_eq!(run("do { 5; break; } while (true)"), JsValue::Number(5.0));
    }
}
