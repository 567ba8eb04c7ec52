//! The frame machine
//!
//! Guest code is evaluated by popping `Frame`s off an explicit stack
//! instead of recursing through the Rust call stack. Each frame either
//! starts evaluating a node (pushing the frames of its children) or
//! consumes the result its children left in the activation's accumulator.
//!
//! The accumulator holds a `Completion`. While it is abrupt, frames that
//! cannot handle abrupt completions are discarded unprocessed; the
//! remaining ones (statement lists, loops, try, environment restores, ...)
//! see the completion and decide whether to absorb or forward it.
//!
//! Because the whole evaluation state of a body lives in its `Activation`,
//! a generator or async body can stop at a `yield` or `await` frame, hand
//! the activation to its coroutine, and continue later from the same spot.

use std::rc::Rc;

use tracing::trace;

use crate::ast::{
    ArrayElement, AssignmentExpression, BinaryExpression, BinaryOp, CallExpression, ClassNode,
    ConditionalExpression, Expression, ForInOfStatement, ForStatement, FunctionKind,
    IfStatement, LogicalExpression, MemberExpression, ObjectMember, ObjectPattern,
    ArrayPattern, Param, Pattern, Statement, SwitchStatement, TemplateLiteral, TryStatement,
    UnaryOp, UpdateExpression, VariableDeclaration, WhileStatement,
};
use crate::completion::Completion;
use crate::environment::EnvId;
use crate::error::{JsError, JsResult};
use crate::reference::Reference;
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

use super::function::call_result;
use super::stack::ensure_sufficient_stack;
use super::{Interpreter, IteratorRecord};

/// How a pattern stores the values it destructures.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BindingMode {
    /// PutValue on the resolved reference (var declarations, assignment).
    Put,
    /// InitializeReferencedBinding in the given environment (let, const,
    /// parameters, catch parameters).
    Initialize(EnvId),
}

/// What to do with a reference once it has been evaluated.
#[derive(Debug, Clone)]
pub(crate) enum RefCont {
    GetValue,
    Call(Rc<CallExpression>),
    Assign(Rc<AssignmentExpression>),
    Update(Rc<UpdateExpression>),
    TypeOf,
    Delete,
    /// Store the value (a destructuring target).
    Put(JsValue),
}

// ═══════════════════════════════════════════════════════════════════════════
// Frame states
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopPhase {
    Start,
    Test,
    Body,
    Update,
}

#[derive(Debug)]
pub(crate) struct WhileState {
    pub stmt: Rc<WhileStatement>,
    pub do_while: bool,
    pub value: JsValue,
    pub phase: LoopPhase,
}

#[derive(Debug)]
pub(crate) struct ForState {
    pub stmt: Rc<ForStatement>,
    /// `let` names copied into a fresh environment for each iteration.
    pub per_iteration: Vec<JsString>,
    pub value: JsValue,
    pub phase: LoopPhase,
}

#[derive(Debug)]
pub(crate) enum LoopSource {
    /// for-in: keys collected up front, re-checked before each visit.
    Keys {
        object: ObjectId,
        keys: Vec<PropertyKey>,
        next: usize,
    },
    Sync(IteratorRecord),
    Async(IteratorRecord),
}

#[derive(Debug)]
pub(crate) enum ForInOfPhase {
    Next,
    /// Waiting for the result of an async `next()`.
    AwaitNext,
    Body,
    /// Waiting for an async `return()`; holds the completion to restore.
    AwaitClose(Completion),
}

#[derive(Debug)]
pub(crate) struct ForInOfState {
    pub stmt: Rc<ForInOfStatement>,
    pub source: LoopSource,
    pub value: JsValue,
    pub old_env: EnvId,
    pub phase: ForInOfPhase,
}

#[derive(Debug)]
pub(crate) struct SwitchState {
    pub stmt: Rc<SwitchStatement>,
    pub discriminant: JsValue,
    /// Index of the case whose test is being evaluated.
    pub next: usize,
    pub testing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Call { direct_eval: bool },
    New,
    Super,
}

#[derive(Debug)]
pub(crate) struct CallState {
    pub kind: CallKind,
    pub func: JsValue,
    pub this: JsValue,
    pub args: Rc<[crate::ast::Argument]>,
    pub values: Vec<JsValue>,
    pub next: usize,
    /// Set while an argument is being evaluated; true for spread arguments.
    pub pending: Option<bool>,
    /// The callee expression, named in "is not a function" errors.
    pub callee: Option<Expression>,
}

#[derive(Debug)]
pub(crate) struct ArrayLiteralState {
    pub elements: Rc<[ArrayElement]>,
    pub values: Vec<Option<JsValue>>,
    pub next: usize,
    pub pending: Option<bool>,
}

#[derive(Debug)]
pub(crate) enum ObjectPending {
    None,
    Key,
    Value(PropertyKey, bool),
    Spread,
}

#[derive(Debug)]
pub(crate) struct ObjectLiteralState {
    pub members: Rc<[ObjectMember]>,
    pub object: ObjectId,
    pub next: usize,
    pub pending: ObjectPending,
}

#[derive(Debug)]
pub(crate) struct TemplateState {
    pub template: Rc<TemplateLiteral>,
    pub out: Vec<u16>,
    pub next: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassPhase {
    Start,
    Heritage,
    Members,
    /// The computed key of member `next` is being evaluated.
    Key,
}

#[derive(Debug)]
pub(crate) struct ClassState {
    pub class: Rc<ClassNode>,
    pub class_env: EnvId,
    pub proto: Option<ObjectId>,
    pub constructor: Option<ObjectId>,
    pub next: usize,
    pub phase: ClassPhase,
}

#[derive(Debug)]
pub(crate) struct ObjectPatternState {
    pub pattern: Rc<ObjectPattern>,
    pub source: JsValue,
    pub excluded: Vec<PropertyKey>,
    pub next: usize,
    pub awaiting_key: bool,
    pub mode: BindingMode,
}

#[derive(Debug)]
pub(crate) struct ArrayPatternState {
    pub pattern: Rc<ArrayPattern>,
    pub iterator: IteratorRecord,
    pub next: usize,
    pub mode: BindingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DelegateMode {
    Next,
    Throw,
    Return,
}

#[derive(Debug)]
pub(crate) enum YieldStarPhase {
    /// Suspended at the delegated yield; the accumulator holds what the
    /// generator was resumed with.
    Received,
    /// Waiting for an async inner iterator's result.
    AwaitInner(DelegateMode),
    /// Waiting for the final value of an async `return` before returning.
    AwaitReturnValue,
}

#[derive(Debug)]
pub(crate) struct YieldStarState {
    pub iterator: IteratorRecord,
    pub is_async: bool,
    pub phase: YieldStarPhase,
}

#[derive(Debug)]
pub(crate) struct ParamState {
    pub params: Rc<[Param]>,
    pub args: Vec<JsValue>,
    pub next: usize,
    pub mode: BindingMode,
}

// ═══════════════════════════════════════════════════════════════════════════
// Frames
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub(crate) enum Frame {
    // ── statements ──
    Stmt(Statement),
    StmtList {
        list: Rc<[Statement]>,
        next: usize,
        value: Option<JsValue>,
    },
    RestoreEnv(EnvId),
    UpdateEmptyUndefined,
    IfBranch(Rc<IfStatement>),
    Declarator {
        decl: Rc<VariableDeclaration>,
        index: usize,
    },
    InitializeBinding(JsString),
    BreakableExit,
    LabelExit(JsString),
    WhileLoop(Box<WhileState>),
    ForLoop(Box<ForState>),
    ForInOfHead {
        stmt: Rc<ForInOfStatement>,
        old_env: EnvId,
        for_in: bool,
    },
    ForInOf(Box<ForInOfState>),
    SwitchStart(Rc<SwitchStatement>),
    SwitchMatch(Box<SwitchState>),
    SwitchRun {
        stmt: Rc<SwitchStatement>,
        next: usize,
        value: JsValue,
    },
    ReturnValue,
    ReturnAwaited,
    ThrowValue,
    TryCatch(Rc<TryStatement>),
    TryFinally(Rc<TryStatement>),
    FinallyExit(Completion),
    WithEnter(Rc<crate::ast::WithStatement>),

    // ── expressions ──
    Expr(Expression),
    EvalRef {
        expr: Expression,
        cont: RefCont,
    },
    MemberObject {
        member: Rc<MemberExpression>,
        cont: RefCont,
    },
    MemberKey {
        base: JsValue,
        cont: RefCont,
    },
    /// `super[expr]`: `this` is read before the key is evaluated.
    SuperKey {
        this: JsValue,
        cont: RefCont,
    },
    PutReference(Box<Reference>),
    CompoundAssign {
        reference: Box<Reference>,
        op: BinaryOp,
        left: JsValue,
    },
    DestructureAssign(Pattern),
    ProduceValue(JsValue),
    CallCallee(Rc<CallExpression>),
    NewCallee(Rc<CallExpression>),
    CallArgs(Box<CallState>),
    OptionalChainEnd(JsValue),
    BinaryRight(Rc<BinaryExpression>),
    BinaryApply {
        op: BinaryOp,
        left: JsValue,
    },
    LogicalRight(Rc<LogicalExpression>),
    ConditionalBranch(Rc<ConditionalExpression>),
    UnaryApply(UnaryOp),
    /// `typeof` of a value that is not a reference.
    TypeOfValue,
    Sequence {
        list: Rc<[Expression]>,
        next: usize,
    },
    ArrayLiteral(Box<ArrayLiteralState>),
    ObjectLiteral(Box<ObjectLiteralState>),
    Template(Box<TemplateState>),
    ClassDefinition(Box<ClassState>),
    ImportCall,

    // ── patterns ──
    BindPattern {
        pattern: Pattern,
        mode: BindingMode,
    },
    BindElement {
        target: Pattern,
        default: Option<Expression>,
        mode: BindingMode,
    },
    ObjectPattern(Box<ObjectPatternState>),
    ArrayPattern(Box<ArrayPatternState>),

    // ── function prologue ──
    BindParams(Box<ParamState>),

    // ── suspension points ──
    Yield {
        awaited: bool,
    },
    /// `yield*`: the operand is in the accumulator.
    YieldStarStart,
    YieldStar(Box<YieldStarState>),
    Await,
}

impl Frame {
    /// Frames that must see abrupt completions instead of being skipped.
    fn handles_abrupt(&self) -> bool {
        matches!(
            self,
            Frame::StmtList { .. }
                | Frame::RestoreEnv(_)
                | Frame::UpdateEmptyUndefined
                | Frame::BreakableExit
                | Frame::LabelExit(_)
                | Frame::WhileLoop(_)
                | Frame::ForLoop(_)
                | Frame::ForInOf(_)
                | Frame::SwitchRun { .. }
                | Frame::TryCatch(_)
                | Frame::TryFinally(_)
                | Frame::ArrayPattern(_)
                | Frame::YieldStar(_)
        )
    }
}

/// Result of processing a single frame.
pub(crate) enum FrameResult {
    Continue,
    /// Run the callee's body on this machine, then hand its completion
    /// back to the caller.
    Call(Box<PendingCall>),
    /// Suspend at a yield. `raw` values are already iterator results.
    Yield { value: JsValue, raw: bool },
    /// Suspend until the value settles.
    Await(JsValue),
}

/// An ordinary function body whose context is already pushed and whose
/// declarations are instantiated.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub activation: Activation,
    pub ret: CallReturn,
}

/// How the caller consumes the completion of an inline call.
#[derive(Debug)]
pub(crate) enum CallReturn {
    Call,
    Construct {
        env: EnvId,
        this: Option<ObjectId>,
        derived: bool,
        /// `super(...)`: the result also becomes the caller's `this`.
        super_call: bool,
    },
}

/// How a run of an activation ended.
#[derive(Debug)]
pub(crate) enum RunOutcome {
    Complete(Completion),
    Yield { value: JsValue, raw: bool },
    Await(JsValue),
}

/// The evaluation state of one body: script, module, eval code, function
/// body or parameter list.
#[derive(Debug)]
pub(crate) struct Activation {
    pub frames: Vec<Frame>,
    pub acc: Completion,
    /// The kind of function whose body runs here; `Normal` for scripts.
    pub kind: FunctionKind,
    pub strict: bool,
}

impl Activation {
    pub fn new(kind: FunctionKind, strict: bool) -> Self {
        Activation {
            frames: Vec::new(),
            acc: Completion::empty(),
            kind,
            strict,
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn push_statement_list(&mut self, list: &Rc<[Statement]>) {
        match list.first() {
            Some(first) => {
                let first = first.cheap_clone();
                self.push(Frame::StmtList {
                    list: list.cheap_clone(),
                    next: 1,
                    value: None,
                });
                self.push(Frame::Stmt(first));
            }
            None => self.acc = Completion::empty(),
        }
    }

    pub fn set_value(&mut self, value: JsValue) {
        self.acc = Completion::Normal(Some(value));
    }

    pub fn set_empty(&mut self) {
        self.acc = Completion::empty();
    }

    /// The value children left behind, or undefined.
    pub fn take_value(&mut self) -> JsValue {
        match std::mem::take(&mut self.acc) {
            Completion::Normal(Some(value)) => value,
            _ => JsValue::Undefined,
        }
    }

    /// Unwind to the innermost optional-chain boundary and make the chain
    /// evaluate to its short-circuit value.
    pub fn short_circuit(&mut self) -> JsResult<()> {
        while let Some(frame) = self.frames.pop() {
            if let Frame::OptionalChainEnd(value) = frame {
                self.set_value(value);
                return Ok(());
            }
        }
        Err(JsError::internal("optional chain without boundary"))
    }
}

impl Interpreter {
    /// Run frames until the activation finishes or suspends.
    ///
    /// Catchable errors raised while processing a frame become `Throw`
    /// completions; fatal ones unwind straight to the caller.
    ///
    /// Calls to ordinary functions swap the callee's activation in and
    /// park the caller on a local stack, so guest recursion does not grow
    /// the Rust stack.
    pub(crate) fn run_activation(&mut self, act: &mut Activation) -> JsResult<RunOutcome> {
        ensure_sufficient_stack(|| {
            let mut callers = Vec::new();
            self.machine_depth += 1;
            let result = self.run_frames(act, &mut callers);
            self.machine_depth -= 1;
            if result.is_err() {
                self.unwind_callers(act, callers)?;
            }
            result
        })
    }

    fn run_frames(
        &mut self,
        act: &mut Activation,
        callers: &mut Vec<(Activation, CallReturn)>,
    ) -> JsResult<RunOutcome> {
        loop {
            self.collect_at_safe_point(act, callers);
            let Some(frame) = act.frames.pop() else {
                let Some((caller, ret)) = callers.pop() else {
                    return Ok(RunOutcome::Complete(std::mem::take(&mut act.acc)));
                };
                let callee = std::mem::replace(act, caller);
                self.pop_context()?;
                self.call_depth -= 1;
                match self.return_to_caller(callee.acc, ret) {
                    Ok(value) => act.set_value(value),
                    Err(err) if err.is_catchable() => {
                        let value = self.error_to_value(err);
                        act.acc = Completion::Throw(value);
                    }
                    Err(err) => return Err(err),
                }
                continue;
            };
            if act.acc.is_abrupt() && !frame.handles_abrupt() {
                continue;
            }
            self.count_step()?;
            match self.process_frame(act, frame) {
                Ok(FrameResult::Continue) => {}
                Ok(FrameResult::Call(pending)) => {
                    let PendingCall { activation, ret } = *pending;
                    let caller = std::mem::replace(act, activation);
                    callers.push((caller, ret));
                }
                Ok(FrameResult::Yield { .. } | FrameResult::Await(_)) if !callers.is_empty() => {
                    return Err(JsError::internal("ordinary function body suspended"));
                }
                Ok(FrameResult::Yield { value, raw }) => return Ok(RunOutcome::Yield { value, raw }),
                Ok(FrameResult::Await(value)) => return Ok(RunOutcome::Await(value)),
                Err(err) if err.is_catchable() => {
                    let value = self.error_to_value(err);
                    act.acc = Completion::Throw(value);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Drop inline callees after a fatal error, restoring the outermost
    /// activation and the context stack.
    fn unwind_callers(
        &mut self,
        act: &mut Activation,
        callers: Vec<(Activation, CallReturn)>,
    ) -> JsResult<()> {
        if callers.is_empty() {
            return Ok(());
        }
        for _ in 0..callers.len() {
            self.pop_context()?;
            self.call_depth -= 1;
        }
        if let Some((outermost, _)) = callers.into_iter().next() {
            *act = outermost;
        }
        Ok(())
    }

    /// The value a finished inline call leaves in its caller.
    fn return_to_caller(&mut self, completion: Completion, ret: CallReturn) -> JsResult<JsValue> {
        match ret {
            CallReturn::Call => call_result(completion),
            CallReturn::Construct {
                env,
                this,
                derived,
                super_call,
            } => {
                let result = self.construct_result(completion, env, this, derived)?;
                if super_call {
                    let env = self.this_environment()?;
                    self.envs.bind_this_value(env, result.cheap_clone())?;
                }
                Ok(result)
            }
        }
    }

    /// Process a single evaluation frame
    fn process_frame(&mut self, act: &mut Activation, frame: Frame) -> JsResult<FrameResult> {
        match frame {
            Frame::Stmt(stmt) => self.exec_statement(act, stmt),
            Frame::StmtList { list, next, value } => self.step_statement_list(act, list, next, value),
            Frame::RestoreEnv(env) => {
                self.set_lexical_env(env);
                Ok(FrameResult::Continue)
            }
            Frame::UpdateEmptyUndefined => {
                act.acc = std::mem::take(&mut act.acc).update_empty(Some(JsValue::Undefined));
                Ok(FrameResult::Continue)
            }
            Frame::IfBranch(stmt) => self.step_if(act, stmt),
            Frame::Declarator { decl, index } => self.step_declarator(act, decl, index),
            Frame::InitializeBinding(name) => {
                let value = act.take_value();
                let env = self.lexical_env();
                self.initialize_binding(env, &name, value)?;
                act.set_empty();
                Ok(FrameResult::Continue)
            }
            Frame::BreakableExit => {
                if let Completion::Break { target: None, value } = &act.acc {
                    act.acc = Completion::Normal(Some(value.clone().unwrap_or_default()));
                }
                Ok(FrameResult::Continue)
            }
            Frame::LabelExit(label) => {
                if let Completion::Break {
                    target: Some(target),
                    value,
                } = &act.acc
                    && *target == label
                {
                    act.acc = Completion::Normal(value.clone());
                }
                Ok(FrameResult::Continue)
            }
            Frame::WhileLoop(state) => self.step_while(act, state),
            Frame::ForLoop(state) => self.step_for(act, state),
            Frame::ForInOfHead { stmt, old_env, for_in } => self.step_for_in_of_head(act, stmt, old_env, for_in),
            Frame::ForInOf(state) => self.step_for_in_of(act, state),
            Frame::SwitchStart(stmt) => self.step_switch_start(act, stmt),
            Frame::SwitchMatch(state) => self.step_switch_match(act, state),
            Frame::SwitchRun { stmt, next, value } => self.step_switch_run(act, stmt, next, value),
            Frame::ReturnValue => self.step_return_value(act),
            Frame::ReturnAwaited => {
                let value = act.take_value();
                act.acc = Completion::Return(value);
                Ok(FrameResult::Continue)
            }
            Frame::ThrowValue => {
                let value = act.take_value();
                act.acc = Completion::Throw(value);
                Ok(FrameResult::Continue)
            }
            Frame::TryCatch(stmt) => self.step_try_catch(act, stmt),
            Frame::TryFinally(stmt) => self.step_try_finally(act, stmt),
            Frame::FinallyExit(saved) => {
                act.acc = saved;
                Ok(FrameResult::Continue)
            }
            Frame::WithEnter(stmt) => self.step_with_enter(act, stmt),

            Frame::Expr(expr) => self.eval_expression(act, expr),
            Frame::EvalRef { expr, cont } => self.eval_reference(act, expr, cont),
            Frame::MemberObject { member, cont } => self.step_member_object(act, member, cont),
            Frame::MemberKey { base, cont } => self.step_member_key(act, base, cont),
            Frame::SuperKey { this, cont } => self.step_super_key(act, this, cont),
            Frame::PutReference(reference) => {
                let value = act.take_value();
                self.put_value(&reference, value.cheap_clone())?;
                act.set_value(value);
                Ok(FrameResult::Continue)
            }
            Frame::CompoundAssign { reference, op, left } => {
                let right = act.take_value();
                let result = self.apply_binary(op, left, right)?;
                self.put_value(&reference, result.cheap_clone())?;
                act.set_value(result);
                Ok(FrameResult::Continue)
            }
            Frame::DestructureAssign(pattern) => {
                let value = act.take_value();
                act.push(Frame::ProduceValue(value.cheap_clone()));
                act.push(Frame::BindPattern {
                    pattern,
                    mode: BindingMode::Put,
                });
                act.set_value(value);
                Ok(FrameResult::Continue)
            }
            Frame::ProduceValue(value) => {
                act.set_value(value);
                Ok(FrameResult::Continue)
            }
            Frame::CallCallee(call) => self.step_call_callee(act, call),
            Frame::NewCallee(call) => self.step_new_callee(act, call),
            Frame::CallArgs(state) => self.step_call_args(act, state),
            Frame::OptionalChainEnd(_) => Ok(FrameResult::Continue),
            Frame::BinaryRight(expr) => {
                let left = act.take_value();
                act.push(Frame::BinaryApply { op: expr.op, left });
                act.push(Frame::Expr(expr.right.cheap_clone()));
                Ok(FrameResult::Continue)
            }
            Frame::BinaryApply { op, left } => {
                let right = act.take_value();
                let result = self.apply_binary(op, left, right)?;
                act.set_value(result);
                Ok(FrameResult::Continue)
            }
            Frame::LogicalRight(expr) => self.step_logical(act, expr),
            Frame::ConditionalBranch(expr) => {
                let test = act.take_value();
                let branch = if test.to_boolean() {
                    &expr.consequent
                } else {
                    &expr.alternate
                };
                act.push(Frame::Expr(branch.cheap_clone()));
                Ok(FrameResult::Continue)
            }
            Frame::UnaryApply(op) => {
                let value = act.take_value();
                let result = self.apply_unary(op, value)?;
                act.set_value(result);
                Ok(FrameResult::Continue)
            }
            Frame::TypeOfValue => {
                let value = act.take_value();
                let name = self.type_of(&value);
                let name = self.intern(name);
                act.set_value(JsValue::String(name));
                Ok(FrameResult::Continue)
            }
            Frame::Sequence { list, next } => {
                if let Some(expr) = list.get(next) {
                    let expr = expr.cheap_clone();
                    if next + 1 < list.len() {
                        act.push(Frame::Sequence {
                            list,
                            next: next + 1,
                        });
                    }
                    act.push(Frame::Expr(expr));
                }
                Ok(FrameResult::Continue)
            }
            Frame::ArrayLiteral(state) => self.step_array_literal(act, state),
            Frame::ObjectLiteral(state) => self.step_object_literal(act, state),
            Frame::Template(state) => self.step_template(act, state),
            Frame::ClassDefinition(state) => self.step_class_definition(act, state),
            Frame::ImportCall => {
                let specifier = act.take_value();
                let promise = self.dynamic_import(specifier)?;
                act.set_value(promise);
                Ok(FrameResult::Continue)
            }

            Frame::BindPattern { pattern, mode } => self.step_bind_pattern(act, pattern, mode),
            Frame::BindElement {
                target,
                default,
                mode,
            } => self.step_bind_element(act, target, default, mode),
            Frame::ObjectPattern(state) => self.step_object_pattern(act, state),
            Frame::ArrayPattern(state) => self.step_array_pattern(act, state),

            Frame::BindParams(state) => self.step_bind_params(act, state),

            Frame::Yield { awaited } => self.step_yield(act, awaited),
            Frame::YieldStarStart => self.step_yield_star_start(act),
            Frame::YieldStar(state) => self.step_yield_star(act, state),
            Frame::Await => {
                let value = act.take_value();
                trace!("await");
                Ok(FrameResult::Await(value))
            }
        }
    }
}
