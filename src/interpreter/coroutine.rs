//! Coroutines
//!
//! A generator, async function or async generator body runs in its own
//! `Activation`. The coroutine keeps that activation and the execution
//! context between runs; resuming pushes the context back, injects a
//! completion into the accumulator and lets the frame machine continue
//! from the suspension point. A `Throw` or `Return` injected there unwinds
//! through the enclosing try/finally frames exactly like a synchronous one.
//!
//! Async bodies suspend at `await` by subscribing the coroutine to the
//! awaited promise; the reaction job resumes it. Async generators add the
//! request queue that serializes `next`/`return`/`throw` calls.

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::ast::{FunctionKind, FunctionNode};
use crate::completion::Completion;
use crate::context::ExecutionContext;
use crate::error::{JsError, JsResult};
use crate::object::{JsObject, ObjectKind};
use crate::value::{CheapClone, JsValue, ObjectId};

use super::function::body_activation;
use super::machine::{
    Activation, DelegateMode, Frame, FrameResult, RunOutcome, YieldStarPhase, YieldStarState,
};
use super::promise::{PromiseCapability, ReactionHandler, ReactionKind};
use super::{Interpreter, IteratorHint};

/// Handle to a coroutine owned by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoroutineId(pub(crate) u32);

impl CoroutineId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineState {
    SuspendedStart,
    SuspendedYield,
    Executing,
    /// An async generator waiting for the operand of a `return` request.
    AwaitingReturn,
    Completed,
}

/// One queued `next`/`return`/`throw` call of an async generator.
#[derive(Debug)]
pub(crate) struct AsyncGeneratorRequest {
    pub completion: Completion,
    pub capability: PromiseCapability,
}

#[derive(Debug)]
pub struct Coroutine {
    pub(crate) kind: FunctionKind,
    pub(crate) state: CoroutineState,
    pub(crate) context: ExecutionContext,
    /// `None` while the body runs and after completion.
    pub(crate) activation: Option<Activation>,
    /// The promise of an async function.
    pub(crate) capability: Option<PromiseCapability>,
    pub(crate) queue: VecDeque<AsyncGeneratorRequest>,
}

impl Coroutine {
    /// What a collected slot holds until it is reused.
    fn vacant(context: ExecutionContext) -> Self {
        Coroutine {
            kind: FunctionKind::Normal,
            state: CoroutineState::Completed,
            context,
            activation: None,
            capability: None,
            queue: VecDeque::new(),
        }
    }
}

/// Every coroutine of an agent. Slots of collected coroutines are reused.
#[derive(Debug, Default)]
pub(crate) struct CoroutineTable {
    slots: Vec<Coroutine>,
    free: Vec<u32>,
    allocations: usize,
}

impl CoroutineTable {
    pub fn get(&self, id: CoroutineId) -> &Coroutine {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: CoroutineId) -> &mut Coroutine {
        &mut self.slots[id.index()]
    }

    fn insert(&mut self, coroutine: Coroutine) -> CoroutineId {
        self.allocations += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = coroutine;
            return CoroutineId(index);
        }
        self.slots.push(coroutine);
        CoroutineId(self.slots.len() as u32 - 1)
    }

    /// The id the next insertion will use.
    fn next_id(&self) -> CoroutineId {
        match self.free.last() {
            Some(index) => CoroutineId(*index),
            None => CoroutineId(self.slots.len() as u32),
        }
    }

    /// Number of live coroutines.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Replace every coroutine not set in `marks` with a vacant one.
    /// Returns how many live coroutines were freed.
    pub fn sweep(&mut self, marks: &[bool], vacant: &ExecutionContext) -> usize {
        let before = self.len();
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !marks.get(index).copied().unwrap_or(false) {
                *slot = Coroutine::vacant(vacant.clone());
                self.free.push(index as u32);
            }
        }
        self.free.reverse();
        self.allocations = 0;
        before - self.len()
    }
}

impl Interpreter {
    fn coroutine(&self, id: CoroutineId) -> &Coroutine {
        self.coroutines.get(id)
    }

    fn coroutine_mut(&mut self, id: CoroutineId) -> &mut Coroutine {
        self.coroutines.get_mut(id)
    }

    fn set_state(&mut self, id: CoroutineId, state: CoroutineState) {
        debug!(coroutine = id.0, ?state, "coroutine state");
        let co = self.coroutine_mut(id);
        co.state = state;
        if state == CoroutineState::Completed {
            co.activation = None;
        }
    }

    /// A coroutine over `act` that runs in a copy of the running context.
    fn alloc_coroutine(&mut self, kind: FunctionKind, act: Activation, capability: Option<PromiseCapability>) -> CoroutineId {
        let mut context = self.running().clone();
        context.coroutine = Some(self.coroutines.next_id());
        let id = self.coroutines.insert(Coroutine {
            kind,
            state: CoroutineState::SuspendedStart,
            context,
            activation: Some(act),
            capability,
            queue: VecDeque::new(),
        });
        debug!(coroutine = id.0, ?kind, "coroutine created");
        id
    }

    /// Restore the saved context, inject `completion` at the suspension
    /// point and run until the body suspends again or finishes.
    fn resume_coroutine(&mut self, id: CoroutineId, completion: Completion) -> JsResult<RunOutcome> {
        let co = self.coroutine_mut(id);
        let Some(mut act) = co.activation.take() else {
            return Err(JsError::internal("resuming a coroutine without a body"));
        };
        let context = co.context.clone();
        co.state = CoroutineState::Executing;
        act.acc = completion;
        self.push_context(context);
        let outcome = self.run_activation(&mut act);
        let context = self.pop_context()?;
        let co = self.coroutine_mut(id);
        co.context = context;
        co.activation = Some(act);
        if outcome.is_err() {
            self.set_state(id, CoroutineState::Completed);
        }
        outcome
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Generators
    // ═══════════════════════════════════════════════════════════════════════

    /// The generator or async generator object returned by calling `func`.
    pub(crate) fn create_generator(&mut self, func: ObjectId, node: &Rc<FunctionNode>) -> JsResult<ObjectId> {
        let is_async = node.kind == FunctionKind::AsyncGenerator;
        let proto = if is_async {
            self.get_prototype_from_constructor(func, |i| i.async_generator_prototype)?
        } else {
            self.get_prototype_from_constructor(func, |i| i.generator_prototype)?
        };
        let id = self.alloc_coroutine(node.kind, body_activation(node), None);
        let kind = if is_async {
            ObjectKind::AsyncGenerator(id)
        } else {
            ObjectKind::Generator(id)
        };
        Ok(self.alloc(JsObject::new(Some(proto), kind)))
    }

    fn generator_coroutine(&self, value: &JsValue, method: &str) -> JsResult<CoroutineId> {
        match value.as_object().map(|id| &self.heap.get(id).kind) {
            Some(ObjectKind::Generator(id)) => Ok(*id),
            _ => Err(JsError::type_error(format!(
                "{method} method called on incompatible receiver"
            ))),
        }
    }

    /// GeneratorResume and GeneratorResumeAbrupt.
    pub(crate) fn generator_resume(&mut self, generator: &JsValue, completion: Completion, method: &str) -> JsResult<JsValue> {
        let id = self.generator_coroutine(generator, method)?;
        let mut state = self.coroutine(id).state;
        if state == CoroutineState::Executing {
            return Err(JsError::type_error("Generator is already running"));
        }
        if state == CoroutineState::SuspendedStart && completion.is_abrupt() {
            self.set_state(id, CoroutineState::Completed);
            state = CoroutineState::Completed;
        }
        if state == CoroutineState::Completed {
            return match completion {
                Completion::Throw(value) => Err(JsError::thrown(value)),
                Completion::Return(value) => Ok(self.create_iter_result(value, true)),
                _ => Ok(self.create_iter_result(JsValue::Undefined, true)),
            };
        }
        let completion = if state == CoroutineState::SuspendedStart {
            Completion::empty()
        } else {
            completion
        };
        match self.resume_coroutine(id, completion)? {
            RunOutcome::Yield { value, raw } => {
                self.set_state(id, CoroutineState::SuspendedYield);
                if raw {
                    Ok(value)
                } else {
                    Ok(self.create_iter_result(value, false))
                }
            }
            RunOutcome::Complete(completion) => {
                self.set_state(id, CoroutineState::Completed);
                match completion {
                    Completion::Throw(value) => Err(JsError::thrown(value)),
                    Completion::Return(value) => Ok(self.create_iter_result(value, true)),
                    _ => Ok(self.create_iter_result(JsValue::Undefined, true)),
                }
            }
            RunOutcome::Await(_) => Err(JsError::internal("await inside a generator")),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Async functions
    // ═══════════════════════════════════════════════════════════════════════

    /// AsyncFunctionStart: run the body until its first `await`.
    pub(crate) fn start_async_function(&mut self, node: &Rc<FunctionNode>, capability: &PromiseCapability) -> JsResult<()> {
        let id = self.alloc_coroutine(FunctionKind::Async, body_activation(node), Some(capability.clone()));
        self.async_function_step(id, Completion::empty())
    }

    fn async_function_step(&mut self, id: CoroutineId, completion: Completion) -> JsResult<()> {
        match self.resume_coroutine(id, completion)? {
            RunOutcome::Await(value) => self.await_value(id, value),
            RunOutcome::Complete(completion) => {
                self.set_state(id, CoroutineState::Completed);
                let Some(capability) = self.coroutine(id).capability.clone() else {
                    return Err(JsError::internal("async function without a promise"));
                };
                match completion {
                    Completion::Throw(reason) => {
                        self.call(&capability.reject, JsValue::Undefined, &[reason])?;
                    }
                    other => {
                        let value = match other {
                            Completion::Return(value) => value,
                            _ => JsValue::Undefined,
                        };
                        self.call(&capability.resolve, JsValue::Undefined, &[value])?;
                    }
                }
                Ok(())
            }
            RunOutcome::Yield { .. } => Err(JsError::internal("yield inside an async function")),
        }
    }

    /// Await: subscribe the coroutine to the settlement of `value`. The
    /// continuation always runs from a job.
    ///
    /// Until the reaction is registered nothing but this frame refers to the
    /// coroutine, and PromiseResolve may run a `constructor` getter.
    fn await_value(&mut self, id: CoroutineId, value: JsValue) -> JsResult<()> {
        self.without_gc(|interp| interp.subscribe_await(id, value))
    }

    fn subscribe_await(&mut self, id: CoroutineId, value: JsValue) -> JsResult<()> {
        let ctor = self.intrinsics().promise_constructor;
        match self.promise_resolve(ctor, value) {
            Ok(promise) => self.perform_promise_then(
                promise,
                ReactionHandler::Await(id),
                ReactionHandler::Await(id),
                None,
            ),
            Err(err) if err.is_catchable() => {
                let reason = self.error_to_value(err);
                self.continue_coroutine(id, Completion::Throw(reason))
            }
            Err(err) => Err(err),
        }
    }

    /// The awaited promise of `id` settled.
    pub(crate) fn resume_after_await(&mut self, id: CoroutineId, kind: ReactionKind, value: JsValue) -> JsResult<()> {
        let completion = match kind {
            ReactionKind::Fulfill => Completion::normal(value),
            ReactionKind::Reject => Completion::Throw(value),
        };
        self.continue_coroutine(id, completion)
    }

    fn continue_coroutine(&mut self, id: CoroutineId, completion: Completion) -> JsResult<()> {
        match self.coroutine(id).kind {
            FunctionKind::AsyncGenerator => self.async_generator_run(id, completion),
            _ => self.async_function_step(id, completion),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Async generators
    // ═══════════════════════════════════════════════════════════════════════

    fn async_generator_coroutine(&self, value: &JsValue) -> Option<CoroutineId> {
        match value.as_object().map(|id| &self.heap.get(id).kind) {
            Some(ObjectKind::AsyncGenerator(id)) => Some(*id),
            _ => None,
        }
    }

    /// AsyncGenerator.prototype.next / return / throw: queue the request
    /// and return its promise.
    pub(crate) fn async_generator_enqueue(&mut self, generator: &JsValue, completion: Completion, method: &str) -> JsResult<JsValue> {
        let capability = self.new_intrinsic_capability();
        let promise = JsValue::Object(capability.promise);
        let Some(id) = self.async_generator_coroutine(generator) else {
            let err = JsError::type_error(format!("{method} method called on incompatible receiver"));
            self.reject_with(&capability, err)?;
            return Ok(promise);
        };
        let mut state = self.coroutine(id).state;
        match &completion {
            Completion::Normal(_) if state == CoroutineState::Completed => {
                let result = self.create_iter_result(JsValue::Undefined, true);
                self.call(&capability.resolve, JsValue::Undefined, &[result])?;
                return Ok(promise);
            }
            Completion::Throw(reason) => {
                if state == CoroutineState::SuspendedStart {
                    self.set_state(id, CoroutineState::Completed);
                    state = CoroutineState::Completed;
                }
                if state == CoroutineState::Completed {
                    self.call(&capability.reject, JsValue::Undefined, &[reason.cheap_clone()])?;
                    return Ok(promise);
                }
            }
            _ => {}
        }

        let is_return = matches!(completion, Completion::Return(_));
        self.coroutine_mut(id).queue.push_back(AsyncGeneratorRequest {
            completion: completion.clone(),
            capability,
        });
        match state {
            CoroutineState::SuspendedStart | CoroutineState::Completed if is_return => {
                self.set_state(id, CoroutineState::AwaitingReturn);
                self.async_generator_await_return(id)?;
            }
            CoroutineState::SuspendedStart | CoroutineState::SuspendedYield => {
                self.async_generator_resume(id, completion)?;
            }
            _ => {}
        }
        Ok(promise)
    }

    /// AsyncGeneratorResume, including AsyncGeneratorUnwrapYieldResumption
    /// for `return` requests at a yield.
    fn async_generator_resume(&mut self, id: CoroutineId, completion: Completion) -> JsResult<()> {
        let completion = match (self.coroutine(id).state, completion) {
            (CoroutineState::SuspendedStart, _) => Completion::empty(),
            (CoroutineState::SuspendedYield, Completion::Return(value)) => {
                let Some(act) = self.coroutine_mut(id).activation.as_mut() else {
                    return Err(JsError::internal("suspended generator without a body"));
                };
                act.push(Frame::ReturnAwaited);
                act.push(Frame::Await);
                Completion::normal(value)
            }
            (_, completion) => completion,
        };
        self.async_generator_run(id, completion)
    }

    fn async_generator_run(&mut self, id: CoroutineId, completion: Completion) -> JsResult<()> {
        match self.resume_coroutine(id, completion)? {
            RunOutcome::Await(value) => self.await_value(id, value),
            RunOutcome::Yield { value, .. } => {
                self.set_state(id, CoroutineState::SuspendedYield);
                self.async_generator_complete_step(id, Completion::normal(value), false)?;
                let next = self
                    .coroutine(id)
                    .queue
                    .front()
                    .map(|request| request.completion.clone());
                match next {
                    Some(completion) => self.async_generator_resume(id, completion),
                    None => Ok(()),
                }
            }
            RunOutcome::Complete(completion) => {
                self.set_state(id, CoroutineState::Completed);
                let result = match completion {
                    Completion::Throw(reason) => Completion::Throw(reason),
                    Completion::Return(value) => Completion::normal(value),
                    _ => Completion::normal(JsValue::Undefined),
                };
                self.async_generator_complete_step(id, result, true)?;
                self.async_generator_drain_queue(id)
            }
        }
    }

    /// AsyncGeneratorCompleteStep: settle the oldest request.
    fn async_generator_complete_step(&mut self, id: CoroutineId, completion: Completion, done: bool) -> JsResult<()> {
        let Some(request) = self.coroutine_mut(id).queue.pop_front() else {
            return Err(JsError::internal("async generator step without a request"));
        };
        match completion {
            Completion::Throw(reason) => {
                self.call(&request.capability.reject, JsValue::Undefined, &[reason])?;
            }
            other => {
                let result = self.create_iter_result(other.value_or_undefined(), done);
                self.call(&request.capability.resolve, JsValue::Undefined, &[result])?;
            }
        }
        Ok(())
    }

    /// AsyncGeneratorDrainQueue
    fn async_generator_drain_queue(&mut self, id: CoroutineId) -> JsResult<()> {
        loop {
            let Some(completion) = self
                .coroutine(id)
                .queue
                .front()
                .map(|request| request.completion.clone())
            else {
                return Ok(());
            };
            if let Completion::Return(_) = completion {
                self.set_state(id, CoroutineState::AwaitingReturn);
                return self.async_generator_await_return(id);
            }
            let completion = match completion {
                Completion::Throw(reason) => Completion::Throw(reason),
                _ => Completion::normal(JsValue::Undefined),
            };
            self.async_generator_complete_step(id, completion, true)?;
        }
    }

    /// AsyncGeneratorAwaitReturn
    fn async_generator_await_return(&mut self, id: CoroutineId) -> JsResult<()> {
        let value = match self.coroutine(id).queue.front().map(|r| &r.completion) {
            Some(Completion::Return(value)) => value.cheap_clone(),
            _ => return Err(JsError::internal("awaiting return without a return request")),
        };
        let ctor = self.intrinsics().promise_constructor;
        let resolved = self.without_gc(|interp| interp.promise_resolve(ctor, value));
        match resolved {
            Ok(promise) => self.perform_promise_then(
                promise,
                ReactionHandler::AsyncGenAwaitReturn(id),
                ReactionHandler::AsyncGenAwaitReturn(id),
                None,
            ),
            Err(err) if err.is_catchable() => {
                let reason = self.error_to_value(err);
                self.set_state(id, CoroutineState::Completed);
                self.async_generator_complete_step(id, Completion::Throw(reason), true)?;
                self.async_generator_drain_queue(id)
            }
            Err(err) => Err(err),
        }
    }

    /// The operand of a `return` request settled.
    pub(crate) fn async_generator_return_settled(&mut self, id: CoroutineId, kind: ReactionKind, value: JsValue) -> JsResult<()> {
        self.set_state(id, CoroutineState::Completed);
        let completion = match kind {
            ReactionKind::Fulfill => Completion::normal(value),
            ReactionKind::Reject => Completion::Throw(value),
        };
        self.async_generator_complete_step(id, completion, true)?;
        self.async_generator_drain_queue(id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // yield and yield*
    // ═══════════════════════════════════════════════════════════════════════

    /// `yield value`. Async generators await the operand first.
    pub(crate) fn step_yield(&mut self, act: &mut Activation, awaited: bool) -> JsResult<FrameResult> {
        let value = act.take_value();
        if act.kind == FunctionKind::AsyncGenerator && !awaited {
            act.push(Frame::Yield { awaited: true });
            return Ok(FrameResult::Await(value));
        }
        Ok(FrameResult::Yield { value, raw: false })
    }

    /// Start `yield*` over the operand in the accumulator.
    pub(crate) fn step_yield_star_start(&mut self, act: &mut Activation) -> JsResult<FrameResult> {
        let operand = act.take_value();
        let is_async = act.kind == FunctionKind::AsyncGenerator;
        let hint = if is_async {
            IteratorHint::Async
        } else {
            IteratorHint::Sync
        };
        let iterator = self.get_iterator(&operand, hint)?;
        act.acc = Completion::normal(JsValue::Undefined);
        self.step_yield_star(
            act,
            Box::new(YieldStarState {
                iterator,
                is_async,
                phase: YieldStarPhase::Received,
            }),
        )
    }

    /// Forward what the generator received to the inner iterator.
    pub(crate) fn step_yield_star(&mut self, act: &mut Activation, mut state: Box<YieldStarState>) -> JsResult<FrameResult> {
        match state.phase {
            YieldStarPhase::AwaitInner(mode) => {
                if act.acc.is_abrupt() {
                    return Ok(FrameResult::Continue);
                }
                let result = act.take_value();
                return self.yield_star_inner_result(act, state, result, mode);
            }
            YieldStarPhase::AwaitReturnValue => {
                if !act.acc.is_abrupt() {
                    act.acc = Completion::Return(act.take_value());
                }
                return Ok(FrameResult::Continue);
            }
            YieldStarPhase::Received => {}
        }

        let iterator = state.iterator.iterator.cheap_clone();
        let (mode, result) = match std::mem::take(&mut act.acc) {
            Completion::Normal(value) => {
                let value = value.unwrap_or_default();
                let result = self.call(&state.iterator.next_method, iterator, &[value])?;
                (DelegateMode::Next, result)
            }
            Completion::Throw(reason) => {
                let throw_key = self.key("throw");
                match self.get_method(&iterator, &throw_key)? {
                    Some(throw) => {
                        let result = self.call(&throw, iterator, &[reason])?;
                        (DelegateMode::Throw, result)
                    }
                    None => {
                        let record = state.iterator.clone();
                        self.iterator_close(&record, Completion::empty())?;
                        return Err(JsError::type_error(
                            "The iterator does not provide a 'throw' method",
                        ));
                    }
                }
            }
            Completion::Return(value) => {
                let return_key = self.key("return");
                match self.get_method(&iterator, &return_key)? {
                    Some(method) => {
                        let result = self.call(&method, iterator, &[value])?;
                        (DelegateMode::Return, result)
                    }
                    None if state.is_async => {
                        state.phase = YieldStarPhase::AwaitReturnValue;
                        act.push(Frame::YieldStar(state));
                        return Ok(FrameResult::Await(value));
                    }
                    None => {
                        act.acc = Completion::Return(value);
                        return Ok(FrameResult::Continue);
                    }
                }
            }
            other => {
                act.acc = other;
                return Ok(FrameResult::Continue);
            }
        };
        if state.is_async {
            state.phase = YieldStarPhase::AwaitInner(mode);
            act.push(Frame::YieldStar(state));
            return Ok(FrameResult::Await(result));
        }
        self.yield_star_inner_result(act, state, result, mode)
    }

    fn yield_star_inner_result(
        &mut self,
        act: &mut Activation,
        mut state: Box<YieldStarState>,
        result: JsValue,
        mode: DelegateMode,
    ) -> JsResult<FrameResult> {
        if !result.is_object() {
            let shown = self.describe_value(&result);
            return Err(JsError::type_error(format!("Iterator result {shown} is not an object")));
        }
        if self.iterator_complete(&result)? {
            let value = self.iterator_value(&result)?;
            if mode != DelegateMode::Return {
                act.set_value(value);
                return Ok(FrameResult::Continue);
            }
            if state.is_async {
                state.phase = YieldStarPhase::AwaitReturnValue;
                act.push(Frame::YieldStar(state));
                return Ok(FrameResult::Await(value));
            }
            act.acc = Completion::Return(value);
            return Ok(FrameResult::Continue);
        }
        let is_async = state.is_async;
        state.phase = YieldStarPhase::Received;
        act.push(Frame::YieldStar(state));
        if is_async {
            let value = self.iterator_value(&result)?;
            Ok(FrameResult::Yield { value, raw: false })
        } else {
            Ok(FrameResult::Yield {
                value: result,
                raw: true,
            })
        }
    }
}
