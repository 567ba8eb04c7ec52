//! Garbage collection
//!
//! Mark-and-sweep over the three arenas: objects, environment records and
//! coroutines. Handles are plain indices, so liveness is decided by tracing
//! from the agent's roots:
//!
//! - every realm (global object, global environment, intrinsics)
//! - the execution-context stack, including the host context
//! - queued jobs and the job being run
//! - registered modules, tracked rejections
//! - values handed out to the host and temporary roots
//! - activations in flight on the outermost frame machine
//!
//! Unreachable slots are reset and reused by later allocations.
//!
//! Rust code between two frames may hold handles the tracer cannot see,
//! so collection only happens at a safe point: the top of the outermost
//! frame machine's loop while no native function is running, or at rest
//! between jobs.

use tracing::debug;

use crate::completion::Completion;
use crate::context::{ContextStack, ExecutionContext};
use crate::environment::{EnvId, EnvironmentKind, EnvironmentRecord};
use crate::object::{JsObject, NativeData, ObjectKind, Property};
use crate::realm::{Intrinsics, Realm, RealmId};
use crate::reference::{Reference, ReferenceBase};
use crate::value::{JsValue, ObjectId};

use super::coroutine::{AsyncGeneratorRequest, Coroutine, CoroutineId};
use super::jobs::{Job, JobKind};
use super::machine::{
    Activation, BindingMode, CallReturn, ForInOfPhase, Frame, LoopSource, RefCont,
};
use super::module::{ModuleRecord, ModuleStatus};
use super::promise::{
    PromiseCapability, PromiseData, PromiseReaction, PromiseStatus, ReactionHandler,
    UnhandledRejection,
};
use super::{Interpreter, IteratorRecord};

/// Allocations between automatic collections.
pub const DEFAULT_GC_THRESHOLD: usize = 10_000;

/// Slots freed by one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub objects: usize,
    pub environments: usize,
    pub coroutines: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// Tracing
// ═══════════════════════════════════════════════════════════════════════════

/// Mark bits and work lists of one collection.
pub(crate) struct Tracer {
    objects: Vec<bool>,
    envs: Vec<bool>,
    coroutines: Vec<bool>,
    object_stack: Vec<ObjectId>,
    env_stack: Vec<EnvId>,
    coroutine_stack: Vec<CoroutineId>,
}

impl Tracer {
    fn new(objects: usize, envs: usize, coroutines: usize) -> Self {
        Tracer {
            objects: vec![false; objects],
            envs: vec![false; envs],
            coroutines: vec![false; coroutines],
            object_stack: Vec::new(),
            env_stack: Vec::new(),
            coroutine_stack: Vec::new(),
        }
    }

    pub fn object(&mut self, id: ObjectId) {
        if let Some(mark) = self.objects.get_mut(id.index())
            && !*mark
        {
            *mark = true;
            self.object_stack.push(id);
        }
    }

    pub fn env(&mut self, id: EnvId) {
        if let Some(mark) = self.envs.get_mut(id.index())
            && !*mark
        {
            *mark = true;
            self.env_stack.push(id);
        }
    }

    pub fn coroutine(&mut self, id: CoroutineId) {
        if let Some(mark) = self.coroutines.get_mut(id.index())
            && !*mark
        {
            *mark = true;
            self.coroutine_stack.push(id);
        }
    }

    pub fn value(&mut self, value: &JsValue) {
        if let JsValue::Object(id) = value {
            self.object(*id);
        }
    }
}

/// Something that holds handles into the arenas.
pub(crate) trait Trace {
    fn trace(&self, tracer: &mut Tracer);
}

impl Trace for JsValue {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.value(self);
    }
}

impl Trace for ObjectId {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.object(*self);
    }
}

impl Trace for EnvId {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.env(*self);
    }
}

impl Trace for CoroutineId {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.coroutine(*self);
    }
}

impl<T: Trace> Trace for Option<T> {
    fn trace(&self, tracer: &mut Tracer) {
        if let Some(inner) = self {
            inner.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for [T] {
    fn trace(&self, tracer: &mut Tracer) {
        for item in self {
            item.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for Vec<T> {
    fn trace(&self, tracer: &mut Tracer) {
        self.as_slice().trace(tracer);
    }
}

impl<A: Trace, B: Trace> Trace for (A, B) {
    fn trace(&self, tracer: &mut Tracer) {
        self.0.trace(tracer);
        self.1.trace(tracer);
    }
}

// ── engine records ──

impl Trace for Completion {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            Completion::Normal(value)
            | Completion::Break { value, .. }
            | Completion::Continue { value, .. } => value.trace(tracer),
            Completion::Return(value) | Completion::Throw(value) => tracer.value(value),
        }
    }
}

impl Trace for Reference {
    fn trace(&self, tracer: &mut Tracer) {
        match &self.base {
            ReferenceBase::Environment(env) => tracer.env(*env),
            ReferenceBase::Value(value) => tracer.value(value),
            ReferenceBase::Unresolvable => {}
        }
        self.this_value.trace(tracer);
    }
}

impl Trace for IteratorRecord {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.value(&self.iterator);
        tracer.value(&self.next_method);
    }
}

impl Trace for ExecutionContext {
    fn trace(&self, tracer: &mut Tracer) {
        self.function.trace(tracer);
        tracer.env(self.lexical_env);
        tracer.env(self.variable_env);
        self.coroutine.trace(tracer);
    }
}

impl Trace for ContextStack {
    fn trace(&self, tracer: &mut Tracer) {
        for ctx in self.iter() {
            ctx.trace(tracer);
        }
    }
}

impl Trace for Intrinsics {
    fn trace(&self, tracer: &mut Tracer) {
        let Intrinsics {
            object_prototype,
            function_prototype,
            array_prototype,
            array_prototype_values,
            iterator_prototype,
            array_iterator_prototype,
            async_iterator_prototype,
            async_from_sync_iterator_prototype,
            generator_function_prototype,
            generator_prototype,
            async_function_prototype,
            async_generator_function_prototype,
            async_generator_prototype,
            promise_prototype,
            promise_constructor,
            symbol_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            bigint_prototype,
            error_prototype,
            type_error_prototype,
            reference_error_prototype,
            range_error_prototype,
            syntax_error_prototype,
            eval_error_prototype,
            eval,
        } = self;
        for id in [
            object_prototype,
            function_prototype,
            array_prototype,
            array_prototype_values,
            iterator_prototype,
            array_iterator_prototype,
            async_iterator_prototype,
            async_from_sync_iterator_prototype,
            generator_function_prototype,
            generator_prototype,
            async_function_prototype,
            async_generator_function_prototype,
            async_generator_prototype,
            promise_prototype,
            promise_constructor,
            symbol_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            bigint_prototype,
            error_prototype,
            type_error_prototype,
            reference_error_prototype,
            range_error_prototype,
            syntax_error_prototype,
            eval_error_prototype,
            eval,
        ] {
            tracer.object(*id);
        }
    }
}

impl Trace for Realm {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.object(self.global_object);
        tracer.env(self.global_env);
        self.intrinsics.trace(tracer);
    }
}

// ── objects ──

impl Trace for Property {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            Property::Data { value, .. } => tracer.value(value),
            Property::Accessor { get, set, .. } => {
                get.trace(tracer);
                set.trace(tracer);
            }
        }
    }
}

impl Trace for NativeData {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            NativeData::None | NativeData::AsyncFromSyncUnwrap { .. } => {}
            NativeData::Resolving { promise, .. } => tracer.object(*promise),
            NativeData::CapabilityExecutor(slots) => {
                if let Ok(slots) = slots.try_borrow() {
                    slots.trace(tracer);
                }
            }
            NativeData::Finally { on_finally } => tracer.value(on_finally),
            NativeData::ValueThunk(value) | NativeData::Thrower(value) => tracer.value(value),
        }
    }
}

impl Trace for JsObject {
    fn trace(&self, tracer: &mut Tracer) {
        self.prototype.trace(tracer);
        for property in self.properties.values() {
            property.trace(tracer);
        }
        match &self.kind {
            ObjectKind::Ordinary
            | ObjectKind::Array { .. }
            | ObjectKind::Error
            | ObjectKind::Arguments
            | ObjectKind::ModuleNamespace(_) => {}
            ObjectKind::Function(data) => {
                tracer.env(data.env);
                data.home_object.trace(tracer);
            }
            ObjectKind::Native(native) => native.data.trace(tracer),
            ObjectKind::Bound(bound) => {
                tracer.object(bound.target);
                tracer.value(&bound.this);
                bound.args.trace(tracer);
            }
            ObjectKind::Generator(id) | ObjectKind::AsyncGenerator(id) => tracer.coroutine(*id),
            ObjectKind::Promise(data) => data.trace(tracer),
            ObjectKind::ArrayIterator(state) => state.target.trace(tracer),
            ObjectKind::AsyncFromSyncIterator(record) => record.trace(tracer),
            ObjectKind::Primitive(value) => tracer.value(value),
        }
    }
}

// ── promises and jobs ──

impl Trace for PromiseCapability {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.object(self.promise);
        tracer.value(&self.resolve);
        tracer.value(&self.reject);
    }
}

impl Trace for PromiseReaction {
    fn trace(&self, tracer: &mut Tracer) {
        self.capability.trace(tracer);
        match &self.handler {
            ReactionHandler::Empty => {}
            ReactionHandler::Callable(handler) => tracer.value(handler),
            ReactionHandler::Await(id) | ReactionHandler::AsyncGenAwaitReturn(id) => {
                tracer.coroutine(*id)
            }
        }
    }
}

impl Trace for PromiseData {
    fn trace(&self, tracer: &mut Tracer) {
        match &self.status {
            PromiseStatus::Pending => {}
            PromiseStatus::Fulfilled(value) | PromiseStatus::Rejected(value) => tracer.value(value),
        }
        self.fulfill_reactions.trace(tracer);
        self.reject_reactions.trace(tracer);
    }
}

impl Trace for UnhandledRejection {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.object(self.promise);
        tracer.value(&self.reason);
    }
}

impl Trace for Job {
    fn trace(&self, tracer: &mut Tracer) {
        match &self.0 {
            JobKind::PromiseReaction { reaction, argument } => {
                reaction.trace(tracer);
                tracer.value(argument);
            }
            JobKind::ResolveThenable {
                promise,
                thenable,
                then,
            } => {
                tracer.object(*promise);
                tracer.value(thenable);
                tracer.value(then);
            }
            JobKind::DynamicImport { capability, .. } => capability.trace(tracer),
        }
    }
}

// ── environments, modules, coroutines ──

impl Trace for EnvironmentRecord {
    fn trace(&self, tracer: &mut Tracer) {
        self.outer.trace(tracer);
        for binding in self.bindings.values() {
            tracer.value(&binding.value);
        }
        match &self.kind {
            EnvironmentKind::Declarative => {}
            EnvironmentKind::Function(slots) => {
                tracer.object(slots.function_object);
                tracer.value(&slots.this_value);
                tracer.value(&slots.new_target);
            }
            EnvironmentKind::Object { binding_object, .. } => tracer.object(*binding_object),
            EnvironmentKind::Global {
                global_object,
                this_value,
                ..
            } => {
                tracer.object(*global_object);
                tracer.object(*this_value);
            }
            EnvironmentKind::Module { imports } => {
                for import in imports.values() {
                    tracer.env(import.env);
                }
            }
        }
    }
}

impl Trace for ModuleRecord {
    fn trace(&self, tracer: &mut Tracer) {
        self.env.trace(tracer);
        self.namespace.trace(tracer);
        if let ModuleStatus::Errored(value) = &self.status {
            tracer.value(value);
        }
    }
}

impl Trace for AsyncGeneratorRequest {
    fn trace(&self, tracer: &mut Tracer) {
        self.completion.trace(tracer);
        self.capability.trace(tracer);
    }
}

impl Trace for Coroutine {
    fn trace(&self, tracer: &mut Tracer) {
        self.context.trace(tracer);
        self.activation.trace(tracer);
        self.capability.trace(tracer);
        for request in &self.queue {
            request.trace(tracer);
        }
    }
}

// ── frames ──

impl Trace for RefCont {
    fn trace(&self, tracer: &mut Tracer) {
        if let RefCont::Put(value) = self {
            tracer.value(value);
        }
    }
}

impl Trace for BindingMode {
    fn trace(&self, tracer: &mut Tracer) {
        if let BindingMode::Initialize(env) = self {
            tracer.env(*env);
        }
    }
}

impl Trace for CallReturn {
    fn trace(&self, tracer: &mut Tracer) {
        if let CallReturn::Construct { env, this, .. } = self {
            tracer.env(*env);
            this.trace(tracer);
        }
    }
}

impl Trace for Frame {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            Frame::StmtList { value, .. } => value.trace(tracer),
            Frame::RestoreEnv(env) | Frame::ForInOfHead { old_env: env, .. } => tracer.env(*env),
            Frame::WhileLoop(state) => tracer.value(&state.value),
            Frame::ForLoop(state) => tracer.value(&state.value),
            Frame::ForInOf(state) => {
                match &state.source {
                    LoopSource::Keys { object, .. } => tracer.object(*object),
                    LoopSource::Sync(record) | LoopSource::Async(record) => record.trace(tracer),
                }
                tracer.value(&state.value);
                tracer.env(state.old_env);
                if let ForInOfPhase::AwaitClose(completion) = &state.phase {
                    completion.trace(tracer);
                }
            }
            Frame::SwitchMatch(state) => tracer.value(&state.discriminant),
            Frame::SwitchRun { value, .. }
            | Frame::ProduceValue(value)
            | Frame::OptionalChainEnd(value)
            | Frame::BinaryApply { left: value, .. } => tracer.value(value),
            Frame::FinallyExit(completion) => completion.trace(tracer),
            Frame::EvalRef { cont, .. } | Frame::MemberObject { cont, .. } => cont.trace(tracer),
            Frame::MemberKey { base: value, cont } | Frame::SuperKey { this: value, cont } => {
                tracer.value(value);
                cont.trace(tracer);
            }
            Frame::PutReference(reference) => reference.trace(tracer),
            Frame::CompoundAssign { reference, left, .. } => {
                reference.trace(tracer);
                tracer.value(left);
            }
            Frame::CallArgs(state) => {
                tracer.value(&state.func);
                tracer.value(&state.this);
                state.values.trace(tracer);
            }
            Frame::ArrayLiteral(state) => {
                for value in state.values.iter().flatten() {
                    tracer.value(value);
                }
            }
            Frame::ObjectLiteral(state) => tracer.object(state.object),
            Frame::ClassDefinition(state) => {
                tracer.env(state.class_env);
                state.proto.trace(tracer);
                state.constructor.trace(tracer);
            }
            Frame::BindPattern { mode, .. } | Frame::BindElement { mode, .. } => mode.trace(tracer),
            Frame::ObjectPattern(state) => {
                tracer.value(&state.source);
                state.mode.trace(tracer);
            }
            Frame::ArrayPattern(state) => {
                state.iterator.trace(tracer);
                state.mode.trace(tracer);
            }
            Frame::BindParams(state) => {
                state.args.trace(tracer);
                state.mode.trace(tracer);
            }
            Frame::YieldStar(state) => state.iterator.trace(tracer),
            Frame::Stmt(_)
            | Frame::UpdateEmptyUndefined
            | Frame::IfBranch(_)
            | Frame::Declarator { .. }
            | Frame::InitializeBinding(_)
            | Frame::BreakableExit
            | Frame::LabelExit(_)
            | Frame::SwitchStart(_)
            | Frame::ReturnValue
            | Frame::ReturnAwaited
            | Frame::ThrowValue
            | Frame::TryCatch(_)
            | Frame::TryFinally(_)
            | Frame::WithEnter(_)
            | Frame::Expr(_)
            | Frame::DestructureAssign(_)
            | Frame::CallCallee(_)
            | Frame::NewCallee(_)
            | Frame::BinaryRight(_)
            | Frame::LogicalRight(_)
            | Frame::ConditionalBranch(_)
            | Frame::UnaryApply(_)
            | Frame::TypeOfValue
            | Frame::Sequence { .. }
            | Frame::Template(_)
            | Frame::ImportCall
            | Frame::Yield { .. }
            | Frame::YieldStarStart
            | Frame::Await => {}
        }
    }
}

impl Trace for Activation {
    fn trace(&self, tracer: &mut Tracer) {
        self.frames.trace(tracer);
        self.acc.trace(tracer);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Collection
// ═══════════════════════════════════════════════════════════════════════════

impl Interpreter {
    /// Whether enough has been allocated since the last collection.
    fn gc_due(&self) -> bool {
        let threshold = self.config.gc_threshold;
        threshold != 0
            && self.heap.allocations() + self.envs.allocations() + self.coroutines.allocations()
                >= threshold
    }

    /// Collect at the top of the frame loop. Only the outermost machine
    /// with no native function on the Rust stack qualifies; `act` and
    /// `callers` are the activations it is running.
    pub(crate) fn collect_at_safe_point(
        &mut self,
        act: &Activation,
        callers: &[(Activation, CallReturn)],
    ) {
        if self.machine_depth != 1 || self.gc_pause != 0 || !self.gc_due() {
            return;
        }
        let mut in_flight: Vec<&dyn Trace> = Vec::with_capacity(callers.len() + 1);
        in_flight.push(act);
        in_flight.extend(callers.iter().map(|caller| caller as &dyn Trace));
        self.collect(&in_flight);
    }

    /// Collect between jobs, when nothing is running.
    pub(crate) fn collect_at_rest(&mut self) {
        if self.machine_depth == 0 && self.gc_pause == 0 && self.gc_due() {
            self.collect(&[]);
        }
    }

    /// Run a full collection now. Only valid while no guest code runs.
    pub fn collect_garbage(&mut self) -> CollectStats {
        if self.machine_depth != 0 || self.gc_pause != 0 {
            return CollectStats::default();
        }
        self.collect(&[])
    }

    /// Run `f` with collection suspended, for host code that holds handles
    /// on the Rust stack while guest code may run.
    pub(crate) fn without_gc<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.gc_pause += 1;
        let result = f(self);
        self.gc_pause -= 1;
        result
    }

    /// Keep `value` alive until `release_host_roots`.
    pub(crate) fn pin_for_host(&mut self, value: &JsValue) {
        if value.is_object() {
            self.host_roots.push(value.clone());
        }
    }

    pub(crate) fn release_host_roots(&mut self) {
        self.host_roots.clear();
    }

    /// Push temporary roots; returns the mark to pass to `unroot_values`.
    pub(crate) fn root_values(&mut self, values: &[JsValue]) -> usize {
        let mark = self.temp_roots.len();
        self.temp_roots.extend_from_slice(values);
        mark
    }

    pub(crate) fn unroot_values(&mut self, mark: usize) {
        self.temp_roots.truncate(mark);
    }

    fn trace_roots(&self, tracer: &mut Tracer) {
        for realm in &self.realms {
            realm.trace(tracer);
        }
        self.contexts.trace(tracer);
        for job in self.jobs.iter().chain(&self.job_roots) {
            job.trace(tracer);
        }
        for module in self.modules.records() {
            module.trace(tracer);
        }
        self.pending_rejections.trace(tracer);
        self.unhandled_rejections.trace(tracer);
        self.host_roots.trace(tracer);
        self.temp_roots.trace(tracer);
    }

    fn collect(&mut self, in_flight: &[&dyn Trace]) -> CollectStats {
        let mut tracer = Tracer::new(
            self.heap.capacity(),
            self.envs.capacity(),
            self.coroutines.capacity(),
        );
        self.trace_roots(&mut tracer);
        for root in in_flight {
            root.trace(&mut tracer);
        }
        loop {
            if let Some(id) = tracer.object_stack.pop() {
                self.heap.get(id).trace(&mut tracer);
            } else if let Some(id) = tracer.env_stack.pop() {
                self.envs.get(id).trace(&mut tracer);
            } else if let Some(id) = tracer.coroutine_stack.pop() {
                self.coroutines.get(id).trace(&mut tracer);
            } else {
                break;
            }
        }

        let vacant = self
            .realms
            .first()
            .map(|realm| ExecutionContext::top_level(RealmId(0), realm.global_env, None));
        let stats = CollectStats {
            objects: self.heap.sweep(&tracer.objects),
            environments: self.envs.sweep(&tracer.envs),
            coroutines: match vacant {
                Some(vacant) => self.coroutines.sweep(&tracer.coroutines, &vacant),
                None => 0,
            },
        };
        self.collections += 1;
        debug!(
            objects = stats.objects,
            environments = stats.environments,
            coroutines = stats.coroutines,
            live_objects = self.heap.len(),
            live_environments = self.envs.len(),
            "garbage collected"
        );
        stats
    }
}
