//! The agent
//!
//! `Interpreter` owns everything one agent needs: the object heap, the
//! environment arena, its realms, the execution-context stack, suspended
//! coroutines, registered modules and the job queue. Evaluation threads
//! `&mut Interpreter` through every operation; there is no ambient state.
//!
//! Guest code runs on an explicit frame machine (`machine.rs`), so
//! generator and async bodies can suspend in the middle of any statement
//! and resume later from a job.

pub mod builtins;
mod bindings;
pub mod coroutine;
mod eval;
mod expressions;
mod function;
pub mod gc;
mod iteration;
pub mod jobs;
mod machine;
pub mod module;
mod operations;
mod patterns;
pub mod promise;
mod stack;
mod statements;

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::ast::FunctionKind;
use crate::completion::Completion;
use crate::config::RuntimeConfig;
use crate::context::{ContextStack, ExecutionContext};
use crate::environment::{EnvId, EnvironmentArena, EnvironmentKind};
use crate::error::{ErrorKind, JsError, JsResult};
use crate::host::{DefaultHost, HostHooks};
use crate::object::{
    JsObject, NativeData, NativeFn, NativeFunction, ObjectHeap, ObjectKind, Property,
};
use crate::parser::parse_script;
use crate::realm::{Intrinsics, Realm, RealmId};
use crate::string_dict::StringDict;
use crate::value::{
    CheapClone, JsString, JsSymbol, JsValue, ObjectId, PropertyKey, WellKnownSymbols,
    number_to_string,
};

use coroutine::CoroutineTable;
use jobs::Job;
use machine::{Activation, RunOutcome};
use module::ModuleMap;
use promise::UnhandledRejection;

pub(crate) use operations::{IteratorHint, IteratorRecord, Numeric};

/// Counters describing what an agent has allocated and executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub objects: usize,
    pub environments: usize,
    /// Environments created by CreatePerIterationEnvironment.
    pub per_iteration_copies: usize,
    pub coroutines: usize,
    pub steps: u64,
    pub jobs_run: u64,
    /// Garbage collections run so far.
    pub collections: u64,
}

/// The interpreter state
pub struct Interpreter {
    pub(crate) heap: ObjectHeap,
    pub(crate) envs: EnvironmentArena,
    pub(crate) realms: Vec<Realm>,
    pub(crate) contexts: ContextStack,
    pub(crate) coroutines: CoroutineTable,
    pub(crate) modules: ModuleMap,
    pub(crate) jobs: VecDeque<Job>,
    pub(crate) host: Box<dyn HostHooks>,
    pub(crate) config: RuntimeConfig,
    pub(crate) symbols: WellKnownSymbols,
    pub(crate) string_dict: StringDict,
    /// Rejected promises without a handler, in rejection order.
    pub(crate) pending_rejections: Vec<ObjectId>,
    /// Rejections reported to the host by the latest drain.
    pub(crate) unhandled_rejections: Vec<UnhandledRejection>,
    pub(crate) call_depth: usize,
    /// Frame machines running on the Rust stack.
    pub(crate) machine_depth: usize,
    /// Nonzero while a native function or host conversion holds handles.
    pub(crate) gc_pause: usize,
    /// Values handed out to the host, kept alive until released.
    pub(crate) host_roots: Vec<JsValue>,
    pub(crate) temp_roots: Vec<JsValue>,
    /// Jobs taken off the queue and still running.
    pub(crate) job_roots: Vec<Job>,
    steps: u64,
    jobs_run: u64,
    collections: u64,
}

impl Interpreter {
    /// Create an agent with one realm.
    pub fn new(config: RuntimeConfig) -> Self {
        let mut heap = ObjectHeap::new();
        let global_object = heap.alloc(JsObject::ordinary(None));
        let mut envs = EnvironmentArena::new();
        let global_env = envs.alloc(
            None,
            EnvironmentKind::Global {
                global_object,
                this_value: global_object,
                var_names: FxHashSet::default(),
            },
        );
        let host_context = ExecutionContext::top_level(RealmId(0), global_env, None);
        let mut interp = Interpreter {
            heap,
            envs,
            realms: Vec::new(),
            contexts: ContextStack::new(host_context),
            coroutines: CoroutineTable::default(),
            modules: ModuleMap::default(),
            jobs: VecDeque::new(),
            host: Box::new(DefaultHost),
            config,
            symbols: WellKnownSymbols::new(),
            string_dict: StringDict::with_common_strings(),
            pending_rejections: Vec::new(),
            unhandled_rejections: Vec::new(),
            call_depth: 0,
            machine_depth: 0,
            gc_pause: 0,
            host_roots: Vec::new(),
            temp_roots: Vec::new(),
            job_roots: Vec::new(),
            steps: 0,
            jobs_run: 0,
            collections: 0,
        };
        builtins::create_realm(&mut interp, global_object, global_env);
        interp.heap.reset_allocations();
        interp.envs.reset_allocations();
        interp
    }

    pub fn set_host(&mut self, host: Box<dyn HostHooks>) {
        self.host = host;
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            objects: self.heap.len(),
            environments: self.envs.len(),
            per_iteration_copies: self.envs.per_iteration_copies(),
            coroutines: self.coroutines.len(),
            steps: self.steps,
            jobs_run: self.jobs_run,
            collections: self.collections,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Running context and realm
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn running(&self) -> &ExecutionContext {
        self.contexts.running()
    }

    pub(crate) fn current_realm(&self) -> RealmId {
        self.contexts.running().realm
    }

    pub(crate) fn realm(&self) -> &Realm {
        &self.realms[self.current_realm().index()]
    }

    pub(crate) fn intrinsics(&self) -> &Intrinsics {
        &self.realm().intrinsics
    }

    pub fn global_object(&self) -> ObjectId {
        self.realm().global_object
    }

    pub(crate) fn lexical_env(&self) -> EnvId {
        self.contexts.running().lexical_env
    }

    pub(crate) fn set_lexical_env(&mut self, env: EnvId) {
        self.contexts.running_mut().lexical_env = env;
    }

    pub(crate) fn push_context(&mut self, ctx: ExecutionContext) {
        self.contexts.push(ctx);
        debug!(depth = self.contexts.depth(), "push execution context");
    }

    pub(crate) fn pop_context(&mut self) -> JsResult<ExecutionContext> {
        let ctx = self
            .contexts
            .pop()
            .ok_or_else(|| JsError::internal("execution context stack underflow"))?;
        debug!(depth = self.contexts.depth(), "pop execution context");
        Ok(ctx)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Strings and keys
    // ═══════════════════════════════════════════════════════════════════════

    /// Intern a string using the string dictionary
    pub fn intern(&mut self, s: &str) -> JsString {
        self.string_dict.get_or_insert(s)
    }

    /// Interned property key
    pub fn key(&mut self, s: &str) -> PropertyKey {
        PropertyKey::String(self.intern(s))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Allocation helpers
    // ═══════════════════════════════════════════════════════════════════════

    pub fn alloc(&mut self, object: JsObject) -> ObjectId {
        self.heap.alloc(object)
    }

    /// OrdinaryObjectCreate(%Object.prototype%)
    pub fn create_object(&mut self) -> ObjectId {
        let proto = self.intrinsics().object_prototype;
        self.alloc(JsObject::ordinary(Some(proto)))
    }

    /// CreateArrayFromList
    pub fn create_array(&mut self, values: Vec<JsValue>) -> ObjectId {
        let proto = self.intrinsics().array_prototype;
        let mut array = JsObject::new(
            Some(proto),
            ObjectKind::Array {
                length: values.len() as u32,
            },
        );
        for (index, value) in values.into_iter().enumerate() {
            array
                .properties
                .insert(PropertyKey::from(index), Property::plain(value));
        }
        self.alloc(array)
    }

    /// Set `name` and `length` the way SetFunctionName and SetFunctionLength do.
    pub fn set_function_name_and_length(&mut self, func: ObjectId, name: JsString, length: u32) {
        let length_key = self.key("length");
        let name_key = self.key("name");
        let obj = self.heap.get_mut(func);
        obj.properties.insert(
            length_key,
            Property::data(JsValue::from(length), false, false, true),
        );
        obj.properties
            .insert(name_key, Property::data(JsValue::String(name), false, false, true));
    }

    pub fn create_native_function(&mut self, name: &str, func: NativeFn, length: u32) -> ObjectId {
        self.create_native_with_data(name, func, length, NativeData::None)
    }

    /// A built-in function closing over `data`.
    pub fn create_native_with_data(
        &mut self,
        name: &str,
        func: NativeFn,
        length: u32,
        data: NativeData,
    ) -> ObjectId {
        let realm = self.current_realm();
        let proto = self.intrinsics().function_prototype;
        let id = self.alloc(JsObject::new(
            Some(proto),
            ObjectKind::Native(Box::new(NativeFunction {
                func,
                data,
                realm,
                constructor: false,
            })),
        ));
        let name = self.intern(name);
        self.set_function_name_and_length(id, name, length);
        id
    }

    /// A built-in constructor with a `prototype` link to `prototype`.
    pub fn create_native_constructor(
        &mut self,
        name: &str,
        func: NativeFn,
        length: u32,
        prototype: ObjectId,
    ) -> ObjectId {
        let ctor = self.create_native_function(name, func, length);
        if let ObjectKind::Native(native) = &mut self.heap.get_mut(ctor).kind {
            native.constructor = true;
        }
        let prototype_key = self.key("prototype");
        let constructor_key = self.key("constructor");
        self.heap.get_mut(ctor).properties.insert(
            prototype_key,
            Property::data(JsValue::Object(prototype), false, false, false),
        );
        self.heap
            .get_mut(prototype)
            .properties
            .insert(constructor_key, Property::hidden(JsValue::Object(ctor)));
        ctor
    }

    /// Register a native method on a prototype object
    pub fn register_method(&mut self, obj: ObjectId, name: &str, func: NativeFn, length: u32) {
        let f = self.create_native_function(name, func, length);
        let key = self.key(name);
        self.define_hidden(obj, key, JsValue::Object(f));
    }

    /// Register a native method keyed by a well-known symbol.
    pub fn register_symbol_method(
        &mut self,
        obj: ObjectId,
        symbol: JsSymbol,
        name: &str,
        func: NativeFn,
        length: u32,
    ) {
        let f = self.create_native_function(name, func, length);
        self.define_hidden(obj, PropertyKey::Symbol(symbol), JsValue::Object(f));
    }

    /// Register an accessor with a native getter.
    pub fn register_getter(&mut self, obj: ObjectId, key: PropertyKey, name: &str, func: NativeFn) {
        let getter = self.create_native_function(&format!("get {name}"), func, 0);
        self.heap.get_mut(obj).properties.insert(
            key,
            Property::Accessor {
                get: Some(getter),
                set: None,
                enumerable: false,
                configurable: true,
            },
        );
    }

    /// Writable, configurable, non-enumerable data property.
    pub fn define_hidden(&mut self, obj: ObjectId, key: PropertyKey, value: JsValue) {
        self.heap
            .get_mut(obj)
            .properties
            .insert(key, Property::hidden(value));
    }

    /// Non-writable, non-enumerable, non-configurable data property.
    pub fn define_frozen(&mut self, obj: ObjectId, key: PropertyKey, value: JsValue) {
        self.heap
            .get_mut(obj)
            .properties
            .insert(key, Property::data(value, false, false, false));
    }

    /// CreateIterResultObject
    pub fn create_iter_result(&mut self, value: JsValue, done: bool) -> JsValue {
        let value_key = self.key("value");
        let done_key = self.key("done");
        let obj = self.create_object();
        let props = &mut self.heap.get_mut(obj).properties;
        props.insert(value_key, Property::plain(value));
        props.insert(done_key, Property::plain(JsValue::Boolean(done)));
        JsValue::Object(obj)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Errors
    // ═══════════════════════════════════════════════════════════════════════

    /// A native error object of the running realm.
    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> ObjectId {
        let proto = self.intrinsics().error_prototype_for(kind);
        let message_key = self.key("message");
        let message = self.intern(message);
        let mut error = JsObject::new(Some(proto), ObjectKind::Error);
        error
            .properties
            .insert(message_key, Property::hidden(JsValue::String(message)));
        self.alloc(error)
    }

    /// The guest value a catchable engine error becomes when script code
    /// observes it.
    pub(crate) fn error_to_value(&mut self, err: JsError) -> JsValue {
        match err {
            JsError::Thrown { value, .. } => value,
            other => {
                let (kind, message) = other
                    .kind_and_message()
                    .unwrap_or((ErrorKind::Error, other.to_string()));
                JsValue::Object(self.create_error(kind, &message))
            }
        }
    }

    /// Fill in the description of a thrown value leaving the engine.
    pub(crate) fn finalize_error(&mut self, err: JsError) -> JsError {
        match err {
            JsError::Thrown { value, .. } => {
                let description = self.describe_value(&value);
                JsError::Thrown { value, description }
            }
            other => other,
        }
    }

    /// A readable rendering of a value that never runs guest code.
    pub(crate) fn describe_value(&mut self, value: &JsValue) -> String {
        match value {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => number_to_string(*n),
            JsValue::BigInt(b) => format!("{b}n"),
            JsValue::String(s) => s.to_rust_string(),
            JsValue::Symbol(sym) => sym.descriptive_string().to_rust_string(),
            JsValue::Object(id) => {
                let name_key = self.key("name");
                let message_key = self.key("message");
                let name = self.lookup_data(*id, &name_key);
                let message = self.lookup_data(*id, &message_key);
                match (name, message) {
                    (Some(JsValue::String(name)), Some(JsValue::String(message)))
                        if message.is_empty() =>
                    {
                        name.to_rust_string()
                    }
                    (Some(JsValue::String(name)), Some(JsValue::String(message))) => {
                        format!("{name}: {message}")
                    }
                    _ if self.heap.get(*id).is_callable() => "function".to_string(),
                    _ if self.heap.get(*id).is_array() => "[object Array]".to_string(),
                    _ => "[object Object]".to_string(),
                }
            }
        }
    }

    /// A data property found along the prototype chain, without running getters.
    pub(crate) fn lookup_data(&self, id: ObjectId, key: &PropertyKey) -> Option<JsValue> {
        let mut current = Some(id);
        while let Some(obj) = current {
            let object = self.heap.get(obj);
            if let Some(prop) = object.properties.get(key) {
                return match prop {
                    Property::Data { value, .. } => Some(value.cheap_clone()),
                    Property::Accessor { .. } => None,
                };
            }
            current = object.prototype;
        }
        None
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Execution
    // ═══════════════════════════════════════════════════════════════════════

    /// Charge one evaluation step against the configured budget.
    pub(crate) fn count_step(&mut self) -> JsResult<()> {
        self.steps += 1;
        let limit = self.config.max_steps;
        if limit != 0 && self.steps > limit {
            return Err(JsError::StepLimitExceeded(limit));
        }
        Ok(())
    }

    /// ScriptEvaluation: parse, instantiate global declarations and run
    /// `source` to completion. Jobs are not drained.
    pub fn run_script(&mut self, source: &str) -> JsResult<JsValue> {
        let program = parse_script(source, &mut self.string_dict, self.config.strict)?;
        let realm = self.current_realm();
        let global_env = self.realm().global_env;
        debug!(statements = program.body.len(), strict = program.strict, "evaluating script");

        self.push_context(ExecutionContext::top_level(realm, global_env, None));
        let result = self
            .global_declaration_instantiation(&program, global_env)
            .and_then(|()| {
                let mut act = Activation::new(FunctionKind::Normal, program.strict);
                act.push_statement_list(&program.body);
                self.run_activation(&mut act)
            });
        self.pop_context()?;

        match result? {
            RunOutcome::Complete(Completion::Throw(value)) => Err(JsError::thrown(value)),
            RunOutcome::Complete(completion) => Ok(completion.value_or_undefined()),
            RunOutcome::Yield { .. } | RunOutcome::Await(_) => {
                Err(JsError::internal("script body suspended"))
            }
        }
    }

    /// Drain the job queue, then report rejections that are still unhandled.
    pub fn run_jobs(&mut self) -> JsResult<()> {
        while !self.jobs.is_empty() {
            self.collect_at_rest();
            let Some(job) = self.jobs.pop_front() else {
                break;
            };
            self.jobs_run += 1;
            self.job_roots.push(job.clone());
            let result = self.run_job(job);
            self.job_roots.pop();
            result?;
        }
        self.report_unhandled_rejections();
        Ok(())
    }
}
