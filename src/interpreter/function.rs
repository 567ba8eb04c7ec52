//! Function objects
//!
//! Creation of ordinary function objects (closures over an environment),
//! the [[Call]] and [[Construct]] internal methods of ordinary, native and
//! bound functions, FunctionDeclarationInstantiation, arguments objects
//! and class definition evaluation.

use std::rc::Rc;

use tracing::trace;

use crate::ast::{FunctionBody, FunctionForm, FunctionKind, FunctionNode, MethodKind};
use crate::completion::Completion;
use crate::context::ExecutionContext;
use crate::environment::{EnvId, EnvironmentKind, FunctionSlots, ThisBindingStatus};
use crate::error::{JsError, JsResult};
use crate::object::{
    FunctionData, JsObject, NativeCall, NativeFn, ObjectKind, Property, PropertyDescriptor,
};
use crate::realm::{Intrinsics, RealmId};
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

use super::bindings::functions_to_initialize;
use super::machine::{
    Activation, BindingMode, CallReturn, ClassPhase, ClassState, Frame, FrameResult, ParamState,
    PendingCall, RunOutcome,
};
use super::stack::ensure_sufficient_stack;
use super::Interpreter;

/// The value of a [[Call]] whose body completed with `completion`.
pub(crate) fn call_result(completion: Completion) -> JsResult<JsValue> {
    match completion {
        Completion::Return(value) => Ok(value),
        Completion::Throw(value) => Err(JsError::thrown(value)),
        _ => Ok(JsValue::Undefined),
    }
}

/// The activation that evaluates the body of `node`.
pub(crate) fn body_activation(node: &FunctionNode) -> Activation {
    let mut act = Activation::new(node.kind, node.strict);
    match &node.body {
        FunctionBody::Block(list) => act.push_statement_list(list),
        FunctionBody::Expression(expr) => {
            act.push(Frame::ReturnValue);
            act.push(Frame::Expr(expr.cheap_clone()));
        }
    }
    act
}

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Creating function objects
    // ═══════════════════════════════════════════════════════════════════════

    /// OrdinaryFunctionCreate plus the MakeConstructor and prototype
    /// set-up InstantiateFunctionObject performs for each kind.
    pub(crate) fn create_function_object(
        &mut self,
        node: &Rc<FunctionNode>,
        env: EnvId,
        home_object: Option<ObjectId>,
    ) -> ObjectId {
        let intrinsics = self.intrinsics();
        let proto = match node.kind {
            FunctionKind::Normal => intrinsics.function_prototype,
            FunctionKind::Generator => intrinsics.generator_function_prototype,
            FunctionKind::Async => intrinsics.async_function_prototype,
            FunctionKind::AsyncGenerator => intrinsics.async_generator_function_prototype,
        };
        let realm = self.current_realm();
        let script_or_module = self.running().script_or_module;
        let id = self.alloc(JsObject::new(
            Some(proto),
            ObjectKind::Function(Box::new(FunctionData {
                node: node.cheap_clone(),
                env,
                home_object,
                realm,
                script_or_module,
            })),
        ));
        self.set_function_name_and_length(id, node.name.cheap_clone(), node.length);

        let prototype = match node.kind {
            FunctionKind::Normal
                if node.is_constructor()
                    && !matches!(node.form, FunctionForm::ClassConstructor { .. }) =>
            {
                let prototype = self.create_object();
                let constructor_key = self.key("constructor");
                self.define_hidden(prototype, constructor_key, JsValue::Object(id));
                Some(prototype)
            }
            FunctionKind::Generator => {
                let parent = self.intrinsics().generator_prototype;
                Some(self.alloc(JsObject::ordinary(Some(parent))))
            }
            FunctionKind::AsyncGenerator => {
                let parent = self.intrinsics().async_generator_prototype;
                Some(self.alloc(JsObject::ordinary(Some(parent))))
            }
            _ => None,
        };
        if let Some(prototype) = prototype {
            let prototype_key = self.key("prototype");
            self.heap.get_mut(id).properties.insert(
                prototype_key,
                Property::data(JsValue::Object(prototype), true, false, false),
            );
        }
        id
    }

    /// InstantiateFunctionObject for hoisted declarations.
    pub(crate) fn instantiate_function_object(&mut self, node: &Rc<FunctionNode>, env: EnvId) -> ObjectId {
        self.create_function_object(node, env, None)
    }

    /// Evaluate a function or arrow expression. Named function expressions
    /// get an environment of their own holding the immutable name binding.
    pub(crate) fn instantiate_function_expression(&mut self, node: &Rc<FunctionNode>) -> JsResult<ObjectId> {
        let env = self.lexical_env();
        match (&node.id, node.form) {
            (Some(name), FunctionForm::Expression) => {
                let func_env = self.envs.new_declarative(env);
                self.envs.create_immutable_binding(func_env, name.cheap_clone(), false);
                let closure = self.create_function_object(node, func_env, None);
                self.envs
                    .initialize_declarative(func_env, name, JsValue::Object(closure))?;
                Ok(closure)
            }
            _ => Ok(self.create_function_object(node, env, None)),
        }
    }

    /// SetFunctionName with a computed key and an optional `get`/`set` prefix.
    pub(crate) fn set_function_name(&mut self, func: ObjectId, key: &PropertyKey, prefix: Option<&str>) {
        let base = key.function_name();
        let name = match prefix {
            Some(prefix) => self.intern(prefix).concat(&JsString::from(" ")).concat(&base),
            None => base,
        };
        let name_key = self.key("name");
        self.heap.get_mut(func).properties.insert(
            name_key,
            Property::data(JsValue::String(name), false, false, true),
        );
    }

    /// DefineMethodProperty and the accessor forms of MethodDefinitionEvaluation.
    pub(crate) fn define_method(
        &mut self,
        target: ObjectId,
        key: PropertyKey,
        kind: MethodKind,
        node: &Rc<FunctionNode>,
        enumerable: bool,
    ) -> JsResult<()> {
        let env = self.lexical_env();
        let closure = self.create_function_object(node, env, Some(target));
        let value = JsValue::Object(closure);
        let desc = match kind {
            MethodKind::Method => {
                self.set_function_name(closure, &key, None);
                PropertyDescriptor::data(value, true, enumerable, true)
            }
            MethodKind::Getter => {
                self.set_function_name(closure, &key, Some("get"));
                PropertyDescriptor {
                    get: Some(value),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..PropertyDescriptor::default()
                }
            }
            MethodKind::Setter => {
                self.set_function_name(closure, &key, Some("set"));
                PropertyDescriptor {
                    set: Some(value),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..PropertyDescriptor::default()
                }
            }
        };
        self.define_property_or_throw(target, key, desc)
    }

    /// GetPrototypeFromConstructor
    pub(crate) fn get_prototype_from_constructor(
        &mut self,
        ctor: ObjectId,
        fallback: fn(&Intrinsics) -> ObjectId,
    ) -> JsResult<ObjectId> {
        let prototype_key = self.key("prototype");
        let proto = self.get(ctor, &prototype_key, JsValue::Object(ctor))?;
        match proto {
            JsValue::Object(proto) => Ok(proto),
            _ => {
                let realm = self.function_realm(ctor);
                Ok(fallback(&self.realms[realm.index()].intrinsics))
            }
        }
    }

    /// OrdinaryCreateFromConstructor
    pub(crate) fn ordinary_create_from_constructor(
        &mut self,
        ctor: ObjectId,
        fallback: fn(&Intrinsics) -> ObjectId,
    ) -> JsResult<ObjectId> {
        let proto = self.get_prototype_from_constructor(ctor, fallback)?;
        Ok(self.alloc(JsObject::ordinary(Some(proto))))
    }

    /// GetFunctionRealm
    pub(crate) fn function_realm(&self, func: ObjectId) -> RealmId {
        match &self.heap.get(func).kind {
            ObjectKind::Function(data) => data.realm,
            ObjectKind::Native(native) => native.realm,
            ObjectKind::Bound(bound) => self.function_realm(bound.target),
            _ => self.current_realm(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // [[Call]] and [[Construct]]
    // ═══════════════════════════════════════════════════════════════════════

    /// Call(F, thisArgument, argumentsList)
    pub(crate) fn call(&mut self, func: &JsValue, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let Some(id) = func.as_object().filter(|id| self.heap.get(*id).is_callable()) else {
            let shown = self.describe_value(func);
            return Err(JsError::type_error(format!("{shown} is not a function")));
        };
        self.enter_call()?;
        let result = ensure_sufficient_stack(|| self.call_object(id, this, args));
        self.call_depth -= 1;
        result
    }

    /// Construct(F, argumentsList, newTarget)
    pub(crate) fn construct(
        &mut self,
        func: &JsValue,
        args: &[JsValue],
        new_target: Option<&JsValue>,
    ) -> JsResult<JsValue> {
        if !self.is_constructor(func) {
            let shown = self.describe_value(func);
            return Err(JsError::type_error(format!("{shown} is not a constructor")));
        }
        let Some(id) = func.as_object() else {
            return Err(JsError::internal("constructor is not an object"));
        };
        let new_target = match new_target {
            Some(JsValue::Object(target)) => *target,
            Some(_) => return Err(JsError::internal("new.target is not an object")),
            None => id,
        };
        self.enter_call()?;
        let result = ensure_sufficient_stack(|| self.construct_object(id, args, new_target));
        self.call_depth -= 1;
        result
    }

    /// Begin [[Call]] of an ordinary non-generator, non-async function as
    /// an activation for the running frame machine. Other callees return
    /// `None` and go through `call`.
    pub(crate) fn begin_call(
        &mut self,
        func: &JsValue,
        this: JsValue,
        args: &[JsValue],
    ) -> JsResult<Option<Box<PendingCall>>> {
        let Some((id, data)) = self.inline_callee(func) else {
            return Ok(None);
        };
        if matches!(data.node.form, FunctionForm::ClassConstructor { .. }) {
            return Ok(None);
        }
        self.enter_call()?;
        let node = data.node.cheap_clone();
        let (env, ctx) = self.prepare_ordinary_call(id, &data, None);
        trace!(function = %node.name, "call");
        self.push_context(ctx);
        let prologue = if node.is_arrow() {
            Ok(())
        } else {
            self.ordinary_call_bind_this(env, &node, data.realm, this)
        }
        .and_then(|()| self.function_declaration_instantiation(id, &node, args));
        self.finish_prologue(prologue, &node, CallReturn::Call)
    }

    /// Begin [[Construct]] of an ordinary constructor the way `begin_call`
    /// begins a call. The caller has checked that `func` is a constructor.
    pub(crate) fn begin_construct(
        &mut self,
        func: &JsValue,
        args: &[JsValue],
        new_target: Option<ObjectId>,
        super_call: bool,
    ) -> JsResult<Option<Box<PendingCall>>> {
        let Some((id, data)) = self.inline_callee(func) else {
            return Ok(None);
        };
        let new_target = new_target.unwrap_or(id);
        self.enter_call()?;
        let node = data.node.cheap_clone();
        let derived = matches!(node.form, FunctionForm::ClassConstructor { derived: true });
        let this = if derived {
            None
        } else {
            match self.ordinary_create_from_constructor(new_target, |i| i.object_prototype) {
                Ok(this) => Some(this),
                Err(err) => {
                    self.call_depth -= 1;
                    return Err(err);
                }
            }
        };
        let (env, ctx) = self.prepare_ordinary_call(id, &data, Some(new_target));
        trace!(function = %node.name, "construct");
        self.push_context(ctx);
        let prologue = match this {
            Some(this) => self.envs.bind_this_value(env, JsValue::Object(this)),
            None => Ok(()),
        }
        .and_then(|()| self.function_declaration_instantiation(id, &node, args));
        let ret = CallReturn::Construct {
            env,
            this,
            derived,
            super_call,
        };
        self.finish_prologue(prologue, &node, ret)
    }

    fn inline_callee(&self, func: &JsValue) -> Option<(ObjectId, FunctionData)> {
        let id = func.as_object()?;
        match &self.heap.get(id).kind {
            ObjectKind::Function(data) if data.node.kind == FunctionKind::Normal => {
                Some((id, (**data).clone()))
            }
            _ => None,
        }
    }

    fn finish_prologue(
        &mut self,
        prologue: JsResult<()>,
        node: &FunctionNode,
        ret: CallReturn,
    ) -> JsResult<Option<Box<PendingCall>>> {
        if let Err(err) = prologue {
            self.pop_context()?;
            self.call_depth -= 1;
            return Err(err);
        }
        Ok(Some(Box::new(PendingCall {
            activation: body_activation(node),
            ret,
        })))
    }

    fn enter_call(&mut self) -> JsResult<()> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(JsError::range_error("Maximum call stack size exceeded"));
        }
        self.call_depth += 1;
        Ok(())
    }

    /// Run `f` with `ctx` as the running execution context.
    pub(crate) fn with_context<T>(
        &mut self,
        ctx: ExecutionContext,
        f: impl FnOnce(&mut Self) -> JsResult<T>,
    ) -> JsResult<T> {
        self.push_context(ctx);
        let result = f(self);
        self.pop_context()?;
        result
    }

    fn call_object(&mut self, id: ObjectId, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        match &self.heap.get(id).kind {
            ObjectKind::Function(data) => {
                let data = (**data).clone();
                self.call_ordinary(id, data, this, args)
            }
            ObjectKind::Native(native) => {
                let (func, realm) = (native.func, native.realm);
                self.call_native(id, func, realm, this, args, None)
            }
            ObjectKind::Bound(bound) => {
                let target = JsValue::Object(bound.target);
                let bound_this = bound.this.cheap_clone();
                let mut full = bound.args.clone();
                full.extend_from_slice(args);
                self.call(&target, bound_this, &full)
            }
            _ => Err(JsError::internal("[[Call]] on a non-callable object")),
        }
    }

    fn construct_object(&mut self, id: ObjectId, args: &[JsValue], new_target: ObjectId) -> JsResult<JsValue> {
        match &self.heap.get(id).kind {
            ObjectKind::Function(data) => {
                let data = (**data).clone();
                self.construct_ordinary(id, data, args, new_target)
            }
            ObjectKind::Native(native) => {
                let (func, realm) = (native.func, native.realm);
                self.call_native(id, func, realm, JsValue::Undefined, args, Some(new_target))
            }
            ObjectKind::Bound(bound) => {
                let target = bound.target;
                let new_target = if new_target == id { target } else { new_target };
                let mut full = bound.args.clone();
                full.extend_from_slice(args);
                self.construct(
                    &JsValue::Object(target),
                    &full,
                    Some(&JsValue::Object(new_target)),
                )
            }
            _ => Err(JsError::internal("[[Construct]] on a non-constructor")),
        }
    }

    fn call_native(
        &mut self,
        callee: ObjectId,
        func: NativeFn,
        realm: RealmId,
        this: JsValue,
        args: &[JsValue],
        new_target: Option<ObjectId>,
    ) -> JsResult<JsValue> {
        let running = self.running();
        let ctx = ExecutionContext {
            function: Some(callee),
            realm,
            script_or_module: running.script_or_module,
            lexical_env: running.lexical_env,
            variable_env: running.variable_env,
            coroutine: None,
        };
        self.without_gc(|interp| {
            interp.with_context(ctx, |interp| {
                func(interp, this, args, NativeCall { callee, new_target })
            })
        })
    }

    /// PrepareForOrdinaryCall: a fresh function environment and the
    /// context that runs the body.
    fn prepare_ordinary_call(
        &mut self,
        func: ObjectId,
        data: &FunctionData,
        new_target: Option<ObjectId>,
    ) -> (EnvId, ExecutionContext) {
        let this_status = if data.node.is_arrow() {
            ThisBindingStatus::Lexical
        } else {
            ThisBindingStatus::Uninitialized
        };
        let env = self.envs.alloc(
            Some(data.env),
            EnvironmentKind::Function(FunctionSlots {
                function_object: func,
                this_status,
                this_value: JsValue::Undefined,
                new_target: new_target.map(JsValue::Object).unwrap_or_default(),
            }),
        );
        let ctx = ExecutionContext {
            function: Some(func),
            realm: data.realm,
            script_or_module: data.script_or_module,
            lexical_env: env,
            variable_env: env,
            coroutine: None,
        };
        (env, ctx)
    }

    fn call_ordinary(&mut self, func: ObjectId, data: FunctionData, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let node = data.node.cheap_clone();
        if matches!(node.form, FunctionForm::ClassConstructor { .. }) {
            return Err(JsError::type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                node.name
            )));
        }
        let (env, ctx) = self.prepare_ordinary_call(func, &data, None);
        trace!(function = %node.name, "call");
        let completion = self.with_context(ctx, |interp| {
            if !node.is_arrow() {
                interp.ordinary_call_bind_this(env, &node, data.realm, this)?;
            }
            interp.evaluate_body(func, &node, args)
        })?;
        call_result(completion)
    }

    /// OrdinaryCallBindThis
    fn ordinary_call_bind_this(&mut self, env: EnvId, node: &FunctionNode, realm: RealmId, this: JsValue) -> JsResult<()> {
        let this = if node.strict {
            this
        } else if this.is_null_or_undefined() {
            JsValue::Object(self.realms[realm.index()].global_object)
        } else {
            JsValue::Object(self.to_object(&this)?)
        };
        self.envs.bind_this_value(env, this)
    }

    fn construct_ordinary(
        &mut self,
        func: ObjectId,
        data: FunctionData,
        args: &[JsValue],
        new_target: ObjectId,
    ) -> JsResult<JsValue> {
        let node = data.node.cheap_clone();
        let derived = matches!(node.form, FunctionForm::ClassConstructor { derived: true });
        let this_argument = if derived {
            None
        } else {
            Some(self.ordinary_create_from_constructor(new_target, |i| i.object_prototype)?)
        };
        let (env, ctx) = self.prepare_ordinary_call(func, &data, Some(new_target));
        trace!(function = %node.name, "construct");
        self.with_context(ctx, |interp| {
            if let Some(this) = this_argument {
                interp.envs.bind_this_value(env, JsValue::Object(this))?;
            }
            let completion = interp.evaluate_body(func, &node, args)?;
            interp.construct_result(completion, env, this_argument, derived)
        })
    }

    /// The result of [[Construct]] once the constructor body completed.
    pub(crate) fn construct_result(
        &mut self,
        completion: Completion,
        env: EnvId,
        this_argument: Option<ObjectId>,
        derived: bool,
    ) -> JsResult<JsValue> {
        match completion {
            Completion::Throw(value) => Err(JsError::thrown(value)),
            Completion::Return(value) if value.is_object() => Ok(value),
            Completion::Return(value) if !derived || !value.is_undefined() => match this_argument {
                Some(this) => Ok(JsValue::Object(this)),
                None => Err(JsError::type_error(
                    "Derived constructors may only return object or undefined",
                )),
            },
            _ => match this_argument {
                Some(this) => Ok(JsValue::Object(this)),
                None => self.envs.get_this_binding(env),
            },
        }
    }

    /// EvaluateBody, dispatched on the function kind.
    fn evaluate_body(&mut self, func: ObjectId, node: &Rc<FunctionNode>, args: &[JsValue]) -> JsResult<Completion> {
        match node.kind {
            FunctionKind::Normal => {
                self.function_declaration_instantiation(func, node, args)?;
                let mut act = body_activation(node);
                match self.run_activation(&mut act)? {
                    RunOutcome::Complete(completion) => Ok(completion),
                    RunOutcome::Yield { .. } | RunOutcome::Await(_) => {
                        Err(JsError::internal("ordinary function body suspended"))
                    }
                }
            }
            FunctionKind::Generator | FunctionKind::AsyncGenerator => {
                self.function_declaration_instantiation(func, node, args)?;
                let generator = self.create_generator(func, node)?;
                Ok(Completion::Return(JsValue::Object(generator)))
            }
            FunctionKind::Async => {
                let capability = self.new_intrinsic_capability();
                match self.function_declaration_instantiation(func, node, args) {
                    Ok(()) => self.start_async_function(node, &capability)?,
                    Err(err) if err.is_catchable() => {
                        let reason = self.error_to_value(err);
                        self.call(&capability.reject, JsValue::Undefined, &[reason])?;
                    }
                    Err(err) => return Err(err),
                }
                Ok(Completion::Return(JsValue::Object(capability.promise)))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FunctionDeclarationInstantiation
    // ═══════════════════════════════════════════════════════════════════════

    /// Bind parameters, `arguments`, vars, lexical declarations and hoisted
    /// functions in the running context's environments.
    pub(crate) fn function_declaration_instantiation(
        &mut self,
        func: ObjectId,
        node: &Rc<FunctionNode>,
        args: &[JsValue],
    ) -> JsResult<()> {
        let callee_env = self.lexical_env();
        let strict = node.strict;
        let scope = &node.scope;
        let functions = functions_to_initialize(&scope.functions);
        let function_names: Vec<JsString> = functions.iter().filter_map(|f| f.id.clone()).collect();
        let arguments_name = self.intern("arguments");

        let mut arguments_needed = node.uses_arguments && !node.is_arrow();
        if node.param_names.contains(&arguments_name) {
            arguments_needed = false;
        } else if !node.has_param_expressions
            && (function_names.contains(&arguments_name)
                || scope.lexical.iter().any(|b| b.name == arguments_name))
        {
            arguments_needed = false;
        }

        let env = if strict || !node.has_param_expressions {
            callee_env
        } else {
            let env = self.envs.new_declarative(callee_env);
            self.set_lexical_env(env);
            env
        };

        for name in node.param_names.iter() {
            if !self.envs.has_declarative(env, name) {
                self.envs.create_mutable_binding(env, name.cheap_clone(), false);
                if node.has_duplicate_params {
                    self.envs.initialize_declarative(env, name, JsValue::Undefined)?;
                }
            }
        }

        let mut parameter_bindings: Vec<JsString> = node.param_names.to_vec();
        if arguments_needed {
            let arguments = self.create_arguments_object(func, args, strict);
            if strict {
                self.envs.create_immutable_binding(env, arguments_name.cheap_clone(), false);
            } else {
                self.envs.create_mutable_binding(env, arguments_name.cheap_clone(), false);
            }
            self.envs
                .initialize_declarative(env, &arguments_name, JsValue::Object(arguments))?;
            parameter_bindings.push(arguments_name);
        }

        let mode = if node.has_duplicate_params {
            BindingMode::Put
        } else {
            BindingMode::Initialize(env)
        };
        self.bind_parameters(node, args, env, mode)?;

        let var_env = if !node.has_param_expressions {
            let mut instantiated = parameter_bindings.clone();
            for name in scope.var_names.iter().chain(&function_names) {
                if !instantiated.contains(name) {
                    instantiated.push(name.cheap_clone());
                    self.envs.create_mutable_binding(env, name.cheap_clone(), false);
                    self.envs.initialize_declarative(env, name, JsValue::Undefined)?;
                }
            }
            env
        } else {
            let var_env = self.envs.new_declarative(env);
            self.contexts.running_mut().variable_env = var_env;
            let mut instantiated: Vec<JsString> = Vec::new();
            for name in scope.var_names.iter().chain(&function_names) {
                if instantiated.contains(name) {
                    continue;
                }
                instantiated.push(name.cheap_clone());
                self.envs.create_mutable_binding(var_env, name.cheap_clone(), false);
                let initial = if !parameter_bindings.contains(name) || function_names.contains(name) {
                    JsValue::Undefined
                } else {
                    self.envs.get_declarative(env, name)?
                };
                self.envs.initialize_declarative(var_env, name, initial)?;
            }
            var_env
        };
        self.contexts.running_mut().variable_env = var_env;

        let lex_env = if strict {
            var_env
        } else {
            self.envs.new_declarative(var_env)
        };
        self.set_lexical_env(lex_env);

        for binding in &scope.lexical {
            if binding.constant {
                self.envs.create_immutable_binding(lex_env, binding.name.cheap_clone(), true);
            } else {
                self.envs.create_mutable_binding(lex_env, binding.name.cheap_clone(), false);
            }
        }
        for decl in &functions {
            let Some(name) = &decl.id else {
                continue;
            };
            let closure = self.instantiate_function_object(decl, lex_env);
            self.envs
                .set_declarative(var_env, name, JsValue::Object(closure), false)?;
        }
        Ok(())
    }

    /// IteratorBindingInitialization of the formal parameters.
    fn bind_parameters(&mut self, node: &FunctionNode, args: &[JsValue], env: EnvId, mode: BindingMode) -> JsResult<()> {
        if node.simple_params {
            for (index, param) in node.params.iter().enumerate() {
                let Some(id) = param.pattern.as_identifier() else {
                    continue;
                };
                let value = args.get(index).cloned().unwrap_or_default();
                match mode {
                    BindingMode::Initialize(_) => self.envs.initialize_declarative(env, &id.name, value)?,
                    BindingMode::Put => self.envs.set_declarative(env, &id.name, value, node.strict)?,
                }
            }
            return Ok(());
        }
        let mut act = Activation::new(FunctionKind::Normal, node.strict);
        act.push(Frame::BindParams(Box::new(ParamState {
            params: node.params.cheap_clone(),
            args: args.to_vec(),
            next: 0,
            mode,
        })));
        match self.run_activation(&mut act)? {
            RunOutcome::Complete(Completion::Throw(value)) => Err(JsError::thrown(value)),
            RunOutcome::Complete(_) => Ok(()),
            RunOutcome::Yield { .. } | RunOutcome::Await(_) => {
                Err(JsError::internal("parameter initialization suspended"))
            }
        }
    }

    /// Bind the next formal parameter.
    pub(crate) fn step_bind_params(&mut self, act: &mut Activation, mut state: Box<ParamState>) -> JsResult<FrameResult> {
        let Some(param) = state.params.get(state.next).cloned() else {
            act.set_empty();
            return Ok(FrameResult::Continue);
        };
        let index = state.next;
        let mode = state.mode;
        if param.rest {
            let rest = state.args.get(index..).map(<[JsValue]>::to_vec).unwrap_or_default();
            let array = self.create_array(rest);
            act.push(Frame::BindPattern {
                pattern: param.pattern,
                mode,
            });
            act.set_value(JsValue::Object(array));
            return Ok(FrameResult::Continue);
        }
        let value = state.args.get(index).cloned().unwrap_or_default();
        state.next += 1;
        act.push(Frame::BindParams(state));
        act.push(Frame::BindElement {
            target: param.pattern,
            default: param.default,
            mode,
        });
        act.set_value(value);
        Ok(FrameResult::Continue)
    }

    /// CreateUnmappedArgumentsObject. Sloppy functions also get `callee`.
    fn create_arguments_object(&mut self, func: ObjectId, args: &[JsValue], strict: bool) -> ObjectId {
        let proto = self.intrinsics().object_prototype;
        let values = self.intrinsics().array_prototype_values;
        let mut object = JsObject::new(Some(proto), ObjectKind::Arguments);
        for (index, value) in args.iter().enumerate() {
            object
                .properties
                .insert(PropertyKey::from(index), Property::plain(value.cheap_clone()));
        }
        let length_key = self.key("length");
        object
            .properties
            .insert(length_key, Property::hidden(JsValue::from(args.len() as u32)));
        object.properties.insert(
            PropertyKey::Symbol(self.symbols.iterator.cheap_clone()),
            Property::hidden(JsValue::Object(values)),
        );
        if !strict {
            let callee_key = self.key("callee");
            object
                .properties
                .insert(callee_key, Property::hidden(JsValue::Object(func)));
        }
        self.alloc(object)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Classes
    // ═══════════════════════════════════════════════════════════════════════

    /// ClassDefinitionEvaluation, resumed after the heritage expression and
    /// after each computed member key.
    pub(crate) fn step_class_definition(&mut self, act: &mut Activation, mut state: Box<ClassState>) -> JsResult<FrameResult> {
        match state.phase {
            ClassPhase::Start => {
                self.set_lexical_env(state.class_env);
                if let Some(heritage) = &state.class.heritage {
                    let heritage = heritage.cheap_clone();
                    state.phase = ClassPhase::Heritage;
                    act.push(Frame::ClassDefinition(state));
                    act.push(Frame::Expr(heritage));
                    return Ok(FrameResult::Continue);
                }
                self.create_class_constructor(&mut state, None)?;
            }
            ClassPhase::Heritage => {
                let superclass = act.take_value();
                self.create_class_constructor(&mut state, Some(superclass))?;
            }
            ClassPhase::Key => {
                let key_value = act.take_value();
                let key = self.to_property_key(&key_value)?;
                self.define_class_member(&state, key)?;
                state.next += 1;
            }
            ClassPhase::Members => {}
        }
        state.phase = ClassPhase::Members;

        while let Some(member) = state.class.members.get(state.next) {
            let key = match &member.key {
                crate::ast::PropertyName::Computed(expr) => {
                    let expr = expr.cheap_clone();
                    state.phase = ClassPhase::Key;
                    act.push(Frame::ClassDefinition(state));
                    act.push(Frame::Expr(expr));
                    return Ok(FrameResult::Continue);
                }
                name => self.static_property_key(name),
            };
            self.define_class_member(&state, key)?;
            state.next += 1;
        }

        let Some(constructor) = state.constructor else {
            return Err(JsError::internal("class finished without a constructor"));
        };
        if let Some(name) = &state.class.id {
            self.envs
                .initialize_declarative(state.class_env, name, JsValue::Object(constructor))?;
        }
        act.set_value(JsValue::Object(constructor));
        Ok(FrameResult::Continue)
    }

    /// The prototype object and constructor function of a class.
    fn create_class_constructor(&mut self, state: &mut ClassState, superclass: Option<JsValue>) -> JsResult<()> {
        let intrinsics = self.intrinsics();
        let (object_prototype, function_prototype) =
            (intrinsics.object_prototype, intrinsics.function_prototype);
        let (proto_parent, constructor_parent) = match superclass {
            None => (Some(object_prototype), function_prototype),
            Some(JsValue::Null) => (None, function_prototype),
            Some(superclass) => {
                if !self.is_constructor(&superclass) {
                    let shown = self.describe_value(&superclass);
                    return Err(JsError::type_error(format!(
                        "Class extends value {shown} is not a constructor or null"
                    )));
                }
                let parent = self.get_named(&superclass, "prototype")?;
                let proto_parent = match parent {
                    JsValue::Object(parent) => Some(parent),
                    JsValue::Null => None,
                    other => {
                        let shown = self.describe_value(&other);
                        return Err(JsError::type_error(format!(
                            "Class extends value does not have valid prototype property {shown}"
                        )));
                    }
                };
                let Some(parent_ctor) = superclass.as_object() else {
                    return Err(JsError::internal("constructor is not an object"));
                };
                (proto_parent, parent_ctor)
            }
        };

        let proto = self.alloc(JsObject::ordinary(proto_parent));
        let class = state.class.cheap_clone();
        let constructor = self.create_function_object(&class.constructor, state.class_env, Some(proto));
        self.heap.get_mut(constructor).prototype = Some(constructor_parent);
        let prototype_key = self.key("prototype");
        self.define_frozen(constructor, prototype_key, JsValue::Object(proto));
        let constructor_key = self.key("constructor");
        self.define_hidden(proto, constructor_key, JsValue::Object(constructor));
        state.proto = Some(proto);
        state.constructor = Some(constructor);
        Ok(())
    }

    fn define_class_member(&mut self, state: &ClassState, key: PropertyKey) -> JsResult<()> {
        let Some(member) = state.class.members.get(state.next) else {
            return Err(JsError::internal("class member index out of range"));
        };
        let target = if member.is_static {
            state.constructor
        } else {
            state.proto
        };
        let Some(target) = target else {
            return Err(JsError::internal("class member defined before the constructor"));
        };
        let function = member.function.cheap_clone();
        self.define_method(target, key, member.kind, &function, false)
    }

    /// The key of a non-computed property name.
    pub(crate) fn static_property_key(&mut self, name: &crate::ast::PropertyName) -> PropertyKey {
        match name {
            crate::ast::PropertyName::Identifier(s) | crate::ast::PropertyName::String(s) => {
                PropertyKey::String(s.cheap_clone())
            }
            crate::ast::PropertyName::Number(n) => {
                let text = crate::value::number_to_string(*n);
                self.key(&text)
            }
            crate::ast::PropertyName::Computed(_) => PropertyKey::String(JsString::empty()),
        }
    }
}
