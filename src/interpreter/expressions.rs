//! Expression evaluation
//!
//! Expressions leave their value in the accumulator. Expressions that
//! produce references (identifiers, member accesses, `super` accesses) go
//! through `eval_reference`, which resolves the reference and then applies
//! a `RefCont`: read it, call through it, assign to it, and so on.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::ast::{
    Argument, AssignmentOp, AssignmentTarget, ClassNode, Expression, Literal, LogicalExpression,
    LogicalOp, MemberExpression, MemberProperty, ObjectMember, PropertyName, UnaryOp, UpdateOp,
};
use crate::error::{JsError, JsResult};
use crate::object::{JsObject, ObjectKind, Property};
use crate::reference::{Reference, ReferenceBase};
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

use super::machine::{
    Activation, ArrayLiteralState, CallKind, CallState, ClassPhase, ClassState, Frame,
    FrameResult, ObjectLiteralState, ObjectPending, RefCont, TemplateState,
};
use super::operations::Numeric;
use super::Interpreter;

/// How a callee reads in "is not a function" messages.
fn callee_text(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(id) => id.name.to_string(),
        Expression::This => "this".to_string(),
        Expression::Member(member) => match &member.property {
            MemberProperty::Identifier(name) => format!("{}.{name}", callee_text(&member.object)),
            MemberProperty::Computed(_) => format!("{}[...]", callee_text(&member.object)),
        },
        Expression::SuperMember(property) => match &**property {
            MemberProperty::Identifier(name) => format!("super.{name}"),
            MemberProperty::Computed(_) => "super[...]".to_string(),
        },
        Expression::Call(call) => format!("{}(...)", callee_text(&call.callee)),
        Expression::OptionalChain(inner) => callee_text(inner),
        _ => "expression".to_string(),
    }
}

fn literal_value(literal: &Literal) -> JsValue {
    match literal {
        Literal::Null => JsValue::Null,
        Literal::Boolean(b) => JsValue::Boolean(*b),
        Literal::Number(n) => JsValue::Number(*n),
        Literal::String(s) => JsValue::String(s.cheap_clone()),
        Literal::BigInt(b) => JsValue::BigInt(b.cheap_clone()),
    }
}

impl Interpreter {
    /// Start evaluating `expr`.
    pub(crate) fn eval_expression(&mut self, act: &mut Activation, expr: Expression) -> JsResult<FrameResult> {
        match expr {
            Expression::Literal(literal) => act.set_value(literal_value(&literal)),
            Expression::Template(template) => {
                let mut out = Vec::new();
                if let Some(first) = template.quasis.first() {
                    out.extend_from_slice(first.as_units());
                }
                match template.expressions.first().cloned() {
                    Some(first) => {
                        act.push(Frame::Template(Box::new(TemplateState {
                            template,
                            out,
                            next: 0,
                        })));
                        act.push(Frame::Expr(first));
                    }
                    None => act.set_value(JsValue::String(JsString::from_units(out))),
                }
            }
            Expression::Identifier(id) => {
                let reference = self.resolve_binding(&id.name, None, act.strict)?;
                let value = self.get_value(&reference)?;
                act.set_value(value);
            }
            Expression::This => {
                let this = self.resolve_this_binding()?;
                act.set_value(this);
            }
            Expression::NewTarget => {
                let target = self.new_target()?;
                act.set_value(target);
            }
            Expression::Array(elements) => {
                return self.step_array_literal(
                    act,
                    Box::new(ArrayLiteralState {
                        values: Vec::with_capacity(elements.len()),
                        elements,
                        next: 0,
                        pending: None,
                    }),
                );
            }
            Expression::Object(members) => {
                let object = self.create_object();
                return self.step_object_literal(
                    act,
                    Box::new(ObjectLiteralState {
                        members,
                        object,
                        next: 0,
                        pending: ObjectPending::None,
                    }),
                );
            }
            Expression::Function(node) => {
                let closure = self.instantiate_function_expression(&node)?;
                act.set_value(JsValue::Object(closure));
            }
            Expression::Class(class) => self.push_class_definition(act, class),
            Expression::Unary(unary) => match unary.op {
                UnaryOp::Typeof => {
                    return self.eval_reference(act, unary.argument.cheap_clone(), RefCont::TypeOf);
                }
                UnaryOp::Delete => {
                    return self.eval_reference(act, unary.argument.cheap_clone(), RefCont::Delete);
                }
                op => {
                    act.push(Frame::UnaryApply(op));
                    act.push(Frame::Expr(unary.argument.cheap_clone()));
                }
            },
            Expression::Update(update) => {
                let argument = update.argument.cheap_clone();
                return self.eval_reference(act, argument, RefCont::Update(update));
            }
            Expression::Binary(binary) => {
                let left = binary.left.cheap_clone();
                act.push(Frame::BinaryRight(binary));
                act.push(Frame::Expr(left));
            }
            Expression::Logical(logical) => {
                let left = logical.left.cheap_clone();
                act.push(Frame::LogicalRight(logical));
                act.push(Frame::Expr(left));
            }
            Expression::Conditional(conditional) => {
                let test = conditional.test.cheap_clone();
                act.push(Frame::ConditionalBranch(conditional));
                act.push(Frame::Expr(test));
            }
            Expression::Assignment(assign) => match assign.target.clone() {
                AssignmentTarget::Simple(target) => {
                    return self.eval_reference(act, target, RefCont::Assign(assign));
                }
                AssignmentTarget::Pattern(pattern) => {
                    act.push(Frame::DestructureAssign(pattern));
                    act.push(Frame::Expr(assign.value.cheap_clone()));
                }
            },
            Expression::Sequence(list) => act.push(Frame::Sequence { list, next: 0 }),
            Expression::Member(_) | Expression::SuperMember(_) => {
                return self.eval_reference(act, expr, RefCont::GetValue);
            }
            Expression::Call(call) => {
                let callee = call.callee.cheap_clone();
                return self.eval_reference(act, callee, RefCont::Call(call));
            }
            Expression::SuperCall(arguments) => {
                let env = self.this_environment()?;
                let active = self
                    .envs
                    .function_slots(env)
                    .map(|slots| slots.function_object)
                    .ok_or_else(|| JsError::syntax_error("'super' keyword unexpected here", 0, 0))?;
                let func = match self.heap.get(active).prototype {
                    Some(parent) => JsValue::Object(parent),
                    None => JsValue::Null,
                };
                return self.step_call_args(
                    act,
                    Box::new(CallState {
                        kind: CallKind::Super,
                        func,
                        this: JsValue::Undefined,
                        args: arguments,
                        values: Vec::new(),
                        next: 0,
                        pending: None,
                        callee: None,
                    }),
                );
            }
            Expression::New(call) => {
                let callee = call.callee.cheap_clone();
                act.push(Frame::NewCallee(call));
                act.push(Frame::Expr(callee));
            }
            Expression::OptionalChain(inner) => {
                act.push(Frame::OptionalChainEnd(JsValue::Undefined));
                act.push(Frame::Expr((*inner).clone()));
            }
            Expression::Yield(expr) => {
                if expr.delegate {
                    act.push(Frame::YieldStarStart);
                } else {
                    act.push(Frame::Yield { awaited: false });
                }
                match &expr.argument {
                    Some(argument) => act.push(Frame::Expr(argument.cheap_clone())),
                    None => act.set_value(JsValue::Undefined),
                }
            }
            Expression::Await(operand) => {
                act.push(Frame::Await);
                act.push(Frame::Expr((*operand).clone()));
            }
            Expression::ImportCall(specifier) => {
                act.push(Frame::ImportCall);
                act.push(Frame::Expr((*specifier).clone()));
            }
        }
        Ok(FrameResult::Continue)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // References
    // ═══════════════════════════════════════════════════════════════════════

    /// Evaluate `expr` as a reference and continue with `cont`.
    pub(crate) fn eval_reference(&mut self, act: &mut Activation, expr: Expression, cont: RefCont) -> JsResult<FrameResult> {
        match expr {
            Expression::Identifier(id) => {
                let reference = self.resolve_binding(&id.name, None, act.strict)?;
                self.apply_reference(act, reference, cont)
            }
            Expression::Member(member) => {
                let object = member.object.cheap_clone();
                act.push(Frame::MemberObject { member, cont });
                act.push(Frame::Expr(object));
                Ok(FrameResult::Continue)
            }
            Expression::SuperMember(property) => {
                let this = self.resolve_this_binding()?;
                match &*property {
                    MemberProperty::Identifier(name) => {
                        let reference = self.super_reference(this, PropertyKey::String(name.cheap_clone()))?;
                        self.apply_reference(act, reference, cont)
                    }
                    MemberProperty::Computed(key) => {
                        act.push(Frame::SuperKey { this, cont });
                        act.push(Frame::Expr(key.cheap_clone()));
                        Ok(FrameResult::Continue)
                    }
                }
            }
            Expression::OptionalChain(inner) => {
                let short = match &cont {
                    RefCont::Delete => JsValue::Boolean(true),
                    _ => JsValue::Undefined,
                };
                act.push(Frame::OptionalChainEnd(short));
                act.push(Frame::EvalRef {
                    expr: (*inner).clone(),
                    cont,
                });
                Ok(FrameResult::Continue)
            }
            other => {
                match cont {
                    RefCont::GetValue => act.push(Frame::Expr(other)),
                    RefCont::TypeOf => {
                        act.push(Frame::TypeOfValue);
                        act.push(Frame::Expr(other));
                    }
                    RefCont::Delete => {
                        act.push(Frame::ProduceValue(JsValue::Boolean(true)));
                        act.push(Frame::Expr(other));
                    }
                    RefCont::Call(call) => {
                        act.push(Frame::CallCallee(call));
                        act.push(Frame::Expr(other));
                    }
                    RefCont::Assign(_) | RefCont::Update(_) | RefCont::Put(_) => {
                        return Err(JsError::reference_error("Invalid left-hand side in assignment"));
                    }
                }
                Ok(FrameResult::Continue)
            }
        }
    }

    pub(crate) fn step_member_object(
        &mut self,
        act: &mut Activation,
        member: Rc<MemberExpression>,
        cont: RefCont,
    ) -> JsResult<FrameResult> {
        let base = act.take_value();
        if member.optional && base.is_null_or_undefined() {
            act.short_circuit()?;
            return Ok(FrameResult::Continue);
        }
        match &member.property {
            MemberProperty::Identifier(name) => {
                let reference = Reference::property(base, PropertyKey::String(name.cheap_clone()), act.strict);
                self.apply_reference(act, reference, cont)
            }
            MemberProperty::Computed(key) => {
                act.push(Frame::MemberKey { base, cont });
                act.push(Frame::Expr(key.cheap_clone()));
                Ok(FrameResult::Continue)
            }
        }
    }

    pub(crate) fn step_member_key(&mut self, act: &mut Activation, base: JsValue, cont: RefCont) -> JsResult<FrameResult> {
        let key_value = act.take_value();
        if base.is_null_or_undefined() {
            let key = self.describe_value(&key_value);
            let shown = if base.is_undefined() { "undefined" } else { "null" };
            return Err(JsError::type_error(format!("Cannot read properties of {shown} (reading '{key}')")));
        }
        let key = self.to_property_key(&key_value)?;
        let reference = Reference::property(base, key, act.strict);
        self.apply_reference(act, reference, cont)
    }

    pub(crate) fn step_super_key(&mut self, act: &mut Activation, this: JsValue, cont: RefCont) -> JsResult<FrameResult> {
        let key_value = act.take_value();
        let key = self.to_property_key(&key_value)?;
        let reference = self.super_reference(this, key)?;
        self.apply_reference(act, reference, cont)
    }

    /// MakeSuperPropertyReference: the base is the [[Prototype]] of the
    /// home object of the function providing `this`.
    fn super_reference(&mut self, this: JsValue, key: PropertyKey) -> JsResult<Reference> {
        let env = self.this_environment()?;
        let home = self
            .envs
            .function_slots(env)
            .and_then(|slots| self.heap.get(slots.function_object).function_data())
            .and_then(|data| data.home_object)
            .ok_or_else(|| JsError::syntax_error("'super' keyword unexpected here", 0, 0))?;
        let base = match self.heap.get(home).prototype {
            Some(proto) => JsValue::Object(proto),
            None => JsValue::Null,
        };
        let mut reference = Reference::property(base, key, true);
        reference.this_value = Some(this);
        Ok(reference)
    }

    fn apply_reference(&mut self, act: &mut Activation, reference: Reference, cont: RefCont) -> JsResult<FrameResult> {
        match cont {
            RefCont::GetValue => {
                let value = self.get_value(&reference)?;
                act.set_value(value);
            }
            RefCont::Call(call) => {
                let func = self.get_value(&reference)?;
                let this = match &reference.base {
                    ReferenceBase::Value(_) => reference.this_value(),
                    ReferenceBase::Environment(env) => self.with_base_object(*env),
                    ReferenceBase::Unresolvable => JsValue::Undefined,
                };
                let direct_eval = matches!(reference.base, ReferenceBase::Environment(_))
                    && call.callee.is_identifier_named("eval");
                if call.optional && func.is_null_or_undefined() {
                    act.short_circuit()?;
                    return Ok(FrameResult::Continue);
                }
                return self.step_call_args(
                    act,
                    Box::new(CallState {
                        kind: CallKind::Call { direct_eval },
                        func,
                        this,
                        args: call.arguments.cheap_clone(),
                        values: Vec::with_capacity(call.arguments.len()),
                        next: 0,
                        pending: None,
                        callee: Some(call.callee.cheap_clone()),
                    }),
                );
            }
            RefCont::Assign(assign) => match assign.op {
                AssignmentOp::Assign => {
                    act.push(Frame::PutReference(Box::new(reference)));
                    act.push(Frame::Expr(assign.value.cheap_clone()));
                }
                AssignmentOp::Compound(op) => {
                    let left = self.get_value(&reference)?;
                    act.push(Frame::CompoundAssign {
                        reference: Box::new(reference),
                        op,
                        left,
                    });
                    act.push(Frame::Expr(assign.value.cheap_clone()));
                }
                AssignmentOp::Logical(op) => {
                    let left = self.get_value(&reference)?;
                    let keep_left = match op {
                        LogicalOp::And => !left.to_boolean(),
                        LogicalOp::Or => left.to_boolean(),
                        LogicalOp::NullishCoalescing => !left.is_null_or_undefined(),
                    };
                    if keep_left {
                        act.set_value(left);
                    } else {
                        act.push(Frame::PutReference(Box::new(reference)));
                        act.push(Frame::Expr(assign.value.cheap_clone()));
                    }
                }
            },
            RefCont::Update(update) => {
                let old = self.get_value(&reference)?;
                let increment = update.op == UpdateOp::Increment;
                let (old, new) = match self.to_numeric(&old)? {
                    Numeric::Number(n) => {
                        let new = if increment { n + 1.0 } else { n - 1.0 };
                        (JsValue::Number(n), JsValue::Number(new))
                    }
                    Numeric::BigInt(b) => {
                        let one = BigInt::from(1);
                        let new = if increment { &*b + one } else { &*b - one };
                        (JsValue::BigInt(b), JsValue::from(new))
                    }
                };
                self.put_value(&reference, new.cheap_clone())?;
                act.set_value(if update.prefix { new } else { old });
            }
            RefCont::TypeOf => {
                let name = if reference.is_unresolvable() {
                    "undefined"
                } else {
                    let value = self.get_value(&reference)?;
                    self.type_of(&value)
                };
                let name = self.intern(name);
                act.set_value(JsValue::String(name));
            }
            RefCont::Delete => {
                let deleted = self.delete_reference(&reference)?;
                act.set_value(JsValue::Boolean(deleted));
            }
            RefCont::Put(value) => {
                self.put_value(&reference, value)?;
                act.set_empty();
            }
        }
        Ok(FrameResult::Continue)
    }

    /// The `delete` operator on a reference.
    fn delete_reference(&mut self, reference: &Reference) -> JsResult<bool> {
        match &reference.base {
            ReferenceBase::Unresolvable => Ok(true),
            ReferenceBase::Value(_) if reference.is_super_reference() => {
                Err(JsError::reference_error("Unsupported reference to 'super'"))
            }
            ReferenceBase::Value(base) => {
                let base = base.cheap_clone();
                let object = self.to_object(&base)?;
                let deleted = self.delete(object, &reference.name)?;
                if !deleted && reference.strict {
                    return Err(JsError::type_error(format!(
                        "Cannot delete property '{}' of object",
                        reference.name
                    )));
                }
                Ok(deleted)
            }
            ReferenceBase::Environment(env) => {
                let env = *env;
                self.delete_binding(env, &reference.name_string())
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    /// The callee of a call is not a reference; `this` is undefined.
    pub(crate) fn step_call_callee(&mut self, act: &mut Activation, call: Rc<crate::ast::CallExpression>) -> JsResult<FrameResult> {
        let func = act.take_value();
        if call.optional && func.is_null_or_undefined() {
            act.short_circuit()?;
            return Ok(FrameResult::Continue);
        }
        self.step_call_args(
            act,
            Box::new(CallState {
                kind: CallKind::Call { direct_eval: false },
                func,
                this: JsValue::Undefined,
                args: call.arguments.cheap_clone(),
                values: Vec::with_capacity(call.arguments.len()),
                next: 0,
                pending: None,
                callee: Some(call.callee.cheap_clone()),
            }),
        )
    }

    pub(crate) fn step_new_callee(&mut self, act: &mut Activation, call: Rc<crate::ast::CallExpression>) -> JsResult<FrameResult> {
        let func = act.take_value();
        self.step_call_args(
            act,
            Box::new(CallState {
                kind: CallKind::New,
                func,
                this: JsValue::Undefined,
                args: call.arguments.cheap_clone(),
                values: Vec::with_capacity(call.arguments.len()),
                next: 0,
                pending: None,
                callee: Some(call.callee.cheap_clone()),
            }),
        )
    }

    /// ArgumentListEvaluation, then the call itself.
    pub(crate) fn step_call_args(&mut self, act: &mut Activation, mut state: Box<CallState>) -> JsResult<FrameResult> {
        if let Some(spread) = state.pending.take() {
            let value = act.take_value();
            if spread {
                let items = self.iterate_to_list(&value)?;
                state.values.extend(items);
            } else {
                state.values.push(value);
            }
        }
        if let Some(argument) = state.args.get(state.next) {
            let (expr, spread) = match argument {
                Argument::Expression(expr) => (expr.cheap_clone(), false),
                Argument::Spread(expr) => (expr.cheap_clone(), true),
            };
            state.next += 1;
            state.pending = Some(spread);
            act.push(Frame::CallArgs(state));
            act.push(Frame::Expr(expr));
            return Ok(FrameResult::Continue);
        }

        let CallState {
            kind,
            func,
            this,
            values,
            callee,
            ..
        } = *state;
        let result = match kind {
            CallKind::Call { direct_eval } => {
                if direct_eval && func.as_object() == Some(self.intrinsics().eval) {
                    let source = values.into_iter().next().unwrap_or_default();
                    self.perform_eval(source, true, act.strict)?
                } else {
                    if !self.is_callable(&func) {
                        let shown = callee.as_ref().map(callee_text).unwrap_or_else(|| self.describe_value(&func));
                        return Err(JsError::type_error(format!("{shown} is not a function")));
                    }
                    if let Some(pending) = self.begin_call(&func, this.cheap_clone(), &values)? {
                        return Ok(FrameResult::Call(pending));
                    }
                    self.call(&func, this, &values)?
                }
            }
            CallKind::New => {
                if !self.is_constructor(&func) {
                    let shown = callee.as_ref().map(callee_text).unwrap_or_else(|| self.describe_value(&func));
                    return Err(JsError::type_error(format!("{shown} is not a constructor")));
                }
                if let Some(pending) = self.begin_construct(&func, &values, None, false)? {
                    return Ok(FrameResult::Call(pending));
                }
                self.construct(&func, &values, None)?
            }
            CallKind::Super => {
                let new_target = self.new_target()?;
                if !new_target.is_object() {
                    return Err(JsError::syntax_error("'super' keyword unexpected here", 0, 0));
                }
                if !self.is_constructor(&func) {
                    let shown = self.describe_value(&func);
                    return Err(JsError::type_error(format!("Super constructor {shown} is not a constructor")));
                }
                if let Some(pending) = self.begin_construct(&func, &values, new_target.as_object(), true)? {
                    return Ok(FrameResult::Call(pending));
                }
                let result = self.construct(&func, &values, Some(&new_target))?;
                let env = self.this_environment()?;
                self.envs.bind_this_value(env, result.cheap_clone())?;
                result
            }
        };
        act.set_value(result);
        Ok(FrameResult::Continue)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operators and literals
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn step_logical(&mut self, act: &mut Activation, expr: Rc<LogicalExpression>) -> JsResult<FrameResult> {
        let left = act.take_value();
        let keep_left = match expr.op {
            LogicalOp::And => !left.to_boolean(),
            LogicalOp::Or => left.to_boolean(),
            LogicalOp::NullishCoalescing => !left.is_null_or_undefined(),
        };
        if keep_left {
            act.set_value(left);
        } else {
            act.push(Frame::Expr(expr.right.cheap_clone()));
        }
        Ok(FrameResult::Continue)
    }

    pub(crate) fn step_array_literal(&mut self, act: &mut Activation, mut state: Box<ArrayLiteralState>) -> JsResult<FrameResult> {
        if let Some(spread) = state.pending.take() {
            let value = act.take_value();
            if spread {
                let items = self.iterate_to_list(&value)?;
                state.values.extend(items.into_iter().map(Some));
            } else {
                state.values.push(Some(value));
            }
        }
        while let Some(element) = state.elements.get(state.next) {
            state.next += 1;
            let (expr, spread) = match element {
                crate::ast::ArrayElement::Hole => {
                    state.values.push(None);
                    continue;
                }
                crate::ast::ArrayElement::Expression(expr) => (expr.cheap_clone(), false),
                crate::ast::ArrayElement::Spread(expr) => (expr.cheap_clone(), true),
            };
            state.pending = Some(spread);
            act.push(Frame::ArrayLiteral(state));
            act.push(Frame::Expr(expr));
            return Ok(FrameResult::Continue);
        }
        let array = self.create_array_with_holes(state.values);
        act.set_value(JsValue::Object(array));
        Ok(FrameResult::Continue)
    }

    fn create_array_with_holes(&mut self, values: Vec<Option<JsValue>>) -> ObjectId {
        if values.iter().all(Option::is_some) {
            return self.create_array(values.into_iter().flatten().collect());
        }
        let proto = self.intrinsics().array_prototype;
        let mut array = JsObject::new(
            Some(proto),
            ObjectKind::Array {
                length: values.len() as u32,
            },
        );
        for (index, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                array
                    .properties
                    .insert(PropertyKey::from(index), Property::plain(value));
            }
        }
        self.alloc(array)
    }

    pub(crate) fn step_object_literal(&mut self, act: &mut Activation, mut state: Box<ObjectLiteralState>) -> JsResult<FrameResult> {
        let mut known_key = None;
        match std::mem::replace(&mut state.pending, ObjectPending::None) {
            ObjectPending::None => {}
            ObjectPending::Key => {
                let key_value = act.take_value();
                known_key = Some(self.to_property_key(&key_value)?);
            }
            ObjectPending::Value(key, name_anonymous) => {
                let value = act.take_value();
                self.store_object_member(&state, key, value, name_anonymous)?;
                state.next += 1;
            }
            ObjectPending::Spread => {
                let source = act.take_value();
                self.copy_data_properties(state.object, &source, &[])?;
                state.next += 1;
            }
        }

        while let Some(member) = state.members.get(state.next).cloned() {
            let key_name = match &member {
                ObjectMember::Property { key, .. } | ObjectMember::Method { key, .. } => Some(key),
                ObjectMember::Spread(_) => None,
            };
            let key = match (known_key.take(), key_name) {
                (Some(key), _) => Some(key),
                (None, Some(PropertyName::Computed(expr))) => {
                    let expr = expr.cheap_clone();
                    state.pending = ObjectPending::Key;
                    act.push(Frame::ObjectLiteral(state));
                    act.push(Frame::Expr(expr));
                    return Ok(FrameResult::Continue);
                }
                (None, Some(name)) => Some(self.static_property_key(name)),
                (None, None) => None,
            };
            match member {
                ObjectMember::Property { key: name, value } => {
                    let Some(key) = key else {
                        return Err(JsError::internal("object property without a key"));
                    };
                    let name_anonymous = matches!(name, PropertyName::Computed(_))
                        && value.is_anonymous_function_definition();
                    state.pending = ObjectPending::Value(key, name_anonymous);
                    act.push(Frame::ObjectLiteral(state));
                    act.push(Frame::Expr(value));
                    return Ok(FrameResult::Continue);
                }
                ObjectMember::Method { kind, function, .. } => {
                    let Some(key) = key else {
                        return Err(JsError::internal("object method without a key"));
                    };
                    self.define_method(state.object, key, kind, &function, true)?;
                    state.next += 1;
                }
                ObjectMember::Spread(expr) => {
                    state.pending = ObjectPending::Spread;
                    act.push(Frame::ObjectLiteral(state));
                    act.push(Frame::Expr(expr));
                    return Ok(FrameResult::Continue);
                }
            }
        }
        act.set_value(JsValue::Object(state.object));
        Ok(FrameResult::Continue)
    }

    /// PropertyDefinitionEvaluation for `key: value`. A literal
    /// `__proto__: value` sets the prototype instead.
    fn store_object_member(
        &mut self,
        state: &ObjectLiteralState,
        key: PropertyKey,
        value: JsValue,
        name_anonymous: bool,
    ) -> JsResult<()> {
        let is_proto_setter = matches!(
            state.members.get(state.next),
            Some(ObjectMember::Property {
                key: PropertyName::Identifier(name) | PropertyName::String(name),
                ..
            }) if name.eq_str("__proto__")
        );
        if is_proto_setter {
            match value {
                JsValue::Object(proto) => self.heap.get_mut(state.object).prototype = Some(proto),
                JsValue::Null => self.heap.get_mut(state.object).prototype = None,
                _ => {}
            }
            return Ok(());
        }
        if name_anonymous && let Some(func) = value.as_object() {
            self.set_function_name(func, &key, None);
        }
        self.create_data_property_or_throw(state.object, key, value)
    }

    /// CopyDataProperties
    pub(crate) fn copy_data_properties(&mut self, target: ObjectId, source: &JsValue, excluded: &[PropertyKey]) -> JsResult<()> {
        if source.is_null_or_undefined() {
            return Ok(());
        }
        let from = self.to_object(source)?;
        for key in self.own_property_keys(from) {
            if excluded.contains(&key) {
                continue;
            }
            if let Some(prop) = self.get_own_property(from, &key)?
                && prop.enumerable()
            {
                let value = self.get(from, &key, JsValue::Object(from))?;
                self.create_data_property_or_throw(target, key, value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn step_template(&mut self, act: &mut Activation, mut state: Box<TemplateState>) -> JsResult<FrameResult> {
        let value = act.take_value();
        let text = self.to_string(&value)?;
        state.out.extend_from_slice(text.as_units());
        state.next += 1;
        if let Some(quasi) = state.template.quasis.get(state.next) {
            state.out.extend_from_slice(quasi.as_units());
        }
        match state.template.expressions.get(state.next) {
            Some(expr) => {
                let expr = expr.cheap_clone();
                act.push(Frame::Template(state));
                act.push(Frame::Expr(expr));
            }
            None => act.set_value(JsValue::String(JsString::from_units(state.out))),
        }
        Ok(FrameResult::Continue)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Classes
    // ═══════════════════════════════════════════════════════════════════════

    /// Start ClassDefinitionEvaluation. The class scope holds the inner
    /// name binding; the running environment is restored however the
    /// definition ends.
    pub(crate) fn push_class_definition(&mut self, act: &mut Activation, class: Rc<ClassNode>) {
        let env = self.lexical_env();
        let class_env = self.envs.new_declarative(env);
        if let Some(id) = &class.id {
            self.envs.create_immutable_binding(class_env, id.cheap_clone(), true);
        }
        act.push(Frame::RestoreEnv(env));
        act.push(Frame::ClassDefinition(Box::new(ClassState {
            class,
            class_env,
            proto: None,
            constructor: None,
            next: 0,
            phase: ClassPhase::Start,
        })));
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
    fn test_optional_chain_short_circuits_whole_chain() {
        assert_eq!(run("var o = null; o?.a.b.c"), JsValue::Undefined);
        assert_eq!(run("var o = {a: {b: 2}}; o?.a.b"), JsValue::Number(2.0));
        assert_eq!(run("var o = {}; o.f?.()"), JsValue::Undefined);
    }

    #[test]
    fn test_typeof_unresolvable_is_undefined() {
        assert_eq!(run("typeof notDeclaredAnywhere"), JsValue::from("undefined"));
    }

    #[test]
    fn test_postfix_update_returns_old_numeric_value() {
        assert_eq!(run("var s = '5'; var r = s++; r + s"), JsValue::Number(11.0));
    }

    #[test]
    fn test_computed_key_names_anonymous_function() {
        assert_eq!(run("var o = {['k' + 1]: function() {}}; o.k1.name"), JsValue::from("k1"));
    }

    #[test]
    fn test_template_literal_joins_parts() {
        assert_eq!(run("var a = 1; `x${a}y${a + 1}z`"), JsValue::from("x1y2z"));
    }

    #[test]
    fn test_logical_assignment_skips_store() {
        assert_eq!(run("var a = 1; a ||= 2; a"), JsValue::Number(1.0));
        assert_eq!(run("var b = null; b ??= 3; b"), JsValue::Number(3.0));
    }
}
