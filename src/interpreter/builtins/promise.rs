//! Promise constructor and Promise.prototype
//!
//! Settlement, reactions and the job queue live in `interpreter::promise`
//! and `interpreter::jobs`; these are the guest-visible entry points.

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::interpreter::promise::ReactionHandler;
use crate::object::{NativeCall, NativeData, Property};
use crate::value::{CheapClone, JsValue, ObjectId, PropertyKey};

use super::callee_data;

/// Create the Promise constructor with resolve and reject
pub fn create_promise_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().promise_prototype;
    let constructor = interp.create_native_constructor("Promise", promise_constructor, 1, proto);

    interp.register_method(constructor, "resolve", promise_static_resolve, 1);
    interp.register_method(constructor, "reject", promise_static_reject, 1);

    constructor
}

/// Initialize Promise.prototype with then, catch and finally
pub fn init_promise_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().promise_prototype;

    interp.register_method(proto, "then", promise_then, 2);
    interp.register_method(proto, "catch", promise_catch, 1);
    interp.register_method(proto, "finally", promise_finally, 1);

    let tag = PropertyKey::Symbol(interp.symbols.to_string_tag.cheap_clone());
    let value = JsValue::String(interp.intern("Promise"));
    interp
        .heap
        .get_mut(proto)
        .properties
        .insert(tag, Property::data(value, false, false, true));
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

/// new Promise(executor)
pub fn promise_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let Some(new_target) = call.new_target else {
        return Err(JsError::type_error("Promise constructor cannot be invoked without 'new'"));
    };
    let executor = arg(args, 0);
    if !interp.is_callable(&executor) {
        let shown = interp.describe_value(&executor);
        return Err(JsError::type_error(format!("Promise resolver {shown} is not a function")));
    }
    let proto = interp.get_prototype_from_constructor(new_target, |i| i.promise_prototype)?;
    let promise = interp.create_promise(proto);
    let (resolve, reject) = interp.create_resolving_functions(promise);
    match interp.call(&executor, JsValue::Undefined, &[resolve, reject.cheap_clone()]) {
        Ok(_) => {}
        Err(err) if err.is_catchable() => {
            let reason = interp.error_to_value(err);
            interp.call(&reject, JsValue::Undefined, &[reason])?;
        }
        Err(err) => return Err(err),
    }
    Ok(JsValue::Object(promise))
}

/// Promise.resolve(x)
pub fn promise_static_resolve(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let JsValue::Object(ctor) = this else {
        return Err(JsError::type_error("Promise.resolve called on non-object"));
    };
    Ok(JsValue::Object(interp.promise_resolve(ctor, arg(args, 0))?))
}

/// Promise.reject(r)
pub fn promise_static_reject(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let capability = interp.new_promise_capability(&this)?;
    interp.call(&capability.reject, JsValue::Undefined, &[arg(args, 0)])?;
    Ok(JsValue::Object(capability.promise))
}

/// The constructor used for derived promises: `this.constructor`, or
/// %Promise% when it is undefined.
fn derived_constructor(interp: &mut Interpreter, promise: &JsValue) -> JsResult<JsValue> {
    let ctor = interp.get_named(promise, "constructor")?;
    match ctor {
        JsValue::Undefined => Ok(JsValue::Object(interp.intrinsics().promise_constructor)),
        JsValue::Object(_) => Ok(ctor),
        _ => Err(JsError::type_error("The promise constructor is not an object")),
    }
}

/// Promise.prototype.then(onFulfilled, onRejected)
pub fn promise_then(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let Some(promise) = this.as_object().filter(|id| interp.heap.get(*id).promise().is_some()) else {
        return Err(JsError::type_error("Promise.prototype.then called on incompatible receiver"));
    };
    let ctor = derived_constructor(interp, &this)?;
    let capability = interp.new_promise_capability(&ctor)?;
    let handler = |interp: &Interpreter, value: JsValue| {
        if interp.is_callable(&value) {
            ReactionHandler::Callable(value)
        } else {
            ReactionHandler::Empty
        }
    };
    let on_fulfilled = handler(interp, arg(args, 0));
    let on_rejected = handler(interp, arg(args, 1));
    let result = JsValue::Object(capability.promise);
    interp.perform_promise_then(promise, on_fulfilled, on_rejected, Some(capability))?;
    Ok(result)
}

/// Promise.prototype.catch(onRejected)
pub fn promise_catch(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.invoke(&this, "then", &[JsValue::Undefined, arg(args, 0)])
}

/// Promise.prototype.finally(onFinally)
pub fn promise_finally(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    if !this.is_object() {
        return Err(JsError::type_error("Promise.prototype.finally called on non-object"));
    }
    let on_finally = arg(args, 0);
    if !interp.is_callable(&on_finally) {
        return interp.invoke(&this, "then", &[on_finally.cheap_clone(), on_finally]);
    }
    let then_finally = interp.create_native_with_data(
        "",
        then_finally,
        1,
        NativeData::Finally {
            on_finally: on_finally.cheap_clone(),
        },
    );
    let catch_finally = interp.create_native_with_data("", catch_finally, 1, NativeData::Finally { on_finally });
    interp.invoke(
        &this,
        "then",
        &[JsValue::Object(then_finally), JsValue::Object(catch_finally)],
    )
}

/// Call onFinally, wait for its result, then continue with `continuation`.
fn run_finally(interp: &mut Interpreter, callee: ObjectId, continuation: NativeData) -> JsResult<JsValue> {
    let NativeData::Finally { on_finally } = callee_data(interp, callee) else {
        return Err(JsError::internal("finally handler without callback"));
    };
    let result = interp.call(&on_finally, JsValue::Undefined, &[])?;
    let promise_ctor = interp.intrinsics().promise_constructor;
    let promise = interp.promise_resolve(promise_ctor, result)?;
    let thunk = interp.create_native_with_data("", finally_continuation, 0, continuation);
    interp.invoke(&JsValue::Object(promise), "then", &[JsValue::Object(thunk)])
}

fn then_finally(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    run_finally(interp, call.callee, NativeData::ValueThunk(arg(args, 0)))
}

fn catch_finally(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    run_finally(interp, call.callee, NativeData::Thrower(arg(args, 0)))
}

/// Return the original value, or rethrow the original reason.
fn finally_continuation(
    interp: &mut Interpreter,
    _this: JsValue,
    _args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    match callee_data(interp, call.callee) {
        NativeData::ValueThunk(value) => Ok(value),
        NativeData::Thrower(reason) => Err(JsError::thrown(reason)),
        _ => Err(JsError::internal("finally continuation without state")),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    fn run_async(source: &str, result: &str) -> JsValue {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        interp.run_script(source).unwrap();
        interp.run_jobs().unwrap();
        interp.run_script(result).unwrap()
    }

    #[test]
    fn test_then_runs_after_synchronous_code() {
        let source = "var log = []; Promise.resolve(1).then(v => log.push('then ' + v)); log.push('sync');";
        assert_eq!(run_async(source, "log.join()"), JsValue::from("sync,then 1"));
    }

    #[test]
    fn test_executor_throw_rejects() {
        let source = "var reason; new Promise(() => { throw new Error('x'); }).catch(e => { reason = e.message; });";
        assert_eq!(run_async(source, "reason"), JsValue::from("x"));
    }

    #[test]
    fn test_finally_passes_value_through() {
        let source = "var out = []; Promise.resolve(7).finally(() => out.push('f')).then(v => out.push(v));";
        assert_eq!(run_async(source, "out.join()"), JsValue::from("f,7"));
    }

    #[test]
    fn test_finally_keeps_rejection() {
        let source = "var out; Promise.reject('r').finally(() => 1).catch(e => { out = e; });";
        assert_eq!(run_async(source, "out"), JsValue::from("r"));
    }

    #[test]
    fn test_resolve_with_thenable_adopts_state() {
        let source = "var out; var thenable = { then(ok) { ok(42); } }; Promise.resolve(thenable).then(v => { out = v; });";
        assert_eq!(run_async(source, "out"), JsValue::Number(42.0));
    }

    #[test]
    fn test_promise_requires_new() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let result = interp.run_script("try { Promise(() => {}); 'no' } catch (e) { e instanceof TypeError }");
        assert_eq!(result.unwrap(), JsValue::Boolean(true));
    }
}
