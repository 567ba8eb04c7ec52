//! Iterator, generator and async generator prototypes
//!
//! The prototype methods only translate the call into a completion record;
//! resumption itself lives with the coroutine machinery.

use crate::completion::Completion;
use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::interpreter::promise::{PromiseCapability, ReactionHandler};
use crate::object::{NativeCall, NativeData, ObjectKind, Property};
use crate::value::{CheapClone, JsValue, ObjectId, PropertyKey};

use super::callee_data;

fn define_tag(interp: &mut Interpreter, obj: ObjectId, tag: &str) {
    let key = PropertyKey::Symbol(interp.symbols.to_string_tag.cheap_clone());
    let value = JsValue::String(interp.intern(tag));
    interp
        .heap
        .get_mut(obj)
        .properties
        .insert(key, Property::data(value, false, false, true));
}

/// Non-writable, configurable link such as
/// %GeneratorFunction.prototype%.prototype.
fn define_link(interp: &mut Interpreter, obj: ObjectId, name: &str, target: ObjectId) {
    let key = interp.key(name);
    interp
        .heap
        .get_mut(obj)
        .properties
        .insert(key, Property::data(JsValue::Object(target), false, false, true));
}

/// %IteratorPrototype%[@@iterator] and %AsyncIteratorPrototype%[@@asyncIterator]
pub fn init_iterator_prototypes(interp: &mut Interpreter) {
    let iterator_proto = interp.intrinsics().iterator_prototype;
    let async_iterator_proto = interp.intrinsics().async_iterator_prototype;

    let iterator = interp.symbols.iterator.cheap_clone();
    interp.register_symbol_method(iterator_proto, iterator, "[Symbol.iterator]", return_this, 0);
    let async_iterator = interp.symbols.async_iterator.cheap_clone();
    interp.register_symbol_method(
        async_iterator_proto,
        async_iterator,
        "[Symbol.asyncIterator]",
        return_this,
        0,
    );
}

/// Generator, async generator and async function prototypes and the links
/// between them.
pub fn init_generator_prototypes(interp: &mut Interpreter) {
    let intrinsics = interp.intrinsics().clone();

    let generator = intrinsics.generator_prototype;
    interp.register_method(generator, "next", generator_next, 1);
    interp.register_method(generator, "return", generator_return, 1);
    interp.register_method(generator, "throw", generator_throw, 1);
    define_tag(interp, generator, "Generator");

    let generator_function = intrinsics.generator_function_prototype;
    define_link(interp, generator_function, "prototype", generator);
    define_link(interp, generator, "constructor", generator_function);
    define_tag(interp, generator_function, "GeneratorFunction");

    let async_generator = intrinsics.async_generator_prototype;
    interp.register_method(async_generator, "next", async_generator_next, 1);
    interp.register_method(async_generator, "return", async_generator_return, 1);
    interp.register_method(async_generator, "throw", async_generator_throw, 1);
    define_tag(interp, async_generator, "AsyncGenerator");

    let async_generator_function = intrinsics.async_generator_function_prototype;
    define_link(interp, async_generator_function, "prototype", async_generator);
    define_link(interp, async_generator, "constructor", async_generator_function);
    define_tag(interp, async_generator_function, "AsyncGeneratorFunction");

    define_tag(interp, intrinsics.async_function_prototype, "AsyncFunction");
}

/// %AsyncFromSyncIteratorPrototype%
pub fn init_async_from_sync_iterator_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().async_from_sync_iterator_prototype;
    interp.register_method(proto, "next", async_from_sync_next, 1);
    interp.register_method(proto, "return", async_from_sync_return, 1);
    interp.register_method(proto, "throw", async_from_sync_throw, 1);
}

fn return_this(
    _interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(this)
}

fn arg0(args: &[JsValue]) -> JsValue {
    args.first().cloned().unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════
// Generator.prototype
// ═══════════════════════════════════════════════════════════════════════════

pub fn generator_next(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.generator_resume(&this, Completion::normal(arg0(args)), "Generator.prototype.next")
}

pub fn generator_return(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.generator_resume(&this, Completion::Return(arg0(args)), "Generator.prototype.return")
}

pub fn generator_throw(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.generator_resume(&this, Completion::Throw(arg0(args)), "Generator.prototype.throw")
}

// ═══════════════════════════════════════════════════════════════════════════
// AsyncGenerator.prototype
// ═══════════════════════════════════════════════════════════════════════════

pub fn async_generator_next(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.async_generator_enqueue(&this, Completion::normal(arg0(args)), "AsyncGenerator.prototype.next")
}

pub fn async_generator_return(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.async_generator_enqueue(&this, Completion::Return(arg0(args)), "AsyncGenerator.prototype.return")
}

pub fn async_generator_throw(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.async_generator_enqueue(&this, Completion::Throw(arg0(args)), "AsyncGenerator.prototype.throw")
}

// ═══════════════════════════════════════════════════════════════════════════
// %AsyncFromSyncIteratorPrototype%
// ═══════════════════════════════════════════════════════════════════════════

/// Run `step` against the wrapped sync iterator; a catchable failure
/// rejects the returned promise instead of propagating.
fn with_sync_record(
    interp: &mut Interpreter,
    this: &JsValue,
    step: fn(&mut Interpreter, &crate::interpreter::IteratorRecord, JsValue, &PromiseCapability) -> JsResult<()>,
    value: JsValue,
) -> JsResult<JsValue> {
    let capability = interp.new_intrinsic_capability();
    let promise = JsValue::Object(capability.promise);
    let record = match this.as_object().map(|id| &interp.heap.get(id).kind) {
        Some(ObjectKind::AsyncFromSyncIterator(record)) => (**record).clone(),
        _ => return Err(JsError::internal("async-from-sync iterator without a sync record")),
    };
    if let Err(err) = step(interp, &record, value, &capability) {
        interp.reject_with(&capability, err)?;
    }
    Ok(promise)
}

/// AsyncFromSyncIteratorContinuation: await the step's value and settle
/// the capability with a fresh iterator result.
fn continuation(interp: &mut Interpreter, result: &JsValue, capability: &PromiseCapability) -> JsResult<()> {
    let done = interp.iterator_complete(result)?;
    let value = interp.iterator_value(result)?;
    let promise_ctor = interp.intrinsics().promise_constructor;
    let wrapper = interp.promise_resolve(promise_ctor, value)?;
    let on_fulfilled = interp.create_native_with_data("", async_from_sync_unwrap, 1, NativeData::AsyncFromSyncUnwrap { done });
    interp.perform_promise_then(
        wrapper,
        ReactionHandler::Callable(JsValue::Object(on_fulfilled)),
        ReactionHandler::Empty,
        Some(capability.clone()),
    )
}

fn ensure_object(result: &JsValue) -> JsResult<()> {
    if result.is_object() {
        Ok(())
    } else {
        Err(JsError::type_error("Iterator result is not an object"))
    }
}

fn async_from_sync_unwrap(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let NativeData::AsyncFromSyncUnwrap { done } = callee_data(interp, call.callee) else {
        return Err(JsError::internal("async-from-sync unwrap without state"));
    };
    Ok(interp.create_iter_result(arg0(args), done))
}

pub fn async_from_sync_next(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let value = args.first().cloned();
    with_sync_record(
        interp,
        &this,
        |interp, record, value, capability| {
            let value = if value.is_undefined() { None } else { Some(value) };
            let result = interp.iterator_next(record, value)?;
            continuation(interp, &result, capability)
        },
        value.unwrap_or_default(),
    )
}

pub fn async_from_sync_return(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    with_sync_record(
        interp,
        &this,
        |interp, record, value, capability| {
            let key = interp.key("return");
            let Some(method) = interp.get_method(&record.iterator, &key)? else {
                let result = interp.create_iter_result(value, true);
                interp.call(&capability.resolve, JsValue::Undefined, &[result])?;
                return Ok(());
            };
            let result = interp.call(&method, record.iterator.cheap_clone(), &[value])?;
            ensure_object(&result)?;
            continuation(interp, &result, capability)
        },
        arg0(args),
    )
}

pub fn async_from_sync_throw(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    with_sync_record(
        interp,
        &this,
        |interp, record, value, capability| {
            let key = interp.key("throw");
            let Some(method) = interp.get_method(&record.iterator, &key)? else {
                // No `throw`: close the iterator, then report the protocol violation
                interp.iterator_close(record, Completion::empty())?;
                return Err(JsError::type_error("The iterator does not provide a 'throw' method"));
            };
            let result = interp.call(&method, record.iterator.cheap_clone(), &[value])?;
            ensure_object(&result)?;
            continuation(interp, &result, capability)
        },
        arg0(args),
    )
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
    fn test_generator_prototype_chain() {
        let source = "
            function* g() {}
            var GeneratorFunctionPrototype = Object.getPrototypeOf(g);
            Object.getPrototypeOf(g.prototype) === GeneratorFunctionPrototype.prototype &&
            g()[Symbol.iterator]() !== undefined &&
            Object.prototype.toString.call(g()) === '[object Generator]'";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_return_before_start_completes() {
        let source = "
            function* g() { yield 1; }
            var it = g();
            var r = it.return(5);
            r.value + ':' + r.done + ':' + it.next().done";
        assert_eq!(run(source), JsValue::from("5:true:true"));
    }

    #[test]
    fn test_throw_is_catchable_inside_generator() {
        let source = "
            function* g() { try { yield 1; } catch (e) { yield 'caught ' + e; } }
            var it = g();
            it.next();
            it.throw('boom').value";
        assert_eq!(run(source), JsValue::from("caught boom"));
    }

    #[test]
    fn test_for_await_over_sync_iterable() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        interp
            .run_script(
                "var seen = [];
                 (async function () {
                     for await (const v of [Promise.resolve(1), 2]) seen.push(v);
                 })();",
            )
            .unwrap();
        interp.run_jobs().unwrap();
        assert_eq!(interp.run_script("seen.join()").unwrap(), JsValue::from("1,2"));
    }
}
