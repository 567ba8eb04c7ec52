//! Error constructor built-in methods

use crate::error::{ErrorKind, JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{NativeCall, NativeFn, ObjectKind, Property};
use crate::realm::Intrinsics;
use crate::value::{JsString, JsValue, ObjectId};

/// Create the constructor for one native error kind and fill in its
/// prototype's `name`, `message` and (for Error itself) `toString`.
pub fn create_error_constructor(interp: &mut Interpreter, kind: ErrorKind) -> ObjectId {
    let proto = interp.intrinsics().error_prototype_for(kind);
    let func: NativeFn = match kind {
        ErrorKind::Error => error_constructor,
        ErrorKind::TypeError => type_error_constructor,
        ErrorKind::ReferenceError => reference_error_constructor,
        ErrorKind::RangeError => range_error_constructor,
        ErrorKind::SyntaxError => syntax_error_constructor,
        ErrorKind::EvalError => eval_error_constructor,
    };
    let constructor = interp.create_native_constructor(kind.name(), func, 1, proto);

    let name_key = interp.key("name");
    let message_key = interp.key("message");
    let name = JsValue::String(interp.intern(kind.name()));
    interp.define_hidden(proto, name_key, name);
    interp.define_hidden(proto, message_key, JsValue::String(JsString::empty()));

    if kind == ErrorKind::Error {
        interp.register_method(proto, "toString", error_to_string, 0);
    } else {
        // The native error constructors inherit from %Error%
        let error_key = interp.key("Error");
        let global = interp.global_object();
        if let Some(JsValue::Object(error_ctor)) = interp.lookup_data(global, &error_key) {
            interp.heap.get_mut(constructor).prototype = Some(error_ctor);
        }
    }
    constructor
}

/// Error.prototype.toString()
/// Returns "name: message", or whichever of the two is non-empty
pub fn error_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    if !this.is_object() {
        return Err(JsError::type_error("Error.prototype.toString called on non-object"));
    }
    let name = match interp.get_named(&this, "name")? {
        JsValue::Undefined => JsString::from("Error"),
        value => interp.to_string(&value)?,
    };
    let message = match interp.get_named(&this, "message")? {
        JsValue::Undefined => JsString::empty(),
        value => interp.to_string(&value)?,
    };
    let text = if name.is_empty() {
        message
    } else if message.is_empty() {
        name
    } else {
        name.concat(&JsString::from(": ")).concat(&message)
    };
    Ok(JsValue::String(text))
}

/// Shared body of the error constructors: OrdinaryCreateFromConstructor
/// with the kind's prototype, then `message` and `cause` when present.
fn construct_error(
    interp: &mut Interpreter,
    args: &[JsValue],
    call: NativeCall,
    kind: ErrorKind,
    fallback: fn(&Intrinsics) -> ObjectId,
) -> JsResult<JsValue> {
    let new_target = call.new_target.unwrap_or(call.callee);
    let error = interp.ordinary_create_from_constructor(new_target, fallback)?;
    interp.heap.get_mut(error).kind = ObjectKind::Error;

    let message = args.first().cloned().unwrap_or_default();
    let mut text = JsString::empty();
    if !message.is_undefined() {
        text = interp.to_string(&message)?;
        let message_key = interp.key("message");
        interp.define_hidden(error, message_key, JsValue::String(text.clone()));
    }
    if let Some(options @ JsValue::Object(options_id)) = args.get(1) {
        let cause_key = interp.key("cause");
        if interp.has_property(*options_id, &cause_key)? {
            let cause = interp.get_v(options, &cause_key)?;
            interp.define_hidden(error, cause_key, cause);
        }
    }

    let stack = if text.is_empty() {
        JsString::from(kind.name())
    } else {
        JsString::from(format!("{}: {text}", kind.name()))
    };
    let stack_key = interp.key("stack");
    interp
        .heap
        .get_mut(error)
        .properties
        .insert(stack_key, Property::hidden(JsValue::String(stack)));
    Ok(JsValue::Object(error))
}

/// Error constructor
pub fn error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    construct_error(interp, args, call, ErrorKind::Error, |i| i.error_prototype)
}

/// TypeError constructor
pub fn type_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    construct_error(interp, args, call, ErrorKind::TypeError, |i| i.type_error_prototype)
}

/// ReferenceError constructor
pub fn reference_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    construct_error(interp, args, call, ErrorKind::ReferenceError, |i| {
        i.reference_error_prototype
    })
}

/// RangeError constructor
pub fn range_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    construct_error(interp, args, call, ErrorKind::RangeError, |i| i.range_error_prototype)
}

/// SyntaxError constructor
pub fn syntax_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    construct_error(interp, args, call, ErrorKind::SyntaxError, |i| i.syntax_error_prototype)
}

/// EvalError constructor
pub fn eval_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    construct_error(interp, args, call, ErrorKind::EvalError, |i| i.eval_error_prototype)
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
    fn test_error_to_string() {
        assert_eq!(run("String(new RangeError('too big'))"), JsValue::from("RangeError: too big"));
        assert_eq!(run("new Error().toString()"), JsValue::from("Error"));
    }

    #[test]
    fn test_call_without_new_creates_error() {
        let source = "var e = TypeError('x'); e instanceof TypeError && e instanceof Error && e.message === 'x'";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_engine_errors_are_instances_of_constructors() {
        let source = "try { null.x } catch (e) { e instanceof TypeError && e.constructor === TypeError }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_subclassed_error_keeps_prototype() {
        let source = "class MyError extends Error { constructor(m) { super(m); this.name = 'MyError'; } } String(new MyError('bad'))";
        assert_eq!(run(source), JsValue::from("MyError: bad"));
    }

    #[test]
    fn test_cause_option() {
        assert_eq!(run("new Error('outer', {cause: 42}).cause"), JsValue::Number(42.0));
    }
}
