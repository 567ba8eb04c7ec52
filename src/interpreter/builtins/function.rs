//! Function.prototype built-in methods (call, apply, bind) and Function constructor

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{BoundFunction, JsObject, NativeCall, ObjectKind, Property};
use crate::value::{CheapClone, JsString, JsValue, ObjectId};

/// Initialize Function.prototype with call, apply, bind and toString
pub fn init_function_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().function_prototype;

    interp.register_method(proto, "call", function_call, 1);
    interp.register_method(proto, "apply", function_apply, 2);
    interp.register_method(proto, "bind", function_bind, 1);
    interp.register_method(proto, "toString", function_to_string, 0);

    let has_instance = interp.symbols.has_instance.cheap_clone();
    let func = interp.create_native_function("[Symbol.hasInstance]", function_has_instance, 1);
    interp.define_frozen(proto, has_instance.into(), JsValue::Object(func));
}

/// Create the global Function constructor
pub fn create_function_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().function_prototype;
    interp.create_native_constructor("Function", function_constructor_fn, 1, proto)
}

/// The Function constructor: new Function([p1[, p2[, ...pN]],] body)
///
/// The last argument is the body, the preceding ones are parameter lists.
/// The function is compiled as indirect eval code, so it closes over the
/// global environment only.
fn function_constructor_fn(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let mut params = Vec::new();
    let mut body = String::new();
    if let Some((last, rest)) = args.split_last() {
        for param in rest {
            params.push(interp.to_string(param)?.to_rust_string());
        }
        body = interp.to_string(last)?.to_rust_string();
    }
    let source = format!("(function anonymous({}\n) {{\n{body}\n}})", params.join(","));
    let text = JsValue::String(interp.intern(&source));
    let func = interp.perform_eval(text, false, false)?;
    if !interp.is_callable(&func) {
        return Err(JsError::syntax_error("Invalid function body", 0, 0));
    }
    Ok(func)
}

/// Function.prototype.call(thisArg, ...args)
pub fn function_call(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let this_arg = args.first().cloned().unwrap_or_default();
    let rest = args.get(1..).unwrap_or_default();
    interp.call(&this, this_arg, rest)
}

/// Function.prototype.apply(thisArg, argsArray)
pub fn function_apply(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    if !interp.is_callable(&this) {
        return Err(JsError::type_error("Function.prototype.apply was called on a non-function"));
    }
    let this_arg = args.first().cloned().unwrap_or_default();
    let list = match args.get(1) {
        None | Some(JsValue::Undefined) | Some(JsValue::Null) => Vec::new(),
        Some(array_like) => interp.list_from_array_like(array_like)?,
    };
    interp.call(&this, this_arg, &list)
}

/// Function.prototype.bind(thisArg, ...args)
pub fn function_bind(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let JsValue::Object(target) = this else {
        return Err(JsError::type_error("Bind must be called on a function"));
    };
    if !interp.heap.get(target).is_callable() {
        return Err(JsError::type_error("Bind must be called on a function"));
    }
    let bound_this = args.first().cloned().unwrap_or_default();
    let bound_args = args.get(1..).unwrap_or_default().to_vec();
    let arg_count = bound_args.len() as f64;

    let proto = interp.heap.get(target).prototype;
    let bound = interp.alloc(JsObject::new(
        proto,
        ObjectKind::Bound(Box::new(BoundFunction {
            target,
            this: bound_this,
            args: bound_args,
        })),
    ));

    let length_key = interp.key("length");
    let mut length = 0.0;
    if interp.has_own_property(target, &length_key)? {
        let target_len = interp.get(target, &length_key, JsValue::Object(target))?;
        if let JsValue::Number(n) = target_len {
            length = if n == f64::INFINITY {
                n
            } else if n == f64::NEG_INFINITY {
                0.0
            } else {
                (interp.to_integer_or_infinity(&target_len)? - arg_count).max(0.0)
            };
        }
    }
    let name = match interp.get_named(&JsValue::Object(target), "name")? {
        JsValue::String(name) => name,
        _ => JsString::empty(),
    };
    let name = JsString::from("bound ").concat(&name);

    let name_key = interp.key("name");
    interp.heap.get_mut(bound).properties.insert(
        length_key,
        Property::data(JsValue::Number(length), false, false, true),
    );
    interp.heap.get_mut(bound).properties.insert(
        name_key,
        Property::data(JsValue::String(name), false, false, true),
    );
    Ok(JsValue::Object(bound))
}

/// Function.prototype.toString: source text is not retained, so every
/// function renders with a placeholder body.
pub fn function_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let Some(id) = this.as_object().filter(|id| interp.heap.get(*id).is_callable()) else {
        return Err(JsError::type_error("Function.prototype.toString requires that 'this' be a Function"));
    };
    let name_key = interp.key("name");
    let name = match interp.lookup_data(id, &name_key) {
        Some(JsValue::String(name)) => name.to_rust_string(),
        _ => String::new(),
    };
    let text = match &interp.heap.get(id).kind {
        ObjectKind::Function(data) if data.node.is_arrow() => "() => { [code] }".to_string(),
        ObjectKind::Function(_) => format!("function {name}() {{ [code] }}"),
        _ => format!("function {name}() {{ [native code] }}"),
    };
    Ok(JsValue::from(text))
}

/// Function.prototype[@@hasInstance]
pub fn function_has_instance(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let value = args.first().cloned().unwrap_or_default();
    Ok(JsValue::Boolean(interp.ordinary_has_instance(&this, &value)?))
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
    fn test_call_and_apply_pass_this() {
        let source = "function f(a, b) { return this.x + a + b; } f.call({x: 1}, 2, 3) + f.apply({x: 10}, [20, 30])";
        assert_eq!(run(source), JsValue::Number(66.0));
    }

    #[test]
    fn test_bind_prepends_arguments() {
        let source = "function add(a, b, c) { return a + b + c; } var g = add.bind(null, 1, 2); g(3) + ':' + g.length + ':' + g.name";
        assert_eq!(run(source), JsValue::from("6:1:bound add"));
    }

    #[test]
    fn test_bound_constructor_ignores_bound_this() {
        let source = "function P(x) { this.x = x; } var B = P.bind({ignored: true}, 7); var p = new B(); p.x === 7 && p instanceof P";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_function_constructor_uses_global_scope() {
        let source = "var k = 2; function outer() { var k = 100; return new Function('a', 'b', 'return a * b * k')(3, 4); } outer()";
        assert_eq!(run(source), JsValue::Number(24.0));
    }
}
