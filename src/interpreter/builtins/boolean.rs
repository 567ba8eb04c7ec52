//! Boolean built-in constructor and prototype methods

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{JsObject, NativeCall, ObjectKind};
use crate::value::{JsValue, ObjectId};

/// Initialize Boolean.prototype with toString, valueOf
pub fn init_boolean_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().boolean_prototype;

    interp.register_method(proto, "toString", boolean_to_string, 0);
    interp.register_method(proto, "valueOf", boolean_value_of, 0);
}

/// Create the Boolean constructor
pub fn create_boolean_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().boolean_prototype;
    interp.create_native_constructor("Boolean", boolean_constructor_fn, 1, proto)
}

/// Boolean(value) converts to a primitive; `new Boolean(value)` wraps it.
pub fn boolean_constructor_fn(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let value = args.first().is_some_and(JsValue::to_boolean);
    let Some(new_target) = call.new_target else {
        return Ok(JsValue::Boolean(value));
    };
    let proto = interp.get_prototype_from_constructor(new_target, |i| i.boolean_prototype)?;
    let wrapper = interp.alloc(JsObject::new(
        Some(proto),
        ObjectKind::Primitive(JsValue::Boolean(value)),
    ));
    Ok(JsValue::Object(wrapper))
}

/// thisBooleanValue
fn this_boolean_value(interp: &Interpreter, this: &JsValue) -> JsResult<bool> {
    match this {
        JsValue::Boolean(b) => Ok(*b),
        JsValue::Object(id) => match &interp.heap.get(*id).kind {
            ObjectKind::Primitive(JsValue::Boolean(b)) => Ok(*b),
            _ => Err(JsError::type_error("Boolean.prototype method called on incompatible receiver")),
        },
        _ => Err(JsError::type_error("Boolean.prototype method called on incompatible receiver")),
    }
}

/// Boolean.prototype.toString()
pub fn boolean_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let value = this_boolean_value(interp, &this)?;
    Ok(JsValue::from(if value { "true" } else { "false" }))
}

/// Boolean.prototype.valueOf()
pub fn boolean_value_of(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(this_boolean_value(interp, &this)?))
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
    fn test_boolean_conversion() {
        assert_eq!(run("Boolean('') + ':' + Boolean('x') + ':' + Boolean()"), JsValue::from("false:true:false"));
    }

    #[test]
    fn test_wrapper_is_truthy_object() {
        let source = "var b = new Boolean(false); (b ? 'truthy' : 'falsy') + ':' + b.valueOf() + ':' + typeof b";
        assert_eq!(run(source), JsValue::from("truthy:false:object"));
    }

    #[test]
    fn test_value_of_rejects_other_receivers() {
        let source = "try { Boolean.prototype.valueOf.call(1); 'no' } catch (e) { e instanceof TypeError }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }
}
