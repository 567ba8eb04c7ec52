//! Built-in objects of a realm
//!
//! `create_realm` allocates the intrinsic prototypes first, registers the
//! realm so native functions can be created against it, and then fills in
//! constructors, methods and the global object's properties.

pub mod array;
pub mod boolean;
pub mod error;
pub mod function;
pub mod generator;
pub mod global;
pub mod json;
pub mod number;
pub mod object;
pub mod promise;
pub mod string;
pub mod symbol;

pub use array::*;
pub use boolean::*;
pub use error::*;
pub use function::*;
pub use generator::*;
pub use global::*;
pub use json::*;
pub use number::*;
pub use object::*;
pub use promise::*;
pub use string::*;
pub use symbol::*;

use crate::environment::EnvId;
use crate::error::ErrorKind;
use crate::interpreter::Interpreter;
use crate::object::{JsObject, NativeCall, NativeData, NativeFunction, ObjectKind};
use crate::realm::{Intrinsics, Realm, RealmId};
use crate::value::{JsString, JsValue, ObjectId};

/// Function.prototype is itself callable and returns undefined.
fn function_prototype_call(
    _interp: &mut Interpreter,
    _this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> crate::error::JsResult<JsValue> {
    Ok(JsValue::Undefined)
}

/// The internal slots of the native function being called.
pub(crate) fn callee_data(interp: &Interpreter, callee: ObjectId) -> NativeData {
    match &interp.heap.get(callee).kind {
        ObjectKind::Native(native) => native.data.clone(),
        _ => NativeData::None,
    }
}

fn plain(interp: &mut Interpreter, proto: ObjectId) -> ObjectId {
    interp.alloc(JsObject::ordinary(Some(proto)))
}

fn wrapper(interp: &mut Interpreter, proto: ObjectId, value: JsValue) -> ObjectId {
    interp.alloc(JsObject::new(Some(proto), ObjectKind::Primitive(value)))
}

/// Build the intrinsics of a new realm around `global_object` and
/// `global_env`, and install the globals.
pub fn create_realm(interp: &mut Interpreter, global_object: ObjectId, global_env: EnvId) -> RealmId {
    let realm = RealmId(interp.realms.len() as u32);

    let object_prototype = interp.alloc(JsObject::ordinary(None));
    interp.heap.get_mut(global_object).prototype = Some(object_prototype);
    let function_prototype = interp.alloc(JsObject::new(
        Some(object_prototype),
        ObjectKind::Native(Box::new(NativeFunction {
            func: function_prototype_call,
            data: NativeData::None,
            realm,
            constructor: false,
        })),
    ));
    interp.set_function_name_and_length(function_prototype, JsString::empty(), 0);

    let array_prototype = interp.alloc(JsObject::new(
        Some(object_prototype),
        ObjectKind::Array { length: 0 },
    ));
    let iterator_prototype = plain(interp, object_prototype);
    let array_iterator_prototype = plain(interp, iterator_prototype);
    let async_iterator_prototype = plain(interp, object_prototype);
    let async_from_sync_iterator_prototype = plain(interp, async_iterator_prototype);
    let generator_prototype = plain(interp, iterator_prototype);
    let generator_function_prototype = plain(interp, function_prototype);
    let async_generator_prototype = plain(interp, async_iterator_prototype);
    let async_generator_function_prototype = plain(interp, function_prototype);
    let async_function_prototype = plain(interp, function_prototype);
    let promise_prototype = plain(interp, object_prototype);
    let symbol_prototype = plain(interp, object_prototype);
    let bigint_prototype = plain(interp, object_prototype);
    let empty = JsValue::String(JsString::empty());
    let string_prototype = wrapper(interp, object_prototype, empty);
    let number_prototype = wrapper(interp, object_prototype, JsValue::Number(0.0));
    let boolean_prototype = wrapper(interp, object_prototype, JsValue::Boolean(false));
    let error_prototype = plain(interp, object_prototype);
    let type_error_prototype = plain(interp, error_prototype);
    let reference_error_prototype = plain(interp, error_prototype);
    let range_error_prototype = plain(interp, error_prototype);
    let syntax_error_prototype = plain(interp, error_prototype);
    let eval_error_prototype = plain(interp, error_prototype);

    // `eval`, `Array.prototype.values` and `Promise` are created once the
    // realm can host native functions; until then they point at
    // Object.prototype.
    let intrinsics = Intrinsics {
        object_prototype,
        function_prototype,
        array_prototype,
        array_prototype_values: object_prototype,
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
        promise_constructor: object_prototype,
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
        eval: object_prototype,
    };
    interp.realms.push(Realm {
        global_object,
        global_env,
        intrinsics,
    });

    init_object_prototype(interp);
    init_function_prototype(interp);
    init_array_prototype(interp);
    init_array_iterator_prototype(interp);
    init_iterator_prototypes(interp);
    init_generator_prototypes(interp);
    init_async_from_sync_iterator_prototype(interp);
    init_symbol_prototype(interp);
    init_string_prototype(interp);
    init_number_prototype(interp);
    init_bigint_prototype(interp);
    init_boolean_prototype(interp);
    init_promise_prototype(interp);

    let object_ctor = create_object_constructor(interp);
    let function_ctor = create_function_constructor(interp);
    let array_ctor = create_array_constructor(interp);
    let symbol_ctor = create_symbol_constructor(interp);
    let string_ctor = create_string_constructor(interp);
    let number_ctor = create_number_constructor(interp);
    let boolean_ctor = create_boolean_constructor(interp);
    let promise_ctor = create_promise_constructor(interp);
    let json = create_json_object(interp);

    let values_key = interp.key("values");
    let values = interp
        .lookup_data(array_prototype, &values_key)
        .and_then(|v| v.as_object())
        .unwrap_or(object_prototype);
    let eval = create_eval_function(interp);
    let intrinsics = &mut interp.realms[realm.index()].intrinsics;
    intrinsics.array_prototype_values = values;
    intrinsics.promise_constructor = promise_ctor;
    intrinsics.eval = eval;

    let globals = [
        ("Object", object_ctor),
        ("Function", function_ctor),
        ("Array", array_ctor),
        ("Symbol", symbol_ctor),
        ("String", string_ctor),
        ("Number", number_ctor),
        ("Boolean", boolean_ctor),
        ("Promise", promise_ctor),
        ("JSON", json),
        ("eval", eval),
    ];
    for (name, value) in globals {
        let key = interp.key(name);
        interp.define_hidden(global_object, key, JsValue::Object(value));
    }
    for kind in ErrorKind::ALL {
        let ctor = create_error_constructor(interp, kind);
        let key = interp.key(kind.name());
        interp.define_hidden(global_object, key, JsValue::Object(ctor));
    }
    init_global_object(interp, global_object);
    realm
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    #[test]
    fn test_prototype_chains_of_intrinsics() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let source = "
            Object.getPrototypeOf(Array.prototype) === Object.prototype &&
            Object.getPrototypeOf(Function.prototype) === Object.prototype &&
            Object.getPrototypeOf(TypeError.prototype) === Error.prototype &&
            Object.getPrototypeOf(Object.prototype) === null";
        assert_eq!(interp.run_script(source).unwrap(), JsValue::Boolean(true));
    }

    #[test]
    fn test_function_prototype_is_callable() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        assert_eq!(
            interp.run_script("typeof Function.prototype + Function.prototype()").unwrap(),
            JsValue::from("functionundefined")
        );
    }
}
