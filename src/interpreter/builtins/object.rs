//! Object built-in methods

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{NativeCall, ObjectKind, Property, PropertyDescriptor};
use crate::value::{CheapClone, JsValue, ObjectId, PropertyKey};

/// Initialize Object.prototype with hasOwnProperty, isPrototypeOf, toString and valueOf.
pub fn init_object_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().object_prototype;

    interp.register_method(proto, "hasOwnProperty", object_has_own_property, 1);
    interp.register_method(proto, "isPrototypeOf", object_is_prototype_of, 1);
    interp.register_method(proto, "toString", object_to_string, 0);
    interp.register_method(proto, "valueOf", object_value_of, 0);
}

/// Create the Object constructor with its static methods.
pub fn create_object_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().object_prototype;
    let constructor = interp.create_native_constructor("Object", object_constructor, 1, proto);

    interp.register_method(constructor, "keys", object_keys, 1);
    interp.register_method(constructor, "create", object_create, 2);
    interp.register_method(constructor, "getPrototypeOf", object_get_prototype_of, 1);
    interp.register_method(constructor, "setPrototypeOf", object_set_prototype_of, 2);
    interp.register_method(constructor, "defineProperty", object_define_property, 3);
    interp.register_method(
        constructor,
        "getOwnPropertyDescriptor",
        object_get_own_property_descriptor,
        2,
    );
    interp.register_method(constructor, "freeze", object_freeze, 1);
    interp.register_method(constructor, "isFrozen", object_is_frozen, 1);
    interp.register_method(constructor, "is", object_is, 2);

    constructor
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

/// ToPropertyDescriptor
pub(crate) fn to_property_descriptor(interp: &mut Interpreter, value: &JsValue) -> JsResult<PropertyDescriptor> {
    let JsValue::Object(obj) = value else {
        return Err(JsError::type_error("Property description must be an object"));
    };
    let obj = *obj;
    let mut desc = PropertyDescriptor::default();

    let field = |interp: &mut Interpreter, name: &str| -> JsResult<Option<JsValue>> {
        let key = interp.key(name);
        if interp.has_property(obj, &key)? {
            Ok(Some(interp.get(obj, &key, JsValue::Object(obj))?))
        } else {
            Ok(None)
        }
    };
    desc.enumerable = field(interp, "enumerable")?.map(|v| v.to_boolean());
    desc.configurable = field(interp, "configurable")?.map(|v| v.to_boolean());
    desc.value = field(interp, "value")?;
    desc.writable = field(interp, "writable")?.map(|v| v.to_boolean());
    desc.get = field(interp, "get")?;
    desc.set = field(interp, "set")?;

    for accessor in [&desc.get, &desc.set].into_iter().flatten() {
        if !accessor.is_undefined() && !interp.is_callable(accessor) {
            return Err(JsError::type_error("Getter and setter must be functions"));
        }
    }
    if desc.is_accessor() && desc.is_data() {
        return Err(JsError::type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }
    Ok(desc)
}

/// FromPropertyDescriptor
pub(crate) fn from_property_descriptor(interp: &mut Interpreter, prop: Property) -> JsValue {
    let obj = interp.create_object();
    let put = |interp: &mut Interpreter, name: &str, value: JsValue| {
        let key = interp.key(name);
        interp.heap.get_mut(obj).properties.insert(key, Property::plain(value));
    };
    match prop {
        Property::Data {
            value,
            writable,
            enumerable,
            configurable,
        } => {
            put(interp, "value", value);
            put(interp, "writable", JsValue::Boolean(writable));
            put(interp, "enumerable", JsValue::Boolean(enumerable));
            put(interp, "configurable", JsValue::Boolean(configurable));
        }
        Property::Accessor {
            get,
            set,
            enumerable,
            configurable,
        } => {
            put(interp, "get", get.map(JsValue::Object).unwrap_or_default());
            put(interp, "set", set.map(JsValue::Object).unwrap_or_default());
            put(interp, "enumerable", JsValue::Boolean(enumerable));
            put(interp, "configurable", JsValue::Boolean(configurable));
        }
    }
    JsValue::Object(obj)
}

pub fn object_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    if let Some(new_target) = call.new_target
        && new_target != call.callee
    {
        let obj = interp.ordinary_create_from_constructor(new_target, |i| i.object_prototype)?;
        return Ok(JsValue::Object(obj));
    }
    let value = arg(args, 0);
    if value.is_null_or_undefined() {
        return Ok(JsValue::Object(interp.create_object()));
    }
    Ok(JsValue::Object(interp.to_object(&value)?))
}

/// Object.keys: own enumerable string keys in property order.
pub fn object_keys(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let obj = interp.to_object(&arg(args, 0))?;
    let mut names = Vec::new();
    for key in interp.own_property_keys(obj) {
        let PropertyKey::String(name) = &key else {
            continue;
        };
        if let Some(prop) = interp.get_own_property(obj, &key)?
            && prop.enumerable()
        {
            names.push(JsValue::String(name.cheap_clone()));
        }
    }
    Ok(JsValue::Object(interp.create_array(names)))
}

pub fn object_create(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let proto = match arg(args, 0) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        _ => return Err(JsError::type_error("Object prototype may only be an Object or null")),
    };
    let obj = interp.alloc(crate::object::JsObject::ordinary(proto));
    let properties = arg(args, 1);
    if !properties.is_undefined() {
        let props = interp.to_object(&properties)?;
        for key in interp.own_property_keys(props) {
            let Some(prop) = interp.get_own_property(props, &key)? else {
                continue;
            };
            if !prop.enumerable() {
                continue;
            }
            let desc_value = interp.get(props, &key, JsValue::Object(props))?;
            let desc = to_property_descriptor(interp, &desc_value)?;
            interp.define_property_or_throw(obj, key, desc)?;
        }
    }
    Ok(JsValue::Object(obj))
}

pub fn object_get_prototype_of(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let obj = interp.to_object(&arg(args, 0))?;
    Ok(interp
        .heap
        .get(obj)
        .prototype
        .map(JsValue::Object)
        .unwrap_or(JsValue::Null))
}

pub fn object_set_prototype_of(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let proto = match arg(args, 1) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        _ => return Err(JsError::type_error("Object prototype may only be an Object or null")),
    };
    if target.is_null_or_undefined() {
        return Err(JsError::type_error("Object.setPrototypeOf called on null or undefined"));
    }
    let JsValue::Object(obj) = target else {
        return Ok(target);
    };
    if !interp.set_prototype_of(obj, proto) {
        return Err(JsError::type_error("Cannot set prototype of this object"));
    }
    Ok(target)
}

pub fn object_define_property(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let JsValue::Object(obj) = target else {
        return Err(JsError::type_error("Object.defineProperty called on non-object"));
    };
    let key = interp.to_property_key(&arg(args, 1))?;
    let desc = to_property_descriptor(interp, &arg(args, 2))?;
    interp.define_property_or_throw(obj, key, desc)?;
    Ok(target)
}

pub fn object_get_own_property_descriptor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let obj = interp.to_object(&arg(args, 0))?;
    let key = interp.to_property_key(&arg(args, 1))?;
    match interp.get_own_property(obj, &key)? {
        Some(prop) => Ok(from_property_descriptor(interp, prop)),
        None => Ok(JsValue::Undefined),
    }
}

/// SetIntegrityLevel(O, frozen)
pub fn object_freeze(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let JsValue::Object(obj) = target else {
        return Ok(target);
    };
    if matches!(interp.heap.get(obj).kind, ObjectKind::ModuleNamespace(_)) {
        return Err(JsError::type_error("Cannot freeze a module namespace object"));
    }
    interp.prevent_extensions(obj);
    for key in interp.own_property_keys(obj) {
        let Some(prop) = interp.get_own_property(obj, &key)? else {
            continue;
        };
        let desc = match prop {
            Property::Data { .. } => PropertyDescriptor {
                writable: Some(false),
                configurable: Some(false),
                ..PropertyDescriptor::default()
            },
            Property::Accessor { .. } => PropertyDescriptor {
                configurable: Some(false),
                ..PropertyDescriptor::default()
            },
        };
        interp.define_property_or_throw(obj, key, desc)?;
    }
    Ok(target)
}

/// TestIntegrityLevel(O, frozen)
pub fn object_is_frozen(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let JsValue::Object(obj) = arg(args, 0) else {
        return Ok(JsValue::Boolean(true));
    };
    if interp.heap.get(obj).extensible {
        return Ok(JsValue::Boolean(false));
    }
    for key in interp.own_property_keys(obj) {
        match interp.get_own_property(obj, &key)? {
            Some(prop) if prop.configurable() => return Ok(JsValue::Boolean(false)),
            Some(Property::Data { writable: true, .. }) => return Ok(JsValue::Boolean(false)),
            _ => {}
        }
    }
    Ok(JsValue::Boolean(true))
}

pub fn object_is(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(arg(args, 0).same_value(&arg(args, 1))))
}

pub fn object_has_own_property(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let obj = interp.to_object(&this)?;
    Ok(JsValue::Boolean(interp.has_own_property(obj, &key)?))
}

pub fn object_is_prototype_of(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let JsValue::Object(mut current) = arg(args, 0) else {
        return Ok(JsValue::Boolean(false));
    };
    let obj = interp.to_object(&this)?;
    while let Some(proto) = interp.heap.get(current).prototype {
        if proto == obj {
            return Ok(JsValue::Boolean(true));
        }
        current = proto;
    }
    Ok(JsValue::Boolean(false))
}

/// Object.prototype.toString: `[object Tag]`.
pub fn object_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let builtin_tag = match &this {
        JsValue::Undefined => return Ok(JsValue::from("[object Undefined]")),
        JsValue::Null => return Ok(JsValue::from("[object Null]")),
        _ => {
            let obj = interp.to_object(&this)?;
            let object = interp.heap.get(obj);
            match &object.kind {
                ObjectKind::Array { .. } => "Array",
                ObjectKind::Arguments => "Arguments",
                ObjectKind::Error => "Error",
                ObjectKind::Primitive(JsValue::Boolean(_)) => "Boolean",
                ObjectKind::Primitive(JsValue::Number(_)) => "Number",
                ObjectKind::Primitive(JsValue::String(_)) => "String",
                _ if object.is_callable() => "Function",
                _ => "Object",
            }
        }
    };
    let tag_key = PropertyKey::Symbol(interp.symbols.to_string_tag.cheap_clone());
    let tag = match interp.get_v(&this, &tag_key)? {
        JsValue::String(tag) => tag.to_rust_string(),
        _ => builtin_tag.to_string(),
    };
    Ok(JsValue::from(format!("[object {tag}]")))
}

pub fn object_value_of(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Object(interp.to_object(&this)?))
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
    fn test_keys_skip_non_enumerable() {
        let source = "var o = {a: 1}; Object.defineProperty(o, 'hidden', {value: 2}); o.b = 3; Object.keys(o).join()";
        assert_eq!(run(source), JsValue::from("a,b"));
    }

    #[test]
    fn test_freeze_blocks_writes_in_strict_code() {
        let source = "'use strict'; var o = Object.freeze({x: 1}); try { o.x = 2; 'written' } catch (e) { e instanceof TypeError && Object.isFrozen(o) }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_accessor_defined_through_descriptor() {
        let source = "var o = {}; Object.defineProperty(o, 'twice', {get() { return 21 * 2; }}); o.twice";
        assert_eq!(run(source), JsValue::Number(42.0));
    }

    #[test]
    fn test_to_string_tags() {
        assert_eq!(
            run("Object.prototype.toString.call([]) + Object.prototype.toString.call(null)"),
            JsValue::from("[object Array][object Null]")
        );
    }
}
