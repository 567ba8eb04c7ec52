//! Symbol constructor and Symbol.prototype

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{NativeCall, ObjectKind, Property};
use crate::value::{CheapClone, JsSymbol, JsValue, ObjectId, PropertyKey};

/// Create the Symbol function. It is a constructor only so that
/// `class extends Symbol` can name it; `new Symbol()` throws.
pub fn create_symbol_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().symbol_prototype;
    let constructor = interp.create_native_constructor("Symbol", symbol_call, 0, proto);

    let well_known = [
        ("iterator", interp.symbols.iterator.cheap_clone()),
        ("asyncIterator", interp.symbols.async_iterator.cheap_clone()),
        ("hasInstance", interp.symbols.has_instance.cheap_clone()),
        ("toPrimitive", interp.symbols.to_primitive.cheap_clone()),
        ("toStringTag", interp.symbols.to_string_tag.cheap_clone()),
        ("unscopables", interp.symbols.unscopables.cheap_clone()),
    ];
    for (name, symbol) in well_known {
        let key = interp.key(name);
        interp.define_frozen(constructor, key, JsValue::Symbol(symbol));
    }
    constructor
}

/// Initialize Symbol.prototype
pub fn init_symbol_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().symbol_prototype;

    interp.register_method(proto, "toString", symbol_to_string, 0);
    interp.register_method(proto, "valueOf", symbol_value_of, 0);
    let description_key = interp.key("description");
    interp.register_getter(proto, description_key, "description", symbol_description);

    let to_primitive = interp.symbols.to_primitive.cheap_clone();
    let func = interp.create_native_function("[Symbol.toPrimitive]", symbol_value_of, 1);
    interp.heap.get_mut(proto).properties.insert(
        PropertyKey::Symbol(to_primitive),
        Property::data(JsValue::Object(func), false, false, true),
    );

    let tag = interp.symbols.to_string_tag.cheap_clone();
    let value = JsValue::String(interp.intern("Symbol"));
    interp
        .heap
        .get_mut(proto)
        .properties
        .insert(PropertyKey::Symbol(tag), Property::data(value, false, false, true));
}

/// Symbol([description])
fn symbol_call(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    if call.new_target.is_some() {
        return Err(JsError::type_error("Symbol is not a constructor"));
    }
    let description = match args.first() {
        None | Some(JsValue::Undefined) => None,
        Some(value) => Some(interp.to_string(value)?),
    };
    Ok(JsValue::Symbol(JsSymbol::new(description)))
}

/// thisSymbolValue
fn this_symbol_value(interp: &Interpreter, this: &JsValue) -> JsResult<JsSymbol> {
    match this {
        JsValue::Symbol(symbol) => Ok(symbol.cheap_clone()),
        JsValue::Object(id) => match &interp.heap.get(*id).kind {
            ObjectKind::Primitive(JsValue::Symbol(symbol)) => Ok(symbol.cheap_clone()),
            _ => Err(JsError::type_error("Symbol.prototype method called on incompatible receiver")),
        },
        _ => Err(JsError::type_error("Symbol.prototype method called on incompatible receiver")),
    }
}

fn symbol_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let symbol = this_symbol_value(interp, &this)?;
    Ok(JsValue::String(symbol.descriptive_string()))
}

fn symbol_value_of(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Symbol(this_symbol_value(interp, &this)?))
}

fn symbol_description(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let symbol = this_symbol_value(interp, &this)?;
    Ok(symbol
        .description()
        .map(|desc| JsValue::String(desc.cheap_clone()))
        .unwrap_or_default())
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
    fn test_symbols_are_unique() {
        assert_eq!(run("Symbol('a') === Symbol('a')"), JsValue::Boolean(false));
        assert_eq!(run("typeof Symbol.iterator"), JsValue::from("symbol"));
    }

    #[test]
    fn test_description_and_to_string() {
        let source = "var s = Symbol('tag'); s.description + '|' + s.toString() + '|' + Symbol().description";
        assert_eq!(run(source), JsValue::from("tag|Symbol(tag)|undefined"));
    }

    #[test]
    fn test_new_symbol_throws() {
        let source = "try { new Symbol(); 'no' } catch (e) { e instanceof TypeError }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_symbol_keyed_property() {
        let source = "var k = Symbol('k'); var o = {[k]: 1}; o[k] + Object.keys(o).length";
        assert_eq!(run(source), JsValue::Number(1.0));
    }
}
