//! JSON built-in methods and the serde_json bridge used by the embedding API

use serde::Serialize;

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{NativeCall, ObjectKind, Property};
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

/// Create the JSON object with parse and stringify
pub fn create_json_object(interp: &mut Interpreter) -> ObjectId {
    let json = interp.create_object();

    interp.register_method(json, "stringify", json_stringify, 3);
    interp.register_method(json, "parse", json_parse, 2);

    let tag = PropertyKey::Symbol(interp.symbols.to_string_tag.cheap_clone());
    let value = JsValue::String(interp.intern("JSON"));
    interp
        .heap
        .get_mut(json)
        .properties
        .insert(tag, Property::data(value, false, false, true));
    json
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════
// JSON.stringify
// ═══════════════════════════════════════════════════════════════════════════

pub fn json_stringify(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let value = arg(args, 0);
    let indent = match arg(args, 2) {
        JsValue::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        JsValue::String(s) => s.to_rust_string().chars().take(10).collect(),
        _ => String::new(),
    };

    let mut stack = Vec::new();
    let key = PropertyKey::String(JsString::empty());
    let Some(json) = serialize_value(interp, key, value, &mut stack)? else {
        return Ok(JsValue::Undefined);
    };

    let output = if indent.is_empty() {
        json.to_string()
    } else {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        json.serialize(&mut serializer)
            .map_err(|e| JsError::internal(format!("JSON serialization failed: {e}")))?;
        String::from_utf8_lossy(&buf).into_owned()
    };
    Ok(JsValue::from(output))
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// SerializeJSONProperty: `None` for values JSON has no rendering for
/// (undefined, functions, symbols).
fn serialize_value(
    interp: &mut Interpreter,
    key: PropertyKey,
    value: JsValue,
    stack: &mut Vec<ObjectId>,
) -> JsResult<Option<serde_json::Value>> {
    let mut value = value;
    if matches!(value, JsValue::Object(_) | JsValue::BigInt(_)) {
        let to_json = interp.get_named(&value, "toJSON")?;
        if interp.is_callable(&to_json) {
            value = interp.call(&to_json, value, &[key.to_value()])?;
        }
    }
    if let JsValue::Object(id) = &value
        && let ObjectKind::Primitive(inner) = &interp.heap.get(*id).kind
        && !matches!(inner, JsValue::Symbol(_))
    {
        value = match inner.cheap_clone() {
            JsValue::Number(_) => JsValue::Number(interp.to_number(&value)?),
            JsValue::String(_) => JsValue::String(interp.to_string(&value)?),
            other => other,
        };
    }

    Ok(Some(match value {
        JsValue::Null => serde_json::Value::Null,
        JsValue::Boolean(b) => serde_json::Value::Bool(b),
        JsValue::Number(n) => number_to_json(n),
        JsValue::String(s) => serde_json::Value::String(s.to_rust_string()),
        JsValue::BigInt(_) => return Err(JsError::type_error("Do not know how to serialize a BigInt")),
        JsValue::Undefined | JsValue::Symbol(_) => return Ok(None),
        JsValue::Object(id) => {
            if interp.heap.get(id).is_callable() {
                return Ok(None);
            }
            if stack.contains(&id) {
                return Err(JsError::type_error("Converting circular structure to JSON"));
            }
            stack.push(id);
            let result = if interp.heap.get(id).is_array() {
                serialize_array(interp, id, stack)
            } else {
                serialize_object(interp, id, stack)
            };
            stack.pop();
            result?
        }
    }))
}

fn serialize_object(
    interp: &mut Interpreter,
    id: ObjectId,
    stack: &mut Vec<ObjectId>,
) -> JsResult<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for key in interp.own_property_keys(id) {
        let PropertyKey::String(name) = &key else {
            continue;
        };
        match interp.get_own_property(id, &key)? {
            Some(prop) if prop.enumerable() => {}
            _ => continue,
        }
        let value = interp.get(id, &key, JsValue::Object(id))?;
        let name = name.to_rust_string();
        if let Some(json) = serialize_value(interp, key, value, stack)? {
            map.insert(name, json);
        }
    }
    Ok(serde_json::Value::Object(map))
}

fn serialize_array(
    interp: &mut Interpreter,
    id: ObjectId,
    stack: &mut Vec<ObjectId>,
) -> JsResult<serde_json::Value> {
    let len = interp.length_of_array_like(id)?;
    let mut items = Vec::new();
    for index in 0..len {
        let key = PropertyKey::String(JsString::from(index.to_string()));
        let value = interp.get(id, &key, JsValue::Object(id))?;
        items.push(serialize_value(interp, key, value, stack)?.unwrap_or(serde_json::Value::Null));
    }
    Ok(serde_json::Value::Array(items))
}

/// Convert a guest value to JSON the way JSON.stringify sees it.
/// Values without a JSON rendering become `null`.
pub fn js_value_to_json(interp: &mut Interpreter, value: &JsValue) -> JsResult<serde_json::Value> {
    let mut stack = Vec::new();
    let key = PropertyKey::String(JsString::empty());
    Ok(serialize_value(interp, key, value.cheap_clone(), &mut stack)?.unwrap_or(serde_json::Value::Null))
}

// ═══════════════════════════════════════════════════════════════════════════
// JSON.parse
// ═══════════════════════════════════════════════════════════════════════════

pub fn json_parse(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let text = interp.to_string(&arg(args, 0))?;
    let json: serde_json::Value = serde_json::from_str(&text.to_rust_string())
        .map_err(|e| JsError::syntax_error(format!("JSON.parse: {e}"), e.line() as u32, e.column() as u32))?;
    let value = json_to_js_value(interp, &json);

    let reviver = arg(args, 1);
    if !interp.is_callable(&reviver) {
        return Ok(value);
    }
    let root = interp.create_object();
    let root_key = PropertyKey::String(JsString::empty());
    interp.create_data_property_or_throw(root, root_key.cheap_clone(), value)?;
    internalize(interp, root, root_key, &reviver)
}

/// InternalizeJSONProperty: walk the parsed value bottom-up through the reviver.
fn internalize(interp: &mut Interpreter, holder: ObjectId, key: PropertyKey, reviver: &JsValue) -> JsResult<JsValue> {
    let value = interp.get(holder, &key, JsValue::Object(holder))?;
    if let JsValue::Object(id) = value {
        let keys: Vec<PropertyKey> = if interp.heap.get(id).is_array() {
            let len = interp.length_of_array_like(id)?;
            (0..len)
                .map(|i| PropertyKey::String(JsString::from(i.to_string())))
                .collect()
        } else {
            let mut keys = Vec::new();
            for key in interp.own_property_keys(id) {
                if matches!(key, PropertyKey::String(_))
                    && interp.get_own_property(id, &key)?.is_some_and(|p| p.enumerable())
                {
                    keys.push(key);
                }
            }
            keys
        };
        for element_key in keys {
            let revived = internalize(interp, id, element_key.cheap_clone(), reviver)?;
            if revived.is_undefined() {
                interp.delete(id, &element_key)?;
            } else {
                interp.create_data_property(id, element_key, revived)?;
            }
        }
    }
    interp.call(reviver, JsValue::Object(holder), &[key.to_value(), value])
}

/// Build guest values from a serde_json tree.
pub fn json_to_js_value(interp: &mut Interpreter, json: &serde_json::Value) -> JsValue {
    match json {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Boolean(*b),
        serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsValue::String(JsString::from(s.as_str())),
        serde_json::Value::Array(items) => {
            let values = items.iter().map(|item| json_to_js_value(interp, item)).collect();
            JsValue::Object(interp.create_array(values))
        }
        serde_json::Value::Object(map) => {
            let obj = interp.create_object();
            for (key, value) in map {
                let value = json_to_js_value(interp, value);
                let key = interp.key(key);
                interp.heap.get_mut(obj).properties.insert(key, Property::plain(value));
            }
            JsValue::Object(obj)
        }
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
    fn test_stringify_keeps_insertion_order() {
        let source = "JSON.stringify({b: 1, a: [true, null, 'x'], u: undefined, f() {}})";
        assert_eq!(run(source), JsValue::from(r#"{"b":1,"a":[true,null,"x"]}"#));
    }

    #[test]
    fn test_stringify_special_values() {
        assert_eq!(run("JSON.stringify([undefined, NaN, 1.5])"), JsValue::from("[null,null,1.5]"));
        assert_eq!(run("JSON.stringify(undefined)"), JsValue::Undefined);
    }

    #[test]
    fn test_stringify_indent() {
        assert_eq!(run("JSON.stringify({a: 1}, null, 2)"), JsValue::from("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn test_to_json_is_used() {
        let source = "JSON.stringify({v: {toJSON() { return 'custom'; }}})";
        assert_eq!(run(source), JsValue::from(r#"{"v":"custom"}"#));
    }

    #[test]
    fn test_circular_structure_throws() {
        let source = "var o = {}; o.self = o; try { JSON.stringify(o); 'no' } catch (e) { e instanceof TypeError }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_parse_with_reviver() {
        let source = "JSON.parse('{\"a\": 1, \"b\": [2, 3]}', (k, v) => typeof v === 'number' ? v * 10 : v).b[1]";
        assert_eq!(run(source), JsValue::Number(30.0));
    }

    #[test]
    fn test_parse_error_is_syntax_error() {
        let source = "try { JSON.parse('{bad'); 'no' } catch (e) { e instanceof SyntaxError }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }
}
