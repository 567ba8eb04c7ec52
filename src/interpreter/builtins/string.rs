//! String constructor and String.prototype
//!
//! Strings are sequences of UTF-16 code units; indices and lengths below
//! count code units.

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{IterationKind, JsObject, NativeCall, ObjectKind};
use crate::value::{CheapClone, JsString, JsValue, ObjectId, is_js_whitespace};

use super::array::create_array_iterator;

/// Create the String constructor
pub fn create_string_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().string_prototype;
    let constructor = interp.create_native_constructor("String", string_constructor_fn, 1, proto);
    interp.register_method(constructor, "fromCharCode", string_from_char_code, 1);
    constructor
}

/// Initialize String.prototype
pub fn init_string_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().string_prototype;

    interp.register_method(proto, "toString", string_value_of, 0);
    interp.register_method(proto, "valueOf", string_value_of, 0);
    interp.register_method(proto, "charAt", string_char_at, 1);
    interp.register_method(proto, "charCodeAt", string_char_code_at, 1);
    interp.register_method(proto, "indexOf", string_index_of, 1);
    interp.register_method(proto, "includes", string_includes, 1);
    interp.register_method(proto, "startsWith", string_starts_with, 1);
    interp.register_method(proto, "endsWith", string_ends_with, 1);
    interp.register_method(proto, "slice", string_slice, 2);
    interp.register_method(proto, "substring", string_substring, 2);
    interp.register_method(proto, "toUpperCase", string_to_upper_case, 0);
    interp.register_method(proto, "toLowerCase", string_to_lower_case, 0);
    interp.register_method(proto, "trim", string_trim, 0);
    interp.register_method(proto, "split", string_split, 2);
    interp.register_method(proto, "repeat", string_repeat, 1);
    interp.register_method(proto, "concat", string_concat, 1);

    let iterator = interp.symbols.iterator.cheap_clone();
    interp.register_symbol_method(proto, iterator, "[Symbol.iterator]", string_iterator, 0);
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

/// RequireObjectCoercible(this) followed by ToString.
fn this_string(interp: &mut Interpreter, this: &JsValue, method: &str) -> JsResult<JsString> {
    if this.is_null_or_undefined() {
        return Err(JsError::type_error(format!(
            "String.prototype.{method} called on null or undefined"
        )));
    }
    interp.to_string(this)
}

/// Clamp a position argument into `0..=len`.
fn clamp_position(interp: &mut Interpreter, value: &JsValue, len: usize, default: usize) -> JsResult<usize> {
    if value.is_undefined() {
        return Ok(default);
    }
    let n = interp.to_integer_or_infinity(value)?;
    Ok(n.clamp(0.0, len as f64) as usize)
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}

fn sub_string(s: &JsString, start: usize, end: usize) -> JsString {
    let units = s.as_units().get(start..end.max(start)).unwrap_or_default();
    JsString::from_units(units.to_vec())
}

// ═══════════════════════════════════════════════════════════════════════════
// Constructor
// ═══════════════════════════════════════════════════════════════════════════

pub fn string_constructor_fn(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let value = match args.first() {
        None => JsString::empty(),
        Some(JsValue::Symbol(symbol)) if call.new_target.is_none() => symbol.descriptive_string(),
        Some(value) => interp.to_string(value)?,
    };
    let Some(new_target) = call.new_target else {
        return Ok(JsValue::String(value));
    };
    let proto = interp.get_prototype_from_constructor(new_target, |i| i.string_prototype)?;
    let wrapper = interp.alloc(JsObject::new(
        Some(proto),
        ObjectKind::Primitive(JsValue::String(value)),
    ));
    Ok(JsValue::Object(wrapper))
}

pub fn string_from_char_code(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let mut units = Vec::with_capacity(args.len());
    for value in args {
        let n = interp.to_number(value)?;
        units.push(crate::value::to_uint32(n) as u16);
    }
    Ok(JsValue::String(JsString::from_units(units)))
}

// ═══════════════════════════════════════════════════════════════════════════
// Prototype methods
// ═══════════════════════════════════════════════════════════════════════════

/// thisStringValue, shared by toString and valueOf
pub fn string_value_of(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    match &this {
        JsValue::String(_) => Ok(this),
        JsValue::Object(id) => match &interp.heap.get(*id).kind {
            ObjectKind::Primitive(value @ JsValue::String(_)) => Ok(value.cheap_clone()),
            _ => Err(JsError::type_error("String.prototype.valueOf requires that 'this' be a String")),
        },
        _ => Err(JsError::type_error("String.prototype.valueOf requires that 'this' be a String")),
    }
}

pub fn string_char_at(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "charAt")?;
    let position = interp.to_integer_or_infinity(&arg(args, 0))?;
    if position < 0.0 || position >= s.len() as f64 {
        return Ok(JsValue::String(JsString::empty()));
    }
    let index = position as usize;
    Ok(JsValue::String(sub_string(&s, index, index + 1)))
}

pub fn string_char_code_at(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "charCodeAt")?;
    let position = interp.to_integer_or_infinity(&arg(args, 0))?;
    if position < 0.0 {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(
        s.unit_at(position as usize).map_or(f64::NAN, f64::from),
    ))
}

pub fn string_index_of(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "indexOf")?;
    let search = interp.to_string(&arg(args, 0))?;
    let from = clamp_position(interp, &arg(args, 1), s.len(), 0)?;
    let found = find_units(s.as_units(), search.as_units(), from);
    Ok(JsValue::Number(found.map_or(-1.0, |i| i as f64)))
}

pub fn string_includes(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "includes")?;
    let search = interp.to_string(&arg(args, 0))?;
    let from = clamp_position(interp, &arg(args, 1), s.len(), 0)?;
    Ok(JsValue::Boolean(find_units(s.as_units(), search.as_units(), from).is_some()))
}

pub fn string_starts_with(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "startsWith")?;
    let search = interp.to_string(&arg(args, 0))?;
    let start = clamp_position(interp, &arg(args, 1), s.len(), 0)?;
    let rest = s.as_units().get(start..).unwrap_or_default();
    Ok(JsValue::Boolean(rest.starts_with(search.as_units())))
}

pub fn string_ends_with(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "endsWith")?;
    let search = interp.to_string(&arg(args, 0))?;
    let end = clamp_position(interp, &arg(args, 1), s.len(), s.len())?;
    let head = s.as_units().get(..end).unwrap_or_default();
    Ok(JsValue::Boolean(head.ends_with(search.as_units())))
}

pub fn string_slice(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "slice")?;
    let len = s.len() as f64;
    let resolve = |n: f64| if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    let start = resolve(interp.to_integer_or_infinity(&arg(args, 0))?);
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        value => resolve(interp.to_integer_or_infinity(&value)?),
    };
    Ok(JsValue::String(sub_string(&s, start as usize, end as usize)))
}

pub fn string_substring(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "substring")?;
    let start = clamp_position(interp, &arg(args, 0), s.len(), 0)?;
    let end = clamp_position(interp, &arg(args, 1), s.len(), s.len())?;
    Ok(JsValue::String(sub_string(&s, start.min(end), start.max(end))))
}

pub fn string_to_upper_case(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "toUpperCase")?;
    Ok(JsValue::from(s.to_rust_string().to_uppercase()))
}

pub fn string_to_lower_case(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "toLowerCase")?;
    Ok(JsValue::from(s.to_rust_string().to_lowercase()))
}

pub fn string_trim(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "trim")?;
    let units = s.as_units();
    let start = units.iter().position(|&u| !is_js_whitespace(u)).unwrap_or(units.len());
    let end = units.iter().rposition(|&u| !is_js_whitespace(u)).map_or(start, |e| e + 1);
    Ok(JsValue::String(sub_string(&s, start, end)))
}

pub fn string_split(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "split")?;
    let limit = match arg(args, 1) {
        JsValue::Undefined => u32::MAX,
        value => crate::value::to_uint32(interp.to_number(&value)?),
    } as usize;
    let separator = arg(args, 0);
    if limit == 0 {
        return Ok(JsValue::Object(interp.create_array(Vec::new())));
    }
    if separator.is_undefined() {
        return Ok(JsValue::Object(interp.create_array(vec![JsValue::String(s)])));
    }
    let separator = interp.to_string(&separator)?;
    let units = s.as_units();
    let sep = separator.as_units();

    let mut parts = Vec::new();
    if sep.is_empty() {
        for &unit in units.iter().take(limit) {
            parts.push(JsValue::String(JsString::from_units(vec![unit])));
        }
        return Ok(JsValue::Object(interp.create_array(parts)));
    }
    let mut start = 0;
    while let Some(found) = find_units(units, sep, start) {
        parts.push(JsValue::String(sub_string(&s, start, found)));
        if parts.len() >= limit {
            return Ok(JsValue::Object(interp.create_array(parts)));
        }
        start = found + sep.len();
    }
    parts.push(JsValue::String(sub_string(&s, start, units.len())));
    Ok(JsValue::Object(interp.create_array(parts)))
}

pub fn string_repeat(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "repeat")?;
    let count = interp.to_integer_or_infinity(&arg(args, 0))?;
    if count < 0.0 || count.is_infinite() {
        return Err(JsError::range_error(format!("Invalid count value: {count}")));
    }
    let units = s.as_units().repeat(count as usize);
    Ok(JsValue::String(JsString::from_units(units)))
}

pub fn string_concat(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let mut s = this_string(interp, &this, "concat")?;
    for value in args {
        let next = interp.to_string(value)?;
        s = s.concat(&next);
    }
    Ok(JsValue::String(s))
}

/// String.prototype[@@iterator]: iterates code points, pairing surrogates.
pub fn string_iterator(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let s = this_string(interp, &this, "[Symbol.iterator]")?;
    let units = s.as_units();
    let mut code_points = Vec::new();
    let mut index = 0;
    while index < units.len() {
        let is_pair = matches!(units.get(index), Some(0xD800..=0xDBFF))
            && matches!(units.get(index + 1), Some(0xDC00..=0xDFFF));
        let width = if is_pair { 2 } else { 1 };
        code_points.push(JsValue::String(sub_string(&s, index, index + width)));
        index += width;
    }
    let array = interp.create_array(code_points);
    Ok(create_array_iterator(interp, JsValue::Object(array), IterationKind::Values))
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
    fn test_conversion_and_wrapper() {
        assert_eq!(run("String(12) + typeof new String('a') + new String('abc').length"), JsValue::from("12object3"));
        assert_eq!(run("String(Symbol('s'))"), JsValue::from("Symbol(s)"));
    }

    #[test]
    fn test_search_methods() {
        let source = "var s = 'hello world'; [s.indexOf('o'), s.indexOf('o', 5), s.includes('wor'), s.startsWith('hell'), s.endsWith('ld')].join()";
        assert_eq!(run(source), JsValue::from("4,7,true,true,true"));
    }

    #[test]
    fn test_slice_and_substring() {
        assert_eq!(run("'abcdef'.slice(-3, -1) + '|' + 'abcdef'.substring(4, 1)"), JsValue::from("de|bcd"));
    }

    #[test]
    fn test_split_and_trim() {
        assert_eq!(run("'  a,b,,c '.trim().split(',').length"), JsValue::Number(4.0));
        assert_eq!(run("'abc'.split('').join('-')"), JsValue::from("a-b-c"));
    }

    #[test]
    fn test_iterator_pairs_surrogates() {
        assert_eq!(run("[...'a\\u{1F600}b'].length"), JsValue::Number(3.0));
    }
}
