//! Global object properties and functions (globalThis, eval, print, parseInt, ...)

use crate::error::JsResult;
use crate::interpreter::Interpreter;
use crate::object::NativeCall;
use crate::value::{JsValue, ObjectId};

/// %eval%. Calls that reach this function are indirect; direct calls are
/// recognized at the call site.
pub fn create_eval_function(interp: &mut Interpreter) -> ObjectId {
    interp.create_native_function("eval", global_eval, 1)
}

/// Install the value properties and plain functions of the global object.
pub fn init_global_object(interp: &mut Interpreter, global: ObjectId) {
    let global_this = interp.key("globalThis");
    interp.define_hidden(global, global_this, JsValue::Object(global));

    let values = [
        ("undefined", JsValue::Undefined),
        ("NaN", JsValue::Number(f64::NAN)),
        ("Infinity", JsValue::Number(f64::INFINITY)),
    ];
    for (name, value) in values {
        let key = interp.key(name);
        interp.define_frozen(global, key, value);
    }

    interp.register_method(global, "print", global_print, 0);
    interp.register_method(global, "parseInt", global_parse_int, 2);
    interp.register_method(global, "parseFloat", global_parse_float, 1);
    interp.register_method(global, "isNaN", global_is_nan, 1);
    interp.register_method(global, "isFinite", global_is_finite, 1);
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

/// Indirect eval: global scope, never strict by inheritance.
pub fn global_eval(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    interp.perform_eval(arg(args, 0), false, false)
}

/// print(...values): hand the space-joined strings to the host.
pub fn global_print(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for value in args {
        let text = match value {
            JsValue::Symbol(symbol) => symbol.descriptive_string(),
            other => interp.to_string(other)?,
        };
        parts.push(text.to_rust_string());
    }
    interp.host.print(&parts.join(" "));
    Ok(JsValue::Undefined)
}

pub fn global_parse_int(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let string = interp.to_string(&arg(args, 0))?.to_rust_string();
    let radix = match arg(args, 1) {
        JsValue::Undefined => 0,
        value => crate::value::to_int32(interp.to_number(&value)?),
    };
    Ok(JsValue::Number(parse_int(&string, radix)))
}

fn parse_int(string: &str, radix: i32) -> f64 {
    let s = string.trim();
    let (negative, s) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    };

    let mut radix = radix;
    let mut s = s;
    if (radix == 0 || radix == 16)
        && let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
    {
        s = rest;
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let mut result = 0.0;
    let mut found_digit = false;
    for c in s.chars() {
        let Some(digit) = c.to_digit(radix as u32) else {
            break;
        };
        found_digit = true;
        result = result * f64::from(radix) + f64::from(digit);
    }
    if !found_digit {
        return f64::NAN;
    }
    if negative { -result } else { result }
}

pub fn global_parse_float(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let string = interp.to_string(&arg(args, 0))?.to_rust_string();
    Ok(JsValue::Number(parse_float(&string)))
}

/// The longest prefix that is a decimal literal.
fn parse_float(string: &str) -> f64 {
    let s = string.trim_start();
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    if unsigned.starts_with("Infinity") {
        return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }

    let mut num_str = String::new();
    let mut has_dot = false;
    let mut has_exp = false;
    let mut chars = s.chars().peekable();
    if let Some(&sign @ ('-' | '+')) = chars.peek() {
        num_str.push(sign);
        chars.next();
    }
    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' => num_str.push(c),
            '.' if !has_dot && !has_exp => {
                has_dot = true;
                num_str.push(c);
            }
            'e' | 'E' if !has_exp => {
                has_exp = true;
                num_str.push(c);
                chars.next();
                if let Some(&sign @ ('-' | '+')) = chars.peek() {
                    num_str.push(sign);
                } else {
                    continue;
                }
            }
            _ => break,
        }
        chars.next();
    }
    // Trailing exponent markers without digits are not part of the literal
    while num_str.ends_with(['e', 'E', '+', '-']) {
        num_str.pop();
    }
    num_str.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn global_is_nan(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let n = interp.to_number(&arg(args, 0))?;
    Ok(JsValue::Boolean(n.is_nan()))
}

pub fn global_is_finite(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let n = interp.to_number(&arg(args, 0))?;
    Ok(JsValue::Boolean(n.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::{parse_float, parse_int};
    use crate::config::RuntimeConfig;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("  42px", 0), 42.0);
        assert_eq!(parse_int("-0x1F", 0), -31.0);
        assert_eq!(parse_int("101", 2), 5.0);
        assert!(parse_int("z", 10).is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("3.5e2x"), 350.0);
        assert_eq!(parse_float("1e"), 1.0);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float("abc").is_nan());
    }

    #[test]
    fn test_global_values() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let source = "globalThis.globalThis === globalThis && typeof undefined === 'undefined' && NaN !== NaN && Infinity > 1e308";
        assert_eq!(interp.run_script(source).unwrap(), JsValue::Boolean(true));
    }

    #[test]
    fn test_undefined_is_not_writable() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let source = "undefined = 1; typeof undefined";
        assert_eq!(interp.run_script(source).unwrap(), JsValue::from("undefined"));
    }
}
