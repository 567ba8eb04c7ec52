//! Number constructor, Number.prototype and BigInt.prototype

use num_bigint::BigInt;

use crate::error::{JsError, JsResult};
use crate::interpreter::{Interpreter, Numeric};
use crate::object::{JsObject, NativeCall, ObjectKind};
use crate::value::{CheapClone, JsValue, ObjectId, bigint_to_number, number_to_string};

/// Create the Number constructor with its constants and predicates
pub fn create_number_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().number_prototype;
    let constructor = interp.create_native_constructor("Number", number_constructor_fn, 1, proto);

    let constants = [
        ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
        ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
        ("EPSILON", f64::EPSILON),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ];
    for (name, value) in constants {
        let key = interp.key(name);
        interp.define_frozen(constructor, key, JsValue::Number(value));
    }

    interp.register_method(constructor, "isInteger", number_is_integer, 1);
    interp.register_method(constructor, "isFinite", number_is_finite, 1);
    interp.register_method(constructor, "isNaN", number_is_nan, 1);
    interp.register_method(constructor, "isSafeInteger", number_is_safe_integer, 1);

    constructor
}

/// Initialize Number.prototype
pub fn init_number_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().number_prototype;

    interp.register_method(proto, "toString", number_to_string_method, 1);
    interp.register_method(proto, "toFixed", number_to_fixed, 1);
    interp.register_method(proto, "valueOf", number_value_of, 0);
}

/// Initialize BigInt.prototype
pub fn init_bigint_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().bigint_prototype;

    interp.register_method(proto, "toString", bigint_to_string, 0);
    interp.register_method(proto, "valueOf", bigint_value_of, 0);
}

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

/// thisNumberValue
fn this_number_value(interp: &Interpreter, this: &JsValue) -> JsResult<f64> {
    match this {
        JsValue::Number(n) => Ok(*n),
        JsValue::Object(id) => match &interp.heap.get(*id).kind {
            ObjectKind::Primitive(JsValue::Number(n)) => Ok(*n),
            _ => Err(JsError::type_error("Number.prototype method called on incompatible receiver")),
        },
        _ => Err(JsError::type_error("Number.prototype method called on incompatible receiver")),
    }
}

/// thisBigIntValue
fn this_bigint_value(interp: &Interpreter, this: &JsValue) -> JsResult<JsValue> {
    match this {
        JsValue::BigInt(_) => Ok(this.cheap_clone()),
        JsValue::Object(id) => match &interp.heap.get(*id).kind {
            ObjectKind::Primitive(value @ JsValue::BigInt(_)) => Ok(value.cheap_clone()),
            _ => Err(JsError::type_error("BigInt.prototype method called on incompatible receiver")),
        },
        _ => Err(JsError::type_error("BigInt.prototype method called on incompatible receiver")),
    }
}

/// Render an integer-valued or fractional number in `radix`.
fn number_to_radix(n: f64, radix: u32) -> String {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return number_to_string(n);
    }
    let negative = n < 0.0;
    let abs = n.abs();
    let mut int_part = abs.trunc();
    let mut fraction = abs - int_part;

    let mut digits = Vec::new();
    while int_part >= 1.0 {
        let digit = (int_part % f64::from(radix)) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        int_part = (int_part / f64::from(radix)).trunc();
    }
    if digits.is_empty() {
        digits.push('0');
    }
    digits.reverse();
    let mut text: String = digits.into_iter().collect();

    if fraction > 0.0 {
        text.push('.');
        for _ in 0..20 {
            fraction *= f64::from(radix);
            let digit = fraction.trunc() as u32;
            text.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            fraction -= fraction.trunc();
            if fraction == 0.0 {
                break;
            }
        }
    }
    if negative {
        text.insert(0, '-');
    }
    text
}

fn radix_arg(interp: &mut Interpreter, value: &JsValue) -> JsResult<u32> {
    if value.is_undefined() {
        return Ok(10);
    }
    let radix = interp.to_integer_or_infinity(value)?;
    if !(2.0..=36.0).contains(&radix) {
        return Err(JsError::range_error("toString() radix must be between 2 and 36"));
    }
    Ok(radix as u32)
}

// ═══════════════════════════════════════════════════════════════════════════
// Number
// ═══════════════════════════════════════════════════════════════════════════

pub fn number_constructor_fn(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let n = match args.first() {
        None => 0.0,
        Some(value) => match interp.to_numeric(value)? {
            Numeric::Number(n) => n,
            Numeric::BigInt(b) => bigint_to_number(&b),
        },
    };
    let Some(new_target) = call.new_target else {
        return Ok(JsValue::Number(n));
    };
    let proto = interp.get_prototype_from_constructor(new_target, |i| i.number_prototype)?;
    let wrapper = interp.alloc(JsObject::new(Some(proto), ObjectKind::Primitive(JsValue::Number(n))));
    Ok(JsValue::Object(wrapper))
}

pub fn number_is_integer(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let result = matches!(arg(args, 0), JsValue::Number(n) if n.is_finite() && n.trunc() == n);
    Ok(JsValue::Boolean(result))
}

pub fn number_is_safe_integer(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let result = matches!(
        arg(args, 0),
        JsValue::Number(n) if n.is_finite() && n.trunc() == n && n.abs() <= 9_007_199_254_740_991.0
    );
    Ok(JsValue::Boolean(result))
}

pub fn number_is_finite(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_finite())))
}

pub fn number_is_nan(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_nan())))
}

/// Number.prototype.toString(radix)
pub fn number_to_string_method(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let n = this_number_value(interp, &this)?;
    let radix = radix_arg(interp, &arg(args, 0))?;
    let text = if radix == 10 {
        number_to_string(n)
    } else {
        number_to_radix(n, radix)
    };
    Ok(JsValue::from(text))
}

/// Number.prototype.toFixed(digits)
pub fn number_to_fixed(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let n = this_number_value(interp, &this)?;
    let digits = interp.to_integer_or_infinity(&arg(args, 0))?;
    if !(0.0..=100.0).contains(&digits) {
        return Err(JsError::range_error("toFixed() digits argument must be between 0 and 100"));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(format!("{n:.prec$}", prec = digits as usize)))
}

pub fn number_value_of(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Number(this_number_value(interp, &this)?))
}

// ═══════════════════════════════════════════════════════════════════════════
// BigInt
// ═══════════════════════════════════════════════════════════════════════════

pub fn bigint_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    match this_bigint_value(interp, &this)? {
        JsValue::BigInt(b) => Ok(JsValue::from(BigInt::to_string(&b))),
        _ => Err(JsError::internal("BigInt value expected")),
    }
}

pub fn bigint_value_of(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    this_bigint_value(interp, &this)
}

#[cfg(test)]
mod tests {
    use super::number_to_radix;
    use crate::config::RuntimeConfig;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    fn run(source: &str) -> JsValue {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        interp.run_script(source).unwrap()
    }

    #[test]
    fn test_radix_rendering() {
        assert_eq!(number_to_radix(255.0, 16), "ff");
        assert_eq!(number_to_radix(-5.0, 2), "-101");
        assert_eq!(number_to_radix(0.5, 2), "0.1");
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(run("Number('  42 ') + Number(true) + Number(10n)"), JsValue::Number(53.0));
        assert_eq!(run("typeof new Number(1)"), JsValue::from("object"));
    }

    #[test]
    fn test_prototype_methods() {
        assert_eq!(run("(255).toString(16) + '|' + (3.14159).toFixed(2)"), JsValue::from("ff|3.14"));
    }

    #[test]
    fn test_predicates() {
        let source = "[Number.isInteger(5), Number.isInteger('5'), Number.isNaN(NaN), Number.isFinite(Infinity)].join()";
        assert_eq!(run(source), JsValue::from("true,false,true,false"));
    }

    #[test]
    fn test_bigint_to_string() {
        assert_eq!(run("(12345678901234567890n).toString()"), JsValue::from("12345678901234567890"));
    }
}
