//! Expressions, operators and value conversions

use super::eval;
use jsrun::JsValue;

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(eval("2 + 3 * 4 - 10 / 5"), JsValue::Number(12.0));
    assert_eq!(eval("2 ** 3 ** 2"), JsValue::Number(512.0));
    assert_eq!(eval("-7 % 3"), JsValue::Number(-1.0));
}

#[test]
fn test_string_concatenation_converts() {
    assert_eq!(eval("'a' + 1 + 2"), JsValue::from("a12"));
    assert_eq!(eval("1 + 2 + 'a'"), JsValue::from("3a"));
    assert_eq!(eval("[1, 2] + ''"), JsValue::from("1,2"));
}

#[test]
fn test_equality() {
    assert_eq!(eval("null == undefined"), JsValue::Boolean(true));
    assert_eq!(eval("null === undefined"), JsValue::Boolean(false));
    assert_eq!(eval("'1' == 1"), JsValue::Boolean(true));
    assert_eq!(eval("NaN === NaN"), JsValue::Boolean(false));
}

#[test]
fn test_typeof() {
    let source = "[typeof 1, typeof 'x', typeof null, typeof undefined, typeof {}, typeof function() {}, typeof Symbol(), typeof 1n].join()";
    assert_eq!(
        eval(source),
        JsValue::from("number,string,object,undefined,object,function,symbol,bigint")
    );
}

#[test]
fn test_typeof_undeclared_is_undefined() {
    assert_eq!(eval("typeof notDeclaredAnywhere"), JsValue::from("undefined"));
}

#[test]
fn test_bitwise_operators() {
    assert_eq!(eval("(5 & 3) + (5 | 3) + (5 ^ 3)"), JsValue::Number(14.0));
    assert_eq!(eval("-1 >>> 28"), JsValue::Number(15.0));
    assert_eq!(eval("1 << 31"), JsValue::Number(-2147483648.0));
}

#[test]
fn test_bigint_arithmetic() {
    assert_eq!(eval("String(2n ** 64n)"), JsValue::from("18446744073709551616"));
    assert_eq!(eval("typeof (10n / 3n)"), JsValue::from("bigint"));
}

#[test]
fn test_logical_and_nullish() {
    assert_eq!(eval("0 || 'fallback'"), JsValue::from("fallback"));
    assert_eq!(eval("0 ?? 'fallback'"), JsValue::Number(0.0));
    assert_eq!(eval("null ?? 'fallback'"), JsValue::from("fallback"));
    assert_eq!(eval("'' && unreachable()"), JsValue::from(""));
}

#[test]
fn test_logical_assignment() {
    assert_eq!(eval("var a = null; a ??= 5; a"), JsValue::Number(5.0));
    assert_eq!(eval("var b = 1; b ||= 5; b"), JsValue::Number(1.0));
    assert_eq!(eval("var c = 1; c &&= 7; c"), JsValue::Number(7.0));
}

#[test]
fn test_update_expressions() {
    assert_eq!(eval("var i = 1; var j = i++ + ++i; j * 10 + i"), JsValue::Number(43.0));
}

#[test]
fn test_template_literals() {
    assert_eq!(eval("var n = 3; `n=${n}, twice=${n * 2}`"), JsValue::from("n=3, twice=6"));
}

#[test]
fn test_object_literal_features() {
    let source = r#"
        var key = 'dyn';
        var base = { a: 1 };
        var o = { ...base, [key + 'amic']: 2, short() { return 'm'; }, get g() { return 'got'; } };
        [o.a, o.dynamic, o.short(), o.g].join()
    "#;
    assert_eq!(eval(source), JsValue::from("1,2,m,got"));
}

#[test]
fn test_array_spread_and_holes() {
    assert_eq!(eval("[0, ...[1, 2], , 4].length"), JsValue::Number(5.0));
    assert_eq!(eval("1 in [0, , 2]"), JsValue::Boolean(false));
}

#[test]
fn test_optional_chaining() {
    assert_eq!(eval("var o = null; o?.a.b.c"), JsValue::Undefined);
    assert_eq!(eval("var o = { f() { return 1; } }; o.g?.() ?? o.f?.()"), JsValue::Number(1.0));
}

#[test]
fn test_delete_and_in() {
    assert_eq!(eval("var o = { a: 1 }; delete o.a; 'a' in o"), JsValue::Boolean(false));
}

#[test]
fn test_comma_and_conditional() {
    assert_eq!(eval("var x = (1, 2, 3); x > 2 ? 'big' : 'small'"), JsValue::from("big"));
}

#[test]
fn test_instanceof() {
    assert_eq!(eval("[] instanceof Array && !({} instanceof Array)"), JsValue::Boolean(true));
}

#[test]
fn test_destructuring_with_defaults() {
    let source = r#"
        var { a, b: { c = 5 } = {}, ...rest } = { a: 1, d: 4, e: 5 };
        var [x, , y = 9, ...others] = [10, 20, undefined, 30, 40];
        [a, c, Object.keys(rest).join(''), x, y, others.length].join()
    "#;
    assert_eq!(eval(source), JsValue::from("1,5,de,10,9,2"));
}

#[test]
fn test_destructuring_assignment_swaps() {
    assert_eq!(eval("var a = 1, b = 2; [a, b] = [b, a]; a * 10 + b"), JsValue::Number(21.0));
}
