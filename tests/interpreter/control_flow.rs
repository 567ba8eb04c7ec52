//! Statements, loops, labels and completion values

use super::{eval, throws_error};
use jsrun::JsValue;

#[test]
fn test_while_and_do_while() {
    assert_eq!(eval("var i = 0; while (i < 5) i++; i"), JsValue::Number(5.0));
    assert_eq!(eval("var n = 0; do { n++; } while (false); n"), JsValue::Number(1.0));
}

#[test]
fn test_for_loop_completion_value() {
    assert_eq!(eval("for (var i = 0; i < 3; i++) { i * 2; }"), JsValue::Number(4.0));
}

#[test]
fn test_labeled_break_and_continue() {
    let source = r#"
        var log = [];
        outer: for (var i = 0; i < 3; i++) {
            for (var j = 0; j < 3; j++) {
                if (j === 1) continue outer;
                if (i === 2) break outer;
                log.push(i + '' + j);
            }
        }
        log.join()
    "#;
    assert_eq!(eval(source), JsValue::from("00,10"));
}

#[test]
fn test_labeled_block_break() {
    assert_eq!(eval("var r = 'a'; block: { r += 'b'; break block; r += 'c'; } r"), JsValue::from("ab"));
}

#[test]
fn test_for_in_enumerates_own_and_inherited() {
    let source = r#"
        var proto = { inherited: 1 };
        var o = Object.create(proto);
        o.own = 2;
        var keys = [];
        for (var k in o) keys.push(k);
        keys.join()
    "#;
    assert_eq!(eval(source), JsValue::from("own,inherited"));
}

#[test]
fn test_for_of_over_array_and_string() {
    assert_eq!(eval("var s = 0; for (const n of [1, 2, 3]) s += n; s"), JsValue::Number(6.0));
    assert_eq!(eval("var out = ''; for (const c of 'abc') out = c + out; out"), JsValue::from("cba"));
}

#[test]
fn test_for_of_break_closes_iterator() {
    let source = r#"
        var closed = false;
        var iterable = {
            [Symbol.iterator]() {
                var i = 0;
                return {
                    next() { return { value: i++, done: false }; },
                    return() { closed = true; return {}; }
                };
            }
        };
        for (var v of iterable) { if (v === 2) break; }
        closed
    "#;
    assert_eq!(eval(source), JsValue::Boolean(true));
}

#[test]
fn test_switch_with_break() {
    let source = r#"
        function name(n) {
            switch (n) {
                case 1: return 'one';
                case 2:
                case 3: return 'few';
                default: return 'many';
            }
        }
        [name(1), name(3), name(9)].join()
    "#;
    assert_eq!(eval(source), JsValue::from("one,few,many"));
}

#[test]
fn test_try_catch_finally_order() {
    let source = r#"
        var log = [];
        try {
            log.push('try');
            throw new Error('boom');
        } catch (e) {
            log.push('catch ' + e.message);
        } finally {
            log.push('finally');
        }
        log.join('|')
    "#;
    assert_eq!(eval(source), JsValue::from("try|catch boom|finally"));
}

#[test]
fn test_finally_overrides_return() {
    let source = "function f() { try { return 'try'; } finally { return 'finally'; } } f()";
    assert_eq!(eval(source), JsValue::from("finally"));
}

#[test]
fn test_finally_runs_on_break() {
    let source = r#"
        var log = '';
        for (var i = 0; i < 3; i++) {
            try { if (i === 1) break; log += i; } finally { log += 'f'; }
        }
        log
    "#;
    assert_eq!(eval(source), JsValue::from("0ff"));
}

#[test]
fn test_optional_catch_binding() {
    assert_eq!(eval("try { null.x; } catch { 'caught' }"), JsValue::from("caught"));
}

#[test]
fn test_uncaught_throw_escapes() {
    assert!(throws_error("throw new RangeError('too far')", "RangeError: too far"));
}

#[test]
fn test_with_statement_resolves_through_object() {
    let source = "var o = { x: 2 }; var x = 1; with (o) { x = x + 40; } o.x + x";
    assert_eq!(eval(source), JsValue::Number(43.0));
}
