//! Functions: parameters, this binding, arguments, bound functions

use super::{eval, throws_error};
use jsrun::{JsValue, Runtime, RuntimeConfig};

#[test]
fn test_default_and_rest_parameters() {
    let source = "function f(a, b = a + 1, ...rest) { return [a, b, rest.length].join(); } f(1) + '|' + f(1, 5, 6, 7)";
    assert_eq!(eval(source), JsValue::from("1,2,0|1,5,2"));
}

#[test]
fn test_parameter_expressions_see_earlier_parameters_only() {
    assert!(throws_error("function f(a = b, b) { return a; } f()", "ReferenceError"));
}

#[test]
fn test_name_and_length() {
    let source = "function named(a, b, c = 1, d) {} var anon = function() {}; var arrow = (x) => x; [named.name, named.length, anon.name, arrow.name, arrow.length].join()";
    assert_eq!(eval(source), JsValue::from("named,2,anon,arrow,1"));
}

#[test]
fn test_sloppy_this_is_global_and_strict_this_is_undefined() {
    assert_eq!(eval("function f() { return this; } f() === globalThis"), JsValue::Boolean(true));
    assert_eq!(eval("function f() { 'use strict'; return this; } f()"), JsValue::Undefined);
}

#[test]
fn test_method_this() {
    assert_eq!(eval("var o = { v: 4, m() { return this.v; } }; o.m()"), JsValue::Number(4.0));
}

#[test]
fn test_arrow_captures_this() {
    let source = r#"
        var o = {
            v: 'outer',
            m() { return [1].map(() => this.v)[0]; }
        };
        o.m()
    "#;
    assert_eq!(eval(source), JsValue::from("outer"));
}

#[test]
fn test_arguments_object() {
    let source = "function f() { return arguments.length + ':' + arguments[1]; } f('a', 'b', 'c')";
    assert_eq!(eval(source), JsValue::from("3:b"));
}

#[test]
fn test_arguments_is_unmapped() {
    let source = "function f(a) { arguments[0] = 'changed'; return a; } f('original')";
    assert_eq!(eval(source), JsValue::from("original"));
}

#[test]
fn test_call_apply_bind() {
    let source = r#"
        function show(greeting, mark) { return greeting + ' ' + this.name + mark; }
        var who = { name: 'w' };
        var bound = show.bind(who, 'hey');
        [show.call(who, 'hi', '!'), show.apply(who, ['yo', '?']), bound('.'), bound.name, bound.length].join('|')
    "#;
    assert_eq!(eval(source), JsValue::from("hi w!|yo w?|hey w.|bound show|1"));
}

#[test]
fn test_new_and_new_target() {
    let source = r#"
        function Point(x) {
            if (!new.target) return 'called';
            this.x = x;
        }
        Point.prototype.double = function() { return this.x * 2; };
        Point(1) + ':' + new Point(21).double()
    "#;
    assert_eq!(eval(source), JsValue::from("called:42"));
}

#[test]
fn test_constructor_returning_object_overrides_this() {
    assert_eq!(eval("function F() { this.a = 1; return { b: 2 }; } var f = new F(); f.a + ':' + f.b"), JsValue::from("undefined:2"));
}

#[test]
fn test_arrow_is_not_constructor() {
    assert!(throws_error("var A = () => {}; new A()", "TypeError"));
}

#[test]
fn test_calling_non_function_is_type_error() {
    assert!(throws_error("var x = 1; x()", "TypeError"));
}

#[test]
fn test_recursion() {
    assert_eq!(eval("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15)"), JsValue::Number(610.0));
}

#[test]
fn test_runaway_recursion_is_range_error() {
    assert!(throws_error("function down() { return down(); } down()", "Maximum call stack size exceeded"));
}

#[test]
fn test_stack_overflow_is_catchable() {
    let source = "function down() { return down(); } try { down(); } catch (e) { e instanceof RangeError }";
    assert_eq!(eval(source), JsValue::Boolean(true));
}

const DEPTH_LIMIT: usize = 3_000;

fn countdown_runtime() -> Runtime {
    let config = RuntimeConfig {
        max_call_depth: DEPTH_LIMIT,
        ..RuntimeConfig::default()
    };
    let mut runtime = Runtime::with_config(config);
    runtime
        .eval("function f(n) { return n === 0 ? 0 : 1 + f(n - 1); }")
        .unwrap();
    runtime
}

#[test]
fn test_recursion_just_below_call_depth_limit() {
    let mut runtime = countdown_runtime();
    let source = format!("f({})", DEPTH_LIMIT - 1);
    assert_eq!(runtime.eval(&source).unwrap(), JsValue::Number((DEPTH_LIMIT - 1) as f64));
}

#[test]
fn test_recursion_just_above_call_depth_limit() {
    let mut runtime = countdown_runtime();
    let source = format!("try {{ f({}); 'returned' }} catch (e) {{ e instanceof RangeError }}", DEPTH_LIMIT + 1);
    assert_eq!(runtime.eval(&source).unwrap(), JsValue::Boolean(true));
    assert_eq!(runtime.eval("f(5)").unwrap(), JsValue::Number(5.0));
}

#[test]
fn test_default_depth_allows_deep_recursion() {
    let source = "function f(n) { return n === 0 ? 0 : 1 + f(n - 1); } var a = f(120); var b = f(5000); var c; try { f(100000); } catch (e) { c = e instanceof RangeError; } [a, b, c].join()";
    assert_eq!(eval(source), JsValue::from("120,5000,true"));
}

#[test]
fn test_deep_constructor_and_super_chains() {
    let source = r#"
        function Node(n) { this.next = n === 0 ? null : new Node(n - 1); }
        class Base { constructor(n) { this.depth = n === 0 ? 0 : new Derived(n - 1).depth + 1; } }
        class Derived extends Base { constructor(n) { super(n); } }
        var list = new Node(2000), length = 0;
        while (list.next) { list = list.next; length++; }
        [length, new Derived(1500).depth].join()
    "#;
    assert_eq!(eval(source), JsValue::from("2000,1500"));
}

#[test]
fn test_deep_recursion_through_native_callbacks() {
    let source = "function f(n) { return n === 0 ? 0 : [n].map(function (x) { return f(x - 1) + 1; })[0]; } f(1500)";
    assert_eq!(eval(source), JsValue::Number(1500.0));
}

#[test]
fn test_function_constructor() {
    assert_eq!(eval("var add = new Function('a', 'b', 'return a + b'); add(2, 3)"), JsValue::Number(5.0));
}

#[test]
fn test_getters_and_setters() {
    let source = r#"
        var o = {
            _v: 1,
            get v() { return this._v * 10; },
            set v(x) { this._v = x; }
        };
        o.v = 4;
        o.v
    "#;
    assert_eq!(eval(source), JsValue::Number(40.0));
}
