//! Bindings: hoisting, block scoping, temporal dead zone, loop environments

use super::{eval, throws_error};
use jsrun::JsValue;

#[test]
fn test_var_and_function_hoisting() {
    assert_eq!(eval("var before = typeof later; function later() {} before"), JsValue::from("function"));
    assert_eq!(eval("var v = hoisted; var hoisted = 1; v"), JsValue::Undefined);
}

#[test]
fn test_let_is_block_scoped() {
    assert_eq!(eval("let x = 1; { let x = 2; } x"), JsValue::Number(1.0));
}

#[test]
fn test_temporal_dead_zone() {
    assert!(throws_error("{ x; let x = 1; }", "ReferenceError"));
    assert!(throws_error("typeof y; let y;", "ReferenceError"));
}

#[test]
fn test_const_assignment_is_type_error() {
    assert!(throws_error("const c = 1; c = 2;", "TypeError"));
}

#[test]
fn test_per_iteration_bindings_in_for_let() {
    let source = r#"
        var fns = [];
        for (let i = 0; i < 3; i++) fns.push(() => i);
        fns.map(f => f()).join()
    "#;
    assert_eq!(eval(source), JsValue::from("0,1,2"));
}

#[test]
fn test_shared_binding_in_for_var() {
    let source = r#"
        var fns = [];
        for (var i = 0; i < 3; i++) fns.push(() => i);
        fns.map(f => f()).join()
    "#;
    assert_eq!(eval(source), JsValue::from("3,3,3"));
}

#[test]
fn test_loop_body_closure_sees_update_of_its_own_copy() {
    let source = r#"
        var fns = [];
        for (let i = 0; i < 3; i++) { fns.push(() => i); i += 0; }
        fns[1]()
    "#;
    assert_eq!(eval(source), JsValue::Number(1.0));
}

#[test]
fn test_for_of_let_bindings_are_fresh() {
    let source = r#"
        var fns = [];
        for (const v of ['a', 'b']) fns.push(() => v);
        fns[0]() + fns[1]()
    "#;
    assert_eq!(eval(source), JsValue::from("ab"));
}

#[test]
fn test_closures_share_environment() {
    let source = r#"
        function counter() {
            let n = 0;
            return { inc: () => ++n, get: () => n };
        }
        var c = counter();
        c.inc(); c.inc();
        c.get()
    "#;
    assert_eq!(eval(source), JsValue::Number(2.0));
}

#[test]
fn test_lexical_redeclaration_is_early_error() {
    assert!(throws_error("let a; let a;", "SyntaxError"));
    assert!(throws_error("let b; var b;", "SyntaxError"));
}

#[test]
fn test_early_errors_prevent_any_evaluation() {
    let mut runtime = jsrun::Runtime::new();
    assert!(runtime.eval("globalThis.ran = true; let z; let z;").is_err());
    assert_eq!(runtime.eval("typeof ran").unwrap(), JsValue::from("undefined"));
}

#[test]
fn test_global_lexical_conflict_across_scripts() {
    let mut runtime = jsrun::Runtime::new();
    runtime.eval("let shared = 1;").unwrap();
    let err = runtime.eval("var shared = 2;").unwrap_err();
    assert!(err.to_string().contains("SyntaxError"));
    assert_eq!(runtime.get_global("shared").unwrap(), JsValue::Number(1.0));
}

#[test]
fn test_global_var_becomes_global_property() {
    assert_eq!(eval("var g = 5; globalThis.g"), JsValue::Number(5.0));
    assert_eq!(eval("let l = 5; globalThis.l"), JsValue::Undefined);
}

#[test]
fn test_block_function_is_hoisted_within_block() {
    assert_eq!(eval("{ var r = inner(); function inner() { return 3; } } r"), JsValue::Number(3.0));
}

#[test]
fn test_sloppy_assignment_creates_global_property() {
    assert_eq!(eval("x = 5; globalThis.x"), JsValue::Number(5.0));
    assert_eq!(eval("function f() { leaked = 'inner'; } f(); [typeof leaked, Object.keys(globalThis).indexOf('leaked') >= 0].join()"), JsValue::from("string,true"));
}
