//! Direct and indirect eval, and the dynamic code host policy

use super::{eval, throws_error};
use jsrun::{HostHooks, JsValue, Runtime};
use jsrun::realm::RealmId;

#[test]
fn test_eval_returns_completion_value() {
    assert_eq!(eval("eval('if (true) { 1; } else { 2; }')"), JsValue::Number(1.0));
    assert_eq!(eval("eval('')"), JsValue::Undefined);
}

#[test]
fn test_eval_lexical_declarations_stay_inside() {
    assert_eq!(eval("eval('let inner = 1; inner + 1')"), JsValue::Number(2.0));
    assert_eq!(eval("eval('let inner = 1;'); typeof inner"), JsValue::from("undefined"));
}

#[test]
fn test_global_eval_var_becomes_global() {
    assert_eq!(eval("(0, eval)('var fromEval = 7'); globalThis.fromEval"), JsValue::Number(7.0));
}

#[test]
fn test_eval_var_is_deletable() {
    assert_eq!(eval("eval('var temp = 1'); delete globalThis.temp"), JsValue::Boolean(true));
    assert_eq!(eval("var kept = 1; delete globalThis.kept"), JsValue::Boolean(false));
}

#[test]
fn test_eval_syntax_error_is_catchable() {
    assert_eq!(eval("try { eval('let let = 1 +'); } catch (e) { e instanceof SyntaxError }"), JsValue::Boolean(true));
}

#[test]
fn test_new_target_outside_function_is_early_error() {
    assert!(throws_error("eval('new.target')", "SyntaxError"));
    assert_eq!(eval("function f() { return eval('new.target'); } new f() === undefined"), JsValue::Boolean(false));
}

#[test]
fn test_eval_sees_this_of_caller() {
    assert_eq!(eval("var o = { m() { return eval('this'); } }; o.m() === o"), JsValue::Boolean(true));
}

struct NoDynamicCode;

impl HostHooks for NoDynamicCode {
    fn may_compile_dynamic_code(&mut self, _realm: RealmId) -> bool {
        false
    }
}

#[test]
fn test_host_can_forbid_dynamic_code() {
    let mut runtime = Runtime::new();
    runtime.set_host(NoDynamicCode);
    let source = r#"
        var kinds = [];
        try { eval('1'); } catch (e) { kinds.push(e.name); }
        try { new Function('return 1'); } catch (e) { kinds.push(e.name); }
        kinds.push(eval(5));
        kinds.join()
    "#;
    assert_eq!(runtime.eval(source).unwrap(), JsValue::from("EvalError,EvalError,5"));
}
