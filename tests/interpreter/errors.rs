//! Error objects, engine-raised errors and fatal errors

use super::{eval, throws_error};
use jsrun::{JsError, JsValue, Runtime, RuntimeConfig};

#[test]
fn test_error_constructors() {
    let source = r#"
        var e = new RangeError('out of range', { cause: 'why' });
        [e.name, e.message, e.cause, String(e), e instanceof RangeError, e instanceof Error].join('|')
    "#;
    assert_eq!(eval(source), JsValue::from("RangeError|out of range|why|RangeError: out of range|true|true"));
}

#[test]
fn test_error_called_without_new() {
    assert_eq!(eval("var e = TypeError('plain call'); e instanceof TypeError && e.message === 'plain call'"), JsValue::Boolean(true));
}

#[test]
fn test_engine_errors_are_guest_errors() {
    let source = r#"
        var kinds = [];
        try { missingName; } catch (e) { kinds.push(e.constructor.name); }
        try { undefined.prop; } catch (e) { kinds.push(e.constructor.name); }
        try { new Array(-1); } catch (e) { kinds.push(e.constructor.name); }
        kinds.join()
    "#;
    assert_eq!(eval(source), JsValue::from("ReferenceError,TypeError,RangeError"));
}

#[test]
fn test_throwing_primitives() {
    assert_eq!(eval("try { throw 42; } catch (v) { v + 1 }"), JsValue::Number(43.0));
    assert!(throws_error("throw 'plain string'", "Uncaught plain string"));
}

#[test]
fn test_thrown_value_reaches_host() {
    let mut runtime = Runtime::new();
    let err = runtime.eval("throw { code: 7 }").unwrap_err();
    let value = match err {
        JsError::Thrown { value, .. } => value,
        _ => JsValue::Undefined,
    };
    assert_eq!(runtime.get(&value, "code").unwrap(), JsValue::Number(7.0));
}

#[test]
fn test_early_errors_are_reported_together() {
    let err = Runtime::new().eval("let a; let a; let b; let b;").unwrap_err();
    assert!(matches!(&err, JsError::EarlyErrors(errors) if errors.len() == 2));
}

#[test]
fn test_strict_mode_early_errors() {
    assert!(throws_error("'use strict'; with ({}) {}", "SyntaxError"));
    assert!(throws_error("'use strict'; var eval = 1;", "SyntaxError"));
    assert!(throws_error("function f(a, a) { 'use strict'; }", "SyntaxError"));
}

#[test]
fn test_invalid_break_target_is_early_error() {
    assert!(throws_error("while (true) { break nowhere; }", "SyntaxError"));
    assert!(throws_error("function f() { continue; }", "SyntaxError"));
}

#[test]
fn test_step_limit_is_uncatchable() {
    let config = RuntimeConfig {
        max_steps: 10_000,
        ..RuntimeConfig::default()
    };
    let mut runtime = Runtime::with_config(config);
    let err = runtime.eval("try { while (true) {} } catch (e) { 'caught' }").unwrap_err();
    assert!(matches!(err, JsError::StepLimitExceeded(10_000)));
}

#[test]
fn test_strict_config_applies_to_scripts() {
    let config = RuntimeConfig {
        strict: true,
        ..RuntimeConfig::default()
    };
    let mut runtime = Runtime::with_config(config);
    let err = runtime.eval("undeclaredTarget = 1;").unwrap_err();
    assert!(err.to_string().contains("ReferenceError"));
}

#[test]
fn test_config_from_json() {
    let config: RuntimeConfig = serde_json::from_str(r#"{ "max_call_depth": 8 }"#).unwrap();
    let mut runtime = Runtime::with_config(config);
    let source = "function depth(n) { try { return depth(n + 1); } catch (e) { return n; } } depth(0)";
    let reached = runtime.eval(source).unwrap();
    assert!(matches!(reached, JsValue::Number(n) if n <= 8.0));
}
