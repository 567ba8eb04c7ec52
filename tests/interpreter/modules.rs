//! Modules: registration, linking, evaluation and import()

use jsrun::{HostHooks, JsError, JsValue, Runtime};

#[test]
fn test_named_and_default_exports() {
    let mut runtime = Runtime::new();
    runtime
        .register_module(
            "lib",
            "export const name = 'lib'; export function greet(who) { return 'hi ' + who; } export default 42;",
        )
        .unwrap();
    runtime
        .register_module(
            "main",
            "import answer, { name, greet as hello } from 'lib'; export const out = hello(name) + ':' + answer;",
        )
        .unwrap();
    let ns = runtime.eval_module("main").unwrap();
    assert_eq!(runtime.get(&ns, "out").unwrap(), JsValue::from("hi lib:42"));
}

#[test]
fn test_default_function_declaration() {
    let mut runtime = Runtime::new();
    runtime
        .register_module("f", "export default function double(x) { return x * 2; }")
        .unwrap();
    runtime
        .register_module("main", "import double from 'f'; export const v = double(8);")
        .unwrap();
    let ns = runtime.eval_module("main").unwrap();
    assert_eq!(runtime.get(&ns, "v").unwrap(), JsValue::Number(16.0));
}

#[test]
fn test_module_code_is_strict() {
    let mut runtime = Runtime::new();
    runtime
        .register_module("m", "export const topThis = typeof this; export const strict = (function() { return this; })() === undefined;")
        .unwrap();
    let ns = runtime.eval_module("m").unwrap();
    assert_eq!(runtime.get(&ns, "topThis").unwrap(), JsValue::from("undefined"));
    assert_eq!(runtime.get(&ns, "strict").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_imports_are_read_only() {
    let mut runtime = Runtime::new();
    runtime.register_module("a", "export let x = 1;").unwrap();
    runtime.register_module("main", "import { x } from 'a'; x = 2;").unwrap();
    let err = runtime.eval_module("main").unwrap_err();
    assert!(err.to_string().contains("TypeError"));
}

#[test]
fn test_namespace_object_rejects_writes() {
    let mut runtime = Runtime::new();
    runtime.register_module("a", "export let x = 1;").unwrap();
    runtime
        .register_module(
            "main",
            "import * as ns from 'a'; \
             export const tag = Object.prototype.toString.call(ns); \
             let threw = false; try { ns.x = 2; } catch (e) { threw = e instanceof TypeError; } \
             export const rejected = threw && ns.x === 1;",
        )
        .unwrap();
    let ns = runtime.eval_module("main").unwrap();
    assert_eq!(runtime.get(&ns, "tag").unwrap(), JsValue::from("[object Module]"));
    assert_eq!(runtime.get(&ns, "rejected").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_module_that_throws_stays_errored() {
    let mut runtime = Runtime::new();
    runtime
        .register_module("bad", "globalThis.runs = (globalThis.runs || 0) + 1; throw new Error('broken');")
        .unwrap();
    assert!(runtime.eval_module("bad").is_err());
    assert!(runtime.eval_module("bad").is_err());
    assert_eq!(runtime.get_global("runs").unwrap(), JsValue::Number(1.0));
}

#[test]
fn test_duplicate_registration_is_module_error() {
    let mut runtime = Runtime::new();
    runtime.register_module("dup", "").unwrap();
    assert!(matches!(
        runtime.register_module("dup", ""),
        Err(JsError::ModuleError { .. })
    ));
}

#[test]
fn test_unknown_module_is_module_error() {
    let mut runtime = Runtime::new();
    assert!(matches!(
        runtime.eval_module("nope"),
        Err(JsError::ModuleError { .. })
    ));
}

#[test]
fn test_dynamic_import_resolves_to_namespace() {
    let mut runtime = Runtime::new();
    runtime.register_module("dyn", "export const value = 'loaded';").unwrap();
    runtime
        .eval("var got; import('dyn').then(ns => { got = ns.value; });")
        .unwrap();
    assert_eq!(runtime.get_global("got").unwrap(), JsValue::from("loaded"));
}

#[test]
fn test_dynamic_import_of_missing_module_rejects() {
    let mut runtime = Runtime::new();
    runtime
        .eval("var message; import('missing').catch(e => { message = e.message; });")
        .unwrap();
    assert_eq!(
        runtime.get_global("message").unwrap(),
        JsValue::from("Cannot find module 'missing'")
    );
}

struct PrefixResolver;

impl HostHooks for PrefixResolver {
    fn resolve_dynamic_import(&mut self, specifier: &str, _referrer: Option<&str>) -> Result<String, String> {
        specifier
            .strip_prefix("app:")
            .map(|rest| format!("modules/{rest}"))
            .ok_or_else(|| format!("unsupported specifier {specifier}"))
    }
}

#[test]
fn test_dynamic_import_goes_through_host_resolution() {
    let mut runtime = Runtime::new();
    runtime.set_host(PrefixResolver);
    runtime.register_module("modules/config", "export default { debug: true };").unwrap();
    runtime
        .eval(
            "var debug, failure; \
             import('app:config').then(ns => { debug = ns.default.debug; }); \
             import('http://x').catch(e => { failure = e.message; });",
        )
        .unwrap();
    assert_eq!(runtime.get_global("debug").unwrap(), JsValue::Boolean(true));
    assert_eq!(
        runtime.get_global("failure").unwrap(),
        JsValue::from("unsupported specifier http://x")
    );
}
