//! Async functions, async generators and for-await

use super::eval;
use jsrun::{JsValue, Runtime};

#[test]
fn test_async_function_returns_promise() {
    assert_eq!(eval("async function f() { return 1; } f() instanceof Promise"), JsValue::Boolean(true));
}

#[test]
fn test_await_result_after_jobs_run() {
    let source = r#"
        var result;
        async function f() {
            var a = await 1;
            var b = await Promise.resolve(2);
            return a + b;
        }
        f().then(v => { result = v; });
        result
    "#;
    // The script's own completion value is observed before any job runs.
    assert_eq!(eval(source), JsValue::Undefined);

    let mut runtime = Runtime::new();
    runtime.eval(source).unwrap();
    assert_eq!(runtime.get_global("result").unwrap(), JsValue::Number(3.0));
}

#[test]
fn test_await_never_resumes_synchronously() {
    let mut runtime = Runtime::new();
    let source = r#"
        var log = [];
        async function f() { log.push('start'); await null; log.push('resumed'); }
        f();
        log.push('after call');
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.eval("log.join()").unwrap(), JsValue::from("start,after call,resumed"));
}

#[test]
fn test_await_rejection_is_catchable() {
    let mut runtime = Runtime::new();
    let source = r#"
        var caught;
        async function f() {
            try { await Promise.reject(new Error('nope')); }
            catch (e) { caught = e.message; }
        }
        f();
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.get_global("caught").unwrap(), JsValue::from("nope"));
}

#[test]
fn test_async_throw_rejects_promise() {
    let mut runtime = Runtime::new();
    runtime
        .eval("var reason; async function f() { throw 'bad'; } f().catch(r => { reason = r; });")
        .unwrap();
    assert_eq!(runtime.get_global("reason").unwrap(), JsValue::from("bad"));
    assert!(runtime.unhandled_rejections().is_empty());
}

#[test]
fn test_async_arrow_and_method() {
    let mut runtime = Runtime::new();
    let source = r#"
        var out = [];
        var o = { async m() { return 'method'; } };
        var arrow = async (x) => (await x) * 2;
        o.m().then(v => out.push(v));
        arrow(Promise.resolve(21)).then(v => out.push(v));
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.eval("out.join()").unwrap(), JsValue::from("method,42"));
}

#[test]
fn test_interleaving_of_two_async_functions() {
    let mut runtime = Runtime::new();
    let source = r#"
        var log = [];
        async function a() { log.push('a1'); await 0; log.push('a2'); await 0; log.push('a3'); }
        async function b() { log.push('b1'); await 0; log.push('b2'); }
        a(); b();
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.eval("log.join()").unwrap(), JsValue::from("a1,b1,a2,b2,a3"));
}

#[test]
fn test_async_generator_queue() {
    let mut runtime = Runtime::new();
    let source = r#"
        var results = [];
        async function* g() { yield 1; yield await Promise.resolve(2); }
        var it = g();
        it.next().then(r => results.push(r.value));
        it.next().then(r => results.push(r.value));
        it.next().then(r => results.push(r.done));
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.eval("results.join()").unwrap(), JsValue::from("1,2,true"));
}

#[test]
fn test_for_await_over_async_generator() {
    let mut runtime = Runtime::new();
    let source = r#"
        var total = 0;
        async function* numbers() { yield 1; yield 2; yield 3; }
        async function sum() { for await (const n of numbers()) total += n; return total; }
        sum();
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.get_global("total").unwrap(), JsValue::Number(6.0));
}

#[test]
fn test_for_await_over_sync_iterable_of_promises() {
    let mut runtime = Runtime::new();
    let source = r#"
        var seen = [];
        (async () => {
            for await (const v of [Promise.resolve('x'), 'y']) seen.push(v);
        })();
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.eval("seen.join()").unwrap(), JsValue::from("x,y"));
}

#[test]
fn test_async_generator_return_runs_finally() {
    let mut runtime = Runtime::new();
    let source = r#"
        var log = [];
        async function* g() { try { yield 1; yield 2; } finally { log.push('finally'); } }
        (async () => {
            for await (const v of g()) { log.push(v); break; }
            log.push('after');
        })();
    "#;
    runtime.eval(source).unwrap();
    assert_eq!(runtime.eval("log.join()").unwrap(), JsValue::from("1,finally,after"));
}
