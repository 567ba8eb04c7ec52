//! Promises and the job queue

use super::RecordingHost;
use jsrun::{JsValue, Runtime};

/// Run `setup`, drain jobs, then evaluate `check` in the same runtime.
fn run_then(setup: &str, check: &str) -> JsValue {
    let mut runtime = Runtime::new();
    runtime.eval(setup).unwrap();
    runtime.eval(check).unwrap()
}

#[test]
fn test_then_callbacks_run_as_jobs() {
    let source = r#"
        var log = [];
        Promise.resolve().then(() => log.push('job'));
        log.push('sync');
    "#;
    assert_eq!(run_then(source, "log.join()"), JsValue::from("sync,job"));
}

#[test]
fn test_jobs_run_in_fifo_order() {
    let source = r#"
        var log = [];
        var p = Promise.resolve();
        p.then(() => { log.push(1); Promise.resolve().then(() => log.push(3)); });
        p.then(() => log.push(2));
    "#;
    assert_eq!(run_then(source, "log.join()"), JsValue::from("1,2,3"));
}

#[test]
fn test_chaining_transforms_values() {
    let source = r#"
        var out;
        Promise.resolve(1)
            .then(v => v + 1)
            .then(v => new Promise(resolve => resolve(v * 10)))
            .then(v => { out = v; });
    "#;
    assert_eq!(run_then(source, "out"), JsValue::Number(20.0));
}

#[test]
fn test_executor_throw_rejects() {
    let source = r#"
        var reason;
        new Promise(() => { throw new Error('in executor'); }).catch(e => { reason = e.message; });
    "#;
    assert_eq!(run_then(source, "reason"), JsValue::from("in executor"));
}

#[test]
fn test_resolve_functions_settle_once() {
    let source = r#"
        var seen = [];
        new Promise((resolve, reject) => { resolve('first'); resolve('second'); reject('third'); })
            .then(v => seen.push(v), r => seen.push('rejected ' + r));
    "#;
    assert_eq!(run_then(source, "seen.join()"), JsValue::from("first"));
}

#[test]
fn test_resolving_with_itself_is_type_error() {
    let source = r#"
        var kind;
        var resolveLater;
        var p = new Promise(resolve => { resolveLater = resolve; });
        resolveLater(p);
        p.catch(e => { kind = e instanceof TypeError; });
    "#;
    assert_eq!(run_then(source, "kind"), JsValue::Boolean(true));
}

#[test]
fn test_thenable_adoption() {
    let source = r#"
        var out;
        var thenable = { then(resolve) { resolve('adopted'); } };
        Promise.resolve(thenable).then(v => { out = v; });
    "#;
    assert_eq!(run_then(source, "out"), JsValue::from("adopted"));
}

#[test]
fn test_finally_passes_value_through() {
    let source = r#"
        var log = [];
        Promise.resolve('v')
            .finally(() => { log.push('finally'); return 'ignored'; })
            .then(v => log.push(v));
        Promise.reject('r')
            .finally(() => log.push('finally2'))
            .catch(r => log.push('caught ' + r));
    "#;
    assert_eq!(run_then(source, "log.join()"), JsValue::from("finally,finally2,v,caught r"));
}

#[test]
fn test_promise_resolve_returns_same_promise() {
    let source = "var p = Promise.resolve(1); var same = Promise.resolve(p) === p;";
    assert_eq!(run_then(source, "same"), JsValue::Boolean(true));
}

#[test]
fn test_unhandled_rejection_is_reported() {
    let host = RecordingHost::default();
    let mut runtime = Runtime::new();
    runtime.set_host(host.clone());
    runtime.eval("var lost = Promise.reject(new Error('lost'));").unwrap();
    assert_eq!(runtime.unhandled_rejections().len(), 1);
    assert_eq!(host.rejections.borrow().as_slice(), ["Error: lost".to_string()]);

    let lost = runtime.get_global("lost").unwrap();
    let (promise, reason) = host.rejected.borrow()[0].clone();
    assert_eq!(JsValue::Object(promise), lost);
    assert_eq!(runtime.unhandled_rejections()[0].promise, promise);
    assert_eq!(runtime.get(&reason, "message").unwrap(), JsValue::from("lost"));
}

#[test]
fn test_unhandled_rejections_cover_latest_drain_only() {
    let mut runtime = Runtime::new();
    runtime.eval("Promise.reject(1); Promise.reject(2);").unwrap();
    assert_eq!(runtime.unhandled_rejections().len(), 2);
    runtime.eval("Promise.reject(3);").unwrap();
    let reasons: Vec<JsValue> = runtime
        .unhandled_rejections()
        .iter()
        .map(|rejection| rejection.reason.clone())
        .collect();
    assert_eq!(reasons, vec![JsValue::Number(3.0)]);
    runtime.eval("1").unwrap();
    assert!(runtime.unhandled_rejections().is_empty());
}

#[test]
fn test_handled_rejection_is_not_reported() {
    let mut runtime = Runtime::new();
    runtime
        .eval("var p = Promise.reject(1); Promise.resolve().then(() => p.catch(() => {}));")
        .unwrap();
    assert!(runtime.unhandled_rejections().is_empty());
}

#[test]
fn test_run_jobs_is_idempotent_when_queue_is_empty() {
    let mut runtime = Runtime::new();
    runtime.eval("1").unwrap();
    runtime.run_jobs().unwrap();
    assert_eq!(runtime.stats().jobs_run, 0);
}
