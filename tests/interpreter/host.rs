//! Host hooks and the embedding surface

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::printed;
use jsrun::interpreter::jobs::Job;
use jsrun::{HostHooks, JsValue, Runtime};

#[test]
fn test_print_goes_to_host() {
    let lines = printed("print('a', 1, true); print([1, 2], null, Symbol('s'));");
    assert_eq!(lines, vec!["a 1 true".to_string(), "1,2 null Symbol(s)".to_string()]);
}

#[derive(Default)]
struct CountingScheduler {
    enqueued: Rc<Cell<usize>>,
}

impl HostHooks for CountingScheduler {
    fn enqueue_job(&mut self, job: Job, queue: &mut VecDeque<Job>) {
        self.enqueued.set(self.enqueued.get() + 1);
        queue.push_back(job);
    }
}

#[test]
fn test_jobs_are_scheduled_through_host() {
    let enqueued = Rc::new(Cell::new(0));
    let mut runtime = Runtime::new();
    runtime.set_host(CountingScheduler {
        enqueued: Rc::clone(&enqueued),
    });
    runtime
        .eval("var n = 0; Promise.resolve().then(() => n++).then(() => n++);")
        .unwrap();
    assert_eq!(runtime.get_global("n").unwrap(), JsValue::Number(2.0));
    assert_eq!(enqueued.get(), 2);
    assert_eq!(runtime.stats().jobs_run, 2);
}

#[test]
fn test_state_persists_between_evals() {
    let mut runtime = Runtime::new();
    runtime.eval("var total = 1; function add(n) { total += n; }").unwrap();
    runtime.eval("add(41)").unwrap();
    assert_eq!(runtime.get_global("total").unwrap(), JsValue::Number(42.0));
}

#[test]
fn test_from_json_builds_guest_values() {
    let mut runtime = Runtime::new();
    let data = runtime.from_json(&serde_json::json!({ "items": [1, 2, 3], "label": "sum" }));
    runtime.eval("function summarize(d) { return d.label + '=' + d.items.reduce((a, b) => a + b, 0); }").unwrap();
    let summarize = runtime.get_global("summarize").unwrap();
    let result = runtime.call(&summarize, JsValue::Undefined, &[data]).unwrap();
    assert_eq!(result, JsValue::from("sum=6"));
}

#[test]
fn test_to_json_follows_stringify_rules() {
    let mut runtime = Runtime::new();
    let value = runtime
        .eval("({ kept: [1, undefined, 'x'], skipped: undefined, fn() {}, nested: { ok: true } })")
        .unwrap();
    assert_eq!(
        runtime.to_json(&value).unwrap(),
        serde_json::json!({ "kept": [1, null, "x"], "nested": { "ok": true } })
    );
}

#[test]
fn test_call_drains_jobs() {
    let mut runtime = Runtime::new();
    runtime
        .eval("var done = false; async function work() { await null; done = true; }")
        .unwrap();
    let work = runtime.get_global("work").unwrap();
    runtime.call(&work, JsValue::Undefined, &[]).unwrap();
    assert_eq!(runtime.get_global("done").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_stats_count_per_iteration_copies() {
    let mut runtime = Runtime::new();
    let copies_after = |runtime: &mut Runtime, source: &str| {
        let before = runtime.stats().per_iteration_copies;
        runtime.eval(source).unwrap();
        runtime.stats().per_iteration_copies - before
    };
    // One copy before the first test, then one after every iteration.
    assert_eq!(copies_after(&mut runtime, "for (let i = 0; i < 5; i++) {}"), 6);
    assert_eq!(copies_after(&mut runtime, "for (let i = 0; i < 1; i++) {}"), 2);
    assert_eq!(copies_after(&mut runtime, "for (let i = 0; i < 0; i++) {}"), 1);
    assert_eq!(copies_after(&mut runtime, "for (let i = 0; ; i++) { if (i === 2) break; }"), 3);
    assert_eq!(copies_after(&mut runtime, "for (const i = 0; false; ) {} for (var j = 0; j < 3; j++) {}"), 0);
}
