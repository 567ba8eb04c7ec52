//! Garbage collection

use super::init_tracing;
use jsrun::{JsValue, Runtime, RuntimeConfig};

fn runtime_with_threshold(gc_threshold: usize) -> Runtime {
    init_tracing();
    Runtime::with_config(RuntimeConfig {
        gc_threshold,
        ..RuntimeConfig::default()
    })
}

const GARBAGE_LOOP: &str = "for (let i = 0; i < 100000; i++) { let o = {}; }";

#[test]
fn test_loop_garbage_stays_bounded_by_default() {
    let mut runtime = Runtime::new();
    let before = runtime.stats();
    runtime.eval(GARBAGE_LOOP).unwrap();
    let after = runtime.stats();
    assert!(after.collections > 0);
    assert!(after.environments < before.environments + 15_000);
    assert!(after.objects < before.objects + 15_000);
}

#[test]
fn test_loop_garbage_follows_threshold() {
    let mut runtime = runtime_with_threshold(1_000);
    let before = runtime.stats();
    runtime.eval(GARBAGE_LOOP).unwrap();
    let after = runtime.stats();
    assert!(after.environments < before.environments + 5_000);
    assert!(after.objects < before.objects + 5_000);
    // Collection frees copies; it does not change how many are made.
    assert_eq!(after.per_iteration_copies - before.per_iteration_copies, 100_001);
}

#[test]
fn test_zero_threshold_disables_collection() {
    let mut runtime = runtime_with_threshold(0);
    let before = runtime.stats();
    runtime.eval("for (let i = 0; i < 20000; i++) { let o = {}; }").unwrap();
    let after = runtime.stats();
    assert_eq!(after.collections, 0);
    assert!(after.objects >= before.objects + 20_000);
}

#[test]
fn test_closures_keep_their_iteration_environments() {
    let mut runtime = runtime_with_threshold(50);
    let source = "
        var fns = [];
        for (let i = 0; i < 2000; i++) { let junk = { i }; fns.push(() => i); }
        var sum = 0;
        for (const f of fns) sum += f();
        sum";
    assert_eq!(runtime.eval(source).unwrap(), JsValue::Number(1_999_000.0));
    assert!(runtime.stats().collections > 0);
}

#[test]
fn test_suspended_generator_survives_collection() {
    let mut runtime = runtime_with_threshold(50);
    let source = "
        function* count(n) { for (let i = 0; i < n; i++) { const item = { v: i }; yield item; } }
        let last = -1;
        for (const item of count(3000)) { let copy = { x: item.v }; last = copy.x; }
        last";
    assert_eq!(runtime.eval(source).unwrap(), JsValue::Number(2999.0));
}

#[test]
fn test_awaiting_async_function_survives_collection() {
    let mut runtime = runtime_with_threshold(50);
    let source = "
        async function worker(n) {
            let acc = 0;
            for (let i = 0; i < n; i++) {
                const box = { value: i };
                await null;
                acc += box.value === i ? 1 : 0;
            }
            return acc;
        }
        var result;
        worker(500).then((v) => { result = v; });";
    runtime.eval(source).unwrap();
    assert_eq!(runtime.get_global("result").unwrap(), JsValue::Number(500.0));
    assert!(runtime.stats().collections > 0);
}

#[test]
fn test_deep_recursion_survives_collection() {
    let mut runtime = runtime_with_threshold(100);
    let source = "
        function build(n) {
            if (n === 0) return [];
            const list = build(n - 1);
            list.push({ n });
            return list;
        }
        const list = build(2000);
        list.length + list[1999].n";
    assert_eq!(runtime.eval(source).unwrap(), JsValue::Number(4000.0));
}

#[test]
fn test_host_values_survive_until_released() {
    let mut runtime = runtime_with_threshold(50);
    let input = serde_json::json!({ "items": [1, 2, 3], "name": "kept" });
    let value = runtime.from_json(&input);
    let made = runtime.eval("({ made: 'here' })").unwrap();
    runtime
        .eval("var junk = 0; for (let i = 0; i < 5000; i++) { junk = { i }; }")
        .unwrap();
    runtime.collect_garbage();
    assert_eq!(runtime.to_json(&value).unwrap(), input);
    assert_eq!(runtime.get(&made, "made").unwrap(), JsValue::from("here"));

    let before = runtime.stats().objects;
    runtime.release_handles();
    let freed = runtime.collect_garbage();
    assert!(freed.objects >= 3);
    assert!(runtime.stats().objects < before);
}

#[test]
fn test_explicit_collection_keeps_reachable_objects() {
    let mut runtime = runtime_with_threshold(0);
    runtime
        .eval("var keep = { label: 'kept' }; (function () { for (let i = 0; i < 100; i++) { let tmp = { i }; } })(); 0")
        .unwrap();
    let before = runtime.stats();
    let freed = runtime.collect_garbage();
    assert!(freed.objects >= 100);
    assert!(freed.environments >= 100);
    assert_eq!(runtime.stats().objects, before.objects - freed.objects);
    assert_eq!(runtime.eval("keep.label").unwrap(), JsValue::from("kept"));
}
