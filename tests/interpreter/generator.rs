//! Generator functions

use super::{eval, throws_error};
use jsrun::JsValue;

#[test]
fn test_generator_yields_in_order() {
    let source = r#"
        function* count() { yield 1; yield 2; return 3; }
        var g = count();
        var a = g.next(), b = g.next(), c = g.next(), d = g.next();
        [a.value, a.done, b.value, c.value, c.done, d.value, d.done].join()
    "#;
    assert_eq!(eval(source), JsValue::from("1,false,2,3,true,,true"));
}

#[test]
fn test_body_does_not_run_before_first_next() {
    let source = r#"
        var started = false;
        function* g() { started = true; yield 1; }
        var it = g();
        var before = started;
        it.next();
        before + ':' + started
    "#;
    assert_eq!(eval(source), JsValue::from("false:true"));
}

#[test]
fn test_next_argument_becomes_yield_value() {
    let source = r#"
        function* echo() {
            var got = [];
            while (true) {
                var v = yield got.length;
                if (v === undefined) return got.join();
                got.push(v);
            }
        }
        var g = echo();
        g.next('ignored');
        g.next('a');
        g.next('b');
        g.next().value
    "#;
    assert_eq!(eval(source), JsValue::from("a,b"));
}

#[test]
fn test_yield_inside_expressions_and_loops() {
    let source = r#"
        function* squares(n) {
            for (let i = 1; i <= n; i++) {
                const total = (yield i * i) + 1;
            }
        }
        [...squares(4)].join()
    "#;
    assert_eq!(eval(source), JsValue::from("1,4,9,16"));
}

#[test]
fn test_return_runs_finally() {
    let source = r#"
        var log = [];
        function* g() {
            try { yield 1; yield 2; } finally { log.push('cleanup'); }
        }
        var it = g();
        it.next();
        var r = it.return('early');
        [r.value, r.done, log.join(), it.next().done].join()
    "#;
    assert_eq!(eval(source), JsValue::from("early,true,cleanup,true"));
}

#[test]
fn test_yield_in_finally_delays_return() {
    let source = r#"
        function* g() {
            try { yield 1; } finally { yield 'from finally'; }
        }
        var it = g();
        it.next();
        var r1 = it.return('done');
        var r2 = it.next();
        [r1.value, r1.done, r2.value, r2.done].join()
    "#;
    assert_eq!(eval(source), JsValue::from("from finally,false,done,true"));
}

#[test]
fn test_throw_is_catchable_inside_generator() {
    let source = r#"
        function* g() {
            try { yield 1; } catch (e) { yield 'caught ' + e; }
        }
        var it = g();
        it.next();
        it.throw('oops').value
    "#;
    assert_eq!(eval(source), JsValue::from("caught oops"));
}

#[test]
fn test_throw_on_fresh_generator_completes_it() {
    let source = r#"
        function* g() { yield 1; }
        var it = g();
        try { it.throw(new Error('x')); } catch (e) {}
        it.next().done
    "#;
    assert_eq!(eval(source), JsValue::Boolean(true));
}

#[test]
fn test_yield_star_delegates() {
    let source = r#"
        function* inner() { yield 'a'; yield 'b'; return 'inner done'; }
        function* outer() { var r = yield* inner(); yield r; }
        [...outer()].join()
    "#;
    assert_eq!(eval(source), JsValue::from("a,b,inner done"));
}

#[test]
fn test_yield_star_over_iterable() {
    assert_eq!(eval("function* g() { yield* [1, 2]; yield* 'xy'; } [...g()].join('')"), JsValue::from("12xy"));
}

#[test]
fn test_running_generator_cannot_be_resumed() {
    let source = r#"
        var it;
        function* g() { it.next(); }
        it = g();
        it.next();
    "#;
    assert!(throws_error(source, "TypeError"));
}

#[test]
fn test_generator_prototype_chain() {
    let source = r#"
        function* g() {}
        var it = g();
        Object.getPrototypeOf(it) === g.prototype && it[Symbol.iterator]() === it
    "#;
    assert_eq!(eval(source), JsValue::Boolean(true));
}

#[test]
fn test_generator_methods_and_destructuring() {
    let source = r#"
        var o = { *pairs() { yield [1, 'one']; yield [2, 'two']; } };
        var out = [];
        for (const [n, word] of o.pairs()) out.push(word + n);
        out.join()
    "#;
    assert_eq!(eval(source), JsValue::from("one1,two2"));
}

#[test]
fn test_infinite_generator_with_early_exit() {
    let source = r#"
        function* naturals() { let n = 0; while (true) yield n++; }
        var total = 0;
        for (const n of naturals()) { if (n > 10) break; total += n; }
        total
    "#;
    assert_eq!(eval(source), JsValue::Number(55.0));
}

#[test]
fn test_completed_generator_stays_completed() {
    let source = r#"
        var runs = 0;
        function* g() { runs++; yield 1; runs++; }
        var log = [], caught = [];
        function show(r) { log.push(r.value + ':' + r.done); }
        var it = g();
        show(it.next()); show(it.next());
        show(it.next()); show(it.next('ignored'));
        show(it.return(7)); show(it.return());
        try { it.throw(new Error('late')); } catch (e) { caught.push(e.message); }
        try { it.throw(2); } catch (e) { caught.push(e); }
        show(it.next());
        [runs, log.join(), caught.join()].join('|')
    "#;
    assert_eq!(
        eval(source),
        JsValue::from("2|1:false,undefined:true,undefined:true,undefined:true,7:true,undefined:true,undefined:true|late,2")
    );
}

#[test]
fn test_generator_finished_early_never_runs_its_body() {
    let source = r#"
        var runs = 0;
        function* g() { runs++; yield 1; }
        var returned = g(), thrown = g(), failing = (function* () { runs++; throw new Error('body'); })();
        var log = [];
        log.push(returned.return('r').value, returned.next().done, returned.next().value);
        try { thrown.throw('t'); } catch (e) { log.push(e); }
        log.push(thrown.next().done);
        try { failing.next(); } catch (e) { log.push(e.message); }
        log.push(failing.next().done, failing.return(4).value);
        [runs, log.join()].join('|')
    "#;
    assert_eq!(eval(source), JsValue::from("1|r,true,,t,true,body,true,4"));
}
