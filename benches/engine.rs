//! Engine benchmarks
//!
//! Run with: cargo bench --bench engine

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use jsrun::Runtime;
use jsrun::parser::parse_script;
use jsrun::string_dict::StringDict;

/// Plain counting loop with a var binding
const VAR_LOOP: &str = r#"
var sum = 0;
for (var i = 0; i < 2000; i++) { sum += i; }
sum
"#;

/// Closures capturing a per-iteration `let` binding
const CLOSURE_LOOP: &str = r#"
var fns = [];
for (let i = 0; i < 500; i++) { fns.push(() => i); }
fns.reduce((acc, f) => acc + f(), 0)
"#;

/// Generator resumed from a for-of loop
const GENERATOR: &str = r#"
function* range(n) { for (let i = 0; i < n; i++) yield i; }
var total = 0;
for (const v of range(1000)) total += v;
total
"#;

/// Chain of awaits drained through the job queue
const ASYNC_CHAIN: &str = r#"
var result;
async function chain(n) { var acc = 0; for (let i = 0; i < n; i++) acc += await i; return acc; }
chain(300).then(v => { result = v; });
"#;

fn generate_functions(count: usize) -> String {
    (0..count)
        .map(|i| format!("function f{i}(a, b) {{ let c = a + b; return c * {i}; }}\n"))
        .collect()
}

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");
    let workloads = [
        ("var_loop", VAR_LOOP),
        ("closure_loop", CLOSURE_LOOP),
        ("generator", GENERATOR),
        ("async_chain", ASYNC_CHAIN),
    ];
    for (name, source) in workloads {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut runtime = Runtime::new();
                black_box(runtime.eval(black_box(source)))
            })
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for count in [10, 100] {
        let source = generate_functions(count);
        group.bench_with_input(BenchmarkId::new("functions", count), &source, |b, source| {
            b.iter(|| {
                let mut dict = StringDict::new();
                black_box(parse_script(black_box(source), &mut dict, false))
            })
        });
    }
    group.finish();
}

fn bench_startup(c: &mut Criterion) {
    c.bench_function("runtime_new", |b| b.iter(|| black_box(Runtime::new())));
}

criterion_group!(benches, bench_eval, bench_parse, bench_startup);
criterion_main!(benches);
