use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use purepar::runtime::{Callable, NativeFn, ResultsStore, Value, WorkerPool};
use purepar::tree::build::*;
use purepar::{FunctionDef, FunctionTable, Parallelizer, PureparConfig};
use std::hint::black_box;
use std::sync::Arc;

fn double() -> NativeFn {
    NativeFn::new("double", 1, |args| match &args[0] {
        Value::Int(n) => Ok(Value::Int(n * 2)),
        other => Ok(other.clone()),
    })
}

fn bench_dispatch_and_fetch(c: &mut Criterion) {
    let pool = Arc::new(WorkerPool::with_size(num_cpus::get()).expect("worker pool"));
    let callable: Arc<dyn Callable> = Arc::new(double());
    let mut group = c.benchmark_group("results_store");

    for tasks in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::new("dispatch_fetch", tasks), &tasks, |b, &tasks| {
            b.iter(|| {
                let store = ResultsStore::new(Arc::clone(&pool));
                for i in 0..tasks {
                    store
                        .submit(
                            format!("x{}", i),
                            "double",
                            Arc::clone(&callable),
                            vec![Value::Int(i as i64)],
                        )
                        .expect("submit");
                }
                for i in 0..tasks {
                    black_box(store.fetch(&format!("x{}", i)).expect("fetch"));
                }
            });
        });
    }

    group.bench_function("cached_fetch", |b| {
        let store = ResultsStore::new(Arc::clone(&pool));
        store
            .submit("x", "double", Arc::clone(&callable), vec![Value::Int(21)])
            .expect("submit");
        store.fetch("x").expect("fetch");
        b.iter(|| black_box(store.fetch("x").expect("fetch")));
    });

    group.finish();
}

fn bench_memoized_call(c: &mut Criterion) {
    let def = FunctionDef::new(
        "sum",
        ["a", "b"],
        vec![
            assign(name("x"), call(name("double"), vec![name("a")])),
            assign(name("y"), call(name("double"), vec![name("b")])),
            ret(add(name("x"), name("y"))),
        ],
    );
    let env = Arc::new(FunctionTable::new().pure_native(double()));
    let parallel = Parallelizer::new(env, PureparConfig::default())
        .expect("parallelizer")
        .parallelize(&def)
        .expect("parallelize");
    let args = [Value::Int(1), Value::Int(2)];
    parallel.call(&args).expect("warm up");

    c.bench_function("memoized_hit", |b| {
        b.iter(|| black_box(parallel.call(black_box(&args)).expect("call")))
    });
}

criterion_group!(benches, bench_dispatch_and_fetch, bench_memoized_call);
criterion_main!(benches);
