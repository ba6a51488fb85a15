// Test utility module for purepar integration tests
#![allow(dead_code)]

use purepar::tree::build::*;
use purepar::{FunctionDef, FunctionTable, NativeFn, Value, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn no_params() -> Vec<String> {
    Vec::new()
}

// Fixtures for the purity analyzer

pub fn uses_globals() -> FunctionDef {
    FunctionDef::new("uses_globals", no_params(), vec![global(["a"])])
}

pub fn calling_a_method() -> FunctionDef {
    FunctionDef::new(
        "calling_a_method",
        no_params(),
        vec![expr_stmt(method_call(name("awesome"), "callmethod", vec![]))],
    )
}

pub fn double_assign() -> FunctionDef {
    FunctionDef::new(
        "double_assign",
        no_params(),
        vec![assign(name("awesome"), int(1)), assign(name("awesome"), int(2))],
    )
}

pub fn some_function() -> FunctionDef {
    FunctionDef::new("some_function", no_params(), vec![])
}

pub fn calling_a_function() -> FunctionDef {
    FunctionDef::new(
        "calling_a_function",
        no_params(),
        vec![expr_stmt(call(name("some_function"), vec![]))],
    )
}

pub fn subscript_assignment() -> FunctionDef {
    FunctionDef::new(
        "subscript_assignment",
        no_params(),
        vec![
            assign(name("lines"), tuple(vec![])),
            assign(subscript(name("lines"), int(0)), int(1)),
            assign(name("x"), tuple(vec![])),
            assign(
                subscript(name("x"), none()),
                tuple(vec![int(1), int(2), int(3)]),
            ),
        ],
    )
}

pub fn tuple_assignment() -> FunctionDef {
    FunctionDef::new(
        "tuple_assignment",
        no_params(),
        vec![
            assign(name("x"), int(0)),
            assign(name("y"), int(0)),
            assign(
                tuple(vec![name("x"), name("y")]),
                tuple(vec![int(1), int(1)]),
            ),
        ],
    )
}

pub fn not_functional() -> FunctionDef {
    FunctionDef::new(
        "not_functional",
        no_params(),
        vec![assign(name("a"), int(10)), assign(name("a"), int(20))],
    )
}

pub fn print_is_a_side_effect() -> FunctionDef {
    FunctionDef::new(
        "print_is_a_side_effect",
        no_params(),
        vec![output(vec![string("I produce side effects")])],
    )
}

pub fn calls_a_non_functional_function() -> FunctionDef {
    FunctionDef::new(
        "calls_a_non_functional_function",
        no_params(),
        vec![expr_stmt(call(name("print_is_a_side_effect"), vec![]))],
    )
}

pub fn assigns_to_a_non_functional_function() -> FunctionDef {
    FunctionDef::new(
        "assigns_to_a_non_functional_function",
        no_params(),
        vec![assign(name("x"), call(name("print_is_a_side_effect"), vec![]))],
    )
}

/// Every analyzer fixture, registered by name.
pub fn analyzer_env() -> FunctionTable {
    FunctionTable::new()
        .define(uses_globals())
        .define(calling_a_method())
        .define(double_assign())
        .define(some_function())
        .define(calling_a_function())
        .define(subscript_assignment())
        .define(tuple_assignment())
        .define(not_functional())
        .define(print_is_a_side_effect())
        .define(calls_a_non_functional_function())
        .define(assigns_to_a_non_functional_function())
}

// Fixtures for the rewriter

pub fn the_simplest_function() -> FunctionDef {
    FunctionDef::new("the_simplest_function", no_params(), vec![ret(int(10))])
}

pub fn pre_simple_parallelization() -> FunctionDef {
    FunctionDef::new(
        "pre_simple_parallelization",
        no_params(),
        vec![assign(name("x"), call(name("the_simplest_function"), vec![]))],
    )
}

pub fn pre_retrieve_results() -> FunctionDef {
    FunctionDef::new(
        "pre_retrieve_results",
        no_params(),
        vec![
            assign(name("x"), call(name("the_simplest_function"), vec![])),
            ret(name("x")),
        ],
    )
}

pub fn pre_several_results() -> FunctionDef {
    FunctionDef::new(
        "pre_several_results",
        no_params(),
        vec![
            assign(name("x"), call(name("the_simplest_function"), vec![])),
            assign(name("y"), call(name("the_simplest_function"), vec![])),
            ret(add(name("x"), name("y"))),
        ],
    )
}

pub fn rewriter_env() -> FunctionTable {
    FunctionTable::new().define(the_simplest_function())
}

// Counted natives

/// A native function that counts its invocations.
#[derive(Clone)]
pub struct CountedNative {
    pub calls: Arc<AtomicUsize>,
    pub function: NativeFn,
}

impl CountedNative {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// `name(n) = n * factor`, counting calls and sleeping `delay` first.
pub fn scaling_native(fn_name: &str, factor: i64, delay: Duration) -> CountedNative {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let function = NativeFn::new(fn_name, 1, move |args| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(delay);
        match &args[0] {
            Value::Int(n) => Ok(Value::Int(n * factor)),
            other => Err(purepar::Error::type_error(format!(
                "expected int, got {}",
                other.type_name()
            ))),
        }
    });
    CountedNative { calls, function }
}

/// A zero-argument native returning `value`, counting calls.
pub fn constant_native(fn_name: &str, value: i64) -> CountedNative {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let function = NativeFn::new(fn_name, 0, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Int(value))
    });
    CountedNative { calls, function }
}

pub fn pool(size: usize) -> Arc<WorkerPool> {
    Arc::new(WorkerPool::with_size(size).expect("worker pool"))
}
