mod common;

use common::*;
use pretty_assertions::assert_eq;
use purepar::analysis::{analyze, PurityAnalyzer};
use purepar::config::{AnalysisConfig, MutualRecursionPolicy};
use purepar::tree::build::*;
use purepar::{FunctionDef, FunctionTable, NativeFn, Value};

fn check(def: FunctionDef, expected: bool) {
    let report = analyze(&def, &analyzer_env());
    assert_eq!(
        report.ok(),
        expected,
        "{} {} supposed to be functional: {:?}",
        def.name,
        if expected { "was" } else { "was NOT" },
        report.diagnostics()
    );
}

#[test]
fn test_is_functional() {
    check(calling_a_method(), false);
    check(double_assign(), false);
    check(calling_a_function(), true);
    check(subscript_assignment(), false);
    check(tuple_assignment(), false);
    check(calls_a_non_functional_function(), false);
    check(print_is_a_side_effect(), false);
    check(assigns_to_a_non_functional_function(), false);
    check(uses_globals(), false);
}

#[test]
fn test_method_call_names_receiver_and_method() {
    let report = analyze(&calling_a_method(), &analyzer_env());
    assert_eq!(
        report.diagnostics(),
        ["calling awesome.callmethod may produce side-effects"]
    );
}

#[test]
fn test_global_declaration() {
    let report = analyze(&uses_globals(), &analyzer_env());
    assert_eq!(report.diagnostics(), ["accesses global variables"]);
}

#[test]
fn test_double_assignment_reported_once() {
    let def = FunctionDef::new(
        "thrice",
        Vec::<String>::new(),
        vec![
            assign(name("a"), int(1)),
            assign(name("a"), int(2)),
            assign(name("a"), int(3)),
            assign(name("b"), int(1)),
            assign(name("b"), int(2)),
        ],
    );
    let report = analyze(&def, &FunctionTable::new());
    assert_eq!(
        report.diagnostics(),
        [
            "variable a is assigned to more than once",
            "variable b is assigned to more than once",
        ]
    );
}

#[test]
fn test_tuple_assignment_always_flagged() {
    let def = FunctionDef::new(
        "unpack",
        ["pair"],
        vec![
            assign(tuple(vec![name("a"), name("b")]), name("pair")),
            ret(add(name("a"), name("b"))),
        ],
    );
    let report = analyze(&def, &FunctionTable::new());
    assert_eq!(
        report.diagnostics(),
        ["unpacks into a tuple target which breaks single assignment"]
    );
}

#[test]
fn test_subscript_assignment_diagnostics() {
    let report = analyze(&subscript_assignment(), &analyzer_env());
    assert!(report.mentions("assigns to a subscript of lines"));
    assert!(report.mentions("assigns to a subscript of x"));
    assert!(report.mentions("variable lines is assigned to more than once"));
}

#[test]
fn test_transitive_impurity_carries_callee_report() {
    let report = analyze(&calls_a_non_functional_function(), &analyzer_env());
    assert_eq!(
        report.diagnostics(),
        ["calls print_is_a_side_effect which is not strictly functional"]
    );
    assert_eq!(report.callee_reports().len(), 1);
    assert_eq!(
        report.trace(),
        vec![
            "function calls_a_non_functional_function: calls print_is_a_side_effect which is not strictly functional".to_string(),
            "function print_is_a_side_effect: prints which is a side-effect".to_string(),
        ]
    );
}

#[test]
fn test_independent_pure_calls_pass() {
    let report = analyze(&pre_several_results(), &rewriter_env());
    assert!(report.ok());
    assert!(report.diagnostics().is_empty());
}

#[test]
fn test_unresolved_callee_is_rejected() {
    let def = FunctionDef::new(
        "mystery",
        Vec::<String>::new(),
        vec![ret(call(name("nowhere"), vec![]))],
    );
    let report = analyze(&def, &FunctionTable::new());
    assert_eq!(report.diagnostics(), ["calls nowhere which cannot be resolved"]);
}

#[test]
fn test_computed_callee_is_rejected() {
    let def = FunctionDef::new(
        "computed",
        ["fs"],
        vec![ret(call(subscript(name("fs"), int(0)), vec![]))],
    );
    let report = analyze(&def, &FunctionTable::new());
    assert_eq!(
        report.diagnostics(),
        ["calls a computed callee which cannot be analyzed"]
    );
}

#[test]
fn test_free_name_read_is_global_access() {
    let def = FunctionDef::new(
        "reads_free",
        Vec::<String>::new(),
        vec![ret(add(name("limit"), name("limit")))],
    );
    let report = analyze(&def, &FunctionTable::new());
    assert_eq!(report.diagnostics(), ["accesses global variables"]);
}

#[test]
fn test_assigning_a_parameter_is_reassignment() {
    let def = FunctionDef::new(
        "shadow",
        ["n"],
        vec![assign(name("n"), int(1)), ret(name("n"))],
    );
    let report = analyze(&def, &FunctionTable::new());
    assert_eq!(report.diagnostics(), ["variable n is assigned to more than once"]);
}

#[test]
fn test_natives_follow_declared_purity() {
    let env = FunctionTable::new()
        .pure_native(NativeFn::new("abs", 1, |args| Ok(args[0].clone())))
        .native(NativeFn::new("now", 0, |_| Ok(Value::Int(0))), false);
    let pure = FunctionDef::new("p", ["n"], vec![ret(call(name("abs"), vec![name("n")]))]);
    let impure = FunctionDef::new("q", Vec::<String>::new(), vec![ret(call(name("now"), vec![]))]);
    assert!(analyze(&pure, &env).ok());
    assert_eq!(
        analyze(&impure, &env).diagnostics(),
        ["calls now which is not strictly functional"]
    );
}

#[test]
fn test_self_recursion_is_accepted() {
    let fact = FunctionDef::new(
        "fact",
        ["n"],
        vec![ret(mul(name("n"), call(name("fact"), vec![sub(name("n"), int(1))])))],
    );
    let env = FunctionTable::new().define(fact.clone());
    assert!(analyze(&fact, &env).ok());
}

fn ping_pong() -> (FunctionDef, FunctionTable) {
    let ping = FunctionDef::new("ping", ["n"], vec![ret(call(name("pong"), vec![name("n")]))]);
    let pong = FunctionDef::new("pong", ["n"], vec![ret(call(name("ping"), vec![name("n")]))]);
    let env = FunctionTable::new().define(ping.clone()).define(pong);
    (ping, env)
}

#[test]
fn test_mutual_recursion_rejected_by_default() {
    let (ping, env) = ping_pong();
    let report = analyze(&ping, &env);
    assert!(!report.ok());
    assert_eq!(
        report.diagnostics(),
        ["calls pong which is not strictly functional"]
    );
    assert_eq!(
        report.callee_reports()[0].diagnostics(),
        ["calls ping through a mutually recursive cycle"]
    );
}

#[test]
fn test_mutual_recursion_assumed_pure_when_configured() {
    let (ping, env) = ping_pong();
    let analyzer = PurityAnalyzer::with_config(
        &env,
        AnalysisConfig {
            mutual_recursion: MutualRecursionPolicy::AssumePure,
        },
    );
    assert!(analyzer.analyze(&ping).ok());
}

#[test]
fn test_nested_definition_shares_binding_set() {
    let inner = FunctionDef::new("inner", Vec::<String>::new(), vec![assign(name("a"), int(2))]);
    let def = FunctionDef::new(
        "outer",
        Vec::<String>::new(),
        vec![assign(name("a"), int(1)), function_def(inner)],
    );
    let report = analyze(&def, &FunctionTable::new());
    assert_eq!(report.diagnostics(), ["variable a is assigned to more than once"]);
}

#[test]
fn test_report_json_lists_diagnostics() {
    let report = analyze(&print_is_a_side_effect(), &analyzer_env());
    let json = report.to_json().unwrap();
    assert!(json.contains("prints which is a side-effect"));
}

fn shadowing_env() -> FunctionTable {
    FunctionTable::new()
        .define(FunctionDef::new("g", Vec::<String>::new(), vec![ret(int(1))]))
        .define(FunctionDef::new(
            "noisy",
            Vec::<String>::new(),
            vec![output(vec![string("side effect")]), ret(int(1))],
        ))
}

#[test]
fn test_local_shadowing_a_pure_function_is_rejected() {
    let def = FunctionDef::new(
        "shadowed_local",
        Vec::<String>::new(),
        vec![
            assign(name("g"), name("noisy")),
            assign(name("x"), call(name("g"), vec![])),
            ret(name("x")),
        ],
    );
    let report = analyze(&def, &shadowing_env());
    assert_eq!(report.diagnostics(), ["calls g which cannot be analyzed"]);
}

#[test]
fn test_parameter_shadowing_a_pure_function_is_rejected() {
    let def = FunctionDef::new(
        "shadowed_param",
        ["g"],
        vec![assign(name("x"), call(name("g"), vec![])), ret(name("x"))],
    );
    let report = analyze(&def, &shadowing_env());
    assert_eq!(report.diagnostics(), ["calls g which cannot be analyzed"]);
}
