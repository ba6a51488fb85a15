//! Purity Analyzer
//!
//! Decides whether a function body is safe to parallelize. The rule set is
//! conservative: a body passes only if it
//!
//! - produces no output,
//! - touches no global variables,
//! - makes no attribute (method) calls,
//! - binds every name at most once, and only to plain names,
//! - calls only functions that resolve in the environment and are
//!   themselves pure (self-recursion excepted).
//!
//! All violations are collected; the walk never stops at the first one.
//! The same tree and environment always produce the same report.

use super::environment::{Environment, FunctionKind};
use super::report::PurityReport;
use crate::config::{AnalysisConfig, MutualRecursionPolicy};
use crate::tree::{FunctionDef, Identifier, NodeRef, TreeNode};
use std::collections::{HashMap, HashSet};
use tracing::{debug, debug_span, trace};

/// Analyzes function bodies against an environment.
pub struct PurityAnalyzer<'e> {
    env: &'e dyn Environment,
    config: AnalysisConfig,
}

impl<'e> PurityAnalyzer<'e> {
    pub fn new(env: &'e dyn Environment) -> Self {
        Self::with_config(env, AnalysisConfig::default())
    }

    pub fn with_config(env: &'e dyn Environment, config: AnalysisConfig) -> Self {
        Self { env, config }
    }

    /// Analyze `def` and every function it transitively calls.
    pub fn analyze(&self, def: &FunctionDef) -> PurityReport {
        let mut session = Session::default();
        self.analyze_in(def, &mut session).report
    }

    fn analyze_in(&self, def: &FunctionDef, session: &mut Session) -> Analyzed {
        let _span = debug_span!("purity_analysis", function = %def.name).entered();

        session.stack.push(def.name.clone());
        let mut walker = BodyWalker::new(self, def, session);
        for stmt in &def.body {
            walker.visit(stmt);
        }
        let analyzed = walker.finish();
        session.stack.pop();

        debug!(
            function = %def.name,
            diagnostics = analyzed.report.diagnostics().len(),
            "purity analysis finished"
        );
        analyzed
    }
}

/// Analyze `def` with the default configuration.
pub fn analyze(def: &FunctionDef, env: &dyn Environment) -> PurityReport {
    PurityAnalyzer::new(env).analyze(def)
}

/// State shared by the recursive analysis of one root function.
#[derive(Default)]
struct Session {
    /// Functions currently being analyzed, outermost first
    stack: Vec<Identifier>,
    /// Reports that did not depend on what was on the stack
    finished: HashMap<Identifier, PurityReport>,
}

struct Analyzed {
    report: PurityReport,
    /// The result relied on an assumption about a function on the stack
    cycle_dependent: bool,
}

/// Walks one function body and collects its diagnostics.
struct BodyWalker<'a, 'e> {
    analyzer: &'a PurityAnalyzer<'e>,
    session: &'a mut Session,
    function: &'a FunctionDef,
    /// Parameters and every name assigned anywhere in the body
    locals: HashSet<Identifier>,
    /// Names bound so far (the variable binding set)
    bindings: HashSet<Identifier>,
    reported_reassignments: HashSet<Identifier>,
    reported_global_access: bool,
    diagnostics: Vec<String>,
    callees: Vec<PurityReport>,
    cycle_dependent: bool,
}

impl<'a, 'e> BodyWalker<'a, 'e> {
    fn new(
        analyzer: &'a PurityAnalyzer<'e>,
        function: &'a FunctionDef,
        session: &'a mut Session,
    ) -> Self {
        let mut locals: HashSet<Identifier> = function.params.iter().cloned().collect();
        for stmt in &function.body {
            collect_locals(stmt, &mut locals);
        }

        Self {
            analyzer,
            session,
            function,
            locals,
            bindings: function.params.iter().cloned().collect(),
            reported_reassignments: HashSet::new(),
            reported_global_access: false,
            diagnostics: Vec::new(),
            callees: Vec::new(),
            cycle_dependent: false,
        }
    }

    fn finish(self) -> Analyzed {
        Analyzed {
            report: PurityReport::new(self.function.name.clone(), self.diagnostics, self.callees),
            cycle_dependent: self.cycle_dependent,
        }
    }

    fn report(&mut self, diagnostic: String) {
        trace!(function = %self.function.name, %diagnostic, "purity violation");
        self.diagnostics.push(diagnostic);
    }

    fn visit(&mut self, node: &NodeRef) {
        match node.as_ref() {
            TreeNode::FunctionDef(nested) => {
                for stmt in &nested.body {
                    self.visit(stmt);
                }
            }
            TreeNode::Assign { targets, value } => {
                for target in targets {
                    self.visit_target(target);
                }
                self.visit(value);
            }
            TreeNode::Return { value } => {
                if let Some(value) = value {
                    self.visit(value);
                }
            }
            TreeNode::ExprStmt { value } => self.visit(value),
            TreeNode::OutputStmt { values } => {
                self.report("prints which is a side-effect".to_string());
                for value in values {
                    self.visit(value);
                }
            }
            TreeNode::GlobalDecl { .. } => self.report_global_access(),
            TreeNode::Call { callee, args } => {
                self.visit_callee(callee);
                for arg in args {
                    self.visit(arg);
                }
            }
            TreeNode::Name { id } => self.visit_read(id),
            TreeNode::Attribute { value, .. } => self.visit(value),
            TreeNode::Subscript { value, index } => {
                self.visit(value);
                self.visit(index);
            }
            TreeNode::Tuple { elements } => {
                for element in elements {
                    self.visit(element);
                }
            }
            TreeNode::Constant(_) => {}
            TreeNode::BinOp { left, right, .. } => {
                self.visit(left);
                self.visit(right);
            }
        }
    }

    /// Check one assignment target and record the names it binds.
    fn visit_target(&mut self, target: &NodeRef) {
        match target.as_ref() {
            TreeNode::Name { id } => self.bind(id),
            TreeNode::Tuple { elements } => {
                self.report(
                    "unpacks into a tuple target which breaks single assignment".to_string(),
                );
                for element in elements {
                    self.visit_target(element);
                }
            }
            TreeNode::Subscript { value, index } => {
                match value.dotted_path() {
                    Some(path) => self.report(format!(
                        "assigns to a subscript of {} which breaks single assignment",
                        path
                    )),
                    None => self.report(
                        "assigns to a subscript which breaks single assignment".to_string(),
                    ),
                }
                match value.as_ref() {
                    TreeNode::Name { id } => self.bind(id),
                    _ => self.visit(value),
                }
                self.visit(index);
            }
            TreeNode::Attribute { value, attr } => {
                let path = value
                    .dotted_path()
                    .map(|base| format!("{}.{}", base, attr))
                    .unwrap_or_else(|| attr.clone());
                self.report(format!("assigns to attribute {} which mutates an object", path));
                if value.dotted_path().is_none() {
                    self.visit(value);
                }
            }
            other => {
                self.report(format!("assigns to a {} which is not a variable", other.kind()));
                self.visit(target);
            }
        }
    }

    fn bind(&mut self, id: &Identifier) {
        if self.bindings.insert(id.clone()) {
            return;
        }
        if self.reported_reassignments.insert(id.clone()) {
            self.report(format!("variable {} is assigned to more than once", id));
        }
    }

    fn visit_read(&mut self, id: &str) {
        if self.locals.contains(id) || id == self.function.name {
            return;
        }
        if self.analyzer.env.resolve(id).is_none() {
            self.report_global_access();
        }
    }

    fn report_global_access(&mut self) {
        if !self.reported_global_access {
            self.reported_global_access = true;
            self.report("accesses global variables".to_string());
        }
    }

    fn visit_callee(&mut self, callee: &NodeRef) {
        match callee.as_ref() {
            TreeNode::Name { id } => self.visit_named_call(id),
            TreeNode::Attribute { value, attr } => {
                match value.dotted_path() {
                    Some(base) => {
                        self.report(format!(
                            "calling {}.{} may produce side-effects",
                            base, attr
                        ));
                    }
                    None => {
                        self.report(format!("calling .{} may produce side-effects", attr));
                        self.visit(value);
                    }
                }
            }
            _ => {
                self.report("calls a computed callee which cannot be analyzed".to_string());
                self.visit(callee);
            }
        }
    }

    fn visit_named_call(&mut self, name: &str) {
        // Parameters and locals shadow the environment at run time.
        if self.locals.contains(name) {
            self.report(format!("calls {} which cannot be analyzed", name));
            return;
        }

        if name == self.function.name {
            // Self-recursion: the body under analysis is the callee.
            return;
        }

        if self.session.stack.iter().any(|f| f == name) {
            self.cycle_dependent = true;
            if self.analyzer.config.mutual_recursion == MutualRecursionPolicy::Reject {
                self.report(format!(
                    "calls {} through a mutually recursive cycle",
                    name
                ));
            }
            return;
        }

        let Some(descriptor) = self.analyzer.env.resolve(name) else {
            self.report(format!("calls {} which cannot be resolved", name));
            return;
        };

        let callee_report = match descriptor.kind {
            FunctionKind::Native { pure: true, .. } => return,
            FunctionKind::Native { pure: false, .. } => None,
            FunctionKind::Defined(def) => Some(self.analyze_callee(&def)),
        };

        match callee_report {
            Some(report) if report.ok() => {}
            Some(report) => {
                self.report(format!("calls {} which is not strictly functional", name));
                self.callees.push(report);
            }
            None => {
                self.report(format!("calls {} which is not strictly functional", name));
            }
        }
    }

    fn analyze_callee(&mut self, def: &FunctionDef) -> PurityReport {
        if let Some(report) = self.session.finished.get(&def.name) {
            return report.clone();
        }

        let analyzed = self.analyzer.analyze_in(def, self.session);
        if analyzed.cycle_dependent {
            self.cycle_dependent = true;
        } else {
            self.session
                .finished
                .insert(def.name.clone(), analyzed.report.clone());
        }
        analyzed.report
    }
}

/// Collect every name an assignment in `node` binds, including names
/// inside nested definitions.
fn collect_locals(node: &NodeRef, locals: &mut HashSet<Identifier>) {
    match node.as_ref() {
        TreeNode::FunctionDef(nested) => {
            locals.extend(nested.params.iter().cloned());
            for stmt in &nested.body {
                collect_locals(stmt, locals);
            }
        }
        TreeNode::Assign { targets, .. } => {
            for target in targets {
                collect_target_names(target, locals);
            }
        }
        _ => {}
    }
}

fn collect_target_names(target: &NodeRef, locals: &mut HashSet<Identifier>) {
    match target.as_ref() {
        TreeNode::Name { id } => {
            locals.insert(id.clone());
        }
        TreeNode::Tuple { elements } => {
            for element in elements {
                collect_target_names(element, locals);
            }
        }
        TreeNode::Subscript { value, .. } => collect_target_names(value, locals),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FunctionTable;
    use crate::tree::build::*;

    fn no_params() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_empty_body_is_pure() {
        let def = FunctionDef::new("noop", no_params(), vec![]);
        assert!(analyze(&def, &FunctionTable::new()).ok());
    }

    #[test]
    fn test_output_statement() {
        let def = FunctionDef::new("noisy", no_params(), vec![output(vec![string("hi")])]);
        let report = analyze(&def, &FunctionTable::new());
        assert_eq!(report.diagnostics(), ["prints which is a side-effect"]);
    }

    #[test]
    fn test_reassignment_reported_once_per_name() {
        let def = FunctionDef::new(
            "thrice",
            no_params(),
            vec![
                assign(name("a"), int(1)),
                assign(name("a"), int(2)),
                assign(name("a"), int(3)),
            ],
        );
        let report = analyze(&def, &FunctionTable::new());
        assert_eq!(report.diagnostics(), ["variable a is assigned to more than once"]);
    }

    #[test]
    fn test_assigning_parameter_is_reassignment() {
        let def = FunctionDef::new("shadow", ["p"], vec![assign(name("p"), int(1))]);
        let report = analyze(&def, &FunctionTable::new());
        assert!(report.mentions("variable p is assigned to more than once"));
    }

    #[test]
    fn test_parameters_and_locals_are_not_globals() {
        let def = FunctionDef::new(
            "locals",
            ["p"],
            vec![assign(name("q"), add(name("p"), int(1))), ret(name("q"))],
        );
        assert!(analyze(&def, &FunctionTable::new()).ok());
    }

    #[test]
    fn test_free_name_read_is_global_access() {
        let def = FunctionDef::new(
            "reads_global",
            no_params(),
            vec![ret(add(name("counter"), name("other")))],
        );
        let report = analyze(&def, &FunctionTable::new());
        assert_eq!(report.diagnostics(), ["accesses global variables"]);
    }

    #[test]
    fn test_value_side_of_assignment_is_checked() {
        let def = FunctionDef::new(
            "nested",
            no_params(),
            vec![assign(
                name("x"),
                add(int(1), method_call(name("obj"), "get", vec![])),
            )],
        );
        let report = analyze(&def, &FunctionTable::new());
        assert_eq!(report.diagnostics(), ["calling obj.get may produce side-effects"]);
    }

    #[test]
    fn test_computed_callee_rejected() {
        let def = FunctionDef::new(
            "computed",
            ["fs"],
            vec![expr_stmt(call(subscript(name("fs"), int(0)), vec![]))],
        );
        let report = analyze(&def, &FunctionTable::new());
        assert_eq!(
            report.diagnostics(),
            ["calls a computed callee which cannot be analyzed"]
        );
    }

    #[test]
    fn test_call_through_parameter_is_rejected() {
        let env = FunctionTable::new().define(FunctionDef::new("g", no_params(), vec![ret(int(1))]));
        let def = FunctionDef::new("apply", ["g"], vec![ret(call(name("g"), vec![]))]);
        let report = analyze(&def, &env);
        assert_eq!(report.diagnostics(), ["calls g which cannot be analyzed"]);
    }

    #[test]
    fn test_self_recursion_is_accepted() {
        let def = FunctionDef::new(
            "countdown",
            ["n"],
            vec![ret(call(name("countdown"), vec![sub(name("n"), int(1))]))],
        );
        let env = FunctionTable::new().define(def.clone());
        assert!(analyze(&def, &env).ok());
    }
}
