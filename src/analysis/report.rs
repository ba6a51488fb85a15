use crate::tree::Identifier;
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of analyzing one function body.
///
/// Diagnostics are kept in discovery order and may repeat; use
/// [`PurityReport::unique_diagnostics`] when presenting them. Reports of
/// impure callees are attached so a caller can show why a call was
/// rejected. A report is never modified after the analyzer returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurityReport {
    function: Identifier,
    diagnostics: Vec<String>,
    callees: Vec<PurityReport>,
}

impl PurityReport {
    pub(crate) fn new(
        function: Identifier,
        diagnostics: Vec<String>,
        callees: Vec<PurityReport>,
    ) -> Self {
        Self {
            function,
            diagnostics,
            callees,
        }
    }

    /// Name of the analyzed function.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Whether the body qualifies for the parallelizing rewrite.
    pub fn ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Diagnostics with repeats removed, first occurrence order kept.
    pub fn unique_diagnostics(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.diagnostics
            .iter()
            .map(String::as_str)
            .filter(|d| seen.insert(*d))
            .collect()
    }

    /// Reports of the impure callees this function calls.
    pub fn callee_reports(&self) -> &[PurityReport] {
        &self.callees
    }

    /// Whether any diagnostic contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.diagnostics.iter().any(|d| d.contains(needle))
    }

    /// `function <name>: <diagnostic>` lines for this report followed by
    /// those of its callees, depth first.
    pub fn trace(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.collect_trace(&mut lines);
        lines
    }

    fn collect_trace(&self, lines: &mut Vec<String>) {
        lines.extend(
            self.unique_diagnostics()
                .into_iter()
                .map(|d| format!("function {}: {}", self.function, d)),
        );
        for callee in &self.callees {
            callee.collect_trace(lines);
        }
    }

    /// JSON rendering for structured output.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_diagnostics_keeps_order() {
        let report = PurityReport::new(
            "f".into(),
            vec!["b".into(), "a".into(), "b".into()],
            vec![],
        );
        assert_eq!(report.unique_diagnostics(), vec!["b", "a"]);
        assert!(!report.ok());
    }

    #[test]
    fn test_trace_includes_callees() {
        let inner = PurityReport::new("g".into(), vec!["prints which is a side-effect".into()], vec![]);
        let outer = PurityReport::new(
            "f".into(),
            vec!["calls g which is not strictly functional".into()],
            vec![inner],
        );
        assert_eq!(
            outer.trace(),
            vec![
                "function f: calls g which is not strictly functional".to_string(),
                "function g: prints which is a side-effect".to_string(),
            ]
        );
    }

    #[test]
    fn test_json_rendering() {
        let report = PurityReport::new("f".into(), vec![], vec![]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"function\": \"f\""));
    }
}
