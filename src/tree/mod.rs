//! Tree Model
//!
//! Immutable, tagged-variant representation of a single function body as
//! produced by an external front end. Nodes carry no behavior; the purity
//! analyzer, the dataflow rewriter and the reference interpreter all work
//! by pattern matching over [`TreeNode`].
//!
//! Child nodes are reference counted ([`NodeRef`]) so that a rewrite can
//! return a new tree that shares every sub-tree it did not touch with the
//! original. Neither tree is ever mutated in place.
//!
//! # Example
//!
//! ```rust
//! use purepar::tree::build::*;
//! use purepar::tree::FunctionDef;
//!
//! // def several_results():
//! //     x = the_simplest_function()
//! //     y = the_simplest_function()
//! //     return x + y
//! let def = FunctionDef::new(
//!     "several_results",
//!     Vec::<String>::new(),
//!     vec![
//!         assign(name("x"), call(name("the_simplest_function"), vec![])),
//!         assign(name("y"), call(name("the_simplest_function"), vec![])),
//!         ret(add(name("x"), name("y"))),
//!     ],
//! );
//! assert_eq!(def.body.len(), 3);
//! ```

pub mod build;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a variable, parameter or function.
pub type Identifier = String;

/// Shared pointer to an immutable node.
pub type NodeRef = Arc<TreeNode>;

/// Literal values that can appear in a function body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Binary operators supported by the tree model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOperator {
    Add,
    Sub,
    Mul,
    /// Integer floor division
    Div,
    Mod,
}

impl BinOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOperator::Add => "+",
            BinOperator::Sub => "-",
            BinOperator::Mul => "*",
            BinOperator::Div => "//",
            BinOperator::Mod => "%",
        }
    }
}

impl fmt::Display for BinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A function definition: name, ordered parameters and ordered body.
///
/// In the un-rewritten form the body statements are evaluated strictly
/// in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Identifier,
    pub params: Vec<Identifier>,
    pub body: Vec<NodeRef>,
}

impl FunctionDef {
    pub fn new<P>(name: impl Into<Identifier>, params: P, body: Vec<NodeRef>) -> Self
    where
        P: IntoIterator,
        P::Item: Into<Identifier>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            body,
        }
    }

    /// Compare two definitions ignoring the function name.
    ///
    /// Two functions with different names but identical parameters and
    /// bodies have the same shape. Used to check a rewrite against a
    /// hand-written expected tree.
    pub fn same_shape(&self, other: &FunctionDef) -> bool {
        self.params == other.params && self.body == other.body
    }

    /// Whether `name` is one of this function's parameters.
    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }

    /// Parse a definition from the JSON interchange form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Render the definition into the JSON interchange form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A node of a function body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    /// A (possibly nested) function definition.
    FunctionDef(FunctionDef),
    /// `targets[0] = targets[1] = ... = value`
    Assign {
        targets: Vec<NodeRef>,
        value: NodeRef,
    },
    Return {
        value: Option<NodeRef>,
    },
    /// An expression evaluated for its effect only.
    ExprStmt {
        value: NodeRef,
    },
    /// A statement whose sole effect is external output.
    OutputStmt {
        values: Vec<NodeRef>,
    },
    /// Declares names as referring to module-level (global) variables.
    GlobalDecl {
        names: Vec<Identifier>,
    },
    Call {
        callee: NodeRef,
        args: Vec<NodeRef>,
    },
    Name {
        id: Identifier,
    },
    /// `value.attr`
    Attribute {
        value: NodeRef,
        attr: Identifier,
    },
    /// `value[index]`
    Subscript {
        value: NodeRef,
        index: NodeRef,
    },
    Tuple {
        elements: Vec<NodeRef>,
    },
    Constant(Constant),
    BinOp {
        left: NodeRef,
        op: BinOperator,
        right: NodeRef,
    },
}

impl TreeNode {
    /// The identifier of a `Name` node.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            TreeNode::Name { id } => Some(id),
            _ => None,
        }
    }

    /// Whether this node is a statement rather than an expression.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            TreeNode::FunctionDef(_)
                | TreeNode::Assign { .. }
                | TreeNode::Return { .. }
                | TreeNode::ExprStmt { .. }
                | TreeNode::OutputStmt { .. }
                | TreeNode::GlobalDecl { .. }
        )
    }

    /// Short variant name used in diagnostics and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            TreeNode::FunctionDef(_) => "function definition",
            TreeNode::Assign { .. } => "assignment",
            TreeNode::Return { .. } => "return",
            TreeNode::ExprStmt { .. } => "expression statement",
            TreeNode::OutputStmt { .. } => "output statement",
            TreeNode::GlobalDecl { .. } => "global declaration",
            TreeNode::Call { .. } => "call",
            TreeNode::Name { .. } => "name",
            TreeNode::Attribute { .. } => "attribute",
            TreeNode::Subscript { .. } => "subscript",
            TreeNode::Tuple { .. } => "tuple",
            TreeNode::Constant(_) => "constant",
            TreeNode::BinOp { .. } => "binary operation",
        }
    }

    /// Dotted rendering of a `Name`/`Attribute` chain, e.g. `obj.method`.
    ///
    /// Returns `None` for any other shape.
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            TreeNode::Name { id } => Some(id.clone()),
            TreeNode::Attribute { value, attr } => {
                value.dotted_path().map(|base| format!("{}.{}", base, attr))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    fn sample() -> FunctionDef {
        FunctionDef::new(
            "sample",
            ["a"],
            vec![
                assign(name("x"), call(name("f"), vec![name("a")])),
                ret(add(name("x"), int(1))),
            ],
        )
    }

    #[test]
    fn test_same_shape_ignores_name() {
        let mut other = sample();
        other.name = "renamed".to_string();
        assert!(sample().same_shape(&other));
        assert_ne!(sample(), other);
    }

    #[test]
    fn test_same_shape_detects_param_change() {
        let mut other = sample();
        other.params.push("b".to_string());
        assert!(!sample().same_shape(&other));
    }

    #[test]
    fn test_json_interchange() {
        let def = sample();
        let json = def.to_json().unwrap();
        let parsed = FunctionDef::from_json(&json).unwrap();
        assert_eq!(def, parsed);
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(
            attr(attr(name("a"), "b"), "c").dotted_path().as_deref(),
            Some("a.b.c")
        );
        assert_eq!(call(name("f"), vec![]).dotted_path(), None);
    }

    #[test]
    fn test_statement_classification() {
        assert!(ret(int(1)).is_statement());
        assert!(output(vec![string("hi")]).is_statement());
        assert!(!name("x").is_statement());
    }
}
