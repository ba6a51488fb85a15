//! Dataflow Rewriter
//!
//! Turns a body that passed the purity check into its parallel form:
//!
//! ```text
//! def f():                      def f():
//!     x = g()                       __store__ = __ResultsStore__()
//!     y = h(x)          ==>         __store__["x"] = __store__.dispatch(g, ())
//!     return x + y                  __store__["y"] = __store__.dispatch(h, (__store__.fetch("x"),))
//!                                   return __store__.fetch("x") + __store__.fetch("y")
//! ```
//!
//! Only top-level assignments of the exact shape `name = identifier(args)`
//! are dispatched. Every later read of a dispatched name, at any depth,
//! becomes a fetch. Everything else is copied through with its
//! sub-expressions rewritten.
//!
//! The transform never mutates its input. Sub-trees that contain no
//! dispatched name are shared with the original tree.
//!
//! The rewriter performs no safety check of its own; callers must gate it
//! on a passing [`PurityReport`](crate::analysis::PurityReport).

use crate::config::{ArgumentPolicy, RewriteOptions, StoreLifecycle};
use crate::errors::{Error, Result};
use crate::tree::build::{assign, call, expr_stmt, method_call, name, string, subscript, tuple};
use crate::tree::{FunctionDef, Identifier, NodeRef, TreeNode};
use std::sync::Arc;
use tracing::debug_span;

/// Reserved name the per-invocation results store is bound to.
pub const STORE_NAME: &str = "__store__";

/// Reserved name of the store constructor understood by the backend.
pub const STORE_CONSTRUCTOR: &str = "__ResultsStore__";

/// Store method that submits a call to the worker pool.
pub const DISPATCH_METHOD: &str = "dispatch";

/// Store method that blocks for a task's value.
pub const FETCH_METHOD: &str = "fetch";

/// Store method that clears the task map.
pub const RESET_METHOD: &str = "reset";

/// Names dispatched so far in one rewrite pass.
pub type SeenNames = im::HashSet<Identifier>;

/// Rewrite `def` into its parallel form.
pub fn rewrite(def: &FunctionDef, options: RewriteOptions) -> Result<FunctionDef> {
    let _span = debug_span!("dataflow_rewrite", function = %def.name).entered();

    if let Some(reserved) = uses_reserved_name(def) {
        return Err(Error::rewrite_assertion(
            &def.name,
            format!("the body already uses the reserved name {}", reserved),
        ));
    }

    let mut body = Vec::with_capacity(def.body.len() + 1);
    body.push(store_init(options.lifecycle));

    let mut seen = SeenNames::new();
    for stmt in &def.body {
        let (rewritten, next) = rewrite_statement(stmt, seen, options, &def.name)?;
        body.push(rewritten);
        seen = next;
    }

    Ok(FunctionDef {
        name: def.name.clone(),
        params: def.params.clone(),
        body,
    })
}

/// Statement that makes `__store__` ready for this invocation.
pub fn store_init(lifecycle: StoreLifecycle) -> NodeRef {
    match lifecycle {
        StoreLifecycle::Fresh => assign(name(STORE_NAME), call(name(STORE_CONSTRUCTOR), vec![])),
        StoreLifecycle::Reset => expr_stmt(method_call(name(STORE_NAME), RESET_METHOD, vec![])),
    }
}

/// `__store__.fetch("key")`
pub fn fetch_expr(key: &str) -> NodeRef {
    method_call(name(STORE_NAME), FETCH_METHOD, vec![string(key)])
}

/// `__store__["key"] = __store__.dispatch(callee, (args...))`
pub fn dispatch_stmt(key: &str, callee: NodeRef, args: Vec<NodeRef>) -> NodeRef {
    assign(
        subscript(name(STORE_NAME), string(key)),
        method_call(name(STORE_NAME), DISPATCH_METHOD, vec![callee, tuple(args)]),
    )
}

fn rewrite_statement(
    stmt: &NodeRef,
    seen: SeenNames,
    options: RewriteOptions,
    function: &str,
) -> Result<(NodeRef, SeenNames)> {
    if let Some((target, callee, args)) = dispatchable(stmt) {
        if seen.contains(target) {
            return Err(reassigned(function, target));
        }
        let args = match options.arguments {
            ArgumentPolicy::Forward => args.iter().map(|arg| substitute(arg, &seen)).collect(),
            ArgumentPolicy::Drop => Vec::new(),
        };
        let rewritten = dispatch_stmt(target, Arc::clone(callee), args);
        return Ok((rewritten, seen.update(target.clone())));
    }

    let rewritten = match stmt.as_ref() {
        TreeNode::Assign { targets, value } => {
            let new_targets = targets
                .iter()
                .map(|target| substitute_target(target, &seen, function))
                .collect::<Result<Vec<_>>>()?;
            let new_value = substitute(value, &seen);
            if unchanged(targets, &new_targets) && Arc::ptr_eq(value, &new_value) {
                Arc::clone(stmt)
            } else {
                Arc::new(TreeNode::Assign {
                    targets: new_targets,
                    value: new_value,
                })
            }
        }
        // Nested definitions have their own scope and are copied through.
        TreeNode::FunctionDef(_) => Arc::clone(stmt),
        _ => substitute(stmt, &seen),
    };
    Ok((rewritten, seen))
}

/// Match `name = identifier(args...)`.
fn dispatchable(stmt: &NodeRef) -> Option<(&Identifier, &NodeRef, &[NodeRef])> {
    let TreeNode::Assign { targets, value } = stmt.as_ref() else {
        return None;
    };
    let [target] = targets.as_slice() else {
        return None;
    };
    let TreeNode::Name { id } = target.as_ref() else {
        return None;
    };
    let TreeNode::Call { callee, args } = value.as_ref() else {
        return None;
    };
    match callee.as_ref() {
        TreeNode::Name { .. } => Some((id, callee, args.as_slice())),
        _ => None,
    }
}

fn reassigned(function: &str, target: &str) -> Error {
    Error::rewrite_assertion(
        function,
        format!("{} is assigned again after being dispatched", target),
    )
}

/// Rewrite an assignment target. Bare names stay names; a dispatched name
/// may not be bound again.
fn substitute_target(target: &NodeRef, seen: &SeenNames, function: &str) -> Result<NodeRef> {
    match target.as_ref() {
        TreeNode::Name { id } if seen.contains(id) => Err(reassigned(function, id)),
        TreeNode::Name { .. } => Ok(Arc::clone(target)),
        TreeNode::Tuple { elements } => {
            let rewritten = elements
                .iter()
                .map(|element| substitute_target(element, seen, function))
                .collect::<Result<Vec<_>>>()?;
            Ok(rebuild_list(target, elements, rewritten, |elements| {
                TreeNode::Tuple { elements }
            }))
        }
        _ => Ok(substitute(target, seen)),
    }
}

/// Replace every read of a dispatched name in `node` with a fetch.
///
/// Returns `node` itself when nothing below it changed.
pub fn substitute(node: &NodeRef, seen: &SeenNames) -> NodeRef {
    if seen.is_empty() {
        return Arc::clone(node);
    }

    match node.as_ref() {
        TreeNode::Name { id } if seen.contains(id) => fetch_expr(id),
        TreeNode::Name { .. } | TreeNode::Constant(_) | TreeNode::GlobalDecl { .. } => {
            Arc::clone(node)
        }
        TreeNode::FunctionDef(_) => Arc::clone(node),
        TreeNode::Call { callee, args } => {
            let new_callee = substitute(callee, seen);
            let new_args: Vec<_> = args.iter().map(|a| substitute(a, seen)).collect();
            if Arc::ptr_eq(callee, &new_callee) && unchanged(args, &new_args) {
                Arc::clone(node)
            } else {
                Arc::new(TreeNode::Call {
                    callee: new_callee,
                    args: new_args,
                })
            }
        }
        TreeNode::Attribute { value, attr } => {
            let new_value = substitute(value, seen);
            if Arc::ptr_eq(value, &new_value) {
                Arc::clone(node)
            } else {
                Arc::new(TreeNode::Attribute {
                    value: new_value,
                    attr: attr.clone(),
                })
            }
        }
        TreeNode::Subscript { value, index } => {
            let new_value = substitute(value, seen);
            let new_index = substitute(index, seen);
            if Arc::ptr_eq(value, &new_value) && Arc::ptr_eq(index, &new_index) {
                Arc::clone(node)
            } else {
                Arc::new(TreeNode::Subscript {
                    value: new_value,
                    index: new_index,
                })
            }
        }
        TreeNode::BinOp { left, op, right } => {
            let new_left = substitute(left, seen);
            let new_right = substitute(right, seen);
            if Arc::ptr_eq(left, &new_left) && Arc::ptr_eq(right, &new_right) {
                Arc::clone(node)
            } else {
                Arc::new(TreeNode::BinOp {
                    left: new_left,
                    op: *op,
                    right: new_right,
                })
            }
        }
        TreeNode::Tuple { elements } => {
            let rewritten = elements.iter().map(|e| substitute(e, seen)).collect();
            rebuild_list(node, elements, rewritten, |elements| TreeNode::Tuple {
                elements,
            })
        }
        TreeNode::OutputStmt { values } => {
            let rewritten = values.iter().map(|v| substitute(v, seen)).collect();
            rebuild_list(node, values, rewritten, |values| TreeNode::OutputStmt { values })
        }
        TreeNode::Return { value } => match value {
            Some(value) => {
                let new_value = substitute(value, seen);
                if Arc::ptr_eq(value, &new_value) {
                    Arc::clone(node)
                } else {
                    Arc::new(TreeNode::Return {
                        value: Some(new_value),
                    })
                }
            }
            None => Arc::clone(node),
        },
        TreeNode::ExprStmt { value } => {
            let new_value = substitute(value, seen);
            if Arc::ptr_eq(value, &new_value) {
                Arc::clone(node)
            } else {
                Arc::new(TreeNode::ExprStmt { value: new_value })
            }
        }
        TreeNode::Assign { targets, value } => {
            let new_targets: Vec<_> = targets.iter().map(|t| substitute(t, seen)).collect();
            let new_value = substitute(value, seen);
            if unchanged(targets, &new_targets) && Arc::ptr_eq(value, &new_value) {
                Arc::clone(node)
            } else {
                Arc::new(TreeNode::Assign {
                    targets: new_targets,
                    value: new_value,
                })
            }
        }
    }
}

fn unchanged(before: &[NodeRef], after: &[NodeRef]) -> bool {
    before.len() == after.len() && before.iter().zip(after).all(|(b, a)| Arc::ptr_eq(b, a))
}

fn rebuild_list(
    original: &NodeRef,
    before: &[NodeRef],
    after: Vec<NodeRef>,
    build: impl FnOnce(Vec<NodeRef>) -> TreeNode,
) -> NodeRef {
    if unchanged(before, &after) {
        Arc::clone(original)
    } else {
        Arc::new(build(after))
    }
}

/// First reserved identifier used anywhere in `def`.
fn uses_reserved_name(def: &FunctionDef) -> Option<&'static str> {
    let reserved = [STORE_NAME, STORE_CONSTRUCTOR];
    reserved.into_iter().find(|&r| {
        def.params.iter().any(|p| p == r) || def.body.iter().any(|stmt| mentions(stmt, r))
    })
}

fn mentions(node: &NodeRef, id: &str) -> bool {
    match node.as_ref() {
        TreeNode::Name { id: found } => found == id,
        TreeNode::FunctionDef(def) => {
            def.params.iter().any(|p| p == id) || def.body.iter().any(|s| mentions(s, id))
        }
        TreeNode::Assign { targets, value } => {
            targets.iter().any(|t| mentions(t, id)) || mentions(value, id)
        }
        TreeNode::Return { value } => value.as_ref().is_some_and(|v| mentions(v, id)),
        TreeNode::ExprStmt { value } => mentions(value, id),
        TreeNode::OutputStmt { values } => values.iter().any(|v| mentions(v, id)),
        TreeNode::GlobalDecl { names } => names.iter().any(|n| n == id),
        TreeNode::Call { callee, args } => mentions(callee, id) || args.iter().any(|a| mentions(a, id)),
        TreeNode::Attribute { value, .. } => mentions(value, id),
        TreeNode::Subscript { value, index } => mentions(value, id) || mentions(index, id),
        TreeNode::Tuple { elements } => elements.iter().any(|e| mentions(e, id)),
        TreeNode::Constant(_) => false,
        TreeNode::BinOp { left, right, .. } => mentions(left, id) || mentions(right, id),
    }
}
