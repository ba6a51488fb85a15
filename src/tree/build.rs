//! Constructor helpers for building trees by hand.
//!
//! These are the functions tests and front ends use to assemble bodies
//! without spelling out `Arc::new(TreeNode::...)` at every level.

use super::{BinOperator, Constant, FunctionDef, Identifier, NodeRef, TreeNode};
use std::sync::Arc;

pub fn node(node: TreeNode) -> NodeRef {
    Arc::new(node)
}

pub fn name(id: impl Into<Identifier>) -> NodeRef {
    node(TreeNode::Name { id: id.into() })
}

pub fn int(value: i64) -> NodeRef {
    node(TreeNode::Constant(Constant::Int(value)))
}

pub fn string(value: impl Into<String>) -> NodeRef {
    node(TreeNode::Constant(Constant::Str(value.into())))
}

pub fn boolean(value: bool) -> NodeRef {
    node(TreeNode::Constant(Constant::Bool(value)))
}

pub fn none() -> NodeRef {
    node(TreeNode::Constant(Constant::None))
}

pub fn call(callee: NodeRef, args: Vec<NodeRef>) -> NodeRef {
    node(TreeNode::Call { callee, args })
}

pub fn attr(value: NodeRef, attr: impl Into<Identifier>) -> NodeRef {
    node(TreeNode::Attribute {
        value,
        attr: attr.into(),
    })
}

/// `receiver.method(args)`
pub fn method_call(receiver: NodeRef, method: &str, args: Vec<NodeRef>) -> NodeRef {
    call(attr(receiver, method), args)
}

pub fn subscript(value: NodeRef, index: NodeRef) -> NodeRef {
    node(TreeNode::Subscript { value, index })
}

pub fn tuple(elements: Vec<NodeRef>) -> NodeRef {
    node(TreeNode::Tuple { elements })
}

pub fn binop(left: NodeRef, op: BinOperator, right: NodeRef) -> NodeRef {
    node(TreeNode::BinOp { left, op, right })
}

pub fn add(left: NodeRef, right: NodeRef) -> NodeRef {
    binop(left, BinOperator::Add, right)
}

pub fn sub(left: NodeRef, right: NodeRef) -> NodeRef {
    binop(left, BinOperator::Sub, right)
}

pub fn mul(left: NodeRef, right: NodeRef) -> NodeRef {
    binop(left, BinOperator::Mul, right)
}

/// Single-target assignment `target = value`.
pub fn assign(target: NodeRef, value: NodeRef) -> NodeRef {
    assign_many(vec![target], value)
}

/// Chained assignment `t1 = t2 = ... = value`.
pub fn assign_many(targets: Vec<NodeRef>, value: NodeRef) -> NodeRef {
    node(TreeNode::Assign { targets, value })
}

pub fn ret(value: NodeRef) -> NodeRef {
    node(TreeNode::Return { value: Some(value) })
}

pub fn ret_none() -> NodeRef {
    node(TreeNode::Return { value: None })
}

pub fn expr_stmt(value: NodeRef) -> NodeRef {
    node(TreeNode::ExprStmt { value })
}

pub fn output(values: Vec<NodeRef>) -> NodeRef {
    node(TreeNode::OutputStmt { values })
}

pub fn global<I>(names: I) -> NodeRef
where
    I: IntoIterator,
    I::Item: Into<Identifier>,
{
    node(TreeNode::GlobalDecl {
        names: names.into_iter().map(Into::into).collect(),
    })
}

pub fn function_def(def: FunctionDef) -> NodeRef {
    node(TreeNode::FunctionDef(def))
}
