//! Tree-walking interpreter.
//!
//! Executes both original and rewritten bodies. In rewritten bodies it
//! recognizes the reserved store protocol:
//!
//! - `__ResultsStore__()` constructs a fresh store on the shared pool,
//! - `__store__.dispatch(f, (args...))` submits `f(args...)`,
//! - `__store__["x"] = <handle>` binds the handle to `x`,
//! - `__store__.fetch("x")` (or `__store__["x"]`) blocks for the value,
//! - `__store__.reset()` clears the store.

use super::output::{OutputSink, StdoutSink};
use crate::analysis::{Environment, FunctionKind};
use crate::errors::{Error, Result};
use crate::rewrite::{DISPATCH_METHOD, FETCH_METHOD, RESET_METHOD, STORE_CONSTRUCTOR, STORE_NAME};
use crate::runtime::{Callable, FunctionRef, ResultsStore, Value, WorkerPool};
use crate::tree::{BinOperator, FunctionDef, Identifier, NodeRef, TreeNode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Evaluates function bodies against an environment.
#[derive(Clone)]
pub struct Interpreter {
    env: Arc<dyn Environment>,
    pool: Arc<WorkerPool>,
    output: Arc<dyn OutputSink>,
}

/// Local variables of one call.
type Frame = HashMap<Identifier, Value>;

impl Interpreter {
    pub fn new(env: Arc<dyn Environment>, pool: Arc<WorkerPool>) -> Self {
        Self {
            env,
            pool,
            output: Arc::new(StdoutSink),
        }
    }

    /// Send output statements to `sink` instead of stdout.
    pub fn with_output(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.output = sink;
        self
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Call `def` with positional `args`.
    pub fn call_function(&self, def: &FunctionDef, args: &[Value]) -> Result<Value> {
        self.call_with_store(def, args, None)
    }

    /// Call `def` with `__store__` pre-bound to `store`.
    pub fn call_with_store(
        &self,
        def: &FunctionDef,
        args: &[Value],
        store: Option<Arc<ResultsStore>>,
    ) -> Result<Value> {
        if def.params.len() != args.len() {
            return Err(Error::Arity {
                function: def.name.clone(),
                expected: def.params.len(),
                found: args.len(),
            });
        }

        let mut frame: Frame = def.params.iter().cloned().zip(args.iter().cloned()).collect();
        if let Some(store) = store {
            frame.insert(STORE_NAME.to_string(), Value::Store(store));
        }

        for stmt in &def.body {
            if let Some(value) = self.exec(stmt, &mut frame)? {
                return Ok(value);
            }
        }
        Ok(Value::None)
    }

    /// Execute one statement; `Some` carries a returned value.
    fn exec(&self, stmt: &NodeRef, frame: &mut Frame) -> Result<Option<Value>> {
        match stmt.as_ref() {
            TreeNode::Assign { targets, value } => {
                let value = self.eval(value, frame)?;
                for target in targets {
                    self.assign(target, value.clone(), frame)?;
                }
                Ok(None)
            }
            TreeNode::Return { value } => {
                let value = match value {
                    Some(value) => self.eval(value, frame)?,
                    None => Value::None,
                };
                Ok(Some(value))
            }
            TreeNode::ExprStmt { value } => {
                self.eval(value, frame)?;
                Ok(None)
            }
            TreeNode::OutputStmt { values } => {
                let rendered = values
                    .iter()
                    .map(|v| self.eval(v, frame).map(|v| v.to_string()))
                    .collect::<Result<Vec<_>>>()?;
                self.output.emit(&rendered.join(" "));
                Ok(None)
            }
            // Names resolve through the environment already.
            TreeNode::GlobalDecl { .. } => Ok(None),
            TreeNode::FunctionDef(def) => Err(Error::unsupported(format!(
                "nested function definition {}",
                def.name
            ))),
            _ => {
                self.eval(stmt, frame)?;
                Ok(None)
            }
        }
    }

    fn assign(&self, target: &NodeRef, value: Value, frame: &mut Frame) -> Result<()> {
        match target.as_ref() {
            TreeNode::Name { id } => {
                frame.insert(id.clone(), value);
                Ok(())
            }
            TreeNode::Tuple { elements } => {
                let Value::Tuple(items) = value else {
                    return Err(Error::type_error(format!(
                        "cannot unpack {} into {} names",
                        value.type_name(),
                        elements.len()
                    )));
                };
                if items.len() != elements.len() {
                    return Err(Error::type_error(format!(
                        "cannot unpack {} values into {} names",
                        items.len(),
                        elements.len()
                    )));
                }
                for (element, item) in elements.iter().zip(items) {
                    self.assign(element, item, frame)?;
                }
                Ok(())
            }
            TreeNode::Subscript { value: container, index } => {
                let Value::Store(store) = self.eval(container, frame)? else {
                    return Err(Error::unsupported("subscript assignment"));
                };
                let key = self.eval_key(index, frame)?;
                let Value::Handle(handle) = value else {
                    return Err(Error::type_error(format!(
                        "store slot {} expects a task handle, got {}",
                        key,
                        value.type_name()
                    )));
                };
                store.bind(key, handle)
            }
            other => Err(Error::unsupported(format!("assignment to a {}", other.kind()))),
        }
    }

    fn eval(&self, node: &NodeRef, frame: &Frame) -> Result<Value> {
        match node.as_ref() {
            TreeNode::Constant(constant) => Ok(Value::from(constant)),
            TreeNode::Name { id } => self.lookup(id, frame),
            TreeNode::Tuple { elements } => Ok(Value::Tuple(self.eval_all(elements, frame)?)),
            TreeNode::BinOp { left, op, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                binary(*op, left, right)
            }
            TreeNode::Subscript { value, index } => {
                let container = self.eval(value, frame)?;
                match container {
                    Value::Store(store) => store.fetch(&self.eval_key(index, frame)?),
                    other => {
                        let index = self.eval(index, frame)?;
                        index_value(other, index)
                    }
                }
            }
            TreeNode::Call { callee, args } => self.eval_call(callee, args, frame),
            TreeNode::Attribute { attr, .. } => {
                Err(Error::unsupported(format!("attribute access .{}", attr)))
            }
            other => Err(Error::unsupported(format!(
                "{} in expression position",
                other.kind()
            ))),
        }
    }

    fn eval_all(&self, nodes: &[NodeRef], frame: &Frame) -> Result<Vec<Value>> {
        nodes.iter().map(|n| self.eval(n, frame)).collect()
    }

    fn eval_key(&self, node: &NodeRef, frame: &Frame) -> Result<String> {
        match self.eval(node, frame)? {
            Value::Str(key) => Ok(key),
            other => Err(Error::type_error(format!(
                "store keys are strings, got {}",
                other.type_name()
            ))),
        }
    }

    fn lookup(&self, id: &str, frame: &Frame) -> Result<Value> {
        if let Some(value) = frame.get(id) {
            return Ok(value.clone());
        }
        self.function_value(id)
            .map(Value::Function)
            .ok_or_else(|| Error::UnboundName(id.to_string()))
    }

    /// Resolve `name` in the environment as a callable value.
    pub fn function_value(&self, name: &str) -> Option<FunctionRef> {
        let descriptor = self.env.resolve(name)?;
        let callable: Arc<dyn Callable> = match descriptor.kind {
            FunctionKind::Native { callable, .. } => callable,
            FunctionKind::Defined(def) => Arc::new(DefinedFunction {
                def,
                interpreter: self.clone(),
            }),
        };
        Some(FunctionRef::new(descriptor.name, callable))
    }

    fn eval_call(&self, callee: &NodeRef, args: &[NodeRef], frame: &Frame) -> Result<Value> {
        if let TreeNode::Attribute { value, attr } = callee.as_ref() {
            return match self.eval(value, frame)? {
                Value::Store(store) => self.store_method(&store, attr, args, frame),
                other => Err(Error::unsupported(format!(
                    "method call .{} on {}",
                    attr,
                    other.type_name()
                ))),
            };
        }

        if let TreeNode::Name { id } = callee.as_ref() {
            if id == STORE_CONSTRUCTOR && !frame.contains_key(id) {
                return Ok(Value::Store(Arc::new(ResultsStore::new(Arc::clone(
                    &self.pool,
                )))));
            }
        }

        let function = match self.eval(callee, frame)? {
            Value::Function(function) => function,
            other => {
                return Err(Error::type_error(format!(
                    "{} is not callable",
                    other.type_name()
                )))
            }
        };
        let args = self.eval_all(args, frame)?;
        trace!(function = %function.name, "direct call");
        function.callable.call(&args)
    }

    fn store_method(
        &self,
        store: &Arc<ResultsStore>,
        method: &str,
        args: &[NodeRef],
        frame: &Frame,
    ) -> Result<Value> {
        match method {
            DISPATCH_METHOD => {
                let [callee, call_args] = args else {
                    return Err(Error::Arity {
                        function: DISPATCH_METHOD.to_string(),
                        expected: 2,
                        found: args.len(),
                    });
                };
                let Value::Function(function) = self.eval(callee, frame)? else {
                    return Err(Error::type_error("dispatch expects a function"));
                };
                let Value::Tuple(call_args) = self.eval(call_args, frame)? else {
                    return Err(Error::type_error("dispatch expects an argument tuple"));
                };
                let handle = store.dispatch(function.name, function.callable, call_args);
                Ok(Value::Handle(handle))
            }
            FETCH_METHOD => {
                let [key] = args else {
                    return Err(Error::Arity {
                        function: FETCH_METHOD.to_string(),
                        expected: 1,
                        found: args.len(),
                    });
                };
                store.fetch(&self.eval_key(key, frame)?)
            }
            RESET_METHOD => {
                store.reset();
                Ok(Value::None)
            }
            other => Err(Error::unsupported(format!("store method .{}", other))),
        }
    }
}

/// A tree-defined function bound to the interpreter that runs it.
struct DefinedFunction {
    def: Arc<FunctionDef>,
    interpreter: Interpreter,
}

impl Callable for DefinedFunction {
    fn call(&self, args: &[Value]) -> Result<Value> {
        self.interpreter.call_function(&self.def, args)
    }
}

fn binary(op: BinOperator, left: Value, right: Value) -> Result<Value> {
    let overflow = || Error::raised(format!("integer overflow in {}", op));
    match (op, left, right) {
        (BinOperator::Add, Value::Int(a), Value::Int(b)) => {
            a.checked_add(b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOperator::Sub, Value::Int(a), Value::Int(b)) => {
            a.checked_sub(b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOperator::Mul, Value::Int(a), Value::Int(b)) => {
            a.checked_mul(b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOperator::Div | BinOperator::Mod, Value::Int(_), Value::Int(0)) => {
            Err(Error::raised("integer division or modulo by zero"))
        }
        (BinOperator::Div, Value::Int(a), Value::Int(b)) => {
            floor_div(a, b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOperator::Mod, Value::Int(a), Value::Int(b)) => {
            floor_mod(a, b).map(Value::Int).ok_or_else(overflow)
        }
        (BinOperator::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinOperator::Add, Value::Tuple(mut a), Value::Tuple(b)) => {
            a.extend(b);
            Ok(Value::Tuple(a))
        }
        (op, left, right) => Err(Error::type_error(format!(
            "unsupported operands for {}: {} and {}",
            op,
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// Remainder with the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        r.checked_add(b)
    } else {
        Some(r)
    }
}

fn index_value(container: Value, index: Value) -> Result<Value> {
    match (container, index) {
        (Value::Tuple(items), Value::Int(i)) => {
            let len = items.len() as i64;
            let position = if i < 0 { i + len } else { i };
            usize::try_from(position)
                .ok()
                .and_then(|p| items.get(p).cloned())
                .ok_or_else(|| Error::raised(format!("tuple index {} out of range", i)))
        }
        (container, index) => Err(Error::type_error(format!(
            "cannot index {} with {}",
            container.type_name(),
            index.type_name()
        ))),
    }
}
