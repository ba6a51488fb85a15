//! Runtime values and the callable abstraction.

use super::store::ResultsStore;
use super::task::TaskHandle;
use crate::errors::{Error, Result};
use crate::tree::{Constant, Identifier};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Anything that can be invoked with positional arguments.
///
/// Implementations must be safe to run on a worker thread.
pub trait Callable: Send + Sync {
    fn call(&self, args: &[Value]) -> Result<Value>;
}

type NativeBody = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A callable implemented in Rust.
#[derive(Clone)]
pub struct NativeFn {
    name: Identifier,
    arity: Option<usize>,
    body: Arc<NativeBody>,
}

impl NativeFn {
    /// A native function taking exactly `arity` arguments.
    pub fn new<F>(name: impl Into<Identifier>, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: Some(arity),
            body: Arc::new(body),
        }
    }

    /// A native function accepting any number of arguments.
    pub fn variadic<F>(name: impl Into<Identifier>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: None,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Callable for NativeFn {
    fn call(&self, args: &[Value]) -> Result<Value> {
        if let Some(expected) = self.arity {
            if expected != args.len() {
                return Err(Error::Arity {
                    function: self.name.clone(),
                    expected,
                    found: args.len(),
                });
            }
        }
        (self.body)(args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A named reference to a callable.
#[derive(Clone)]
pub struct FunctionRef {
    pub name: Identifier,
    pub callable: Arc<dyn Callable>,
}

impl FunctionRef {
    pub fn new(name: impl Into<Identifier>, callable: Arc<dyn Callable>) -> Self {
        Self {
            name: name.into(),
            callable,
        }
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.name)
    }
}

/// A runtime value.
///
/// Data values (`None` through `Tuple`) compare and hash structurally, so
/// argument vectors can key a memo table. Functions compare by name;
/// stores and task handles by identity.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Tuple(Vec<Value>),
    Function(FunctionRef),
    Store(Arc<ResultsStore>),
    Handle(TaskHandle),
}

impl Value {
    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::Function(_) => "function",
            Value::Store(_) => "results store",
            Value::Handle(_) => "task handle",
        }
    }
}

impl From<&Constant> for Value {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::None => Value::None,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.name == b.name,
            (Value::Store(a), Value::Store(b)) => Arc::ptr_eq(a, b),
            (Value::Handle(a), Value::Handle(b)) => a.same_task(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Tuple(items) => items.hash(state),
            Value::Function(f) => f.name.hash(state),
            Value::Store(store) => (Arc::as_ptr(store) as usize).hash(state),
            Value::Handle(handle) => handle.address().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => f.write_str(s),
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Store(_) => f.write_str("<results store>"),
            Value::Handle(_) => f.write_str("<task handle>"),
        }
    }
}
