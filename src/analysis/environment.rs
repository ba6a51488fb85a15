//! Callee resolution.
//!
//! The analyzer and the interpreter never look names up in ambient state;
//! they are handed an [`Environment`] that maps identifiers to function
//! descriptors. A descriptor either carries the callee's own tree, so the
//! analyzer can recurse into it, or a native callable with a declared
//! purity flag.

use crate::runtime::{Callable, NativeFn};
use crate::tree::{FunctionDef, Identifier};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How a resolved function is implemented.
#[derive(Clone)]
pub enum FunctionKind {
    /// Defined by a tree; purity is derived by analyzing the tree
    Defined(Arc<FunctionDef>),
    /// Implemented natively; purity is declared by whoever registered it
    Native {
        callable: Arc<dyn Callable>,
        pure: bool,
    },
}

/// A resolved function.
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: Identifier,
    pub kind: FunctionKind,
}

impl FunctionDescriptor {
    pub fn definition(&self) -> Option<&Arc<FunctionDef>> {
        match &self.kind {
            FunctionKind::Defined(def) => Some(def),
            FunctionKind::Native { .. } => None,
        }
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FunctionKind::Defined(_) => "defined",
            FunctionKind::Native { pure: true, .. } => "native (pure)",
            FunctionKind::Native { pure: false, .. } => "native (impure)",
        };
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

/// Resolves identifiers to functions.
pub trait Environment: Send + Sync {
    fn resolve(&self, name: &str) -> Option<FunctionDescriptor>;
}

/// Environment backed by a name-indexed table.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<Identifier, FunctionDescriptor>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tree-defined function under its own name.
    pub fn define(mut self, def: FunctionDef) -> Self {
        self.insert_defined(def);
        self
    }

    /// Register a native function known to be pure.
    pub fn pure_native(self, function: NativeFn) -> Self {
        self.native(function, true)
    }

    /// Register a native function with its declared purity.
    pub fn native(mut self, function: NativeFn, pure: bool) -> Self {
        let name = function.name().to_string();
        self.functions.insert(
            name.clone(),
            FunctionDescriptor {
                name,
                kind: FunctionKind::Native {
                    callable: Arc::new(function),
                    pure,
                },
            },
        );
        self
    }

    pub fn insert_defined(&mut self, def: FunctionDef) {
        let name = def.name.clone();
        self.functions.insert(
            name.clone(),
            FunctionDescriptor {
                name,
                kind: FunctionKind::Defined(Arc::new(def)),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Environment for FunctionTable {
    fn resolve(&self, name: &str) -> Option<FunctionDescriptor> {
        self.functions.get(name).cloned()
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionTable").field("functions", &names).finish()
    }
}
