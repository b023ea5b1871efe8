//! PTC-Lisp Standard Library
//!
//! The builtin table is built once per process and never changes afterwards.
//! Every entry carries a [`Shape`] that tells `apply` how to validate and
//! dispatch a call by argument count. Functions are grouped by category:
//! - Arithmetic
//! - Comparison and logic
//! - Type predicates
//! - Collections
//! - Higher-order functions (these call back into the evaluator)
//! - Sets
//! - Strings and regular expressions

use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::memory::Memory;
use crate::runtime::values::Value;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use std::fmt;

pub mod arithmetic;
pub mod collections;
pub mod comparison;
pub mod higher_order;
pub mod predicates;
#[cfg(feature = "regex")]
pub mod regex_ops;
pub mod sets;
pub mod strings;

/// A builtin that only looks at its arguments.
pub type PureFn = fn(&[Value]) -> EvalResult<Value>;

/// A builtin that calls user functions and therefore threads memory.
pub type ApplyingFn = fn(&Evaluator, &[Value], Memory) -> EvalResult<(Value, Memory)>;

#[derive(Clone, Copy)]
pub enum BuiltinImpl {
    Pure(PureFn),
    Applying(ApplyingFn),
}

/// How a builtin accepts its arguments.
pub enum Shape {
    /// Exactly `arity` arguments.
    Normal { arity: usize, func: BuiltinImpl },
    /// Zero or more arguments; zero yields `identity()`.
    Variadic {
        identity: fn() -> Value,
        func: BuiltinImpl,
    },
    /// One or more arguments.
    VariadicNonEmpty { func: BuiltinImpl },
    /// One implementation per accepted argument count.
    MultiArity { arities: Vec<(usize, BuiltinImpl)> },
    /// All arguments gathered into a single vector argument.
    Collect { func: BuiltinImpl },
}

impl Shape {
    pub fn arity_description(&self) -> String {
        match self {
            Shape::Normal { arity, .. } => arity.to_string(),
            Shape::Variadic { .. } | Shape::Collect { .. } => "any number of".to_string(),
            Shape::VariadicNonEmpty { .. } => "at least 1".to_string(),
            Shape::MultiArity { arities } => {
                let counts: Vec<String> = arities.iter().map(|(n, _)| n.to_string()).collect();
                match counts.len() {
                    0 => "no".to_string(),
                    1 => counts[0].clone(),
                    n => format!("{} or {}", counts[..n - 1].join(", "), counts[n - 1]),
                }
            }
        }
    }
}

pub struct Builtin {
    pub name: &'static str,
    pub shape: Shape,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Registration target for the `load_*_functions` loaders.
pub struct BuiltinTable {
    entries: IndexMap<&'static str, Builtin>,
}

impl BuiltinTable {
    fn new() -> Self {
        BuiltinTable {
            entries: IndexMap::new(),
        }
    }

    pub fn define(&mut self, name: &'static str, shape: Shape) {
        self.entries.insert(name, Builtin { name, shape });
    }

    pub fn define_pure(&mut self, name: &'static str, arity: usize, func: PureFn) {
        self.define(
            name,
            Shape::Normal {
                arity,
                func: BuiltinImpl::Pure(func),
            },
        );
    }

    pub fn define_applying(&mut self, name: &'static str, arity: usize, func: ApplyingFn) {
        self.define(
            name,
            Shape::Normal {
                arity,
                func: BuiltinImpl::Applying(func),
            },
        );
    }
}

/// The Standard Library for the PTC-Lisp runtime.
pub struct StandardLibrary;

impl StandardLibrary {
    fn build_table() -> BuiltinTable {
        let mut table = BuiltinTable::new();
        arithmetic::load_arithmetic_functions(&mut table);
        comparison::load_comparison_functions(&mut table);
        predicates::load_predicate_functions(&mut table);
        collections::load_collection_functions(&mut table);
        higher_order::load_higher_order_functions(&mut table);
        sets::load_set_functions(&mut table);
        strings::load_string_functions(&mut table);
        #[cfg(feature = "regex")]
        regex_ops::load_regex_functions(&mut table);
        log::debug!("builtin table initialised with {} functions", table.entries.len());
        table
    }
}

lazy_static! {
    static ref BUILTINS: BuiltinTable = StandardLibrary::build_table();
}

/// Looks up a builtin by name.
pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.entries.get(name)
}

/// Every builtin name, in registration order.
pub fn names() -> Vec<&'static str> {
    BUILTINS.entries.keys().copied().collect()
}

// --- Argument helpers shared by the category modules ---

pub(crate) fn type_error(expected: &str, actual: &Value, operation: &str) -> EvalError {
    EvalError::type_error(expected, actual.type_name(), operation)
}

pub(crate) fn expect_int(value: &Value, operation: &str) -> EvalResult<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
        other => Err(type_error("integer", other, operation)),
    }
}

pub(crate) fn expect_number(value: &Value, operation: &str) -> EvalResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| type_error("number", value, operation))
}

pub(crate) fn expect_str<'a>(value: &'a Value, operation: &str) -> EvalResult<&'a str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(type_error("string", other, operation)),
    }
}

/// Elements of any sequential value. Maps yield `[key value]` pairs, strings
/// yield one-character strings and `nil` is empty.
pub(crate) fn seq_items(value: &Value, operation: &str) -> EvalResult<Vec<Value>> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Vector(items) => Ok(items.iter().cloned().collect()),
        Value::Set(items) => Ok(items.iter().cloned().collect()),
        Value::Map(map) => Ok(map
            .iter()
            .map(|(k, v)| Value::vector(vec![k.clone(), v.clone()]))
            .collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(type_error("collection", other, operation)),
    }
}

/// Lookup used by `get`, keyword calls and `where` paths.
pub(crate) fn lookup(collection: &Value, key: &Value) -> Option<Value> {
    match collection {
        Value::Map(map) => map.get(key).cloned(),
        Value::Vector(items) => match key {
            Value::Integer(i) if *i >= 0 => items.get(*i as usize).cloned(),
            _ => None,
        },
        Value::Set(items) => items.get(key).cloned(),
        Value::String(s) => match key {
            Value::Integer(i) if *i >= 0 => s
                .chars()
                .nth(*i as usize)
                .map(|c| Value::String(c.to_string())),
            _ => None,
        },
        _ => None,
    }
}
