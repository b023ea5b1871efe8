// Runtime value system for PTC-Lisp
// Represents values during execution (different from the AST which represents parsed code)

use crate::ast::{escape_string, format_float};
use crate::core_ast::{Combinator, FnDef, WhereOp};
use crate::runtime::environment::Env;
use crate::runtime::stdlib::Builtin;
use im::Vector;
use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type ValueVec = Vector<Value>;
pub type ValueMap = IndexMap<Value, Value>;
pub type ValueSet = IndexSet<Value>;

/// Collections are shared, not copied, when a value is cloned: vectors are
/// persistent, maps and sets sit behind an `Arc` and are copied on write.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Keyword(String),
    Vector(ValueVec),
    Map(Arc<ValueMap>),
    Set(Arc<ValueSet>),
    Function(Function),
}

#[derive(Clone)]
pub enum Function {
    Builtin(&'static Builtin),
    Closure(Arc<Closure>),
    Predicate(Arc<Predicate>),
}

/// A user function together with the environment it was defined in.
/// The environment is an immutable shared snapshot: nothing defined later in
/// the defining scope can change what the closure sees.
pub struct Closure {
    pub def: Arc<FnDef>,
    pub env: Env,
}

/// Predicate values produced by `where` and the `all-of`/`any-of`/`none-of` combinators.
#[derive(Debug, Clone)]
pub enum Predicate {
    Where {
        path: Vec<Value>,
        op: WhereOp,
        operand: Value,
    },
    Combined {
        kind: Combinator,
        preds: Vec<Value>,
    },
}

impl Value {
    pub fn keyword(name: &str) -> Value {
        Value::Keyword(name.to_string())
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn vector(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Vector(items.into_iter().collect())
    }

    pub fn map(map: ValueMap) -> Value {
        Value::Map(Arc::new(map))
    }

    pub fn set(set: ValueSet) -> Value {
        Value::Set(Arc::new(set))
    }

    pub fn empty_vector() -> Value {
        Value::Vector(ValueVec::new())
    }

    pub fn empty_map() -> Value {
        Value::map(ValueMap::new())
    }

    /// Only `false` and `nil` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Function(_) => "function",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Key used for `memory/` entries and map-style lookups by name.
    pub fn as_key_name(&self) -> Option<&str> {
        match self {
            Value::Keyword(k) => Some(k),
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Build a map with keyword keys from `(name, value)` pairs.
    pub fn keyword_map<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
        Value::map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::keyword(k), v))
                .collect(),
        )
    }

    /// Text as produced by `str`: strings are not quoted and nil is empty.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Rough heap footprint, used when the metered allocator is not installed.
    pub fn approx_size(&self) -> usize {
        let own = std::mem::size_of::<Value>();
        match self {
            Value::String(s) | Value::Keyword(s) => own + s.capacity(),
            Value::Vector(items) => own + items.iter().map(Value::approx_size).sum::<usize>(),
            Value::Set(items) => own + items.iter().map(Value::approx_size).sum::<usize>(),
            Value::Map(map) => {
                own + map
                    .iter()
                    .map(|(k, v)| k.approx_size() + v.approx_size())
                    .sum::<usize>()
            }
            _ => own,
        }
    }
}

impl Function {
    pub fn name(&self) -> String {
        match self {
            Function::Builtin(b) => b.name.to_string(),
            Function::Closure(c) => c
                .def
                .meta
                .name
                .clone()
                .unwrap_or_else(|| "anonymous fn".to_string()),
            Function::Predicate(p) => match p.as_ref() {
                Predicate::Where { .. } => "where".to_string(),
                Predicate::Combined { kind, .. } => kind.as_str().to_string(),
            },
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(b) => write!(f, "Builtin({})", b.name),
            Function::Closure(c) => write!(f, "Closure({:?})", c.def.meta.name),
            Function::Predicate(p) => write!(f, "Predicate({:?})", p),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Builtin(a), Function::Builtin(b)) => a.name == b.name,
            (Function::Closure(a), Function::Closure(b)) => Arc::ptr_eq(a, b),
            (Function::Predicate(a), Function::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Structural equality; floats compare like `OrderedFloat` so that `Eq`/`Hash`
// stay consistent for map keys and set members.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => OrderedFloat(*f).hash(state),
            Value::String(s) | Value::Keyword(s) => s.hash(state),
            Value::Vector(items) => items.hash(state),
            // order-independent, matching IndexMap/IndexSet equality
            Value::Map(map) => {
                let mut acc: u64 = 0;
                for (k, v) in map.iter() {
                    acc = acc.wrapping_add(hash_one(&(k, v)));
                }
                map.len().hash(state);
                acc.hash(state);
            }
            Value::Set(set) => {
                let mut acc: u64 = 0;
                for item in set.iter() {
                    acc = acc.wrapping_add(hash_one(item));
                }
                set.len().hash(state);
                acc.hash(state);
            }
            Value::Function(func) => match func {
                Function::Builtin(b) => b.name.hash(state),
                Function::Closure(c) => (Arc::as_ptr(c) as usize).hash(state),
                Function::Predicate(p) => (Arc::as_ptr(p) as usize).hash(state),
            },
        }
    }
}

fn hash_one<T: Hash>(value: &T) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::Vector(items) => {
                let items: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "[{}]", items.join(" "))
            }
            Value::Set(items) => {
                let items: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "#{{{}}}", items.join(" "))
            }
            Value::Map(map) => {
                let items: Vec<String> = map.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::Function(func) => write!(f, "#<fn {}>", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::vector(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::empty_vector().is_truthy());
        assert!(Value::empty_map().is_truthy());
    }

    #[test]
    fn map_equality_and_hash_ignore_order() {
        let a = Value::keyword_map([("a", Value::Integer(1)), ("b", Value::Integer(2))]);
        let b = Value::keyword_map([("b", Value::Integer(2)), ("a", Value::Integer(1))]);
        assert_eq!(a, b);
        assert_eq!(hash_one(&a), hash_one(&b));
    }

    #[test]
    fn ints_and_floats_are_distinct_keys() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn display_is_readable() {
        let v = Value::vector(vec![
            Value::Integer(1),
            Value::Float(2.0),
            Value::string("x"),
            Value::keyword("k"),
            Value::Nil,
        ]);
        assert_eq!(v.to_string(), "[1 2.0 \"x\" :k nil]");
        assert_eq!(Value::string("x").to_display_string(), "x");
    }

    #[test]
    fn clones_share_collection_storage() {
        let map = Value::keyword_map([("rows", Value::vector((0..1000).map(Value::Integer)))]);
        let copy = map.clone();
        match (&map, &copy) {
            (Value::Map(a), Value::Map(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => unreachable!(),
        }
    }
}
