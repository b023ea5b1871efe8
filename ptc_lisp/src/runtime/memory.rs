//! Program memory: the key/value store a program reads with `memory/` and
//! updates with `memory/put`.
//!
//! Memory is a persistent map threaded through evaluation by value. Every
//! `memory/put` yields a new map that shares structure with the old one; the
//! map a caller passed in is never changed.

use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::{Value, ValueMap};
use im::OrdMap;

pub type Memory = OrdMap<String, Value>;

/// Normalizes a `memory/put`/`memory/get` key. Keywords and strings name the
/// same slot, so `:count` and `"count"` are interchangeable.
pub fn memory_key(key: &Value, operation: &str) -> EvalResult<String> {
    key.as_key_name()
        .map(str::to_string)
        .ok_or_else(|| EvalError::type_error("keyword or string key", key.type_name(), operation))
}

/// Memory as a program-visible map with keyword keys.
pub fn memory_to_value(memory: &Memory) -> Value {
    Value::map(
        memory
            .iter()
            .map(|(k, v)| (Value::keyword(k), v.clone()))
            .collect::<ValueMap>(),
    )
}

/// Builds memory from a map value. Keys must be keywords or strings.
pub fn memory_from_value(value: &Value) -> EvalResult<Memory> {
    match value {
        Value::Nil => Ok(Memory::new()),
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| Ok((memory_key(k, "memory")?, v.clone())))
            .collect(),
        other => Err(EvalError::type_error("map", other.type_name(), "memory")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_produces_a_new_map() {
        let before = Memory::new();
        let after = before.update("count".to_string(), Value::Integer(42));
        assert!(before.is_empty());
        assert_eq!(after.get("count"), Some(&Value::Integer(42)));
    }

    #[test]
    fn keyword_and_string_keys_share_a_slot() {
        assert_eq!(memory_key(&Value::keyword("a"), "memory/put").unwrap(), "a");
        assert_eq!(memory_key(&Value::string("a"), "memory/put").unwrap(), "a");
        assert!(memory_key(&Value::Integer(1), "memory/put").is_err());
    }

    #[test]
    fn converts_to_and_from_values() {
        let memory = Memory::new().update("x".to_string(), Value::Integer(1));
        let value = memory_to_value(&memory);
        assert_eq!(value, Value::keyword_map([("x", Value::Integer(1))]));
        assert_eq!(memory_from_value(&value).unwrap(), memory);
    }
}
