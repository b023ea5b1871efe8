// Conversion between runtime values and serde_json, for host-supplied context
// and for handing results back to JSON-speaking callers.

use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::{Value, ValueMap};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

/// JSON to runtime value. Object keys become keywords.
pub fn from_json(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Nil,
        JsonValue::Bool(b) => Value::Boolean(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::Vector(items.iter().map(from_json).collect()),
        JsonValue::Object(map) => Value::map(
            map.iter()
                .map(|(k, v)| (Value::keyword(k), from_json(v)))
                .collect::<ValueMap>(),
        ),
    }
}

/// Runtime value to JSON. Keywords become plain strings, sets become arrays,
/// and map keys are rendered as strings. Functions have no JSON form.
pub fn to_json(value: &Value) -> EvalResult<JsonValue> {
    Ok(match value {
        Value::Nil => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::String(s) | Value::Keyword(s) => JsonValue::String(s.clone()),
        Value::Vector(items) => {
            JsonValue::Array(items.iter().map(to_json).collect::<EvalResult<_>>()?)
        }
        Value::Set(items) => {
            JsonValue::Array(items.iter().map(to_json).collect::<EvalResult<_>>()?)
        }
        Value::Map(map) => {
            let mut object = JsonMap::new();
            for (k, v) in map.iter() {
                let key = match k {
                    Value::String(s) | Value::Keyword(s) => s.clone(),
                    other => other.to_string(),
                };
                object.insert(key, to_json(v)?);
            }
            JsonValue::Object(object)
        }
        Value::Function(f) => {
            return Err(EvalError::invalid_argument(
                "to-json",
                format!("function {} cannot be converted to JSON", f.name()),
            ))
        }
    })
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        from_json(&json)
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        from_json(json)
    }
}
