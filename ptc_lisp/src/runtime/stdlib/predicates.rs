use super::{expect_int, expect_number, type_error, BuiltinTable};
use crate::runtime::error::EvalResult;
use crate::runtime::values::Value;

macro_rules! type_predicate {
    ($table:expr, $name:literal, $pattern:pat) => {
        $table.define_pure($name, 1, |args: &[Value]| {
            Ok(Value::Boolean(matches!(&args[0], $pattern)))
        });
    };
}

fn zero(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(expect_number(&args[0], "zero?")? == 0.0))
}

fn positive(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(expect_number(&args[0], "pos?")? > 0.0))
}

fn negative(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(expect_number(&args[0], "neg?")? < 0.0))
}

fn even(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(expect_int(&args[0], "even?")? % 2 == 0))
}

fn odd(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(expect_int(&args[0], "odd?")? % 2 != 0))
}

pub(crate) fn is_empty(value: &Value, operation: &str) -> EvalResult<bool> {
    match value {
        Value::Nil => Ok(true),
        Value::String(s) => Ok(s.is_empty()),
        Value::Vector(items) => Ok(items.is_empty()),
        Value::Map(map) => Ok(map.is_empty()),
        Value::Set(items) => Ok(items.is_empty()),
        other => Err(type_error("collection", other, operation)),
    }
}

fn empty(args: &[Value]) -> EvalResult<Value> {
    is_empty(&args[0], "empty?").map(Value::Boolean)
}

fn not_empty(args: &[Value]) -> EvalResult<Value> {
    if is_empty(&args[0], "not-empty")? {
        Ok(Value::Nil)
    } else {
        Ok(args[0].clone())
    }
}

pub fn load_predicate_functions(table: &mut BuiltinTable) {
    type_predicate!(table, "nil?", Value::Nil);
    type_predicate!(table, "boolean?", Value::Boolean(_));
    type_predicate!(table, "number?", Value::Integer(_) | Value::Float(_));
    type_predicate!(table, "integer?", Value::Integer(_));
    type_predicate!(table, "float?", Value::Float(_));
    type_predicate!(table, "string?", Value::String(_));
    type_predicate!(table, "keyword?", Value::Keyword(_));
    type_predicate!(table, "vector?", Value::Vector(_));
    type_predicate!(table, "map?", Value::Map(_));
    type_predicate!(table, "set?", Value::Set(_));
    type_predicate!(table, "coll?", Value::Vector(_) | Value::Map(_) | Value::Set(_));
    type_predicate!(table, "fn?", Value::Function(_));
    table.define_pure("some?", 1, |args: &[Value]| {
        Ok(Value::Boolean(!matches!(args[0], Value::Nil)))
    });

    table.define_pure("zero?", 1, zero);
    table.define_pure("pos?", 1, positive);
    table.define_pure("neg?", 1, negative);
    table.define_pure("even?", 1, even);
    table.define_pure("odd?", 1, odd);
    table.define_pure("empty?", 1, empty);
    table.define_pure("not-empty", 1, not_empty);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::stdlib::builtin;
    use crate::runtime::stdlib::{BuiltinImpl, Shape};

    fn call(name: &str, arg: Value) -> Value {
        match &builtin(name).unwrap().shape {
            Shape::Normal {
                func: BuiltinImpl::Pure(f),
                ..
            } => f(&[arg]).unwrap(),
            _ => panic!("{} is not a unary pure builtin", name),
        }
    }

    #[test]
    fn type_predicates() {
        assert_eq!(call("nil?", Value::Nil), Value::Boolean(true));
        assert_eq!(call("number?", Value::Float(1.0)), Value::Boolean(true));
        assert_eq!(call("integer?", Value::Float(1.0)), Value::Boolean(false));
        assert_eq!(call("coll?", Value::empty_map()), Value::Boolean(true));
        assert_eq!(call("some?", Value::Boolean(false)), Value::Boolean(true));
    }

    #[test]
    fn emptiness() {
        assert_eq!(call("empty?", Value::string("")), Value::Boolean(true));
        assert_eq!(call("empty?", Value::Nil), Value::Boolean(true));
        assert_eq!(call("not-empty", Value::vector(vec![])), Value::Nil);
        assert!(empty(&[Value::Integer(1)]).is_err());
    }

    #[test]
    fn parity_requires_integers() {
        assert_eq!(call("even?", Value::Integer(4)), Value::Boolean(true));
        assert!(odd(&[Value::string("1")]).is_err());
    }
}
