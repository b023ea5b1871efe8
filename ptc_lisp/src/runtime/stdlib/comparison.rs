use super::{type_error, BuiltinImpl, BuiltinTable, Shape};
use crate::runtime::error::EvalResult;
use crate::runtime::values::Value;
use std::cmp::Ordering;

/// Equality as seen by programs: numbers compare by value across integer and
/// float, collections compare element-wise with the same rule.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Float(y)) | (Value::Float(y), Value::Integer(x)) => {
            (*x as f64) == *y
        }
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Vector(xs), Value::Vector(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, v)| ys.get(k).map_or(false, |other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

/// Total ordering used by `compare`, `sort` and `sort-by`. `nil` sorts first;
/// values of different kinds (other than nil) cannot be compared.
pub fn compare_values(a: &Value, b: &Value, operation: &str) -> EvalResult<Ordering> {
    match (a, b) {
        (Value::Nil, Value::Nil) => Ok(Ordering::Equal),
        (Value::Nil, _) => Ok(Ordering::Less),
        (_, Value::Nil) => Ok(Ordering::Greater),
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x.cmp(y)),
        (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
        (x, y) if x.is_number() && y.is_number() => {
            let (fx, fy) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            Ok(fx.total_cmp(&fy))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Keyword(x), Value::Keyword(y)) => Ok(x.cmp(y)),
        (Value::Vector(xs), Value::Vector(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                match compare_values(x, y, operation)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Ok(xs.len().cmp(&ys.len()))
        }
        _ => Err(type_error(
            &format!("value comparable with {}", a.type_name()),
            b,
            operation,
        )),
    }
}

fn equal(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(
        args.windows(2).all(|pair| values_equal(&pair[0], &pair[1])),
    ))
}

fn not_equal(args: &[Value]) -> EvalResult<Value> {
    equal(args).map(|v| Value::Boolean(!v.is_truthy()))
}

fn numeric_chain(
    args: &[Value],
    operation: &str,
    holds: fn(Ordering) -> bool,
) -> EvalResult<Value> {
    for arg in args {
        if !arg.is_number() {
            return Err(type_error("number", arg, operation));
        }
    }
    for pair in args.windows(2) {
        if !holds(compare_values(&pair[0], &pair[1], operation)?) {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

fn less(args: &[Value]) -> EvalResult<Value> {
    numeric_chain(args, "<", |o| o == Ordering::Less)
}

fn greater(args: &[Value]) -> EvalResult<Value> {
    numeric_chain(args, ">", |o| o == Ordering::Greater)
}

fn less_equal(args: &[Value]) -> EvalResult<Value> {
    numeric_chain(args, "<=", |o| o != Ordering::Greater)
}

fn greater_equal(args: &[Value]) -> EvalResult<Value> {
    numeric_chain(args, ">=", |o| o != Ordering::Less)
}

fn compare(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Integer(
        match compare_values(&args[0], &args[1], "compare")? {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        },
    ))
}

fn not(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(!args[0].is_truthy()))
}

fn boolean(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Boolean(args[0].is_truthy()))
}

pub fn load_comparison_functions(table: &mut BuiltinTable) {
    let chains: [(&'static str, fn(&[Value]) -> EvalResult<Value>); 6] = [
        ("=", equal),
        ("not=", not_equal),
        ("<", less),
        (">", greater),
        ("<=", less_equal),
        (">=", greater_equal),
    ];
    for (name, func) in chains {
        table.define(
            name,
            Shape::VariadicNonEmpty {
                func: BuiltinImpl::Pure(func),
            },
        );
    }
    table.define_pure("compare", 2, compare);
    table.define_pure("not", 1, not);
    table.define_pure("boolean", 1, boolean);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_crosses_int_and_float() {
        assert!(values_equal(&Value::Integer(1), &Value::Float(1.0)));
        assert!(values_equal(
            &Value::vector(vec![Value::Integer(2)]),
            &Value::vector(vec![Value::Float(2.0)])
        ));
        assert!(!values_equal(&Value::Integer(1), &Value::string("1")));
    }

    #[test]
    fn chains_compare_every_neighbour() {
        let args = [Value::Integer(1), Value::Integer(2), Value::Float(2.5)];
        assert_eq!(less(&args).unwrap(), Value::Boolean(true));
        let args = [Value::Integer(1), Value::Integer(3), Value::Integer(2)];
        assert_eq!(less(&args).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn ordering_rejects_mixed_kinds() {
        assert!(compare_values(&Value::Integer(1), &Value::string("a"), "sort").is_err());
        assert_eq!(
            compare_values(&Value::Nil, &Value::Integer(1), "sort").unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn less_than_requires_numbers() {
        assert!(less(&[Value::string("a"), Value::string("b")]).is_err());
    }
}
