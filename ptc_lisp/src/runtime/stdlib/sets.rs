use super::{type_error, BuiltinImpl, BuiltinTable, Shape};
use crate::runtime::error::EvalResult;
use crate::runtime::values::{Value, ValueSet};

fn as_set<'a>(value: &'a Value, operation: &str) -> EvalResult<Option<&'a ValueSet>> {
    match value {
        Value::Set(items) => Ok(Some(items.as_ref())),
        Value::Nil => Ok(None),
        other => Err(type_error("set", other, operation)),
    }
}

fn union(args: &[Value]) -> EvalResult<Value> {
    let mut out = ValueSet::new();
    for arg in args {
        if let Some(items) = as_set(arg, "union")? {
            out.extend(items.iter().cloned());
        }
    }
    Ok(Value::set(out))
}

fn intersection(args: &[Value]) -> EvalResult<Value> {
    let mut out = as_set(&args[0], "intersection")?.cloned().unwrap_or_default();
    for arg in &args[1..] {
        let other = as_set(arg, "intersection")?;
        out.retain(|item| other.map_or(false, |set| set.contains(item)));
    }
    Ok(Value::set(out))
}

fn difference(args: &[Value]) -> EvalResult<Value> {
    let mut out = as_set(&args[0], "difference")?.cloned().unwrap_or_default();
    for arg in &args[1..] {
        if let Some(other) = as_set(arg, "difference")? {
            out.retain(|item| !other.contains(item));
        }
    }
    Ok(Value::set(out))
}

fn disj(args: &[Value]) -> EvalResult<Value> {
    match as_set(&args[0], "disj")? {
        None => Ok(Value::Nil),
        Some(items) => {
            let mut out = ValueSet::clone(items);
            for item in &args[1..] {
                out.shift_remove(item);
            }
            Ok(Value::set(out))
        }
    }
}

pub fn load_set_functions(table: &mut BuiltinTable) {
    table.define(
        "union",
        Shape::Variadic {
            identity: || Value::set(ValueSet::new()),
            func: BuiltinImpl::Pure(union),
        },
    );
    table.define(
        "intersection",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(intersection),
        },
    );
    table.define(
        "difference",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(difference),
        },
    );
    table.define(
        "disj",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(disj),
        },
    );
}
