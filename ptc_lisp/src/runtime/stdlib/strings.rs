use super::{expect_int, expect_str, seq_items, type_error, BuiltinImpl, BuiltinTable, Shape};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::Value;
use crate::sandbox::allocator;
use itertools::Itertools;

fn str_concat(args: &[Value]) -> EvalResult<Value> {
    let parts: Vec<String> = args.iter().map(Value::to_display_string).collect();
    allocator::ensure_headroom(parts.iter().map(String::len).sum())?;
    Ok(Value::String(parts.concat()))
}

fn char_slice(s: &str, start: i64, end: Option<i64>) -> EvalResult<Value> {
    let chars: Vec<char> = s.chars().collect();
    let end = end.unwrap_or(chars.len() as i64);
    if start < 0 || end < start || end as usize > chars.len() {
        return Err(EvalError::IndexOutOfBounds {
            operation: "subs".to_string(),
            index: if start < 0 || end < start { start } else { end },
            length: chars.len(),
        });
    }
    Ok(Value::String(chars[start as usize..end as usize].iter().collect()))
}

fn subs(args: &[Value]) -> EvalResult<Value> {
    char_slice(expect_str(&args[0], "subs")?, expect_int(&args[1], "subs")?, None)
}

fn subs_range(args: &[Value]) -> EvalResult<Value> {
    char_slice(
        expect_str(&args[0], "subs")?,
        expect_int(&args[1], "subs")?,
        Some(expect_int(&args[2], "subs")?),
    )
}

fn join_with(separator: &str, coll: &Value) -> EvalResult<Value> {
    let items = seq_items(coll, "join")?;
    Ok(Value::String(
        items.iter().map(Value::to_display_string).join(separator),
    ))
}

fn join(args: &[Value]) -> EvalResult<Value> {
    join_with("", &args[0])
}

fn join_sep(args: &[Value]) -> EvalResult<Value> {
    join_with(expect_str(&args[0], "join")?, &args[1])
}

fn split(args: &[Value]) -> EvalResult<Value> {
    let s = expect_str(&args[0], "split")?;
    let separator = expect_str(&args[1], "split")?;
    let parts: Vec<Value> = if separator.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(separator).map(Value::string).collect()
    };
    Ok(Value::vector(parts))
}

fn upper_case(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(expect_str(&args[0], "upper-case")?.to_uppercase()))
}

fn lower_case(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(expect_str(&args[0], "lower-case")?.to_lowercase()))
}

fn trim(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(expect_str(&args[0], "trim")?.trim()))
}

fn starts_with(args: &[Value]) -> EvalResult<Value> {
    let s = expect_str(&args[0], "starts-with?")?;
    Ok(Value::Boolean(s.starts_with(expect_str(&args[1], "starts-with?")?)))
}

fn ends_with(args: &[Value]) -> EvalResult<Value> {
    let s = expect_str(&args[0], "ends-with?")?;
    Ok(Value::Boolean(s.ends_with(expect_str(&args[1], "ends-with?")?)))
}

fn includes(args: &[Value]) -> EvalResult<Value> {
    let s = expect_str(&args[0], "includes?")?;
    Ok(Value::Boolean(s.contains(expect_str(&args[1], "includes?")?)))
}

fn replace(args: &[Value]) -> EvalResult<Value> {
    let s = expect_str(&args[0], "replace")?;
    let from = expect_str(&args[1], "replace")?;
    let to = expect_str(&args[2], "replace")?;
    if from.is_empty() {
        return Err(EvalError::invalid_argument("replace", "search string must not be empty"));
    }
    let growth = s.matches(from).count().saturating_mul(to.len());
    allocator::ensure_headroom(s.len().saturating_add(growth))?;
    Ok(Value::String(s.replace(from, to)))
}

fn blank(args: &[Value]) -> EvalResult<Value> {
    match &args[0] {
        Value::Nil => Ok(Value::Boolean(true)),
        Value::String(s) => Ok(Value::Boolean(s.trim().is_empty())),
        other => Err(type_error("string", other, "blank?")),
    }
}

fn keyword(args: &[Value]) -> EvalResult<Value> {
    match &args[0] {
        Value::String(s) => Ok(Value::Keyword(s.clone())),
        Value::Keyword(_) => Ok(args[0].clone()),
        Value::Nil => Ok(Value::Nil),
        other => Err(type_error("string or keyword", other, "keyword")),
    }
}

fn name(args: &[Value]) -> EvalResult<Value> {
    match &args[0] {
        Value::Keyword(k) => Ok(Value::String(k.clone())),
        Value::String(_) => Ok(args[0].clone()),
        other => Err(type_error("string or keyword", other, "name")),
    }
}

fn parse_long(args: &[Value]) -> EvalResult<Value> {
    let s = expect_str(&args[0], "parse-long")?;
    Ok(s.trim().parse::<i64>().map(Value::Integer).unwrap_or(Value::Nil))
}

fn parse_double(args: &[Value]) -> EvalResult<Value> {
    let s = expect_str(&args[0], "parse-double")?;
    Ok(s.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Nil))
}

pub fn load_string_functions(table: &mut BuiltinTable) {
    table.define(
        "str",
        Shape::Variadic {
            identity: || Value::String(String::new()),
            func: BuiltinImpl::Pure(str_concat),
        },
    );
    table.define(
        "subs",
        Shape::MultiArity {
            arities: vec![
                (2, BuiltinImpl::Pure(subs)),
                (3, BuiltinImpl::Pure(subs_range)),
            ],
        },
    );
    table.define(
        "join",
        Shape::MultiArity {
            arities: vec![
                (1, BuiltinImpl::Pure(join)),
                (2, BuiltinImpl::Pure(join_sep)),
            ],
        },
    );
    table.define_pure("split", 2, split);
    table.define_pure("upper-case", 1, upper_case);
    table.define_pure("lower-case", 1, lower_case);
    table.define_pure("trim", 1, trim);
    table.define_pure("starts-with?", 2, starts_with);
    table.define_pure("ends-with?", 2, ends_with);
    table.define_pure("includes?", 2, includes);
    table.define_pure("replace", 3, replace);
    table.define_pure("blank?", 1, blank);
    table.define_pure("keyword", 1, keyword);
    table.define_pure("name", 1, name);
    table.define_pure("parse-long", 1, parse_long);
    table.define_pure("parse-double", 1, parse_double);
}
