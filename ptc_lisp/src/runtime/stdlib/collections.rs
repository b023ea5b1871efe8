use super::{
    expect_int, lookup, seq_items, type_error, BuiltinImpl, BuiltinTable, Shape,
};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::{Value, ValueMap, ValueSet};
use crate::sandbox::allocator;
use indexmap::IndexMap;
use std::sync::Arc;

fn count(args: &[Value]) -> EvalResult<Value> {
    let n = match &args[0] {
        Value::Nil => 0,
        Value::String(s) => s.chars().count(),
        Value::Vector(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::Set(items) => items.len(),
        other => return Err(type_error("collection", other, "count")),
    };
    Ok(Value::Integer(n as i64))
}

fn first(args: &[Value]) -> EvalResult<Value> {
    Ok(seq_items(&args[0], "first")?.into_iter().next().unwrap_or(Value::Nil))
}

fn second(args: &[Value]) -> EvalResult<Value> {
    Ok(seq_items(&args[0], "second")?.into_iter().nth(1).unwrap_or(Value::Nil))
}

fn last(args: &[Value]) -> EvalResult<Value> {
    Ok(seq_items(&args[0], "last")?.pop().unwrap_or(Value::Nil))
}

fn rest(args: &[Value]) -> EvalResult<Value> {
    let items = seq_items(&args[0], "rest")?;
    Ok(Value::Vector(items.into_iter().skip(1).collect()))
}

fn next(args: &[Value]) -> EvalResult<Value> {
    let items = seq_items(&args[0], "next")?;
    if items.len() <= 1 {
        Ok(Value::Nil)
    } else {
        Ok(Value::Vector(items.into_iter().skip(1).collect()))
    }
}

fn nth_checked(args: &[Value]) -> EvalResult<Value> {
    let index = expect_int(&args[1], "nth")?;
    let length = seq_items(&args[0], "nth")?.len();
    lookup(&args[0], &Value::Integer(index)).ok_or(EvalError::IndexOutOfBounds {
        operation: "nth".to_string(),
        index,
        length,
    })
}

fn nth_default(args: &[Value]) -> EvalResult<Value> {
    let index = expect_int(&args[1], "nth")?;
    seq_items(&args[0], "nth")?;
    Ok(lookup(&args[0], &Value::Integer(index)).unwrap_or_else(|| args[2].clone()))
}

fn get(args: &[Value]) -> EvalResult<Value> {
    Ok(lookup(&args[0], &args[1]).unwrap_or(Value::Nil))
}

fn get_default(args: &[Value]) -> EvalResult<Value> {
    Ok(lookup(&args[0], &args[1]).unwrap_or_else(|| args[2].clone()))
}

pub(crate) fn path_of(value: &Value, operation: &str) -> EvalResult<Vec<Value>> {
    match value {
        Value::Vector(items) => Ok(items.iter().cloned().collect()),
        other => Err(type_error("vector path", other, operation)),
    }
}

pub(crate) fn get_path(root: &Value, path: &[Value]) -> Option<Value> {
    let mut current = root.clone();
    for key in path {
        current = lookup(&current, key)?;
    }
    Some(current)
}

fn get_in(args: &[Value]) -> EvalResult<Value> {
    let path = path_of(&args[1], "get-in")?;
    Ok(get_path(&args[0], &path).unwrap_or(Value::Nil))
}

fn get_in_default(args: &[Value]) -> EvalResult<Value> {
    let path = path_of(&args[1], "get-in")?;
    Ok(get_path(&args[0], &path).unwrap_or_else(|| args[2].clone()))
}

pub(crate) fn assoc_one(target: Value, key: Value, value: Value, operation: &str) -> EvalResult<Value> {
    match target {
        Value::Nil => {
            let mut map = ValueMap::new();
            map.insert(key, value);
            Ok(Value::map(map))
        }
        Value::Map(mut map) => {
            Arc::make_mut(&mut map).insert(key, value);
            Ok(Value::Map(map))
        }
        Value::Vector(mut items) => {
            let index = expect_int(&key, operation)?;
            let length = items.len();
            if index < 0 || index as usize > length {
                return Err(EvalError::IndexOutOfBounds {
                    operation: operation.to_string(),
                    index,
                    length,
                });
            }
            if index as usize == length {
                items.push_back(value);
            } else {
                items.set(index as usize, value);
            }
            Ok(Value::Vector(items))
        }
        other => Err(type_error("map or vector", &other, operation)),
    }
}

fn assoc(args: &[Value]) -> EvalResult<Value> {
    if args.len() < 3 || args.len() % 2 == 0 {
        return Err(EvalError::arity("assoc", "a collection followed by key/value pairs", args.len()));
    }
    let mut target = args[0].clone();
    for pair in args[1..].chunks(2) {
        target = assoc_one(target, pair[0].clone(), pair[1].clone(), "assoc")?;
    }
    Ok(target)
}

pub(crate) fn assoc_path(root: Value, path: &[Value], value: Value, operation: &str) -> EvalResult<Value> {
    match path.split_first() {
        None => Ok(value),
        Some((key, rest)) => {
            let child = lookup(&root, key).unwrap_or(Value::Nil);
            let updated = assoc_path(child, rest, value, operation)?;
            assoc_one(root, key.clone(), updated, operation)
        }
    }
}

fn assoc_in(args: &[Value]) -> EvalResult<Value> {
    let path = path_of(&args[1], "assoc-in")?;
    if path.is_empty() {
        return Err(EvalError::invalid_argument("assoc-in", "path must not be empty"));
    }
    assoc_path(args[0].clone(), &path, args[2].clone(), "assoc-in")
}

fn dissoc(args: &[Value]) -> EvalResult<Value> {
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(map) => {
            let mut map = ValueMap::clone(map);
            for key in &args[1..] {
                map.shift_remove(key);
            }
            Ok(Value::map(map))
        }
        other => Err(type_error("map", other, "dissoc")),
    }
}

fn keys(args: &[Value]) -> EvalResult<Value> {
    match &args[0] {
        Value::Nil => Ok(Value::empty_vector()),
        Value::Map(map) => Ok(Value::Vector(map.keys().cloned().collect())),
        other => Err(type_error("map", other, "keys")),
    }
}

fn vals(args: &[Value]) -> EvalResult<Value> {
    match &args[0] {
        Value::Nil => Ok(Value::empty_vector()),
        Value::Map(map) => Ok(Value::Vector(map.values().cloned().collect())),
        other => Err(type_error("map", other, "vals")),
    }
}

fn contains(args: &[Value]) -> EvalResult<Value> {
    let found = match &args[0] {
        Value::Nil => false,
        Value::Map(map) => map.contains_key(&args[1]),
        Value::Set(items) => items.contains(&args[1]),
        Value::Vector(items) => {
            matches!(args[1], Value::Integer(i) if i >= 0 && (i as usize) < items.len())
        }
        Value::String(s) => {
            matches!(args[1], Value::Integer(i) if i >= 0 && (i as usize) < s.chars().count())
        }
        other => return Err(type_error("collection", other, "contains?")),
    };
    Ok(Value::Boolean(found))
}

fn map_entry(item: &Value, operation: &str) -> EvalResult<(Value, Value)> {
    match item {
        Value::Vector(pair) if pair.len() == 2 => Ok((pair[0].clone(), pair[1].clone())),
        other => Err(type_error("[key value] pair", other, operation)),
    }
}

/// Adds items to a collection the way `conj`/`into` do: vectors append,
/// sets insert, maps take `[k v]` pairs or whole maps.
fn add_items(target: &Value, items: Vec<Value>, operation: &str) -> EvalResult<Value> {
    match target {
        Value::Nil => Ok(Value::vector(items)),
        Value::Vector(existing) => {
            let mut out = existing.clone();
            out.extend(items);
            Ok(Value::Vector(out))
        }
        Value::Set(existing) => {
            let mut out = ValueSet::clone(existing);
            out.extend(items);
            Ok(Value::set(out))
        }
        Value::Map(existing) => {
            let mut out = ValueMap::clone(existing);
            for item in items {
                match item {
                    Value::Map(other) => {
                        out.extend(other.iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    Value::Nil => {}
                    entry => {
                        let (k, v) = map_entry(&entry, operation)?;
                        out.insert(k, v);
                    }
                }
            }
            Ok(Value::map(out))
        }
        other => Err(type_error("collection", other, operation)),
    }
}

fn conj(args: &[Value]) -> EvalResult<Value> {
    add_items(&args[0], args[1..].to_vec(), "conj")
}

fn cons(args: &[Value]) -> EvalResult<Value> {
    let mut items = vec![args[0].clone()];
    items.extend(seq_items(&args[1], "cons")?);
    Ok(Value::vector(items))
}

fn concat(args: &[Value]) -> EvalResult<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(seq_items(arg, "concat")?);
    }
    let total: usize = parts.iter().map(Vec::len).sum();
    allocator::ensure_headroom(total.saturating_mul(std::mem::size_of::<Value>()))?;
    Ok(Value::Vector(parts.into_iter().flatten().collect()))
}

fn into(args: &[Value]) -> EvalResult<Value> {
    add_items(&args[0], seq_items(&args[1], "into")?, "into")
}

fn vec(args: &[Value]) -> EvalResult<Value> {
    seq_items(&args[0], "vec").map(Value::vector)
}

fn collected(args: &[Value]) -> Vec<Value> {
    match args.first() {
        Some(Value::Vector(items)) => items.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

fn vector(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::vector(collected(args)))
}

fn hash_map(args: &[Value]) -> EvalResult<Value> {
    let items = collected(args);
    if items.len() % 2 != 0 {
        return Err(EvalError::invalid_argument(
            "hash-map",
            format!("expected key/value pairs, got {} arguments", items.len()),
        ));
    }
    let mut map = ValueMap::new();
    let mut iter = items.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        map.insert(k, v);
    }
    Ok(Value::map(map))
}

fn set(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::set(seq_items(&args[0], "set")?.into_iter().collect()))
}

fn hash_set(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::set(collected(args).into_iter().collect()))
}

fn merge(args: &[Value]) -> EvalResult<Value> {
    let mut result: Option<ValueMap> = None;
    for arg in args {
        match arg {
            Value::Nil => {}
            Value::Map(map) => result
                .get_or_insert_with(ValueMap::new)
                .extend(map.iter().map(|(k, v)| (k.clone(), v.clone()))),
            other => return Err(type_error("map", other, "merge")),
        }
    }
    Ok(result.map(Value::map).unwrap_or(Value::Nil))
}

fn select_keys(args: &[Value]) -> EvalResult<Value> {
    let wanted = seq_items(&args[1], "select-keys")?;
    match &args[0] {
        Value::Nil => Ok(Value::empty_map()),
        Value::Map(map) => Ok(Value::map(
            wanted
                .into_iter()
                .filter_map(|k| map.get(&k).map(|v| (k.clone(), v.clone())))
                .collect(),
        )),
        other => Err(type_error("map", other, "select-keys")),
    }
}

fn zipmap(args: &[Value]) -> EvalResult<Value> {
    let keys = seq_items(&args[0], "zipmap")?;
    let vals = seq_items(&args[1], "zipmap")?;
    Ok(Value::map(keys.into_iter().zip(vals).collect()))
}

fn count_arg(value: &Value, operation: &str) -> EvalResult<usize> {
    Ok(expect_int(value, operation)?.max(0) as usize)
}

fn take_items(args: &[Value]) -> EvalResult<Value> {
    let n = count_arg(&args[0], "take")?;
    let items = seq_items(&args[1], "take")?;
    Ok(Value::Vector(items.into_iter().take(n).collect()))
}

fn drop_items(args: &[Value]) -> EvalResult<Value> {
    let n = count_arg(&args[0], "drop")?;
    let items = seq_items(&args[1], "drop")?;
    Ok(Value::Vector(items.into_iter().skip(n).collect()))
}

fn reverse(args: &[Value]) -> EvalResult<Value> {
    let mut items = seq_items(&args[0], "reverse")?;
    items.reverse();
    Ok(Value::vector(items))
}

fn distinct(args: &[Value]) -> EvalResult<Value> {
    let unique: ValueSet = seq_items(&args[0], "distinct")?.into_iter().collect();
    Ok(Value::Vector(unique.into_iter().collect()))
}

fn flatten_into(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Vector(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other.clone()),
    }
}

fn flatten(args: &[Value]) -> EvalResult<Value> {
    let mut out = Vec::new();
    if let Value::Vector(items) = &args[0] {
        items.iter().for_each(|item| flatten_into(item, &mut out));
    }
    Ok(Value::vector(out))
}

fn range_values(start: &Value, end: &Value, step: &Value) -> EvalResult<Value> {
    if let (Value::Integer(start), Value::Integer(end), Value::Integer(step)) = (start, end, step) {
        let (start, end, step) = (*start, *end, *step);
        if step == 0 {
            return Err(EvalError::invalid_argument("range", "step must not be zero"));
        }
        let span = if step > 0 { end.saturating_sub(start) } else { start.saturating_sub(end) };
        let count = if span <= 0 { 0 } else { (span as u64).div_ceil(step.unsigned_abs()) };
        allocator::ensure_headroom((count as usize).saturating_mul(std::mem::size_of::<Value>()))?;
        let mut items = Vec::with_capacity(count as usize);
        let mut current = start;
        for _ in 0..count {
            items.push(Value::Integer(current));
            current = current.wrapping_add(step);
        }
        return Ok(Value::vector(items));
    }

    let as_f64 = |v: &Value| super::expect_number(v, "range");
    let (start, end, step) = (as_f64(start)?, as_f64(end)?, as_f64(step)?);
    if step == 0.0 || !step.is_finite() {
        return Err(EvalError::invalid_argument("range", "step must be a non-zero finite number"));
    }
    let count = ((end - start) / step).ceil();
    let count = if count.is_finite() && count > 0.0 { count as usize } else { 0 };
    allocator::ensure_headroom(count.saturating_mul(std::mem::size_of::<Value>()))?;
    Ok(Value::Vector(
        (0..count).map(|i| Value::Float(start + step * i as f64)).collect(),
    ))
}

fn range_to(args: &[Value]) -> EvalResult<Value> {
    range_values(&Value::Integer(0), &args[0], &Value::Integer(1))
}

fn range_from_to(args: &[Value]) -> EvalResult<Value> {
    range_values(&args[0], &args[1], &Value::Integer(1))
}

fn range_step(args: &[Value]) -> EvalResult<Value> {
    range_values(&args[0], &args[1], &args[2])
}

fn partition_with(n: &Value, step: &Value, coll: &Value) -> EvalResult<Value> {
    let n = expect_int(n, "partition")?;
    let step = expect_int(step, "partition")?;
    if n <= 0 || step <= 0 {
        return Err(EvalError::invalid_argument("partition", "size and step must be positive"));
    }
    let (n, step) = (n as usize, step as usize);
    let items = seq_items(coll, "partition")?;
    let mut out = Vec::new();
    let mut start = 0;
    while start + n <= items.len() {
        out.push(Value::vector(items[start..start + n].to_vec()));
        start += step;
    }
    Ok(Value::vector(out))
}

fn partition(args: &[Value]) -> EvalResult<Value> {
    partition_with(&args[0], &args[0], &args[1])
}

fn partition_step(args: &[Value]) -> EvalResult<Value> {
    partition_with(&args[0], &args[1], &args[2])
}

fn frequencies(args: &[Value]) -> EvalResult<Value> {
    let mut counts: IndexMap<Value, i64> = IndexMap::new();
    for item in seq_items(&args[0], "frequencies")? {
        *counts.entry(item).or_insert(0) += 1;
    }
    Ok(Value::map(
        counts.into_iter().map(|(k, n)| (k, Value::Integer(n))).collect(),
    ))
}

fn identity(args: &[Value]) -> EvalResult<Value> {
    Ok(args[0].clone())
}

pub(crate) fn sum_values(items: &[Value], operation: &str) -> EvalResult<Value> {
    let mut int_total: i64 = 0;
    let mut float_total: Option<f64> = None;
    for item in items {
        match item {
            Value::Integer(i) => match float_total.as_mut() {
                Some(total) => *total += *i as f64,
                None => {
                    int_total = int_total
                        .checked_add(*i)
                        .ok_or_else(|| EvalError::invalid_argument(operation, "integer overflow"))?
                }
            },
            Value::Float(f) => *float_total.get_or_insert(int_total as f64) += f,
            other => return Err(type_error("number", other, operation)),
        }
    }
    Ok(float_total.map(Value::Float).unwrap_or(Value::Integer(int_total)))
}

pub(crate) fn avg_values(items: &[Value], operation: &str) -> EvalResult<Value> {
    if items.is_empty() {
        return Ok(Value::Nil);
    }
    let total = sum_values(items, operation)?
        .as_f64()
        .unwrap_or(0.0);
    Ok(Value::Float(total / items.len() as f64))
}

fn sum(args: &[Value]) -> EvalResult<Value> {
    sum_values(&seq_items(&args[0], "sum")?, "sum")
}

fn avg(args: &[Value]) -> EvalResult<Value> {
    avg_values(&seq_items(&args[0], "avg")?, "avg")
}

fn pluck(args: &[Value]) -> EvalResult<Value> {
    let items = seq_items(&args[1], "pluck")?;
    Ok(Value::Vector(
        items
            .iter()
            .map(|item| lookup(item, &args[0]).unwrap_or(Value::Nil))
            .collect(),
    ))
}

fn multi(arities: Vec<(usize, fn(&[Value]) -> EvalResult<Value>)>) -> Shape {
    Shape::MultiArity {
        arities: arities
            .into_iter()
            .map(|(n, f)| (n, BuiltinImpl::Pure(f)))
            .collect(),
    }
}

pub fn load_collection_functions(table: &mut BuiltinTable) {
    table.define_pure("count", 1, count);
    table.define_pure("first", 1, first);
    table.define_pure("second", 1, second);
    table.define_pure("last", 1, last);
    table.define_pure("rest", 1, rest);
    table.define_pure("next", 1, next);
    table.define("nth", multi(vec![(2, nth_checked), (3, nth_default)]));
    table.define("get", multi(vec![(2, get), (3, get_default)]));
    table.define("get-in", multi(vec![(2, get_in), (3, get_in_default)]));
    table.define(
        "assoc",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(assoc),
        },
    );
    table.define_pure("assoc-in", 3, assoc_in);
    table.define(
        "dissoc",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(dissoc),
        },
    );
    table.define_pure("keys", 1, keys);
    table.define_pure("vals", 1, vals);
    table.define_pure("contains?", 2, contains);
    table.define(
        "conj",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Pure(conj),
        },
    );
    table.define_pure("cons", 2, cons);
    table.define(
        "concat",
        Shape::Variadic {
            identity: Value::empty_vector,
            func: BuiltinImpl::Pure(concat),
        },
    );
    table.define_pure("into", 2, into);
    table.define_pure("vec", 1, vec);
    for (name, func) in [
        ("vector", vector as fn(&[Value]) -> EvalResult<Value>),
        ("list", vector),
        ("hash-map", hash_map),
        ("hash-set", hash_set),
    ] {
        table.define(
            name,
            Shape::Collect {
                func: BuiltinImpl::Pure(func),
            },
        );
    }
    table.define_pure("set", 1, set);
    table.define(
        "merge",
        Shape::Variadic {
            identity: || Value::Nil,
            func: BuiltinImpl::Pure(merge),
        },
    );
    table.define_pure("select-keys", 2, select_keys);
    table.define_pure("zipmap", 2, zipmap);
    table.define_pure("take", 2, take_items);
    table.define_pure("drop", 2, drop_items);
    table.define_pure("reverse", 1, reverse);
    table.define_pure("distinct", 1, distinct);
    table.define_pure("flatten", 1, flatten);
    table.define(
        "range",
        multi(vec![(1, range_to), (2, range_from_to), (3, range_step)]),
    );
    table.define("partition", multi(vec![(2, partition), (3, partition_step)]));
    table.define_pure("frequencies", 1, frequencies);
    table.define_pure("identity", 1, identity);
    table.define_pure("sum", 1, sum);
    table.define_pure("avg", 1, avg);
    table.define_pure("pluck", 2, pluck);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(xs: &[i64]) -> Value {
        Value::Vector(xs.iter().map(|x| Value::Integer(*x)).collect())
    }

    #[test]
    fn sequence_accessors_handle_nil_and_empty() {
        assert_eq!(first(&[Value::Nil]).unwrap(), Value::Nil);
        assert_eq!(rest(&[ints(&[])]).unwrap(), ints(&[]));
        assert_eq!(next(&[ints(&[1])]).unwrap(), Value::Nil);
        assert_eq!(last(&[ints(&[1, 2, 3])]).unwrap(), Value::Integer(3));
    }

    #[test]
    fn nth_reports_out_of_bounds() {
        let err = nth_checked(&[ints(&[1]), Value::Integer(3)]).unwrap_err();
        assert!(matches!(err, EvalError::IndexOutOfBounds { index: 3, length: 1, .. }));
        assert_eq!(
            nth_default(&[ints(&[1]), Value::Integer(3), Value::keyword("none")]).unwrap(),
            Value::keyword("none")
        );
    }

    #[test]
    fn assoc_in_creates_nested_maps() {
        let path = Value::vector(vec![Value::keyword("a"), Value::keyword("b")]);
        let result = assoc_in(&[Value::Nil, path, Value::Integer(1)]).unwrap();
        assert_eq!(
            result,
            Value::keyword_map([("a", Value::keyword_map([("b", Value::Integer(1))]))])
        );
    }

    #[test]
    fn conj_respects_target_kind() {
        let set = Value::set([Value::Integer(1)].into_iter().collect());
        assert_eq!(
            conj(&[set, Value::Integer(1), Value::Integer(2)]).unwrap(),
            Value::set([Value::Integer(1), Value::Integer(2)].into_iter().collect())
        );
        let map = conj(&[
            Value::empty_map(),
            Value::vector(vec![Value::keyword("k"), Value::Integer(1)]),
        ])
        .unwrap();
        assert_eq!(map, Value::keyword_map([("k", Value::Integer(1))]));
    }

    #[test]
    fn ranges() {
        assert_eq!(range_to(&[Value::Integer(3)]).unwrap(), ints(&[0, 1, 2]));
        assert_eq!(
            range_step(&[Value::Integer(10), Value::Integer(0), Value::Integer(-5)]).unwrap(),
            ints(&[10, 5])
        );
        assert_eq!(range_to(&[Value::Integer(-1)]).unwrap(), ints(&[]));
        assert!(range_step(&[Value::Integer(0), Value::Integer(1), Value::Integer(0)]).is_err());
    }

    #[test]
    fn partition_drops_incomplete_tail() {
        assert_eq!(
            partition(&[Value::Integer(2), ints(&[1, 2, 3, 4, 5])]).unwrap(),
            Value::vector(vec![ints(&[1, 2]), ints(&[3, 4])])
        );
    }

    #[test]
    fn sums_and_averages() {
        assert_eq!(sum(&[ints(&[1, 2, 3])]).unwrap(), Value::Integer(6));
        assert_eq!(avg(&[ints(&[1, 2])]).unwrap(), Value::Float(1.5));
        assert_eq!(avg(&[ints(&[])]).unwrap(), Value::Nil);
    }

    #[test]
    fn frequencies_keep_first_seen_order() {
        let result = frequencies(&[Value::vector(vec![
            Value::keyword("b"),
            Value::keyword("a"),
            Value::keyword("b"),
        ])])
        .unwrap();
        assert_eq!(result.to_string(), "{:b 2, :a 1}");
    }

    #[test]
    fn merge_skips_nil_and_overrides_left_to_right() {
        let a = Value::keyword_map([("x", Value::Integer(1))]);
        let b = Value::keyword_map([("x", Value::Integer(2))]);
        assert_eq!(merge(&[a, Value::Nil, b.clone()]).unwrap(), b);
        assert_eq!(merge(&[Value::Nil]).unwrap(), Value::Nil);
    }
}
