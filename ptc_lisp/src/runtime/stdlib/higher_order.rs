//! Builtins that take functions as arguments.
//!
//! Each callback goes through [`Evaluator::apply_fun`] with the current memory
//! and hands the returned memory to the next callback, so `memory/put` inside a
//! mapped function behaves exactly as it would in straight-line code.

use super::collections::{assoc_path, get_path, path_of, sum_values};
use super::comparison::compare_values;
use super::{lookup, seq_items, type_error, BuiltinImpl, BuiltinTable, Shape};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::memory::Memory;
use crate::runtime::values::{Value, ValueMap};
use std::cmp::Ordering;

type Applied = EvalResult<(Value, Memory)>;

fn call1(ev: &Evaluator, f: &Value, x: Value, memory: Memory) -> Applied {
    ev.apply_fun(f, vec![x], memory)
}

fn map_values(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let f = &args[0];
    let mut memory = memory;
    let mut out = Vec::new();
    if args.len() == 2 {
        for item in seq_items(&args[1], "map")? {
            let (v, m) = call1(ev, f, item, memory)?;
            out.push(v);
            memory = m;
        }
    } else {
        let columns: Vec<Vec<Value>> = args[1..]
            .iter()
            .map(|coll| seq_items(coll, "map"))
            .collect::<EvalResult<_>>()?;
        let shortest = columns.iter().map(Vec::len).min().unwrap_or(0);
        for i in 0..shortest {
            let row = columns.iter().map(|col| col[i].clone()).collect();
            let (v, m) = ev.apply_fun(f, row, memory)?;
            out.push(v);
            memory = m;
        }
    }
    Ok((Value::vector(out), memory))
}

fn select(ev: &Evaluator, args: &[Value], memory: Memory, keep: bool, operation: &str) -> Applied {
    let mut memory = memory;
    let mut out = Vec::new();
    for item in seq_items(&args[1], operation)? {
        let (verdict, m) = call1(ev, &args[0], item.clone(), memory)?;
        memory = m;
        if verdict.is_truthy() == keep {
            out.push(item);
        }
    }
    Ok((Value::vector(out), memory))
}

fn filter(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    select(ev, args, memory, true, "filter")
}

fn remove(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    select(ev, args, memory, false, "remove")
}

fn reduce_with(ev: &Evaluator, f: &Value, init: Value, items: Vec<Value>, memory: Memory) -> Applied {
    let mut acc = init;
    let mut memory = memory;
    for item in items {
        let (v, m) = ev.apply_fun(f, vec![acc, item], memory)?;
        acc = v;
        memory = m;
    }
    Ok((acc, memory))
}

fn reduce(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let mut items = seq_items(&args[1], "reduce")?.into_iter();
    match items.next() {
        None => ev.apply_fun(&args[0], Vec::new(), memory),
        Some(first) => reduce_with(ev, &args[0], first, items.collect(), memory),
    }
}

fn reduce_init(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let items = seq_items(&args[2], "reduce")?;
    reduce_with(ev, &args[0], args[1].clone(), items, memory)
}

/// Walks `coll` until `stop` says so for a callback result. Returns the item
/// and the callback result that stopped the walk.
fn scan(
    ev: &Evaluator,
    args: &[Value],
    memory: Memory,
    operation: &str,
    stop: fn(&Value) -> bool,
) -> EvalResult<(Option<(Value, Value)>, Memory)> {
    let mut memory = memory;
    for item in seq_items(&args[1], operation)? {
        let (result, m) = call1(ev, &args[0], item.clone(), memory)?;
        memory = m;
        if stop(&result) {
            return Ok((Some((item, result)), memory));
        }
    }
    Ok((None, memory))
}

fn find(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (hit, memory) = scan(ev, args, memory, "find", Value::is_truthy)?;
    Ok((hit.map(|(item, _)| item).unwrap_or(Value::Nil), memory))
}

fn some(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (hit, memory) = scan(ev, args, memory, "some", Value::is_truthy)?;
    Ok((hit.map(|(_, result)| result).unwrap_or(Value::Nil), memory))
}

fn every(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (hit, memory) = scan(ev, args, memory, "every?", |v| !v.is_truthy())?;
    Ok((Value::Boolean(hit.is_none()), memory))
}

fn not_any(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (hit, memory) = scan(ev, args, memory, "not-any?", Value::is_truthy)?;
    Ok((Value::Boolean(hit.is_none()), memory))
}

fn mapcat(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (mapped, memory) = map_values(ev, args, memory)?;
    let mut out = Vec::new();
    for part in seq_items(&mapped, "mapcat")? {
        out.extend(seq_items(&part, "mapcat")?);
    }
    Ok((Value::vector(out), memory))
}

fn keep(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (mapped, memory) = map_values(ev, args, memory)?;
    let out: Vec<Value> = seq_items(&mapped, "keep")?
        .into_iter()
        .filter(|v| !matches!(v, Value::Nil))
        .collect();
    Ok((Value::vector(out), memory))
}

fn apply(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    if args.len() < 2 {
        return Err(EvalError::arity("apply", "at least 2", args.len()));
    }
    let last = args.len() - 1;
    let mut call_args: Vec<Value> = args[1..last].to_vec();
    call_args.extend(seq_items(&args[last], "apply")?);
    ev.apply_fun(&args[0], call_args, memory)
}

/// Computes the key of every item, in order.
fn keyed(
    ev: &Evaluator,
    key_fn: &Value,
    coll: &Value,
    memory: Memory,
    operation: &str,
) -> EvalResult<(Vec<(Value, Value)>, Memory)> {
    let mut memory = memory;
    let mut out = Vec::new();
    for item in seq_items(coll, operation)? {
        let (key, m) = call1(ev, key_fn, item.clone(), memory)?;
        memory = m;
        out.push((key, item));
    }
    Ok((out, memory))
}

fn sum_by(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (pairs, memory) = keyed(ev, &args[0], &args[1], memory, "sum-by")?;
    let keys: Vec<Value> = pairs.into_iter().map(|(k, _)| k).collect();
    Ok((sum_values(&keys, "sum-by")?, memory))
}

fn avg_by(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (pairs, memory) = keyed(ev, &args[0], &args[1], memory, "avg-by")?;
    if pairs.is_empty() {
        return Ok((Value::Nil, memory));
    }
    let count = pairs.len() as f64;
    let keys: Vec<Value> = pairs.into_iter().map(|(k, _)| k).collect();
    let total = sum_values(&keys, "avg-by")?.as_f64().unwrap_or(0.0);
    Ok((Value::Float(total / count), memory))
}

fn extreme_by(
    ev: &Evaluator,
    args: &[Value],
    memory: Memory,
    operation: &str,
    wanted: Ordering,
) -> Applied {
    let (pairs, memory) = keyed(ev, &args[0], &args[1], memory, operation)?;
    let mut best: Option<(Value, Value)> = None;
    for (key, item) in pairs {
        if matches!(key, Value::Nil) {
            continue;
        }
        let replace = match &best {
            None => true,
            Some((best_key, _)) => compare_values(&key, best_key, operation)? == wanted,
        };
        if replace {
            best = Some((key, item));
        }
    }
    Ok((best.map(|(_, item)| item).unwrap_or(Value::Nil), memory))
}

fn min_by(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    extreme_by(ev, args, memory, "min-by", Ordering::Less)
}

fn max_by(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    extreme_by(ev, args, memory, "max-by", Ordering::Greater)
}

/// Orders two values with a user comparator. Numeric results are used by
/// sign; boolean results are read as "a comes before b".
fn comparator_ordering(
    ev: &Evaluator,
    cmp: &Value,
    a: &Value,
    b: &Value,
    memory: Memory,
) -> EvalResult<(Ordering, Memory)> {
    let (result, memory) = ev.apply_fun(cmp, vec![a.clone(), b.clone()], memory)?;
    match result {
        Value::Integer(i) => Ok((i.cmp(&0), memory)),
        Value::Float(f) => Ok((f.total_cmp(&0.0), memory)),
        Value::Boolean(true) => Ok((Ordering::Less, memory)),
        Value::Boolean(false) | Value::Nil => {
            let (reverse, memory) = ev.apply_fun(cmp, vec![b.clone(), a.clone()], memory)?;
            let ordering = if reverse.is_truthy() {
                Ordering::Greater
            } else {
                Ordering::Equal
            };
            Ok((ordering, memory))
        }
        other => Err(type_error("number or boolean from comparator", &other, "sort")),
    }
}

/// Stable sort of `(key, item)` pairs by key, either naturally or through a
/// user comparator. Errors from the comparator abort the sort.
fn sort_pairs(
    ev: &Evaluator,
    mut pairs: Vec<(Value, Value)>,
    comparator: Option<&Value>,
    memory: Memory,
    operation: &str,
) -> EvalResult<(Vec<Value>, Memory)> {
    let mut failure: Option<EvalError> = None;
    let mut memory = Some(memory);
    pairs.sort_by(|(ka, _), (kb, _)| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        let result = match comparator {
            None => compare_values(ka, kb, operation),
            Some(cmp) => match memory.take() {
                Some(current) => comparator_ordering(ev, cmp, ka, kb, current).map(|(o, m)| {
                    memory = Some(m);
                    o
                }),
                None => Ok(Ordering::Equal),
            },
        };
        result.unwrap_or_else(|e| {
            failure = Some(e);
            Ordering::Equal
        })
    });
    if let Some(err) = failure {
        return Err(err);
    }
    let memory = memory.ok_or_else(|| EvalError::Internal(format!("{} lost memory", operation)))?;
    Ok((pairs.into_iter().map(|(_, item)| item).collect(), memory))
}

fn sort_natural(args: &[Value]) -> EvalResult<Value> {
    let mut items = seq_items(&args[0], "sort")?;
    let mut failure = None;
    items.sort_by(|a, b| {
        compare_values(a, b, "sort").unwrap_or_else(|e| {
            failure.get_or_insert(e);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(Value::vector(items)),
    }
}

fn sort_with(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let pairs = seq_items(&args[1], "sort")?
        .into_iter()
        .map(|item| (item.clone(), item))
        .collect();
    let (sorted, memory) = sort_pairs(ev, pairs, Some(&args[0]), memory, "sort")?;
    Ok((Value::vector(sorted), memory))
}

fn sort_by(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (pairs, memory) = keyed(ev, &args[0], &args[1], memory, "sort-by")?;
    let (sorted, memory) = sort_pairs(ev, pairs, None, memory, "sort-by")?;
    Ok((Value::vector(sorted), memory))
}

fn sort_by_with(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (pairs, memory) = keyed(ev, &args[0], &args[2], memory, "sort-by")?;
    let (sorted, memory) = sort_pairs(ev, pairs, Some(&args[1]), memory, "sort-by")?;
    Ok((Value::vector(sorted), memory))
}

fn group_by(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let (pairs, memory) = keyed(ev, &args[0], &args[1], memory, "group-by")?;
    let mut groups = ValueMap::new();
    for (key, item) in pairs {
        match groups.entry(key).or_insert_with(Value::empty_vector) {
            Value::Vector(members) => members.push_back(item),
            _ => return Err(EvalError::Internal("group-by bucket is not a vector".to_string())),
        }
    }
    Ok((Value::map(groups), memory))
}

fn take_while(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let mut memory = memory;
    let mut out = Vec::new();
    for item in seq_items(&args[1], "take-while")? {
        let (verdict, m) = call1(ev, &args[0], item.clone(), memory)?;
        memory = m;
        if !verdict.is_truthy() {
            break;
        }
        out.push(item);
    }
    Ok((Value::vector(out), memory))
}

fn drop_while(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    let mut memory = memory;
    let items = seq_items(&args[1], "drop-while")?;
    let mut split = items.len();
    for (i, item) in items.iter().enumerate() {
        let (verdict, m) = call1(ev, &args[0], item.clone(), memory)?;
        memory = m;
        if !verdict.is_truthy() {
            split = i;
            break;
        }
    }
    Ok((Value::vector(items[split..].to_vec()), memory))
}

// (update m k f & args)
fn update(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    if args.len() < 3 {
        return Err(EvalError::arity("update", "at least 3", args.len()));
    }
    let current = lookup(&args[0], &args[1]).unwrap_or(Value::Nil);
    let mut call_args = vec![current];
    call_args.extend_from_slice(&args[3..]);
    let (updated, memory) = ev.apply_fun(&args[2], call_args, memory)?;
    let result = assoc_path(args[0].clone(), std::slice::from_ref(&args[1]), updated, "update")?;
    Ok((result, memory))
}

// (update-in m [k ...] f & args)
fn update_in(ev: &Evaluator, args: &[Value], memory: Memory) -> Applied {
    if args.len() < 3 {
        return Err(EvalError::arity("update-in", "at least 3", args.len()));
    }
    let path = path_of(&args[1], "update-in")?;
    if path.is_empty() {
        return Err(EvalError::invalid_argument("update-in", "path must not be empty"));
    }
    let current = get_path(&args[0], &path).unwrap_or(Value::Nil);
    let mut call_args = vec![current];
    call_args.extend_from_slice(&args[3..]);
    let (updated, memory) = ev.apply_fun(&args[2], call_args, memory)?;
    Ok((assoc_path(args[0].clone(), &path, updated, "update-in")?, memory))
}

fn applying_multi(arities: Vec<(usize, BuiltinImpl)>) -> Shape {
    Shape::MultiArity { arities }
}

pub fn load_higher_order_functions(table: &mut BuiltinTable) {
    table.define(
        "map",
        applying_multi(vec![
            (2, BuiltinImpl::Applying(map_values)),
            (3, BuiltinImpl::Applying(map_values)),
        ]),
    );
    table.define(
        "mapv",
        applying_multi(vec![
            (2, BuiltinImpl::Applying(map_values)),
            (3, BuiltinImpl::Applying(map_values)),
        ]),
    );
    table.define_applying("filter", 2, filter);
    table.define_applying("remove", 2, remove);
    table.define(
        "reduce",
        applying_multi(vec![
            (2, BuiltinImpl::Applying(reduce)),
            (3, BuiltinImpl::Applying(reduce_init)),
        ]),
    );
    table.define_applying("find", 2, find);
    table.define_applying("some", 2, some);
    table.define_applying("every?", 2, every);
    table.define_applying("not-any?", 2, not_any);
    table.define_applying("mapcat", 2, mapcat);
    table.define_applying("keep", 2, keep);
    table.define(
        "apply",
        Shape::VariadicNonEmpty {
            func: BuiltinImpl::Applying(apply),
        },
    );
    table.define_applying("sum-by", 2, sum_by);
    table.define_applying("avg-by", 2, avg_by);
    table.define_applying("min-by", 2, min_by);
    table.define_applying("max-by", 2, max_by);
    table.define(
        "sort",
        applying_multi(vec![
            (1, BuiltinImpl::Pure(sort_natural)),
            (2, BuiltinImpl::Applying(sort_with)),
        ]),
    );
    table.define(
        "sort-by",
        applying_multi(vec![
            (2, BuiltinImpl::Applying(sort_by)),
            (3, BuiltinImpl::Applying(sort_by_with)),
        ]),
    );
    table.define_applying("group-by", 2, group_by);
    table.define_applying("take-while", 2, take_while);
    table.define_applying("drop-while", 2, drop_while);
    for (name, func) in [("update", update as super::ApplyingFn), ("update-in", update_in)] {
        table.define(
            name,
            Shape::VariadicNonEmpty {
                func: BuiltinImpl::Applying(func),
            },
        );
    }
}
