// Function application: builtin shapes, closures, predicates and the
// collection-as-function forms.

use crate::core_ast::{Combinator, WhereOp};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::memory::Memory;
use crate::runtime::stdlib::comparison::{compare_values, values_equal};
use crate::runtime::stdlib::{lookup, Builtin, BuiltinImpl, Shape};
use crate::runtime::values::{Closure, Function, Predicate, Value};
use std::cmp::Ordering;
use std::sync::Arc;

impl Evaluator {
    /// Applies any callable value to already evaluated arguments.
    pub fn apply_fun(&self, f: &Value, args: Vec<Value>, memory: Memory) -> EvalResult<(Value, Memory)> {
        self.guard.check()?;
        match f {
            Value::Function(Function::Builtin(builtin)) => self.call_builtin(builtin, args, memory),
            Value::Function(Function::Closure(closure)) => self.call_closure(closure, args, memory),
            Value::Function(Function::Predicate(pred)) => {
                if args.len() != 1 {
                    return Err(EvalError::arity(&pred_name(pred), "1", args.len()));
                }
                let (matched, memory) = self.test_predicate(pred, &args[0], memory)?;
                Ok((Value::Boolean(matched), memory))
            }
            Value::Keyword(k) => {
                let name = format!(":{}", k);
                match args.len() {
                    1 | 2 => {
                        let found = lookup(&args[0], f);
                        let fallback = args.get(1).cloned().unwrap_or(Value::Nil);
                        Ok((found.unwrap_or(fallback), memory))
                    }
                    n => Err(EvalError::arity(&name, "1 or 2", n)),
                }
            }
            Value::Map(_) => match args.len() {
                1 | 2 => {
                    let found = lookup(f, &args[0]);
                    let fallback = args.get(1).cloned().unwrap_or(Value::Nil);
                    Ok((found.unwrap_or(fallback), memory))
                }
                n => Err(EvalError::arity("map lookup", "1 or 2", n)),
            },
            Value::Set(set) => match args.as_slice() {
                [x] => Ok((if set.contains(x) { x.clone() } else { Value::Nil }, memory)),
                _ => Err(EvalError::arity("set lookup", "1", args.len())),
            },
            other => Err(EvalError::NotCallable(other.type_name().to_string())),
        }
    }

    fn call_builtin(&self, builtin: &Builtin, args: Vec<Value>, memory: Memory) -> EvalResult<(Value, Memory)> {
        let arity_error = |actual: usize| EvalError::arity(builtin.name, builtin.shape.arity_description(), actual);
        match &builtin.shape {
            Shape::Normal { arity, func } => {
                if args.len() != *arity {
                    return Err(arity_error(args.len()));
                }
                self.invoke(*func, &args, memory)
            }
            Shape::Variadic { identity, func } => {
                if args.is_empty() {
                    Ok((identity(), memory))
                } else {
                    self.invoke(*func, &args, memory)
                }
            }
            Shape::VariadicNonEmpty { func } => {
                if args.is_empty() {
                    return Err(arity_error(0));
                }
                self.invoke(*func, &args, memory)
            }
            Shape::MultiArity { arities } => {
                match arities.iter().find(|(count, _)| *count == args.len()) {
                    Some((_, func)) => self.invoke(*func, &args, memory),
                    None => Err(arity_error(args.len())),
                }
            }
            Shape::Collect { func } => self.invoke(*func, &[Value::vector(args)], memory),
        }
    }

    fn invoke(&self, func: BuiltinImpl, args: &[Value], memory: Memory) -> EvalResult<(Value, Memory)> {
        match func {
            BuiltinImpl::Pure(f) => Ok((f(args)?, memory)),
            BuiltinImpl::Applying(f) => f(self, args, memory),
        }
    }

    fn call_closure(&self, closure: &Arc<Closure>, args: Vec<Value>, memory: Memory) -> EvalResult<(Value, Memory)> {
        let def = &closure.def;
        let name = closure_name(closure);
        let fixed = def.params.len();
        let arity_ok = if def.rest.is_some() {
            args.len() >= fixed
        } else {
            args.len() == fixed
        };
        if !arity_ok {
            return Err(EvalError::arity(&name, def.arity_description(), args.len()));
        }

        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(EvalError::RecursionLimit(self.max_depth));
        }
        self.depth.set(depth + 1);
        let result = self.run_closure(closure, args, memory);
        self.depth.set(depth);
        result
    }

    fn run_closure(&self, closure: &Arc<Closure>, mut args: Vec<Value>, memory: Memory) -> EvalResult<(Value, Memory)> {
        let def = &closure.def;
        let mut env = closure.env.clone();
        if let Some(self_name) = &def.meta.name {
            env = env.bind(
                self_name,
                Value::Function(Function::Closure(Arc::clone(closure))),
            );
        }

        let extra = args.split_off(def.params.len());
        let mut memory = memory;
        for (pattern, value) in def.params.iter().zip(args) {
            let (next, m) = self.bind_pattern(pattern, value, env, memory)?;
            env = next;
            memory = m;
        }
        if let Some(rest) = &def.rest {
            let rest_value = if extra.is_empty() {
                Value::Nil
            } else {
                Value::vector(extra)
            };
            let (next, m) = self.bind_pattern(rest, rest_value, env, memory)?;
            env = next;
            memory = m;
        }
        self.eval(&def.body, &env, memory)
    }

    /// Runs a `where` or combinator predicate against one item.
    fn test_predicate(&self, pred: &Predicate, item: &Value, memory: Memory) -> EvalResult<(bool, Memory)> {
        match pred {
            Predicate::Where { path, op, operand } => {
                let field = path
                    .iter()
                    .try_fold(item.clone(), |current, key| lookup(&current, key))
                    .unwrap_or(Value::Nil);
                Ok((where_matches(*op, &field, operand), memory))
            }
            Predicate::Combined { kind, preds } => {
                let mut memory = memory;
                for p in preds {
                    let (result, m) = self.apply_fun(p, vec![item.clone()], memory)?;
                    memory = m;
                    let truthy = result.is_truthy();
                    match kind {
                        Combinator::AllOf if !truthy => return Ok((false, memory)),
                        Combinator::AnyOf if truthy => return Ok((true, memory)),
                        Combinator::NoneOf if truthy => return Ok((false, memory)),
                        _ => {}
                    }
                }
                Ok((!matches!(kind, Combinator::AnyOf), memory))
            }
        }
    }
}

fn closure_name(closure: &Closure) -> String {
    closure
        .def
        .meta
        .name
        .clone()
        .unwrap_or_else(|| "anonymous fn".to_string())
}

fn pred_name(pred: &Predicate) -> String {
    match pred {
        Predicate::Where { .. } => "where".to_string(),
        Predicate::Combined { kind, .. } => kind.as_str().to_string(),
    }
}

/// Ordering comparisons are false rather than errors when either side is nil
/// or the two sides cannot be compared.
fn ordered(field: &Value, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    if matches!(field, Value::Nil) || matches!(operand, Value::Nil) {
        return false;
    }
    compare_values(field, operand, "where").map(accept).unwrap_or(false)
}

pub(crate) fn where_matches(op: WhereOp, field: &Value, operand: &Value) -> bool {
    match op {
        WhereOp::Truthy => field.is_truthy(),
        WhereOp::Eq => values_equal(field, operand),
        WhereOp::NotEq => !values_equal(field, operand),
        WhereOp::Gt => ordered(field, operand, |o| o == Ordering::Greater),
        WhereOp::Lt => ordered(field, operand, |o| o == Ordering::Less),
        WhereOp::Gte => ordered(field, operand, |o| o != Ordering::Less),
        WhereOp::Lte => ordered(field, operand, |o| o != Ordering::Greater),
        WhereOp::Includes => contains_value(field, operand),
        WhereOp::In => contains_value(operand, field),
    }
}

fn contains_value(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
        (Value::Vector(items), _) => items.iter().any(|v| values_equal(v, needle)),
        (Value::Set(items), _) => items.iter().any(|v| values_equal(v, needle)),
        (Value::Map(map), _) => map.contains_key(needle),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_ordering_is_false_on_nil_or_mismatch() {
        assert!(where_matches(WhereOp::Gt, &Value::Integer(5), &Value::Float(4.5)));
        assert!(!where_matches(WhereOp::Gt, &Value::Nil, &Value::Integer(1)));
        assert!(!where_matches(WhereOp::Lt, &Value::string("a"), &Value::Integer(1)));
    }

    #[test]
    fn includes_and_in() {
        let tags = Value::vector(vec![Value::string("a"), Value::string("b")]);
        assert!(where_matches(WhereOp::Includes, &tags, &Value::string("b")));
        assert!(where_matches(WhereOp::Includes, &Value::string("hello"), &Value::string("ell")));
        assert!(where_matches(WhereOp::In, &Value::string("a"), &tags));
        assert!(!where_matches(WhereOp::In, &Value::string("z"), &tags));
    }

    #[test]
    fn equality_is_numeric() {
        assert!(where_matches(WhereOp::Eq, &Value::Integer(1), &Value::Float(1.0)));
        assert!(where_matches(WhereOp::NotEq, &Value::Nil, &Value::Integer(1)));
    }
}
