// Binding of `let` and parameter patterns.

use crate::core_ast::Pattern;
use crate::runtime::environment::Env;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::memory::Memory;
use crate::runtime::values::{Value, ValueVec};

fn mismatch(pattern: &Pattern, reason: String) -> EvalError {
    EvalError::DestructureMismatch {
        pattern: pattern.to_string(),
        reason,
    }
}

impl Evaluator {
    /// Binds `value` against `pattern`, returning the extended environment.
    /// `:or` defaults are evaluated lazily, only for keys that are missing.
    pub fn bind_pattern(
        &self,
        pattern: &Pattern,
        value: Value,
        env: Env,
        memory: Memory,
    ) -> EvalResult<(Env, Memory)> {
        match pattern {
            Pattern::Bind(name) => Ok((env.bind(name, value), memory)),
            Pattern::Ignore => Ok((env, memory)),
            Pattern::Seq {
                items,
                rest,
                as_name,
            } => {
                let elements = match &value {
                    Value::Nil => ValueVec::new(),
                    Value::Vector(elements) => elements.clone(),
                    other => {
                        return Err(mismatch(
                            pattern,
                            format!("expected a vector, got {}", other.type_name()),
                        ))
                    }
                };
                let mut env = env;
                let mut memory = memory;
                if let Some(name) = as_name {
                    env = env.bind(name, value.clone());
                }
                for (i, item) in items.iter().enumerate() {
                    let element = elements.get(i).cloned().unwrap_or(Value::Nil);
                    let (next, m) = self.bind_pattern(item, element, env, memory)?;
                    env = next;
                    memory = m;
                }
                if let Some(rest) = rest {
                    let remaining: Vec<Value> = elements.iter().skip(items.len()).cloned().collect();
                    let rest_value = if remaining.is_empty() {
                        Value::Nil
                    } else {
                        Value::vector(remaining)
                    };
                    let (next, m) = self.bind_pattern(rest, rest_value, env, memory)?;
                    env = next;
                    memory = m;
                }
                Ok((env, memory))
            }
            Pattern::Map {
                entries,
                defaults,
                as_name,
            } => {
                let map = match &value {
                    Value::Nil => None,
                    Value::Map(map) => Some(map),
                    other => {
                        return Err(mismatch(
                            pattern,
                            format!("expected a map, got {}", other.type_name()),
                        ))
                    }
                };
                let mut env = env;
                let mut memory = memory;
                if let Some(name) = as_name {
                    env = env.bind(name, value.clone());
                }
                for (item, key) in entries {
                    let found = map.and_then(|m| m.get(key)).cloned();
                    let default = match item {
                        Pattern::Bind(name) => defaults.iter().find(|(d, _)| d == name),
                        _ => None,
                    };
                    let element = match (found, default) {
                        (Some(v), _) => v,
                        (None, Some((_, expr))) => {
                            let (v, m) = self.eval(expr, &env, memory)?;
                            memory = m;
                            v
                        }
                        (None, None) => Value::Nil,
                    };
                    let (next, m) = self.bind_pattern(item, element, env, memory)?;
                    env = next;
                    memory = m;
                }
                Ok((env, memory))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_ast::CoreNode;
    use crate::runtime::evaluator::Externals;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn evaluator() -> Evaluator {
        Evaluator::new(Arc::new(Externals::default()))
    }

    #[test]
    fn vector_pattern_binds_rest_and_whole() {
        let pattern = Pattern::Seq {
            items: vec![Pattern::Bind("a".into()), Pattern::Ignore],
            rest: Some(Box::new(Pattern::Bind("more".into()))),
            as_name: Some("all".into()),
        };
        let value = Value::vector(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        let (env, _) = evaluator()
            .bind_pattern(&pattern, value.clone(), Env::new(), Memory::new())
            .unwrap();
        assert_eq!(env.lookup("a"), Some(&Value::Integer(1)));
        assert_eq!(env.lookup("more"), Some(&Value::vector(vec![Value::Integer(3)])));
        assert_eq!(env.lookup("all"), Some(&value));
    }

    #[test]
    fn map_pattern_uses_defaults_only_when_missing() {
        let pattern = Pattern::Map {
            entries: vec![
                (Pattern::Bind("a".into()), Value::keyword("a")),
                (Pattern::Bind("b".into()), Value::keyword("b")),
            ],
            defaults: vec![
                ("a".into(), CoreNode::Const(Value::Integer(10))),
                ("b".into(), CoreNode::Const(Value::Integer(20))),
            ],
            as_name: None,
        };
        let value = Value::keyword_map([("a", Value::Integer(1))]);
        let (env, _) = evaluator()
            .bind_pattern(&pattern, value, Env::new(), Memory::new())
            .unwrap();
        assert_eq!(env.lookup("a"), Some(&Value::Integer(1)));
        assert_eq!(env.lookup("b"), Some(&Value::Integer(20)));
    }

    #[test]
    fn shape_mismatch_names_the_pattern() {
        let pattern = Pattern::Map {
            entries: vec![(Pattern::Bind("a".into()), Value::keyword("a"))],
            defaults: vec![],
            as_name: None,
        };
        let err = evaluator()
            .bind_pattern(&pattern, Value::Integer(3), Env::new(), Memory::new())
            .unwrap_err();
        match err {
            EvalError::DestructureMismatch { reason, .. } => {
                assert_eq!(reason, "expected a map, got integer")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
