// Environment for lexical bindings
//
// Frames are reference counted and never mutated once linked, so a closure can
// hold on to the environment it was created in while evaluation continues to
// extend its own copy.

use crate::runtime::values::Value;
use std::fmt;
use std::sync::Arc;

struct Frame {
    name: String,
    value: Value,
    parent: Option<Arc<Frame>>,
}

/// The lexical scope chain. Builtins are not stored here: the analyzer resolves
/// them to direct references, so the chain only holds `let`/`fn`/`def` names.
#[derive(Clone, Default)]
pub struct Env {
    head: Option<Arc<Frame>>,
}

impl Env {
    /// Creates a new, empty environment.
    pub fn new() -> Self {
        Env { head: None }
    }

    /// Returns a child environment with `name` bound to `value`. The receiver
    /// is left untouched.
    pub fn bind(&self, name: &str, value: Value) -> Env {
        Env {
            head: Some(Arc::new(Frame {
                name: name.to_string(),
                value,
                parent: self.head.clone(),
            })),
        }
    }

    /// Looks up a name, innermost binding first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if current.name == name {
                return Some(&current.value);
            }
            frame = current.parent.as_deref();
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Visible names, innermost first, without shadowed duplicates.
    pub fn symbol_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if !names.contains(&current.name) {
                names.push(current.name.clone());
            }
            frame = current.parent.as_deref();
        }
        names
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("names", &self.symbol_names())
            .finish()
    }
}

impl Drop for Env {
    // Unlink long chains iteratively; a recursive drop of thousands of
    // single-binding frames could exhaust the stack.
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(frame) = next {
            match Arc::try_unwrap(frame) {
                Ok(mut owned) => next = owned.parent.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_bindings_shadow_outer() {
        let outer = Env::new().bind("x", Value::Integer(1));
        let inner = outer.bind("x", Value::Integer(2));
        assert_eq!(inner.lookup("x"), Some(&Value::Integer(2)));
        assert_eq!(outer.lookup("x"), Some(&Value::Integer(1)));
        assert_eq!(inner.symbol_names(), vec!["x".to_string()]);
    }

    #[test]
    fn extending_does_not_affect_captured_env() {
        let captured = Env::new().bind("a", Value::Integer(1));
        let later = captured.bind("b", Value::Integer(2));
        assert!(later.contains("b"));
        assert!(!captured.contains("b"));
    }

    #[test]
    fn long_chains_drop_without_overflow() {
        let mut env = Env::new();
        for i in 0..200_000 {
            env = env.bind("x", Value::Integer(i));
        }
        drop(env);
    }
}
