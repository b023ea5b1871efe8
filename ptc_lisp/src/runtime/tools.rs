//! Host tools callable from programs.
//!
//! A tool is a synchronous callback into the host. Programs reach it with
//! `(tool/name ...)`, `(ctx/name ...)` or `(call "name" ...)`; all three build
//! the same single argument (see [`tool_argument`]).

use crate::runtime::values::Value;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Callback type for closures registered as tools.
pub type ToolFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Anything that can serve tool calls for a program.
pub trait ToolInvoker: Send + Sync {
    /// Invoke `name` with its single argument. An `Err` is turned into an
    /// error value the program can inspect, not into an evaluation failure.
    fn invoke(&self, name: &str, argument: Value) -> Result<Value, String>;

    fn has_tool(&self, name: &str) -> bool;

    fn tool_names(&self) -> Vec<String>;
}

/// Name-indexed set of tool callbacks.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolFn>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: IndexMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, tool: F)
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.tools.insert(name.to_string(), Arc::new(tool));
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_tool<F>(mut self, name: &str, tool: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(name, tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolInvoker for ToolRegistry {
    fn invoke(&self, name: &str, argument: Value) -> Result<Value, String> {
        match self.tools.get(name) {
            Some(tool) => tool(argument),
            None => Err(format!("tool '{}' is not registered", name)),
        }
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds the argument a tool receives from the call-site arguments:
/// a single map passes through as is, no arguments become `{}`, and anything
/// else is wrapped as `{:args [...]}`.
pub fn tool_argument(mut args: Vec<Value>) -> Value {
    match args.len() {
        0 => Value::empty_map(),
        1 if matches!(args[0], Value::Map(_)) => args.remove(0),
        _ => Value::keyword_map([("args", Value::vector(args))]),
    }
}

/// The value a program sees when a tool reports an error.
pub fn tool_error_value(tool: &str, message: &str) -> Value {
    Value::keyword_map([
        ("error", Value::string(message)),
        ("tool", Value::string(tool)),
    ])
}

/// Text of a panic payload, for tools and workers that unwind.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
