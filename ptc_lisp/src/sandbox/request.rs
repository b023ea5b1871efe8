//! Everything a caller hands to one evaluation besides the program itself.

use crate::runtime::memory::Memory;
use crate::runtime::tools::{ToolInvoker, ToolRegistry};
use crate::runtime::values::Value;
use crate::sandbox::options::SandboxOptions;
use std::fmt;
use std::sync::Arc;

/// Inputs for one sandboxed run, assembled with the `with_*` builder methods.
///
/// `context`, `data` and `budget` accept anything convertible into a
/// [`Value`], including `serde_json::Value`; context and data must end up as
/// maps (or nil) or the run fails before evaluation starts.
#[derive(Clone)]
pub struct ExecutionRequest {
    pub context: Value,
    pub data: Value,
    pub memory: Memory,
    pub budget: Option<Value>,
    pub tools: Arc<dyn ToolInvoker>,
    pub options: SandboxOptions,
}

impl Default for ExecutionRequest {
    fn default() -> Self {
        ExecutionRequest {
            context: Value::Nil,
            data: Value::Nil,
            memory: Memory::new(),
            budget: None,
            tools: Arc::new(ToolRegistry::new()),
            options: SandboxOptions::default(),
        }
    }
}

impl ExecutionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// Memory left behind by a previous run.
    pub fn with_memory(mut self, memory: Memory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_budget(mut self, budget: impl Into<Value>) -> Self {
        self.budget = Some(budget.into());
        self
    }

    pub fn with_tools<T: ToolInvoker + 'static>(mut self, tools: T) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn with_shared_tools(mut self, tools: Arc<dyn ToolInvoker>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_options(mut self, options: SandboxOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_memory_bytes(mut self, max_memory_bytes: u64) -> Self {
        self.options.max_memory_bytes = max_memory_bytes;
        self
    }
}

impl fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("context", &self.context)
            .field("data", &self.data)
            .field("memory_keys", &self.memory.len())
            .field("budget", &self.budget)
            .field("tools", &self.tools.tool_names())
            .field("options", &self.options)
            .finish()
    }
}
