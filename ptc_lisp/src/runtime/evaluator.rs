// Tree-walking evaluator over the core AST.
//
// Every step takes the program memory by value and hands back the (possibly
// updated) memory alongside its result; nothing is mutated in place.

use crate::core_ast::{CoreNode, FnDef};
use crate::error_reporting::did_you_mean;
use crate::runtime::environment::Env;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::memory::{memory_key, Memory};
use crate::runtime::tools::{panic_message, tool_argument, tool_error_value, ToolInvoker, ToolRegistry};
use crate::runtime::values::{Closure, Function, Predicate, Value, ValueMap, ValueSet};
use crate::sandbox::allocator;
use log::{debug, trace, warn};
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Host-supplied inputs a program can read or call.
#[derive(Clone)]
pub struct Externals {
    pub ctx: Arc<ValueMap>,
    pub data: Arc<ValueMap>,
    pub budget: Option<Value>,
    pub tools: Arc<dyn ToolInvoker>,
}

impl Default for Externals {
    fn default() -> Self {
        Externals {
            ctx: Arc::default(),
            data: Arc::default(),
            budget: None,
            tools: Arc::new(ToolRegistry::new()),
        }
    }
}

impl fmt::Debug for Externals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Externals")
            .field("ctx_keys", &self.ctx.len())
            .field("data_keys", &self.data.len())
            .field("budget", &self.budget)
            .field("tools", &self.tools.tool_names())
            .finish()
    }
}

/// Finds `name` in a map keyed by keywords or strings.
pub(crate) fn lookup_named<'a>(map: &'a ValueMap, name: &str) -> Option<&'a Value> {
    map.get(&Value::keyword(name))
        .or_else(|| map.get(&Value::string(name)))
}

fn key_names(map: &ValueMap) -> Vec<String> {
    map.keys()
        .filter_map(|k| k.as_key_name().map(str::to_string))
        .collect()
}

/// Stops evaluation once the deadline passes, the caller cancels, or the
/// memory ledger trips. Checked before every evaluation step.
#[derive(Debug, Clone, Default)]
pub struct ExecutionGuard {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl ExecutionGuard {
    pub fn unbounded() -> Self {
        ExecutionGuard::default()
    }

    pub fn new(deadline: Instant, cancelled: Arc<AtomicBool>) -> Self {
        ExecutionGuard {
            deadline: Some(deadline),
            cancelled,
        }
    }

    pub fn check(&self) -> EvalResult<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(EvalError::Timeout);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(EvalError::Timeout);
            }
        }
        if allocator::tripped() {
            return Err(EvalError::MemoryLimit);
        }
        Ok(())
    }
}

pub struct Evaluator {
    pub(super) externals: Arc<Externals>,
    pub(super) guard: ExecutionGuard,
    pub(super) max_depth: usize,
    pub(super) depth: Cell<usize>,
}

impl Evaluator {
    pub fn new(externals: Arc<Externals>) -> Self {
        Evaluator {
            externals,
            guard: ExecutionGuard::unbounded(),
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
            depth: Cell::new(0),
        }
    }

    pub fn with_guard(mut self, guard: ExecutionGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn externals(&self) -> &Externals {
        &self.externals
    }

    /// Evaluates a whole program in an empty lexical scope.
    pub fn evaluate(&self, program: &CoreNode, memory: Memory) -> EvalResult<(Value, Memory)> {
        self.eval(program, &Env::new(), memory)
    }

    pub fn eval(&self, node: &CoreNode, env: &Env, memory: Memory) -> EvalResult<(Value, Memory)> {
        self.guard.check()?;
        match node {
            CoreNode::Const(value) => Ok((value.clone(), memory)),
            CoreNode::Vector(items) => {
                let (values, memory) = self.eval_all(items, env, memory)?;
                Ok((Value::vector(values), memory))
            }
            CoreNode::Set(items) => {
                let (values, memory) = self.eval_all(items, env, memory)?;
                Ok((Value::set(values.into_iter().collect::<ValueSet>()), memory))
            }
            CoreNode::Map(pairs) => {
                let mut map = ValueMap::with_capacity(pairs.len());
                let mut memory = memory;
                for (key_node, value_node) in pairs {
                    let (key, m) = self.eval(key_node, env, memory)?;
                    let (value, m) = self.eval(value_node, env, m)?;
                    map.insert(key, value);
                    memory = m;
                }
                Ok((Value::map(map), memory))
            }
            CoreNode::Local(name) => match env.lookup(name) {
                Some(value) => Ok((value.clone(), memory)),
                None => Err(EvalError::UnboundSymbol {
                    name: name.clone(),
                    hint: did_you_mean(name, &env.symbol_names()),
                }),
            },
            CoreNode::Builtin(builtin) => Ok((Value::Function(Function::Builtin(builtin)), memory)),
            CoreNode::Global(name) => {
                let value = self.resolve_global(name, env, &memory)?;
                Ok((value, memory))
            }
            CoreNode::CtxGet { name } => Ok((
                lookup_named(&self.externals.ctx, name).cloned().unwrap_or(Value::Nil),
                memory,
            )),
            CoreNode::DataGet { name } => Ok((
                lookup_named(&self.externals.data, name).cloned().unwrap_or(Value::Nil),
                memory,
            )),
            CoreNode::MemoryGet { key } => {
                let (key, memory) = self.eval(key, env, memory)?;
                let key = memory_key(&key, "memory/get")?;
                let value = memory.get(&key).cloned().unwrap_or(Value::Nil);
                Ok((value, memory))
            }
            CoreNode::MemoryPut { key, expr } => {
                let (key, memory) = self.eval(key, env, memory)?;
                let key = memory_key(&key, "memory/put")?;
                let (value, memory) = self.eval(expr, env, memory)?;
                trace!("memory/put {}", key);
                let memory = memory.update(key, value.clone());
                Ok((value, memory))
            }
            CoreNode::BudgetQuery => Ok((
                self.externals.budget.clone().unwrap_or_else(Value::empty_map),
                memory,
            )),
            CoreNode::Do(body) => self.eval_do(body, env, memory),
            CoreNode::Def { value, .. } => self.eval(value, env, memory),
            CoreNode::Let { bindings, body } => self.eval_let(bindings, body, env, memory),
            CoreNode::If {
                cond,
                then,
                otherwise,
            } => {
                let (test, memory) = self.eval(cond, env, memory)?;
                if test.is_truthy() {
                    self.eval(then, env, memory)
                } else {
                    self.eval(otherwise, env, memory)
                }
            }
            CoreNode::And(items) => self.eval_and(items, env, memory),
            CoreNode::Or(items) => self.eval_or(items, env, memory),
            CoreNode::Fn(def) => Ok((self.make_closure(def, env), memory)),
            CoreNode::Call { target, args } => {
                let (callee, memory) = self.eval(target, env, memory)?;
                let (args, memory) = self.eval_all(args, env, memory)?;
                self.apply_fun(&callee, args, memory)
            }
            CoreNode::CtxCall { name, args } => {
                let (args, memory) = self.eval_all(args, env, memory)?;
                let result = self.call_tool(name, args)?;
                Ok((result, memory))
            }
            CoreNode::Where { path, op, operand } => {
                let (operand, memory) = match operand {
                    Some(node) => self.eval(node, env, memory)?,
                    None => (Value::Nil, memory),
                };
                let predicate = Predicate::Where {
                    path: path.clone(),
                    op: *op,
                    operand,
                };
                Ok((Value::Function(Function::Predicate(Arc::new(predicate))), memory))
            }
            CoreNode::Combine { kind, preds } => {
                let (preds, memory) = self.eval_all(preds, env, memory)?;
                for pred in &preds {
                    if !is_callable(pred) {
                        return Err(EvalError::type_error(
                            "predicate function",
                            pred.type_name(),
                            kind.as_str(),
                        ));
                    }
                }
                let predicate = Predicate::Combined { kind: *kind, preds };
                Ok((Value::Function(Function::Predicate(Arc::new(predicate))), memory))
            }
        }
    }

    /// Evaluates nodes left to right, threading memory.
    pub(super) fn eval_all(
        &self,
        nodes: &[CoreNode],
        env: &Env,
        memory: Memory,
    ) -> EvalResult<(Vec<Value>, Memory)> {
        let mut values = Vec::with_capacity(nodes.len());
        let mut memory = memory;
        for node in nodes {
            let (value, m) = self.eval(node, env, memory)?;
            values.push(value);
            memory = m;
        }
        Ok((values, memory))
    }

    fn eval_do(&self, body: &[CoreNode], env: &Env, memory: Memory) -> EvalResult<(Value, Memory)> {
        let mut scope = env.clone();
        let mut memory = memory;
        let mut last = Value::Nil;
        for node in body {
            let (value, m) = self.eval(node, &scope, memory)?;
            memory = m;
            if let CoreNode::Def { name, .. } = node {
                // later definitions of the same name win
                scope = scope.bind(name, value.clone());
            }
            last = value;
        }
        Ok((last, memory))
    }

    fn eval_let(
        &self,
        bindings: &[(crate::core_ast::Pattern, CoreNode)],
        body: &CoreNode,
        env: &Env,
        memory: Memory,
    ) -> EvalResult<(Value, Memory)> {
        let mut scope = env.clone();
        let mut memory = memory;
        for (pattern, expr) in bindings {
            let (value, m) = self.eval(expr, &scope, memory)?;
            let (next_scope, m) = self.bind_pattern(pattern, value, scope, m)?;
            scope = next_scope;
            memory = m;
        }
        self.eval(body, &scope, memory)
    }

    fn eval_and(&self, items: &[CoreNode], env: &Env, memory: Memory) -> EvalResult<(Value, Memory)> {
        let mut memory = memory;
        let mut last = Value::Boolean(true);
        for item in items {
            let (value, m) = self.eval(item, env, memory)?;
            memory = m;
            if !value.is_truthy() {
                return Ok((value, memory));
            }
            last = value;
        }
        Ok((last, memory))
    }

    fn eval_or(&self, items: &[CoreNode], env: &Env, memory: Memory) -> EvalResult<(Value, Memory)> {
        let mut memory = memory;
        let mut last = Value::Nil;
        for item in items {
            let (value, m) = self.eval(item, env, memory)?;
            memory = m;
            if value.is_truthy() {
                return Ok((value, memory));
            }
            last = value;
        }
        Ok((last, memory))
    }

    fn make_closure(&self, def: &Arc<FnDef>, env: &Env) -> Value {
        Value::Function(Function::Closure(Arc::new(Closure {
            def: Arc::clone(def),
            env: env.clone(),
        })))
    }

    /// A bare name that is neither local nor builtin: look it up in ctx, data
    /// and memory. Exactly one of them may hold it.
    fn resolve_global(&self, name: &str, env: &Env, memory: &Memory) -> EvalResult<Value> {
        if let Some(value) = env.lookup(name) {
            return Ok(value.clone());
        }
        let mut found: Vec<(&'static str, Value)> = Vec::new();
        if let Some(value) = lookup_named(&self.externals.ctx, name) {
            found.push(("ctx", value.clone()));
        }
        if let Some(value) = lookup_named(&self.externals.data, name) {
            found.push(("data", value.clone()));
        }
        if let Some(value) = memory.get(name) {
            found.push(("memory", value.clone()));
        }
        match found.len() {
            1 => Ok(found.remove(0).1),
            0 => {
                let mut candidates = env.symbol_names();
                candidates.extend(key_names(&self.externals.ctx));
                candidates.extend(key_names(&self.externals.data));
                candidates.extend(memory.keys().cloned());
                candidates.extend(crate::runtime::stdlib::names().into_iter().map(str::to_string));
                Err(EvalError::UnboundSymbol {
                    name: name.to_string(),
                    hint: did_you_mean(name, &candidates),
                })
            }
            _ => {
                let namespaces: Vec<&str> = found.iter().map(|(ns, _)| *ns).collect();
                Err(EvalError::AmbiguousReference {
                    name: name.to_string(),
                    namespaces: namespaces.join(" and "),
                    example: format!("{}/{}", namespaces[0], name),
                })
            }
        }
    }

    /// Invokes a host tool. Tool failures become `{:error .. :tool ..}` values.
    pub(super) fn call_tool(&self, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let tools = &self.externals.tools;
        if !tools.has_tool(name) {
            let available = tools.tool_names();
            return Err(EvalError::UnknownTool {
                name: name.to_string(),
                available: if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                },
            });
        }
        let argument = tool_argument(args);
        debug!("invoking tool '{}'", name);
        // a panicking tool is a failed call, not a failed program
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| tools.invoke(name, argument)))
            .unwrap_or_else(|payload| {
                Err(format!("tool panicked: {}", panic_message(payload.as_ref())))
            });
        match outcome {
            Ok(value) => Ok(value),
            Err(message) => {
                warn!("tool '{}' returned an error: {}", name, message);
                Ok(tool_error_value(name, &message))
            }
        }
    }
}

pub(crate) fn is_callable(value: &Value) -> bool {
    matches!(
        value,
        Value::Function(_) | Value::Keyword(_) | Value::Map(_) | Value::Set(_)
    )
}
