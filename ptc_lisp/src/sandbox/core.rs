//! Sandboxed execution of programs.
//!
//! Each run gets its own worker thread with a large stack, a metered heap and
//! a deadline. Parsing, analysis and evaluation all happen on the worker. The
//! caller blocks on a channel until the worker reports, the deadline passes,
//! or the worker dies.
//!
//! ```text
//! Spawned -> Running -> Completed | TimedOut | MemoryKilled | Crashed
//! ```
//!
//! A timed-out worker cannot be killed from outside. It is cancelled through
//! its [`ExecutionGuard`], which the evaluator checks before every step, and
//! detached. A worker stuck inside a host tool call or a single long builtin
//! keeps its thread and heap until that call returns.

use crate::analyzer::{analyze, AnalyzeError};
use crate::config::RuntimeConfig;
use crate::core_ast::CoreNode;
use crate::parser::{parse, ParseError};
use crate::runtime::error::EvalError;
use crate::runtime::evaluator::{Evaluator, ExecutionGuard, Externals};
use crate::runtime::memory::Memory;
use crate::runtime::tools::panic_message;
use crate::runtime::values::{Value, ValueMap};
use crate::sandbox::allocator::{self, LedgerReport};
use crate::sandbox::options::SandboxOptions;
use crate::sandbox::request::ExecutionRequest;
use log::{debug, warn};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const WORKER_THREAD_NAME: &str = "ptc-sandbox";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Spawned,
    Running,
    Completed,
    TimedOut,
    MemoryKilled,
    Crashed,
}

impl fmt::Display for SandboxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SandboxState::Spawned => "spawned",
            SandboxState::Running => "running",
            SandboxState::Completed => "completed",
            SandboxState::TimedOut => "timed out",
            SandboxState::MemoryKilled => "memory killed",
            SandboxState::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SandboxError {
    #[error("execution timed out after {0} ms")]
    Timeout(u64),

    #[error("memory limit of {0} bytes exceeded")]
    MemoryExceeded(u64),

    #[error("{0}")]
    ExecutionError(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
}

impl SandboxError {
    /// The terminal state a run with this error ended in.
    pub fn state(&self) -> SandboxState {
        match self {
            SandboxError::Timeout(_) => SandboxState::TimedOut,
            SandboxError::MemoryExceeded(_) => SandboxState::MemoryKilled,
            SandboxError::ExecutionError(_)
            | SandboxError::Parse(_)
            | SandboxError::Analyze(_) => SandboxState::Crashed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionMetrics {
    pub duration_ms: u64,
    /// Peak heap bytes seen by the worker
    pub memory_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    pub value: Value,
    pub memory: Memory,
    pub metrics: ExecutionMetrics,
}

enum WorkerFailure {
    Compile(SandboxError),
    Eval(EvalError),
}

impl From<EvalError> for WorkerFailure {
    fn from(err: EvalError) -> Self {
        WorkerFailure::Eval(err)
    }
}

type WorkerResult = thread::Result<Result<(Value, Memory), WorkerFailure>>;

struct WorkerReport {
    result: WorkerResult,
    ledger: LedgerReport,
}

/// Runs programs in isolated workers.
#[derive(Debug, Clone)]
pub struct Sandbox {
    max_recursion_depth: usize,
    worker_stack_bytes: usize,
}

impl Default for Sandbox {
    fn default() -> Self {
        Sandbox::new(&RuntimeConfig::default())
    }
}

impl Sandbox {
    pub fn new(config: &RuntimeConfig) -> Self {
        Sandbox {
            max_recursion_depth: config.max_recursion_depth,
            worker_stack_bytes: config.worker_stack_bytes,
        }
    }

    /// Runs an already analyzed program.
    pub fn execute(&self, program: CoreNode, request: ExecutionRequest) -> Result<SandboxOutcome, SandboxError> {
        self.launch(move || Ok(program), request)
    }

    /// Parses, analyzes and runs `source`, all on the worker thread.
    pub fn execute_source(&self, source: &str, request: ExecutionRequest) -> Result<SandboxOutcome, SandboxError> {
        let source = source.to_string();
        self.launch(
            move || {
                let raw = parse(&source)?;
                Ok(analyze(&raw)?)
            },
            request,
        )
    }

    fn launch<F>(&self, compile: F, request: ExecutionRequest) -> Result<SandboxOutcome, SandboxError>
    where
        F: FnOnce() -> Result<CoreNode, SandboxError> + Send + 'static,
    {
        let options = request.options;
        let externals = Externals {
            ctx: request_map(request.context, "context")?,
            data: request_map(request.data, "data")?,
            budget: request.budget,
            tools: request.tools,
        };
        let limit = usize::try_from(options.max_memory_bytes).unwrap_or(usize::MAX);
        let started = Instant::now();
        let timeout = Duration::from_millis(options.timeout_ms);
        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = ExecutionGuard::new(started + timeout, Arc::clone(&cancelled));
        let max_depth = self.max_recursion_depth;
        let memory = request.memory;

        let (tx, rx) = mpsc::channel::<WorkerReport>();
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .stack_size(self.worker_stack_bytes)
            .spawn(move || {
                allocator::arm(limit);
                let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<_, WorkerFailure> {
                    let program = compile().map_err(WorkerFailure::Compile)?;
                    let evaluator = Evaluator::new(Arc::new(externals))
                        .with_guard(guard)
                        .with_max_depth(max_depth);
                    Ok(evaluator.evaluate(&program, memory)?)
                }));
                let ledger = allocator::disarm();
                // the caller may have given up already
                let _ = tx.send(WorkerReport { result, ledger });
            })
            .map_err(|e| SandboxError::ExecutionError(format!("failed to spawn sandbox worker: {}", e)))?;
        debug!(
            "sandbox {} (timeout {} ms, memory limit {} bytes)",
            SandboxState::Spawned,
            options.timeout_ms,
            options.max_memory_bytes
        );
        debug!("sandbox {}", SandboxState::Running);

        let report = match rx.recv_timeout(timeout) {
            Ok(report) => report,
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::Relaxed);
                warn!("sandbox {} after {} ms", SandboxState::TimedOut, options.timeout_ms);
                return Err(SandboxError::Timeout(options.timeout_ms));
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("sandbox {}: worker exited without reporting", SandboxState::Crashed);
                return Err(SandboxError::ExecutionError(
                    "sandbox worker exited without a result".to_string(),
                ));
            }
        };
        let _ = worker.join();
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = finish(report, &options, duration_ms);
        match &outcome {
            Ok(_) => debug!("sandbox {} in {} ms", SandboxState::Completed, duration_ms),
            Err(e) => warn!("sandbox {}: {}", e.state(), e),
        }
        outcome
    }
}

fn finish(
    report: WorkerReport,
    options: &SandboxOptions,
    duration_ms: u64,
) -> Result<SandboxOutcome, SandboxError> {
    let WorkerReport { result, ledger } = report;
    let (value, memory) = match result {
        Err(payload) => {
            return Err(SandboxError::ExecutionError(format!(
                "sandbox worker panicked: {}",
                panic_message(payload.as_ref())
            )))
        }
        Ok(Err(WorkerFailure::Eval(EvalError::Timeout))) => {
            return Err(SandboxError::Timeout(options.timeout_ms))
        }
        Ok(Err(WorkerFailure::Eval(EvalError::MemoryLimit))) => {
            return Err(SandboxError::MemoryExceeded(options.max_memory_bytes))
        }
        Ok(Err(_)) if ledger.tripped => {
            return Err(SandboxError::MemoryExceeded(options.max_memory_bytes))
        }
        Ok(Err(WorkerFailure::Compile(e))) => return Err(e),
        Ok(Err(WorkerFailure::Eval(e))) => return Err(SandboxError::ExecutionError(e.to_string())),
        Ok(Ok(pair)) => pair,
    };
    if ledger.tripped {
        return Err(SandboxError::MemoryExceeded(options.max_memory_bytes));
    }

    let retained: usize = value.approx_size()
        + memory
            .iter()
            .map(|(k, v)| k.len() + v.approx_size())
            .sum::<usize>();
    // without the metered allocator the retained result is all we can see
    if !allocator::is_metering() && retained as u64 > options.max_memory_bytes {
        return Err(SandboxError::MemoryExceeded(options.max_memory_bytes));
    }
    let memory_bytes = ledger.peak_bytes.max(retained).max(std::mem::size_of::<Value>()) as u64;

    Ok(SandboxOutcome {
        value,
        memory,
        metrics: ExecutionMetrics {
            duration_ms,
            memory_bytes,
        },
    })
}

fn request_map(value: Value, what: &str) -> Result<Arc<ValueMap>, SandboxError> {
    match value {
        Value::Nil => Ok(Arc::default()),
        Value::Map(map) => Ok(map),
        other => Err(SandboxError::ExecutionError(format!(
            "{} must be a map, got {}",
            what,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_failures_come_back_from_the_worker() {
        let sandbox = Sandbox::default();
        let err = sandbox.execute_source("(+ 1", ExecutionRequest::new()).unwrap_err();
        assert!(matches!(err, SandboxError::Parse(_)), "{:?}", err);
        let err = sandbox
            .execute_source("(frobnicate 1)", ExecutionRequest::new())
            .unwrap_err();
        assert!(matches!(err, SandboxError::Analyze(_)), "{:?}", err);
        assert_eq!(err.state(), SandboxState::Crashed);
    }

    #[test]
    fn hand_built_programs_run_directly() {
        let outcome = Sandbox::default()
            .execute(CoreNode::Const(Value::Integer(42)), ExecutionRequest::new())
            .unwrap();
        assert_eq!(outcome.value, Value::Integer(42));
        assert!(outcome.memory.is_empty());
    }

    #[test]
    fn errors_map_to_terminal_states() {
        assert_eq!(SandboxError::Timeout(5).state(), SandboxState::TimedOut);
        assert_eq!(SandboxError::MemoryExceeded(1).state(), SandboxState::MemoryKilled);
        assert_eq!(
            SandboxError::ExecutionError("x".into()).state(),
            SandboxState::Crashed
        );
    }

    #[test]
    fn context_must_be_a_map() {
        let err = request_map(Value::Integer(1), "context").unwrap_err();
        assert_eq!(
            err,
            SandboxError::ExecutionError("context must be a map, got integer".into())
        );
    }
}
