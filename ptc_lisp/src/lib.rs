// PTC-Lisp Library
// A small, sandboxed Lisp for programs written by language models that call
// host tools. Source text goes through parse -> analyze -> sandboxed eval.
pub mod analyzer;
pub mod ast;
pub mod config;
pub mod core_ast;
pub mod error_reporting;
pub mod parser;
pub mod runtime;
pub mod sandbox;

// Re-export the pieces a host needs to run programs.
pub use analyzer::{analyze, AnalyzeError};
pub use ast::RawNode;
pub use config::{ConfigError, RuntimeConfig};
pub use core_ast::CoreNode;
pub use parser::{parse, ParseError};
pub use runtime::memory::{memory_from_value, memory_to_value, Memory};
pub use runtime::tools::{ToolInvoker, ToolRegistry};
pub use runtime::values::Value;
pub use sandbox::{ExecutionMetrics, ExecutionRequest, Sandbox, SandboxError, SandboxOptions};

use std::fmt;
use thiserror::Error;

#[cfg(feature = "metered-allocator")]
#[global_allocator]
static GLOBAL: sandbox::MeteredAllocator = sandbox::MeteredAllocator;

/// Which stage of a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ParseError,
    AnalyzeError,
    ExecutionError,
    Timeout,
    MemoryExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "parse_error",
            ErrorKind::AnalyzeError => "analyze_error",
            ErrorKind::ExecutionError => "execution_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MemoryExceeded => "memory_exceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run, as reported back to whoever wrote the program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct PtcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PtcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        PtcError {
            kind,
            message: message.into(),
        }
    }
}

impl From<ParseError> for PtcError {
    fn from(err: ParseError) -> Self {
        PtcError::new(ErrorKind::ParseError, err.to_string())
    }
}

impl From<AnalyzeError> for PtcError {
    fn from(err: AnalyzeError) -> Self {
        PtcError::new(ErrorKind::AnalyzeError, err.to_string())
    }
}

impl From<SandboxError> for PtcError {
    fn from(err: SandboxError) -> Self {
        let kind = match err {
            SandboxError::Timeout(_) => ErrorKind::Timeout,
            SandboxError::MemoryExceeded(_) => ErrorKind::MemoryExceeded,
            SandboxError::ExecutionError(_) => ErrorKind::ExecutionError,
            SandboxError::Parse(_) => ErrorKind::ParseError,
            SandboxError::Analyze(_) => ErrorKind::AnalyzeError,
        };
        PtcError::new(kind, err.to_string())
    }
}

/// A successful run: the program's value, the memory to hand to the next run,
/// and resource usage.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub value: Value,
    pub memory: Memory,
    pub metrics: ExecutionMetrics,
}

/// Parses and analyzes `source` without running it, on the calling thread.
pub fn compile(source: &str) -> Result<CoreNode, PtcError> {
    let raw = parse(source)?;
    Ok(analyze(&raw)?)
}

/// Parses, analyzes and runs `source` in a fresh sandbox.
pub fn run(source: &str, request: ExecutionRequest) -> Result<RunOutput, PtcError> {
    run_with(&Sandbox::default(), source, request)
}

/// Like [`run`], with a sandbox built from a specific configuration.
pub fn run_with(sandbox: &Sandbox, source: &str, request: ExecutionRequest) -> Result<RunOutput, PtcError> {
    let outcome = sandbox.execute_source(source, request)?;
    Ok(RunOutput {
        value: outcome.value,
        memory: outcome.memory,
        metrics: outcome.metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_follow_the_stage() {
        let err = run("(+ 1", ExecutionRequest::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
        let err = run("(frobnicate 1)", ExecutionRequest::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AnalyzeError);
        let err = run("(/ 1 0)", ExecutionRequest::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExecutionError);
        assert!(err.message.contains("division by zero"));
    }

    #[test]
    fn kind_names_match_the_wire_format() {
        assert_eq!(ErrorKind::MemoryExceeded.to_string(), "memory_exceeded");
        assert_eq!(ErrorKind::AnalyzeError.as_str(), "analyze_error");
    }
}
