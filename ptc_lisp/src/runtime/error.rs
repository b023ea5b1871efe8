use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// Runtime faults raised while evaluating a core program.
///
/// Messages are read by the model that wrote the program, so each one names
/// the operation involved and, where possible, what would have been accepted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unbound symbol '{name}'{hint}")]
    UnboundSymbol { name: String, hint: String },

    #[error("arity mismatch in '{function}': expected {expected} argument(s), got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("type error in '{operation}': expected {expected}, got {actual}")]
    TypeError {
        expected: String,
        actual: String,
        operation: String,
    },

    #[error("division by zero in '{operation}'")]
    DivisionByZero { operation: String },

    #[error("index {index} out of bounds for '{operation}' (length {length})")]
    IndexOutOfBounds {
        operation: String,
        index: i64,
        length: usize,
    },

    #[error("ambiguous reference '{name}': defined in {namespaces}; qualify it (e.g. {example})")]
    AmbiguousReference {
        name: String,
        namespaces: String,
        example: String,
    },

    #[error("destructuring failed for pattern {pattern}: {reason}")]
    DestructureMismatch { pattern: String, reason: String },

    #[error("unknown tool '{name}'; available tools: {available}")]
    UnknownTool { name: String, available: String },

    #[error("value of type {0} is not callable")]
    NotCallable(String),

    #[error("invalid argument to '{operation}': {message}")]
    InvalidArgument { operation: String, message: String },

    #[error("recursion depth limit of {0} exceeded")]
    RecursionLimit(usize),

    #[error("execution timed out")]
    Timeout,

    #[error("memory limit exceeded")]
    MemoryLimit,

    #[error("internal error: {0}")]
    Internal(String),
}

impl EvalError {
    pub fn type_error(expected: &str, actual: &str, operation: &str) -> EvalError {
        EvalError::TypeError {
            expected: expected.to_string(),
            actual: actual.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn invalid_argument(operation: &str, message: impl Into<String>) -> EvalError {
        EvalError::InvalidArgument {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn arity(function: &str, expected: impl Into<String>, actual: usize) -> EvalError {
        EvalError::ArityMismatch {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    /// Faults that come from the sandbox rather than the program itself.
    pub fn is_resource_fault(&self) -> bool {
        matches!(self, EvalError::Timeout | EvalError::MemoryLimit)
    }
}
