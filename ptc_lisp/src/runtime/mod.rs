//! PTC-Lisp Runtime System
//!
//! Values, lexical environments, the threaded program memory, the evaluator
//! with its apply and destructuring halves, host tool plumbing and the
//! builtin library.

pub mod apply;
pub mod destructure;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod json;
pub mod memory;
pub mod stdlib;
pub mod tools;
pub mod values;

pub use environment::Env;
pub use error::{EvalError, EvalResult};
pub use evaluator::{Evaluator, ExecutionGuard, Externals};
pub use memory::Memory;
pub use tools::{ToolFn, ToolInvoker, ToolRegistry};
pub use values::{Function, Value, ValueMap, ValueSet, ValueVec};
