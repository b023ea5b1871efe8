//! Isolated execution: worker threads, deadlines and the heap ceiling.

pub mod allocator;
pub mod core;
pub mod options;
pub mod request;

pub use self::core::{
    ExecutionMetrics, Sandbox, SandboxError, SandboxOutcome, SandboxState, WORKER_THREAD_NAME,
};
pub use allocator::MeteredAllocator;
pub use options::SandboxOptions;
pub use request::ExecutionRequest;
