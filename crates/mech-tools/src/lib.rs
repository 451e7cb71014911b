//! Tool registry and dispatcher (spec.md §4.B) plus the concrete tools
//! exposed to agents: shell execution and background-process management
//! (kept from the teacher), file operations, the task-completion signals,
//! and the metacognition tuning tools.

mod argutil;
pub mod builtin;
pub mod descriptors;
pub mod dispatch;
pub mod exec;
pub mod file_ops;
pub mod manager;
pub mod process;
pub mod registry;
pub mod signals;

pub use builtin::MetaSink;
pub use dispatch::dispatch_tool_calls;
pub use manager::ProcessManager;
pub use registry::ToolRegistry;
pub use signals::SignalSink;
