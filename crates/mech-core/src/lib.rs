//! The MECH orchestration engine (spec.md §4): history, tool-aware
//! streaming runners, the outer driver loop, and the metacognition agent
//! that tunes it mid-run.

pub mod agent;
pub mod cancel;
pub mod driver;
pub mod events;
pub mod history;
pub mod metacognition;
pub mod result;
pub mod runner;
pub mod state;
pub mod timeout;
pub mod tool_runner;

pub use agent::{Agent, AgentHooks, NoopHooks};
pub use cancel::{sleep_interruptible, CancelToken};
pub use driver::{run_mech, MechDriverParams};
pub use events::StreamingEvent;
pub use history::{ensure_tool_result_sequence, HistoryStore};
pub use metacognition::run_metacognition;
pub use result::MechResult;
pub use runner::{run_streamed, RunStreamedParams};
pub use state::{MechOutcome, MechRunContext, MechState};
pub use tool_runner::{run_streamed_with_tools, ToolAwareParams};
