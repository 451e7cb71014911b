pub mod capability;
pub mod config;
pub mod error;
pub mod history;
pub mod stream;
pub mod toolspec;
pub mod trace;

pub use capability::{LlmCapabilities, ToolChoice, ToolSupport};
pub use config::Config;
pub use error::{Error, Result};
pub use history::{ContentPart, HistoryItem, HistoryStatus, MessageContent, Role};
pub use stream::{BoxStream, StreamEvent, Usage};
pub use toolspec::{ParamType, ToolCall, ToolDefinition, ToolDescriptor, ToolFuture, ToolParameter};
pub use trace::TraceEvent;
