//! The runtime Agent (spec.md §3): wraps the static [`AgentConfig`] with
//! the fields that mutate during a run and the lifecycle hooks a caller
//! may observe a turn through.

use std::sync::Arc;

use mech_domain::config::AgentConfig;
use mech_domain::history::HistoryItem;
use mech_domain::toolspec::ToolCall;

/// Best-effort lifecycle observers. Every method is a no-op by default;
/// errors returned by an implementation must never abort the run (spec.md
/// §7 propagation rule) — callers log and discard, they do not propagate.
#[async_trait::async_trait]
pub trait AgentHooks: Send + Sync {
    async fn on_request(&self, _messages: &mut Vec<HistoryItem>) {}
    async fn on_response(&self, _response: &str) {}
    async fn on_thinking(&self, _content: &str) {}
    async fn on_tool_call(&self, _call: &ToolCall) {}
    async fn on_tool_result(&self, _call: &ToolCall, _result: &str) {}

    /// Fast path checked by the Tool-Aware Runner (spec.md §4.D) before the
    /// first LLM call of a turn: if this returns `Some`, the runner treats
    /// it as the final response and never invokes the Streaming Runner or
    /// any tool. Only consulted on the initial call (`tool_call_count ==
    /// 0`), never on recursive tool-result rounds.
    async fn try_direct_execution(&self, _input: &str) -> Option<String> {
        None
    }
}

#[derive(Default)]
pub struct NoopHooks;

#[async_trait::async_trait]
impl AgentHooks for NoopHooks {}

/// Agents are immutable once a run begins except for `model` (reassigned
/// each turn by the driver/runner) and `history_thread` (a per-agent
/// scratch log merged into the main history at the top of each MECH loop,
/// spec.md §4.A).
pub struct Agent {
    pub config: AgentConfig,
    pub model: Option<String>,
    pub history_thread: Vec<HistoryItem>,
    pub hooks: Arc<dyn AgentHooks>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        let model = config.pinned_model.clone();
        Self { config, model, history_thread: Vec::new(), hooks: Arc::new(NoopHooks) }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AgentHooks>) -> Self {
        self.hooks = hooks;
        self
    }
}
