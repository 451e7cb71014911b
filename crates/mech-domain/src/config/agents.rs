use serde::{Deserialize, Serialize};

use crate::capability::ToolChoice;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent definitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Static configuration for an [`Agent`](crate's runtime Agent in mech-core)
/// — the part an operator declares up front. Spec.md §3 names the full
/// `Agent` type (including the mutable `model`/`historyThread` fields and
/// lifecycle hooks); those live on the runtime struct in mech-core, which
/// embeds one of these as its immutable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub instructions: String,
    /// Model class this agent draws from absent a pinned model.
    pub model_class: String,
    /// Optional pinned model id, bypassing class-based selection.
    #[serde(default)]
    pub pinned_model: Option<String>,
    /// Tool names this agent may call, in declared order.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(default)]
    pub json_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub force_json: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Bound on tool-call resolution rounds within one turn (spec.md §4.D).
    #[serde(default = "d_max_rounds")]
    pub max_tool_call_rounds_per_turn: u32,
    /// Bound on total tool calls across recursion depth (spec.md §4.D).
    #[serde(default = "d_max_tool_calls")]
    pub max_tool_calls: u32,
}

fn d_max_rounds() -> u32 {
    10
}
fn d_max_tool_calls() -> u32 {
    8
}
