//! The MECH-level event stream (spec.md §3 `StreamingEvent`): what the
//! Streaming Runner (4.C) and Tool-Aware Runner (4.D) yield upward, and
//! ultimately what the controller transport (§6) relays outward.
//!
//! This sits one layer above `mech_domain::stream::StreamEvent`, which is
//! the raw per-provider wire event a single `LlmProvider` emits.

use mech_domain::toolspec::ToolCall;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamingEvent {
    #[serde(rename = "agent_start")]
    AgentStart { agent_id: String, model: String },

    #[serde(rename = "agent_updated")]
    AgentUpdated { agent_id: String, model: Option<String> },

    #[serde(rename = "message_delta")]
    MessageDelta { content: String, order: u64, message_id: String, model: String },

    #[serde(rename = "message_complete")]
    MessageComplete {
        content: String,
        message_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        thinking_content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thinking_signature: Option<String>,
        model: String,
    },

    #[serde(rename = "tool_start")]
    ToolStart { tool_calls: Vec<ToolCall>, model: String },

    #[serde(rename = "tool_done")]
    ToolDone {
        tool_calls: Vec<ToolCall>,
        /// Result text keyed by call id.
        results: HashMap<String, String>,
    },

    #[serde(rename = "error")]
    Error { error: String, model: Option<String> },

    #[serde(rename = "process_updated")]
    ProcessUpdated,

    #[serde(rename = "process_done")]
    ProcessDone,

    #[serde(rename = "process_failed")]
    ProcessFailed { error: String },

    #[serde(rename = "system_status")]
    SystemStatus { content: String },

    /// `agent_status: mech_start` / `agent_status: mech_done` (spec.md
    /// §4.E steps d/f).
    #[serde(rename = "agent_status")]
    AgentStatus { status: String },
}
