//! Metacognition Agent (spec.md §4.F): a fresh, single-turn agent spawned
//! inside the MECH loop to observe and tune the running agent's own
//! parameters. Never fatal to the parent run — failures are logged and
//! the cycle is simply skipped.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use mech_domain::capability::ToolChoice;
use mech_domain::config::MechConfig;
use mech_domain::trace::TraceEvent;
use mech_providers::ProviderRegistry;
use mech_tools::{builtin, dispatch_tool_calls, MetaSink, ToolRegistry};

use crate::agent::NoopHooks;
use crate::events::StreamingEvent;
use crate::runner::{run_streamed, RunStreamedParams};
use crate::state::MechState;

const META_TOOL_NAMES: [&str; 6] = [
    "inject_thought",
    "set_meta_frequency",
    "set_thought_delay",
    "set_model_score",
    "disable_model",
    "no_changes_needed",
];

/// Run exactly one LLM turn with one round of tool calls (spec.md §4.F
/// Contract). `sink` is the parent run's `MechRunContext`, which applies
/// each tuning tool's effect directly to the shared `MECHState`.
pub async fn run_metacognition(
    sink: Arc<dyn MetaSink>,
    condensed_history: String,
    ai_name: &str,
    providers: Arc<ProviderRegistry>,
    mech_state: Arc<MechState>,
    mech_config: Arc<MechConfig>,
    pinned_model: Option<String>,
) {
    TraceEvent::MetacognitionRun { llm_request_count: mech_state.llm_request_count() }.emit();

    let mut registry = ToolRegistry::new();
    registry.register(builtin::inject_thought_descriptor(sink.clone()));
    registry.register(builtin::set_meta_frequency_descriptor(sink.clone()));
    registry.register(builtin::set_thought_delay_descriptor(sink.clone()));
    registry.register(builtin::set_model_score_descriptor(sink.clone()));
    registry.register(builtin::disable_model_descriptor(sink.clone()));
    registry.register(builtin::no_changes_needed_descriptor(sink));

    let tool_names: Vec<String> = META_TOOL_NAMES.iter().map(|s| s.to_string()).collect();
    let tools = registry.definitions_for(&tool_names);

    let instructions = format!(
        "You are {ai_name}'s metacognition subroutine: an observer and tuner of the \
         running agent's own parameters, not a task executor. Review the recent \
         history below and call exactly one tuning tool, or `no_changes_needed` if \
         nothing needs adjusting.\n\nRecent history:\n{condensed_history}"
    );

    let params = RunStreamedParams {
        agent_id: "metacognition".into(),
        instructions,
        model_class: "metacognition".into(),
        pinned_model,
        tool_choice: ToolChoice::Required,
        json_schema_present: false,
        temperature: None,
        input: None,
        history: vec![],
        tools,
    };

    let mut stream = run_streamed(params, Arc::new(NoopHooks), providers, mech_state, mech_config);
    while let Some(event) = stream.next().await {
        match event {
            StreamingEvent::ToolStart { tool_calls, .. } => {
                dispatch_tool_calls(&registry, &tool_calls, &HashMap::new()).await;
            }
            StreamingEvent::Error { error, .. } => {
                tracing::warn!(error = %error, "metacognition turn failed, skipping this cycle");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::META_TOOL_NAMES;

    #[test]
    fn exposes_all_six_tuning_tools() {
        assert_eq!(META_TOOL_NAMES.len(), 6);
        assert!(META_TOOL_NAMES.contains(&"no_changes_needed"));
    }
}
