//! Tool-Aware Runner (spec.md §4.D): wraps the Streaming Runner, dispatches
//! any tool calls it collects, and recurses with the tool results folded
//! back into history until a turn ends without tool calls, `tool_choice`
//! resolves to `"none"`, or `max_tool_calls` is hit.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::StreamExt;
use mech_domain::capability::ToolChoice;
use mech_domain::history::HistoryItem;
use mech_domain::config::MechConfig;
use mech_domain::toolspec::ToolCall;
use mech_providers::ProviderRegistry;
use mech_tools::{dispatch_tool_calls, ToolRegistry};
use serde_json::Value;

use crate::agent::AgentHooks;
use crate::events::StreamingEvent;
use crate::runner::{run_streamed, RunStreamedParams};
use crate::state::MechState;

/// Static per-call configuration threaded unchanged through recursion.
#[derive(Clone)]
pub struct ToolAwareParams {
    pub agent_id: String,
    pub instructions: String,
    pub model_class: String,
    pub pinned_model: Option<String>,
    pub base_tool_choice: ToolChoice,
    pub json_schema: Option<Value>,
    pub force_json: bool,
    pub temperature: Option<f32>,
    pub max_tool_calls: u32,
    pub tool_names: Vec<String>,
}

/// Relax/force `tool_choice` based on how many tool-call rounds have
/// already happened this turn (spec.md §4.D step 3).
fn effective_tool_choice(base: &ToolChoice, tool_call_count: u32, max_tool_calls: u32) -> ToolChoice {
    if tool_call_count >= max_tool_calls {
        ToolChoice::None
    } else if tool_call_count == 1 && *base == ToolChoice::Required {
        ToolChoice::Auto
    } else {
        base.clone()
    }
}

/// Best-effort JSON coercion for an agent declaring `json_schema` (spec.md
/// §4.D step 4): parse directly, else extract the first fenced or braced
/// JSON substring, else pass the raw text through if `force_json`.
fn coerce_json_response(text: &str, force_json: bool) -> String {
    if serde_json::from_str::<Value>(text).is_ok() {
        return text.to_string();
    }
    if let Some(extracted) = extract_json_substring(text) {
        if serde_json::from_str::<Value>(&extracted).is_ok() {
            return extracted;
        }
    }
    if force_json {
        tracing::warn!("agent response failed JSON coercion, passing through raw text");
    }
    text.to_string()
}

fn extract_json_substring(text: &str) -> Option<String> {
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(text[start..=end].to_string())
    } else {
        None
    }
}

/// Run one turn end to end, recursing through tool-call rounds. Returns the
/// final text and the list of history items generated by this call (and
/// all of its recursive descendants, in order) — the caller appends these
/// to the main `HistoryStore`, it does not need to track recursion itself.
pub fn run_streamed_with_tools(
    params: ToolAwareParams,
    hooks: Arc<dyn AgentHooks>,
    input: Option<String>,
    history: Vec<HistoryItem>,
    providers: Arc<ProviderRegistry>,
    tool_registry: Arc<ToolRegistry>,
    injected: HashMap<String, Value>,
    mech_state: Arc<MechState>,
    mech_config: Arc<MechConfig>,
    tool_call_count: u32,
) -> Pin<Box<dyn Future<Output = (String, Vec<HistoryItem>)> + Send>> {
    Box::pin(async move {
        if tool_call_count == 0 {
            if let Some(inp) = &input {
                if let Some(direct) = hooks.try_direct_execution(inp).await {
                    hooks.on_response(&direct).await;
                    return (
                        direct.clone(),
                        vec![HistoryItem::user(inp.clone()), HistoryItem::assistant(direct)],
                    );
                }
            }
        }

        let effective_choice = effective_tool_choice(&params.base_tool_choice, tool_call_count, params.max_tool_calls);
        let tool_definitions = tool_registry.definitions_for(&params.tool_names);

        let run_params = RunStreamedParams {
            agent_id: params.agent_id.clone(),
            instructions: params.instructions.clone(),
            model_class: params.model_class.clone(),
            pinned_model: params.pinned_model.clone(),
            tool_choice: effective_choice.clone(),
            json_schema_present: params.json_schema.is_some(),
            temperature: params.temperature,
            input: input.clone(),
            history: history.clone(),
            tools: tool_definitions,
        };

        let mut stream = run_streamed(run_params, hooks.clone(), providers.clone(), mech_state.clone(), mech_config.clone());

        let mut full_response = String::new();
        let mut thinking_response: Option<String> = None;
        let mut thinking_signature: Option<String> = None;
        let mut collected_tool_calls: Vec<ToolCall> = Vec::new();
        let mut collected_outputs: Vec<HistoryItem> = Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                StreamingEvent::MessageComplete { content, thinking_content, thinking_signature: sig, .. } => {
                    full_response = content;
                    thinking_response = thinking_content;
                    thinking_signature = sig;
                }
                StreamingEvent::ToolStart { tool_calls, .. } => {
                    let outputs = dispatch_tool_calls(&tool_registry, &tool_calls, &injected).await;
                    for (call, output) in tool_calls.iter().zip(outputs.iter()) {
                        hooks.on_tool_call(call).await;
                        if let HistoryItem::FunctionCallOutput { output: text, .. } = output {
                            hooks.on_tool_result(call, text).await;
                        }
                    }
                    collected_tool_calls.extend(tool_calls);
                    collected_outputs.extend(outputs);
                }
                StreamingEvent::Error { .. } => {}
                _ => {}
            }
        }

        let mut generated: Vec<HistoryItem> = Vec::new();
        if let Some(inp) = &input {
            generated.push(HistoryItem::user(inp.clone()));
        }

        if !collected_tool_calls.is_empty() && effective_choice != ToolChoice::None {
            if let Some(content) = &thinking_response {
                generated.push(HistoryItem::Thinking { content: content.clone(), signature: thinking_signature.clone(), status: None });
            }
            if !full_response.is_empty() {
                generated.push(HistoryItem::assistant(full_response.clone()));
            }
            for (call, output) in collected_tool_calls.iter().zip(collected_outputs.into_iter()) {
                generated.push(HistoryItem::function_call(call.id.clone(), call.tool_name.clone(), call.arguments.clone()));
                generated.push(output);
            }

            let next_history: Vec<HistoryItem> = history.iter().cloned().chain(generated.iter().cloned()).collect();
            let next_count = tool_call_count + 1;

            let (recursive_text, recursive_generated) = run_streamed_with_tools(
                params.clone(),
                hooks.clone(),
                None,
                next_history,
                providers,
                tool_registry,
                injected,
                mech_state,
                mech_config,
                next_count,
            )
            .await;

            generated.extend(recursive_generated);
            return (recursive_text, generated);
        }

        let mut final_text = full_response;
        if params.json_schema.is_some() {
            final_text = coerce_json_response(&final_text, params.force_json);
        }
        hooks.on_response(&final_text).await;
        if !final_text.is_empty() {
            generated.push(HistoryItem::assistant(final_text.clone()));
        }

        (final_text, generated)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mech_domain::config::MechConfig;

    struct DirectHooks;

    #[async_trait::async_trait]
    impl AgentHooks for DirectHooks {
        async fn try_direct_execution(&self, input: &str) -> Option<String> {
            if input == "ping" {
                Some("pong".into())
            } else {
                None
            }
        }
    }

    fn empty_params() -> ToolAwareParams {
        ToolAwareParams {
            agent_id: "overseer".into(),
            instructions: "observe".into(),
            model_class: "monologue".into(),
            pinned_model: None,
            base_tool_choice: ToolChoice::Auto,
            json_schema: None,
            force_json: false,
            temperature: None,
            max_tool_calls: 8,
            tool_names: vec![],
        }
    }

    #[tokio::test]
    async fn try_direct_execution_short_circuits_before_any_llm_call() {
        // No provider is registered, so if the runner fell through to
        // `run_streamed` this would panic looking up the model — reaching
        // "pong" proves the hook pre-empted the LLM call entirely.
        let providers = Arc::new(ProviderRegistry::from_config(&mech_domain::config::LlmConfig::default()).unwrap());
        let tool_registry = Arc::new(ToolRegistry::new());
        let state = Arc::new(MechState::new(&MechConfig::default(), 0.0, chrono::Utc::now()));

        let (text, generated) = run_streamed_with_tools(
            empty_params(),
            Arc::new(DirectHooks),
            Some("ping".into()),
            vec![],
            providers,
            tool_registry,
            HashMap::new(),
            state,
            Arc::new(MechConfig::default()),
            0,
        )
        .await;

        assert_eq!(text, "pong");
        assert!(matches!(generated.last(), Some(HistoryItem::Message { .. })));
    }

    #[test]
    fn effective_tool_choice_forces_none_at_max() {
        let choice = effective_tool_choice(&ToolChoice::Required, 8, 8);
        assert_eq!(choice, ToolChoice::None);
    }

    #[test]
    fn effective_tool_choice_relaxes_required_after_first_round() {
        let choice = effective_tool_choice(&ToolChoice::Required, 1, 8);
        assert_eq!(choice, ToolChoice::Auto);
    }

    #[test]
    fn effective_tool_choice_passes_through_otherwise() {
        let choice = effective_tool_choice(&ToolChoice::Auto, 0, 8);
        assert_eq!(choice, ToolChoice::Auto);
    }

    #[test]
    fn coerce_json_response_passes_valid_json_through() {
        let out = coerce_json_response(r#"{"a":1}"#, false);
        assert_eq!(out, r#"{"a":1}"#);
    }

    #[test]
    fn coerce_json_response_extracts_fenced_block() {
        let text = "here you go:\n```json\n{\"a\":1}\n```\nthanks";
        let out = coerce_json_response(text, false);
        assert_eq!(out, "{\"a\":1}");
    }

    #[test]
    fn coerce_json_response_extracts_braced_substring() {
        let text = "sure, the answer is {\"a\":1} hope that helps";
        let out = coerce_json_response(text, false);
        assert_eq!(out, "{\"a\":1}");
    }

    #[test]
    fn coerce_json_response_falls_through_on_total_failure() {
        let out = coerce_json_response("no json here", true);
        assert_eq!(out, "no json here");
    }
}
