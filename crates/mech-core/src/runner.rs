//! Streaming Runner (spec.md §4.C): runs exactly one provider turn, with
//! model selection, the repair pass, an inactivity-timeout wrapper around
//! the provider stream, and fallback to the next candidate model on error.
//!
//! Model ids here are always `"<provider_id>/<model>"`. `MechConfig`'s
//! `model_classes` lists and the per-provider `rate_limit_fallback` map are
//! both namespaced this way so the runner can resolve an id to a concrete
//! `Arc<dyn LlmProvider>` without a separate lookup table (DESIGN.md).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::StreamExt;
use mech_domain::capability::ToolChoice;
use mech_domain::config::MechConfig;
use mech_domain::history::HistoryItem;
use mech_domain::stream::{BoxStream, StreamEvent};
use mech_domain::toolspec::{ToolCall, ToolDefinition};
use mech_domain::trace::TraceEvent;
use mech_providers::{fallback, LlmProvider, ProviderRegistry};
use uuid::Uuid;

use crate::agent::AgentHooks;
use crate::events::StreamingEvent;
use crate::history::ensure_tool_result_sequence;
use crate::state::MechState;
use crate::timeout::with_inactivity_timeout;

/// Split a `"<provider_id>/<model>"` id and resolve the provider half.
fn resolve_model(providers: &ProviderRegistry, model_id: &str) -> Option<(Arc<dyn LlmProvider>, String)> {
    let (provider_id, model_name) = model_id.split_once('/')?;
    let provider = providers.get(provider_id)?;
    Some((provider, model_name.to_string()))
}

/// Everything `run_streamed` needs for one turn (spec.md §4.C steps 1-2).
#[derive(Clone)]
pub struct RunStreamedParams {
    pub agent_id: String,
    pub instructions: String,
    pub model_class: String,
    pub pinned_model: Option<String>,
    pub tool_choice: ToolChoice,
    pub json_schema_present: bool,
    pub temperature: Option<f32>,
    pub input: Option<String>,
    pub history: Vec<HistoryItem>,
    pub tools: Vec<ToolDefinition>,
}

/// Accumulates a provider's tool-call deltas in arrival order. Real
/// streaming providers emit one `ToolCallStarted` per call followed by a
/// run of `ToolCallDelta`s before the next call starts, so tracking "append
/// to whichever call started most recently" is sufficient.
#[derive(Default)]
struct ToolCallAccumulator {
    calls: Vec<(String, String, String)>, // (call_id, tool_name, arguments)
    current: Option<usize>,
}

impl ToolCallAccumulator {
    fn start(&mut self, call_id: String, tool_name: String) {
        self.calls.push((call_id, tool_name, String::new()));
        self.current = Some(self.calls.len() - 1);
    }

    fn delta(&mut self, delta: &str) {
        if let Some(i) = self.current {
            self.calls[i].2.push_str(delta);
        }
    }

    fn finished(&mut self, call_id: String, tool_name: String, arguments: serde_json::Value) {
        let arguments = match arguments {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.calls.push((call_id, tool_name, arguments));
        self.current = None;
    }

    fn into_tool_calls(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .map(|(id, tool_name, arguments)| ToolCall { id, tool_name, arguments })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Run one turn, retrying across fallback models until one succeeds or the
/// candidate set is exhausted (spec.md §4.C). The returned stream ends
/// after a single successful `message_complete`/`tool_start`, or after a
/// final unresolvable `error`.
pub fn run_streamed(
    params: RunStreamedParams,
    hooks: Arc<dyn AgentHooks>,
    providers: Arc<ProviderRegistry>,
    mech_state: Arc<MechState>,
    mech_config: Arc<MechConfig>,
) -> BoxStream<'static, StreamingEvent> {
    Box::pin(stream! {
        let mut attempted: HashSet<String> = HashSet::new();
        let mut last_error: Option<String> = None;
        let rate_limit_fallback = providers.rate_limit_fallback();

        loop {
            let model_id = match select_next_model(&params, &mech_state, &mech_config, &attempted, &last_error, &rate_limit_fallback) {
                Some(m) => m,
                None => {
                    yield StreamingEvent::Error { error: last_error.unwrap_or_else(|| "no model available".into()), model: None };
                    return;
                }
            };

            let Some((provider, model_name)) = resolve_model(&providers, &model_id) else {
                attempted.insert(model_id.clone());
                last_error = Some(format!("no provider registered for model {model_id}"));
                continue;
            };

            attempted.insert(model_id.clone());
            mech_state.set_last_model_used(Some(model_id.clone()));
            TraceEvent::ModelSelected {
                model: model_id.clone(),
                model_class: params.model_class.clone(),
                score: mech_state.model_scores().get(&model_id).copied().unwrap_or(50),
            }
            .emit();

            yield StreamingEvent::AgentStart { agent_id: params.agent_id.clone(), model: model_id.clone() };

            let mut messages = vec![HistoryItem::developer(params.instructions.clone())];
            messages.extend(params.history.iter().cloned());
            if let Some(input) = &params.input {
                messages.push(HistoryItem::user(input.clone()));
            }
            hooks.on_request(&mut messages).await;
            let messages = ensure_tool_result_sequence(messages);

            let req = mech_providers::ChatRequest {
                history: messages,
                tools: params.tools.clone(),
                tool_choice: params.tool_choice.clone(),
                temperature: params.temperature,
                max_tokens: None,
                json_mode: params.json_schema_present,
                model: Some(model_name),
            };

            let raw = match provider.chat_stream(&req).await {
                Ok(s) => s,
                Err(e) => {
                    last_error = Some(e.to_string());
                    yield StreamingEvent::Error { error: e.to_string(), model: Some(model_id.clone()) };
                    continue;
                }
            };
            let mut events = with_inactivity_timeout(raw, Duration::from_secs(mech_config.inactivity_timeout_secs));

            let message_id = Uuid::new_v4().to_string();
            let mut order = 0u64;
            let mut content = String::new();
            let mut thinking = String::new();
            let mut thinking_signature: Option<String> = None;
            let mut tool_calls = ToolCallAccumulator::default();
            let mut turn_failed = false;

            while let Some(event) = events.next().await {
                match event {
                    Ok(StreamEvent::Token { text }) => {
                        content.push_str(&text);
                        order += 1;
                        yield StreamingEvent::MessageDelta { content: text, order, message_id: message_id.clone(), model: model_id.clone() };
                    }
                    Ok(StreamEvent::Thinking { text }) => {
                        thinking.push_str(&text);
                        hooks.on_thinking(&text).await;
                    }
                    Ok(StreamEvent::ToolCallStarted { call_id, tool_name }) => {
                        tool_calls.start(call_id, tool_name);
                    }
                    Ok(StreamEvent::ToolCallDelta { delta, .. }) => {
                        tool_calls.delta(&delta);
                    }
                    Ok(StreamEvent::ToolCallFinished { call_id, tool_name, arguments }) => {
                        tool_calls.finished(call_id, tool_name, arguments);
                    }
                    Ok(StreamEvent::Done { thinking_signature: sig, .. }) => {
                        thinking_signature = sig;
                        if !tool_calls.is_empty() {
                            yield StreamingEvent::ToolStart { tool_calls: tool_calls.into_tool_calls(), model: model_id.clone() };
                        } else {
                            yield StreamingEvent::MessageComplete {
                                content: content.clone(),
                                message_id: message_id.clone(),
                                thinking_content: if thinking.is_empty() { None } else { Some(thinking.clone()) },
                                thinking_signature,
                                model: model_id.clone(),
                            };
                        }
                        return;
                    }
                    Ok(StreamEvent::Error { message }) => {
                        last_error = Some(message.clone());
                        yield StreamingEvent::Error { error: message, model: Some(model_id.clone()) };
                        turn_failed = true;
                        break;
                    }
                    Err(e) => {
                        last_error = Some(e.to_string());
                        yield StreamingEvent::Error { error: e.to_string(), model: Some(model_id.clone()) };
                        turn_failed = true;
                        break;
                    }
                }
            }

            if !turn_failed {
                // Stream closed without a `Done` event: treat as an error
                // so the loop either falls back or terminates cleanly.
                last_error = Some("provider stream ended without a done event".into());
                yield StreamingEvent::Error { error: last_error.clone().unwrap(), model: Some(model_id.clone()) };
            }
        }
    })
}

fn select_next_model(
    params: &RunStreamedParams,
    mech_state: &MechState,
    mech_config: &MechConfig,
    attempted: &HashSet<String>,
    last_error: &Option<String>,
    rate_limit_fallback: &HashMap<String, String>,
) -> Option<String> {
    if let Some(pinned) = &params.pinned_model {
        return if attempted.contains(pinned) { None } else { Some(pinned.clone()) };
    }

    let agent_class = mech_config.class_models(&params.model_class);
    let standard_class = mech_config.class_models(mech_domain::config::STANDARD_CLASS);
    let disabled = mech_state.disabled_models();
    let scores = mech_state.model_scores();

    if let Some(err) = last_error {
        let last_model = mech_state.last_model_used().unwrap_or_default();
        if let Some((model, reason)) = fallback::pick_fallback(err, &last_model, rate_limit_fallback, agent_class, standard_class, &disabled, &scores, attempted) {
            TraceEvent::ModelFallback { from_model: last_model, to_model: model.clone(), reason: format!("{reason:?}") }.emit();
            return Some(model);
        }
        return None;
    }

    fallback::select_model(agent_class, &disabled, &scores, attempted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mech_domain::error::Result as DomainResult;
    use mech_providers::ChatResponse;

    struct MockProvider {
        id: String,
        events: Vec<StreamEvent>,
        caps: mech_domain::capability::LlmCapabilities,
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockProvider {
        async fn chat(&self, _req: &mech_providers::ChatRequest) -> DomainResult<ChatResponse> {
            unimplemented!("streaming-only mock")
        }

        async fn chat_stream(&self, _req: &mech_providers::ChatRequest) -> DomainResult<BoxStream<'static, DomainResult<StreamEvent>>> {
            let events = self.events.clone();
            Ok(Box::pin(futures_util::stream::iter(events.into_iter().map(Ok))))
        }

        fn capabilities(&self) -> &mech_domain::capability::LlmCapabilities {
            &self.caps
        }

        fn provider_id(&self) -> &str {
            &self.id
        }
    }

    fn registry_with(id: &str, events: Vec<StreamEvent>) -> Arc<ProviderRegistry> {
        let mut reg = ProviderRegistry::from_config(&mech_domain::config::LlmConfig::default()).unwrap();
        reg.insert(id, Arc::new(MockProvider { id: id.into(), events, caps: Default::default() }));
        Arc::new(reg)
    }

    fn params(model_id: &str) -> RunStreamedParams {
        RunStreamedParams {
            agent_id: "overseer".into(),
            instructions: "observe".into(),
            model_class: "monologue".into(),
            pinned_model: Some(model_id.into()),
            tool_choice: ToolChoice::Auto,
            json_schema_present: false,
            temperature: None,
            input: Some("hi".into()),
            history: vec![],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn happy_path_yields_message_complete() {
        let providers = registry_with(
            "mock",
            vec![
                StreamEvent::Token { text: "4".into() },
                StreamEvent::Done { usage: None, finish_reason: Some("stop".into()), thinking_signature: None },
            ],
        );
        let state = Arc::new(MechState::new(&MechConfig::default(), 0.0, chrono::Utc::now()));
        let mut stream = run_streamed(params("mock/gpt-x"), Arc::new(crate::agent::NoopHooks), providers, state, Arc::new(MechConfig::default()));
        let mut saw_complete = false;
        while let Some(ev) = stream.next().await {
            if let StreamingEvent::MessageComplete { content, .. } = ev {
                assert_eq!(content, "4");
                saw_complete = true;
            }
        }
        assert!(saw_complete);
    }

    #[tokio::test]
    async fn unresolvable_model_yields_error_and_stops() {
        let providers = registry_with("mock", vec![]);
        let state = Arc::new(MechState::new(&MechConfig::default(), 0.0, chrono::Utc::now()));
        let mut cfg = MechConfig::default();
        cfg.model_classes.insert("standard".into(), vec![]);
        let mut p = params("ghost/gpt-x");
        p.pinned_model = None;
        p.model_class = "nonexistent".into();
        let mut stream = run_streamed(p, Arc::new(crate::agent::NoopHooks), providers, state, Arc::new(cfg));
        let first = stream.next().await;
        assert!(matches!(first, Some(StreamingEvent::Error { .. })));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn tool_call_delta_accumulates_onto_most_recent_call() {
        let providers = registry_with(
            "mock",
            vec![
                StreamEvent::ToolCallStarted { call_id: "c1".into(), tool_name: "calculator".into() },
                StreamEvent::ToolCallDelta { call_id: "0".into(), delta: "{\"a\":".into() },
                StreamEvent::ToolCallDelta { call_id: "0".into(), delta: "2}".into() },
                StreamEvent::Done { usage: None, finish_reason: Some("tool_calls".into()), thinking_signature: None },
            ],
        );
        let state = Arc::new(MechState::new(&MechConfig::default(), 0.0, chrono::Utc::now()));
        let mut stream = run_streamed(params("mock/gpt-x"), Arc::new(crate::agent::NoopHooks), providers, state, Arc::new(MechConfig::default()));
        let mut saw_tool_start = false;
        while let Some(ev) = stream.next().await {
            if let StreamingEvent::ToolStart { tool_calls, .. } = ev {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].arguments, "{\"a\":2}");
                saw_tool_start = true;
            }
        }
        assert!(saw_tool_start);
    }

    #[tokio::test]
    async fn rate_limited_model_switches_directly_to_declared_fallback() {
        let mut registry = ProviderRegistry::from_config(&mech_domain::config::LlmConfig::default()).unwrap();
        registry.insert(
            "free",
            Arc::new(MockProvider {
                id: "free".into(),
                events: vec![StreamEvent::Error { message: "HTTP 429 Too Many Requests".into() }],
                caps: Default::default(),
            }),
        );
        registry.insert(
            "paid",
            Arc::new(MockProvider {
                id: "paid".into(),
                events: vec![
                    StreamEvent::Token { text: "ok".into() },
                    StreamEvent::Done { usage: None, finish_reason: Some("stop".into()), thinking_signature: None },
                ],
                caps: Default::default(),
            }),
        );
        registry.insert_rate_limit_fallback("free/a", "paid/a");
        let providers = Arc::new(registry);

        let mut cfg = MechConfig::default();
        cfg.model_classes.insert("agentclass".into(), vec!["free/a".into()]);
        cfg.model_classes.insert("standard".into(), vec![]);

        let mut p = params("free/a");
        p.pinned_model = None;
        p.model_class = "agentclass".into();

        let state = Arc::new(MechState::new(&cfg, 0.0, chrono::Utc::now()));
        let mut stream = run_streamed(p, Arc::new(crate::agent::NoopHooks), providers, state, Arc::new(cfg));

        let mut models_attempted = Vec::new();
        let mut saw_complete = false;
        while let Some(ev) = stream.next().await {
            match ev {
                StreamingEvent::AgentStart { model, .. } => models_attempted.push(model),
                StreamingEvent::MessageComplete { content, .. } => {
                    assert_eq!(content, "ok");
                    saw_complete = true;
                }
                _ => {}
            }
        }
        assert_eq!(models_attempted, vec!["free/a".to_string(), "paid/a".to_string()]);
        assert!(saw_complete);
    }
}
