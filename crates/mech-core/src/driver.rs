//! MECH Driver (spec.md §4.E): the outer `runMECH` loop. Resets `MECHState`,
//! wires the `task_complete`/`task_fatal_error` signals into a per-run
//! context, and repeatedly calls the Tool-Aware Runner until the run
//! completes, a single iteration finishes in non-looping mode, or the
//! caller-supplied transport reports closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mech_domain::capability::ToolChoice;
use mech_domain::config::MechConfig;
use mech_domain::history::HistoryItem;
use mech_domain::trace::TraceEvent;
use mech_providers::ProviderRegistry;
use mech_tools::builtin::{task_complete_descriptor, task_fatal_error_descriptor};
use mech_tools::{SignalSink, ToolRegistry};
use rand::Rng;
use serde_json::Value;

use crate::agent::AgentHooks;
use crate::cancel::{sleep_interruptible, CancelToken};
use crate::events::StreamingEvent;
use crate::history::HistoryStore;
use crate::metacognition::run_metacognition;
use crate::result::MechResult;
use crate::state::{MechOutcome, MechRunContext, MechState};
use crate::tool_runner::{run_streamed_with_tools, ToolAwareParams};

/// Static configuration for one `runMECH` call (spec.md §4.E).
pub struct MechDriverParams {
    pub agent_id: String,
    pub instructions: String,
    pub model_class: String,
    /// Pin a single model for the whole run, bypassing rotation/fallback.
    pub fixed_model: Option<String>,
    pub tool_choice: ToolChoice,
    pub json_schema: Option<Value>,
    pub force_json: bool,
    pub temperature: Option<f32>,
    pub max_tool_calls: u32,
    /// The agent's own declared tools; `task_complete`/`task_fatal_error`
    /// are prepended by the driver (spec.md §4.E step 2).
    pub tool_names: Vec<String>,
    pub ai_name: String,
    /// Names of the projects currently active in the surrounding MAGI
    /// system, surfaced in the System Status message (spec.md §4.E). This
    /// core has no Project data model of its own (out of scope per
    /// spec.md §1); callers that track projects elsewhere pass their
    /// names through here.
    pub active_projects: Vec<String>,
    /// Short descriptions of the tasks currently active in the
    /// surrounding MAGI system, surfaced in the System Status message
    /// (spec.md §4.E). Same caveat as `active_projects`.
    pub active_tasks: Vec<String>,
}

/// Pick the next model for one loop iteration, ahead of calling the
/// Tool-Aware Runner (spec.md §4.E step c). `None` lets the Streaming
/// Runner's own class-based selection apply instead.
fn rotate_model(params: &MechDriverParams, mech_config: &MechConfig, mech_state: &MechState) -> Option<String> {
    if let Some(fixed) = &params.fixed_model {
        return Some(fixed.clone());
    }
    if params.model_class != "monologue" {
        return None;
    }
    let candidates = mech_config.class_models(&params.model_class);
    if candidates.is_empty() {
        return None;
    }
    let previous = mech_state.last_model_used();
    let pool: Vec<&String> = candidates.iter().filter(|m| Some(m.as_str()) != previous.as_deref()).collect();
    let pool: Vec<&String> = if pool.is_empty() { candidates.iter().collect() } else { pool };
    let idx = rand::thread_rng().gen_range(0..pool.len());
    Some(pool[idx].clone())
}

/// Build the ephemeral "System Status" developer message pushed ahead of
/// each Tool-Aware Runner call (spec.md §4.E "Overseer prompt
/// augmentation"). Never persisted to the main history log.
fn system_status_message(params: &MechDriverParams, state: &MechState, short_term_memories: &[String], now: chrono::DateTime<Utc>) -> HistoryItem {
    let elapsed = state.elapsed_secs(now);
    let memories = if short_term_memories.is_empty() {
        "none".to_string()
    } else {
        short_term_memories.join("; ")
    };
    let projects = if params.active_projects.is_empty() { "none".to_string() } else { params.active_projects.join(", ") };
    let tasks = if params.active_tasks.is_empty() { "none".to_string() } else { params.active_tasks.join(", ") };
    let content = format!(
        "System Status — time: {now}, elapsed: {elapsed:.1}s, thought_delay: {delay}s, \
         active_projects: [{projects}], active_tasks: [{tasks}], active_tools: [{tools}], \
         short_term_memories: [{memories}]",
        now = now.to_rfc3339(),
        delay = state.thought_delay_secs(),
        tools = params.tool_names.join(", "),
    );
    HistoryItem::developer(content)
}

/// Probabilistic "mind wander" nudge (spec.md §4.E), injected as an
/// ephemeral developer message at most once per turn.
fn wander_nudge(mech_config: &MechConfig) -> Option<HistoryItem> {
    if rand::thread_rng().gen_bool(mech_config.wander_probability.clamp(0.0, 1.0)) {
        Some(HistoryItem::developer("Your mind may wander for a moment before returning to the task at hand.".to_string()))
    } else {
        None
    }
}

/// Build the per-run tool registry: the process-wide base registry plus
/// the two task signals, closed over this run's `MechRunContext`.
fn build_run_registry(base: &ToolRegistry, run_ctx: &Arc<MechRunContext>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for descriptor in base.entries() {
        registry.register_arc(descriptor.clone());
    }
    let sink: Arc<dyn SignalSink> = run_ctx.clone();
    registry.register(task_complete_descriptor(sink.clone()));
    registry.register(task_fatal_error_descriptor(sink));
    registry
}

/// Run the MECH loop to completion (spec.md §4.E).
///
/// `current_cost` reads the process-wide running cost tracker (spec.md §3
/// `costTracker`); `transport_closed` mirrors §6's `comm.isClosed()`.
#[allow(clippy::too_many_arguments)]
pub async fn run_mech(
    params: MechDriverParams,
    hooks: Arc<dyn AgentHooks>,
    input: String,
    loop_forever: bool,
    providers: Arc<ProviderRegistry>,
    base_tool_registry: Arc<ToolRegistry>,
    mech_config: Arc<MechConfig>,
    cancel: CancelToken,
    current_cost: impl Fn() -> f64,
    transport_closed: impl Fn() -> bool,
    emit: impl Fn(StreamingEvent),
) -> MechResult {
    let now = Utc::now();
    let cost_baseline = current_cost();
    let state = Arc::new(MechState::new(&mech_config, cost_baseline, now));
    let history = Arc::new(HistoryStore::new());
    let run_ctx = Arc::new(MechRunContext::new(state.clone(), history.clone()));

    let run_registry = Arc::new(build_run_registry(&base_tool_registry, &run_ctx));
    let mut tool_names = vec!["task_complete".to_string(), "task_fatal_error".to_string()];
    tool_names.extend(params.tool_names.iter().cloned());

    TraceEvent::MechLoopStart { agent_id: params.agent_id.clone() }.emit();
    history.append(HistoryItem::user(input));

    let mut last_response = String::new();
    let mut first_iteration = true;

    while !run_ctx.is_complete() && (loop_forever || first_iteration) && !transport_closed() {
        first_iteration = false;

        history.drain_threads();
        let request_count = state.next_request_count();
        TraceEvent::MechLoopTick { llm_request_count: request_count, meta_frequency: state.meta_frequency() }.emit();

        if state.meta_frequency() > 0 && request_count % state.meta_frequency() as u64 == 0 {
            let condensed = history.describe(20);
            let meta_sink: Arc<dyn mech_tools::MetaSink> = run_ctx.clone();
            run_metacognition(meta_sink, condensed, &params.ai_name, providers.clone(), state.clone(), mech_config.clone(), None).await;
        }

        let rotated_model = rotate_model(&params, &mech_config, &state);
        let tick_now = Utc::now();
        let mut turn_history = history.snapshot();
        turn_history.push(system_status_message(&params, &state, &[], tick_now));
        if let Some(nudge) = wander_nudge(&mech_config) {
            turn_history.push(nudge);
        }

        emit(StreamingEvent::AgentStatus { status: "mech_start".into() });

        let tool_aware_params = ToolAwareParams {
            agent_id: params.agent_id.clone(),
            instructions: params.instructions.clone(),
            model_class: params.model_class.clone(),
            pinned_model: rotated_model,
            base_tool_choice: params.tool_choice.clone(),
            json_schema: params.json_schema.clone(),
            force_json: params.force_json,
            temperature: params.temperature,
            max_tool_calls: params.max_tool_calls,
            tool_names: tool_names.clone(),
        };

        let injected: HashMap<String, Value> = HashMap::from([("agent_id".to_string(), Value::String(params.agent_id.clone()))]);

        let (response, generated) = run_streamed_with_tools(
            tool_aware_params,
            hooks.clone(),
            None,
            turn_history,
            providers.clone(),
            run_registry.clone(),
            injected,
            state.clone(),
            mech_config.clone(),
            0,
        )
        .await;

        last_response = response;
        for item in generated {
            history.append(item);
        }

        emit(StreamingEvent::AgentStatus { status: "mech_done".into() });

        if !run_ctx.is_complete() {
            emit(StreamingEvent::ProcessUpdated);
            let delay = Duration::from_secs(state.thought_delay_secs() as u64);
            let chunk = Duration::from_millis(mech_config.delay_chunk_ms);
            sleep_interruptible(delay, chunk, &cancel).await;
            cancel.reset();
        }
    }

    let duration_sec = state.elapsed_secs(Utc::now());
    let total_cost = current_cost() - state.cost_baseline();
    let snapshot = history.snapshot();

    let result = match run_ctx.outcome() {
        Some(MechOutcome::Complete(v)) => MechResult::Complete { result: v, history: snapshot, duration_sec, total_cost },
        Some(MechOutcome::Fatal(e)) => MechResult::FatalError { error: e, history: snapshot, duration_sec, total_cost },
        None => MechResult::Complete { result: Value::String(last_response), history: snapshot, duration_sec, total_cost },
    };

    TraceEvent::MechComplete { status: if result.is_fatal() { "fatal_error".into() } else { "complete".into() }, duration_sec }.emit();
    result
}
