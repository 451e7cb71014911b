//! `MECHState` (spec.md §3) and the per-run context that closes over it
//! for the `task_complete`/`task_fatal_error`/metacognition tools.
//!
//! Spec.md §9 flags the source's global mutable `mechComplete`/
//! `mechOutcome` as a bug hazard and recommends encapsulating them in a
//! per-run context owned by the driver — `MechRunContext` below is that
//! encapsulation, implementing `mech_tools`'s `SignalSink`/`MetaSink`
//! traits so the tool descriptors built in `mech_tools::builtin` can
//! reach it without the dispatcher threading a result back.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mech_domain::config::MechConfig;
use mech_tools::{MetaSink, SignalSink};
use parking_lot::Mutex;
use serde_json::Value;

use crate::history::HistoryStore;

struct MechStateInner {
    llm_request_count: u64,
    meta_frequency: u32,
    disabled_models: HashSet<String>,
    model_scores: HashMap<String, u8>,
    last_model_used: Option<String>,
    thought_delay_secs: u32,
    run_start_time: DateTime<Utc>,
    cost_baseline: f64,
}

/// Process-local state for one `runMECH` call (spec.md §3). Reset at the
/// start of every run; never persisted across runs.
pub struct MechState {
    inner: Mutex<MechStateInner>,
}

impl MechState {
    pub fn new(config: &MechConfig, cost_baseline: f64, now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(MechStateInner {
                llm_request_count: 0,
                meta_frequency: config.default_meta_frequency,
                disabled_models: HashSet::new(),
                model_scores: HashMap::new(),
                last_model_used: None,
                thought_delay_secs: config.default_thought_delay_secs,
                run_start_time: now,
                cost_baseline,
            }),
        }
    }

    /// Increment and return the new `llmRequestCount` (spec.md §4.E.4.b).
    pub fn next_request_count(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.llm_request_count += 1;
        inner.llm_request_count
    }

    pub fn llm_request_count(&self) -> u64 {
        self.inner.lock().llm_request_count
    }

    pub fn meta_frequency(&self) -> u32 {
        self.inner.lock().meta_frequency
    }

    pub fn set_meta_frequency(&self, freq: u32) {
        self.inner.lock().meta_frequency = freq;
    }

    pub fn thought_delay_secs(&self) -> u32 {
        self.inner.lock().thought_delay_secs
    }

    pub fn set_thought_delay_secs(&self, secs: u32) {
        self.inner.lock().thought_delay_secs = secs;
    }

    pub fn disabled_models(&self) -> HashSet<String> {
        self.inner.lock().disabled_models.clone()
    }

    pub fn disable_model(&self, model_id: String, disabled: bool) {
        let mut inner = self.inner.lock();
        if disabled {
            inner.disabled_models.insert(model_id);
        } else {
            inner.disabled_models.remove(&model_id);
        }
    }

    pub fn model_scores(&self) -> HashMap<String, u8> {
        self.inner.lock().model_scores.clone()
    }

    pub fn set_model_score(&self, model_id: String, score: u8) {
        self.inner.lock().model_scores.insert(model_id, score);
    }

    pub fn last_model_used(&self) -> Option<String> {
        self.inner.lock().last_model_used.clone()
    }

    pub fn set_last_model_used(&self, model: Option<String>) {
        self.inner.lock().last_model_used = model;
    }

    pub fn run_start_time(&self) -> DateTime<Utc> {
        self.inner.lock().run_start_time
    }

    pub fn cost_baseline(&self) -> f64 {
        self.inner.lock().cost_baseline
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        (now - self.run_start_time()).num_milliseconds().max(0) as f64 / 1000.0
    }
}

/// The terminal outcome reported through `task_complete`/`task_fatal_error`.
#[derive(Debug, Clone)]
pub enum MechOutcome {
    Complete(Value),
    Fatal(String),
}

/// Per-run context closed over by the `task_complete`/`task_fatal_error`
/// and metacognition tool descriptors. Replaces the source's global
/// `mechComplete`/`mechOutcome` flags (spec.md §9).
pub struct MechRunContext {
    state: Arc<MechState>,
    history: Arc<HistoryStore>,
    complete: AtomicBool,
    outcome: Mutex<Option<MechOutcome>>,
}

impl MechRunContext {
    pub fn new(state: Arc<MechState>, history: Arc<HistoryStore>) -> Self {
        Self { state, history, complete: AtomicBool::new(false), outcome: Mutex::new(None) }
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    pub fn outcome(&self) -> Option<MechOutcome> {
        self.outcome.lock().clone()
    }

    pub fn state(&self) -> &Arc<MechState> {
        &self.state
    }
}

impl SignalSink for MechRunContext {
    fn complete(&self, result: Value) {
        *self.outcome.lock() = Some(MechOutcome::Complete(result));
        self.complete.store(true, Ordering::Release);
    }

    fn fatal(&self, error: String) {
        *self.outcome.lock() = Some(MechOutcome::Fatal(error));
        self.complete.store(true, Ordering::Release);
    }
}

impl MetaSink for MechRunContext {
    fn inject_thought(&self, content: String) {
        self.history.append(mech_domain::history::HistoryItem::developer(content));
    }

    fn set_meta_frequency(&self, freq: u32) {
        self.state.set_meta_frequency(freq);
    }

    fn set_thought_delay(&self, seconds: u32) {
        self.state.set_thought_delay_secs(seconds);
    }

    fn set_model_score(&self, model_id: String, score: u8) {
        self.state.set_model_score(model_id, score);
    }

    fn disable_model(&self, model_id: String, disabled: bool) {
        self.state.disable_model(model_id, disabled);
    }

    fn no_changes_needed(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn new_state_matches_config_defaults() {
        let config = MechConfig::default();
        let state = MechState::new(&config, 0.0, now());
        assert_eq!(state.llm_request_count(), 0);
        assert_eq!(state.meta_frequency(), 5);
        assert_eq!(state.thought_delay_secs(), 0);
        assert!(state.disabled_models().is_empty());
    }

    #[test]
    fn next_request_count_is_monotonic() {
        let state = MechState::new(&MechConfig::default(), 0.0, now());
        assert_eq!(state.next_request_count(), 1);
        assert_eq!(state.next_request_count(), 2);
        assert_eq!(state.next_request_count(), 3);
    }

    #[test]
    fn disable_and_reenable_model() {
        let state = MechState::new(&MechConfig::default(), 0.0, now());
        state.disable_model("gpt-x".into(), true);
        assert!(state.disabled_models().contains("gpt-x"));
        state.disable_model("gpt-x".into(), false);
        assert!(!state.disabled_models().contains("gpt-x"));
    }

    #[test]
    fn run_context_complete_sets_flag_and_outcome() {
        let state = Arc::new(MechState::new(&MechConfig::default(), 0.0, now()));
        let history = Arc::new(HistoryStore::new());
        let ctx = MechRunContext::new(state, history);
        assert!(!ctx.is_complete());
        ctx.complete(Value::String("done".into()));
        assert!(ctx.is_complete());
        match ctx.outcome() {
            Some(MechOutcome::Complete(v)) => assert_eq!(v, Value::String("done".into())),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn run_context_fatal_sets_flag_and_outcome() {
        let state = Arc::new(MechState::new(&MechConfig::default(), 0.0, now()));
        let history = Arc::new(HistoryStore::new());
        let ctx = MechRunContext::new(state, history);
        ctx.fatal("boom".into());
        assert!(ctx.is_complete());
        match ctx.outcome() {
            Some(MechOutcome::Fatal(e)) => assert_eq!(e, "boom"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn inject_thought_appends_developer_message_to_history() {
        let state = Arc::new(MechState::new(&MechConfig::default(), 0.0, now()));
        let history = Arc::new(HistoryStore::new());
        let ctx = MechRunContext::new(state, history.clone());
        ctx.inject_thought("focus on the deadline".into());
        assert_eq!(history.len(), 1);
    }
}
