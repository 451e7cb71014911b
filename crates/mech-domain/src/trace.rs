use serde::Serialize;

/// Structured trace events emitted across the MECH crates at the lifecycle
/// points called out in spec.md: loop ticks, model selection/fallback,
/// tool dispatch, history repair, metacognition, and thought-delay sleep.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    MechLoopStart {
        agent_id: String,
    },
    MechLoopTick {
        llm_request_count: u64,
        meta_frequency: u32,
    },
    ModelSelected {
        model: String,
        model_class: String,
        score: u8,
    },
    ModelFallback {
        from_model: String,
        to_model: String,
        reason: String,
    },
    ToolDispatch {
        tool_name: String,
        call_id: String,
    },
    ToolResult {
        tool_name: String,
        call_id: String,
        is_error: bool,
    },
    HistoryRepair {
        orphans_converted: usize,
        pairs_synthesized: usize,
    },
    MetacognitionRun {
        llm_request_count: u64,
    },
    ThoughtDelaySleep {
        seconds: u32,
    },
    ThoughtDelayInterrupted {
        elapsed_ms: u64,
    },
    MechComplete {
        status: String,
        duration_sec: f64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "mech_event");
    }
}
