//! Built-in control tools (spec.md §4.E/§4.F): the `task_complete`/
//! `task_fatal_error` signals prepended to every agent's tool list by the
//! MECH driver, the six metacognition tuning tools, and a demo `calculator`
//! tool used to exercise the dispatcher end to end.

use std::sync::Arc;

use mech_domain::toolspec::{ParamType, ToolDescriptor, ToolParameter};
use serde_json::Value;

use crate::argutil::{arg_bool, arg_f64, arg_str, param};
use crate::signals::SignalSink;

/// Mutations the metacognition agent's tools apply to the driver's
/// `MECHState` (spec.md §4.F). Implemented by `mech-core`; defined here so
/// the tool descriptors can be constructed without `mech-tools` depending
/// on `mech-core`.
pub trait MetaSink: Send + Sync {
    fn inject_thought(&self, content: String);
    fn set_meta_frequency(&self, freq: u32);
    fn set_thought_delay(&self, seconds: u32);
    fn set_model_score(&self, model_id: String, score: u8);
    fn disable_model(&self, model_id: String, disabled: bool);
    fn no_changes_needed(&self);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Task signals
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn task_complete_descriptor(sink: Arc<dyn SignalSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "task_complete".into(),
        description: "Signal that the current task is finished and stop the MECH loop.".into(),
        parameters: vec![param("result", ParamType::String, "the final result to report", true)],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |args| {
            let sink = sink.clone();
            let result = args.into_iter().next().unwrap_or(Value::Null);
            Box::pin(async move {
                sink.complete(result);
                serde_json::json!({ "acknowledged": true })
            })
        }),
    }
}

pub fn task_fatal_error_descriptor(sink: Arc<dyn SignalSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "task_fatal_error".into(),
        description: "Signal that the task has failed unrecoverably and stop the MECH loop.".into(),
        parameters: vec![param("error", ParamType::String, "description of the fatal error", true)],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |args| {
            let sink = sink.clone();
            let error = args.into_iter().next().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
            Box::pin(async move {
                sink.fatal(error);
                serde_json::json!({ "acknowledged": true })
            })
        }),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Metacognition tuning tools
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn inject_thought_descriptor(sink: Arc<dyn MetaSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "inject_thought".into(),
        description: "Append a high-priority developer thought into the Overseer's history.".into(),
        parameters: vec![param("content", ParamType::String, "the thought to inject", true)],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |args| {
            let sink = sink.clone();
            let content = arg_str(&args, 0);
            Box::pin(async move {
                sink.inject_thought(content);
                serde_json::json!({ "ok": true })
            })
        }),
    }
}

pub fn set_meta_frequency_descriptor(sink: Arc<dyn MetaSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "set_meta_frequency".into(),
        description: "Set how often (in LLM requests) metacognition runs. Allowed: 5, 10, 20, 40.".into(),
        parameters: vec![param("frequency", ParamType::Number, "one of 5, 10, 20, 40", true)],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |args| {
            let sink = sink.clone();
            let freq = arg_f64(&args, 0) as u32;
            Box::pin(async move {
                sink.set_meta_frequency(freq);
                serde_json::json!({ "ok": true })
            })
        }),
    }
}

pub fn set_thought_delay_descriptor(sink: Arc<dyn MetaSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "set_thought_delay".into(),
        description: "Set the interruptible delay between MECH loop iterations, in seconds. Allowed: 0, 2, 4, 8, 16, 32, 64, 128.".into(),
        parameters: vec![param("seconds", ParamType::Number, "one of 0,2,4,8,16,32,64,128", true)],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |args| {
            let sink = sink.clone();
            let seconds = arg_f64(&args, 0) as u32;
            Box::pin(async move {
                sink.set_thought_delay(seconds);
                serde_json::json!({ "ok": true })
            })
        }),
    }
}

pub fn set_model_score_descriptor(sink: Arc<dyn MetaSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "set_model_score".into(),
        description: "Adjust a model's weighted-selection score (0-100).".into(),
        parameters: vec![
            param("model_id", ParamType::String, "the model identifier", true),
            param("score", ParamType::Number, "0-100", true),
        ],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |args| {
            let sink = sink.clone();
            let model_id = arg_str(&args, 0);
            let score = arg_f64(&args, 1).clamp(0.0, 100.0) as u8;
            Box::pin(async move {
                sink.set_model_score(model_id, score);
                serde_json::json!({ "ok": true })
            })
        }),
    }
}

pub fn disable_model_descriptor(sink: Arc<dyn MetaSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "disable_model".into(),
        description: "Disable (or re-enable) a model from selection.".into(),
        parameters: vec![
            param("model_id", ParamType::String, "the model identifier", true),
            param("disabled", ParamType::Boolean, "true to disable, false to re-enable", false),
        ],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |args| {
            let sink = sink.clone();
            let model_id = arg_str(&args, 0);
            let disabled = arg_bool(&args, 1, true);
            Box::pin(async move {
                sink.disable_model(model_id, disabled);
                serde_json::json!({ "ok": true })
            })
        }),
    }
}

pub fn no_changes_needed_descriptor(sink: Arc<dyn MetaSink>) -> ToolDescriptor {
    ToolDescriptor {
        name: "no_changes_needed".into(),
        description: "Acknowledge the current state needs no tuning.".into(),
        parameters: vec![],
        return_description: "acknowledgement".into(),
        invoke: Box::new(move |_args| {
            let sink = sink.clone();
            Box::pin(async move {
                sink.no_changes_needed();
                serde_json::json!({ "ok": true })
            })
        }),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Demo tool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A small arithmetic tool used to exercise dispatch end to end (the
/// recurring example throughout spec.md §8's scenarios).
pub fn calculator_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "calculator".into(),
        description: "Perform a basic arithmetic operation on two numbers.".into(),
        parameters: vec![
            param("a", ParamType::Number, "first operand", true),
            param("b", ParamType::Number, "second operand", true),
            ToolParameter {
                name: "operation".into(),
                param_type: ParamType::Enum,
                description: "the operation to perform".into(),
                enum_values: vec!["add".into(), "subtract".into(), "multiply".into(), "divide".into()],
                default: Some(Value::String("add".into())),
                required: true,
                inject: false,
            },
        ],
        return_description: "the numeric result, or an error if dividing by zero".into(),
        invoke: Box::new(|args| {
            Box::pin(async move {
                let a = arg_f64(&args, 0);
                let b = arg_f64(&args, 1);
                let op = arg_str(&args, 2);
                match op.as_str() {
                    "subtract" => serde_json::json!({ "result": a - b }),
                    "multiply" => serde_json::json!({ "result": a * b }),
                    "divide" => {
                        if b == 0.0 {
                            serde_json::json!({ "error": "division by zero" })
                        } else {
                            serde_json::json!({ "result": a / b })
                        }
                    }
                    _ => serde_json::json!({ "result": a + b }),
                }
            })
        }),
    }
}
