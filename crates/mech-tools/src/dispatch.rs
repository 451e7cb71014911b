//! Tool-call dispatch (spec.md §4.B): parses LLM-produced argument blobs,
//! resolves descriptors, invokes handlers concurrently, and normalizes
//! results into `FunctionCallOutput` history items preserving call order
//! regardless of completion order (IT1).

use std::collections::HashMap;

use mech_domain::history::HistoryItem;
use mech_domain::toolspec::{ParamType, ToolCall, ToolParameter};
use mech_domain::trace::TraceEvent;
use serde_json::Value;

use crate::registry::ToolRegistry;

/// Dispatch every call in one `tool_start` event concurrently, returning
/// their `FunctionCallOutput` items in the same order as `tool_calls`.
/// `injected` supplies values for parameters flagged `inject` (e.g. the
/// current agent id), keyed by the declared parameter name.
pub async fn dispatch_tool_calls(
    registry: &ToolRegistry,
    tool_calls: &[ToolCall],
    injected: &HashMap<String, Value>,
) -> Vec<HistoryItem> {
    if tool_calls.is_empty() {
        return Vec::new();
    }

    let futures = tool_calls.iter().map(|call| dispatch_one(registry, call, injected));
    futures_util::future::join_all(futures).await
}

async fn dispatch_one(
    registry: &ToolRegistry,
    call: &ToolCall,
    injected: &HashMap<String, Value>,
) -> HistoryItem {
    TraceEvent::ToolDispatch { tool_name: call.tool_name.clone(), call_id: call.id.clone() }.emit();

    let parsed = parse_arguments(&call.arguments);

    let descriptor = match registry.get(&call.tool_name) {
        Some(d) => d,
        None => {
            let output = canonical_error(&call.tool_name, &parsed, &format!("Tool {} not found", call.tool_name));
            TraceEvent::ToolResult { tool_name: call.tool_name.clone(), call_id: call.id.clone(), is_error: true }.emit();
            return HistoryItem::function_call_output(call.id.clone(), call.tool_name.clone(), output);
        }
    };

    let args = build_positional_args(&descriptor.parameters, &parsed, injected);
    let result = (descriptor.invoke)(args).await;
    let is_error = result.get("error").is_some();
    let output = stringify(&result);

    TraceEvent::ToolResult { tool_name: call.tool_name.clone(), call_id: call.id.clone(), is_error }.emit();
    HistoryItem::function_call_output(call.id.clone(), call.tool_name.clone(), output)
}

/// Parse a raw argument blob as a JSON object. On parse failure or a
/// non-object result, wrap it as `{_raw: arguments}` (spec.md §4.B step 1.a).
fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) if v.is_object() => v,
        Ok(v) => serde_json::json!({ "_raw": v }),
        Err(_) => serde_json::json!({ "_raw": raw }),
    }
}

/// Walk `parameters` in declared order, building the positional argument
/// list the descriptor's `invoke` expects: injected parameters come from
/// `injected`, the rest from the parsed argument object, type-coerced and
/// defaulted.
fn build_positional_args(
    parameters: &[ToolParameter],
    parsed: &Value,
    injected: &HashMap<String, Value>,
) -> Vec<Value> {
    parameters
        .iter()
        .map(|param| {
            if param.inject {
                return injected.get(&param.name).cloned().unwrap_or(Value::Null);
            }
            let raw = parsed.get(&param.name).cloned().or_else(|| param.default.clone());
            coerce(raw, param.param_type)
        })
        .collect()
}

fn coerce(value: Option<Value>, param_type: ParamType) -> Value {
    let value = match value {
        Some(v) => v,
        None => return Value::Null,
    };
    match param_type {
        ParamType::Number => match &value {
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(|n| serde_json::Number::from_f64(n)).map(Value::Number).unwrap_or(value),
            _ => value,
        },
        ParamType::Boolean => match &value {
            Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => value,
        },
        ParamType::String | ParamType::Enum => match &value {
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => value,
        },
        ParamType::Array | ParamType::Object => value,
    }
}

/// Non-string tool results are JSON-stringified before becoming a
/// `FunctionCallOutput.output` (spec.md §4.B step 1.e).
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// The canonical tool-error shape, per the batcher convention chosen as
/// canonical in spec.md §9's first open question.
fn canonical_error(tool: &str, input: &Value, message: &str) -> String {
    serde_json::to_string(&serde_json::json!({
        "tool": tool,
        "input": input,
        "error": message,
    }))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use mech_domain::toolspec::ToolDescriptor;

    fn echo_descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".into(),
            description: "echoes its single string argument".into(),
            parameters: vec![ToolParameter {
                name: "text".into(),
                param_type: ParamType::String,
                description: String::new(),
                enum_values: vec![],
                default: None,
                required: true,
                inject: false,
            }],
            return_description: String::new(),
            invoke: Box::new(|args| {
                let text = args.first().and_then(|v| v.as_str()).unwrap_or("").to_string();
                Box::pin(async move { Value::String(text) })
            }),
        }
    }

    fn tool_call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall { id: id.into(), tool_name: name.into(), arguments: args.into() }
    }

    #[tokio::test]
    async fn empty_tool_calls_returns_empty_without_side_effects() {
        let registry = ToolRegistry::new();
        let results = dispatch_tool_calls(&registry, &[], &HashMap::new()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_produces_canonical_error_shape() {
        let registry = ToolRegistry::new();
        let calls = vec![tool_call("c1", "ghost", "{}")];
        let results = dispatch_tool_calls(&registry, &calls, &HashMap::new()).await;
        assert_eq!(results.len(), 1);
        match &results[0] {
            HistoryItem::FunctionCallOutput { output, call_id, .. } => {
                assert_eq!(call_id, "c1");
                let v: Value = serde_json::from_str(output).unwrap();
                assert_eq!(v["tool"], "ghost");
                assert!(v["error"].as_str().unwrap().contains("not found"));
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_arguments_become_raw_wrapper() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_descriptor());
        let calls = vec![tool_call("c1", "echo", "not json")];
        let results = dispatch_tool_calls(&registry, &calls, &HashMap::new()).await;
        match &results[0] {
            HistoryItem::FunctionCallOutput { output, .. } => assert_eq!(output, ""),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_preserves_call_order_regardless_of_completion_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_descriptor());
        let calls = vec![
            tool_call("c1", "echo", r#"{"text":"first"}"#),
            tool_call("c2", "echo", r#"{"text":"second"}"#),
            tool_call("c3", "echo", r#"{"text":"third"}"#),
        ];
        let results = dispatch_tool_calls(&registry, &calls, &HashMap::new()).await;
        assert_eq!(results.len(), 3);
        let ids: Vec<&str> = results.iter().map(|i| i.call_id().unwrap()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn string_result_is_not_double_encoded() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_descriptor());
        let calls = vec![tool_call("c1", "echo", r#"{"text":"hello"}"#)];
        let results = dispatch_tool_calls(&registry, &calls, &HashMap::new()).await;
        match &results[0] {
            HistoryItem::FunctionCallOutput { output, .. } => assert_eq!(output, "hello"),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn coerce_string_to_number() {
        let v = coerce(Some(Value::String("42".into())), ParamType::Number);
        assert_eq!(v, serde_json::json!(42.0));
    }

    #[test]
    fn coerce_string_to_boolean() {
        assert_eq!(coerce(Some(Value::String("true".into())), ParamType::Boolean), Value::Bool(true));
        assert_eq!(coerce(Some(Value::String("false".into())), ParamType::Boolean), Value::Bool(false));
    }

    #[test]
    fn coerce_missing_value_is_null() {
        assert_eq!(coerce(None, ParamType::String), Value::Null);
    }
}
