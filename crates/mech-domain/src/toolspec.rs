use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// A boxed future returned by a tool's `invoke` closure. Tool handlers are
/// fundamentally async (shell exec, file I/O) so the callable must return
/// one rather than a bare `Value`.
pub type ToolFuture = Pin<Box<dyn Future<Output = Value> + Send>>;

/// A tool call as produced by a streaming provider (spec.md §3 `ToolCall`),
/// consumed by the dispatcher (spec.md §4.B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    /// Raw JSON arguments, still a string — parsed by the dispatcher.
    pub arguments: String,
}

/// The declared type of a tool parameter (spec.md §3 `ToolDescriptor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Enum,
}

/// One parameter of a [`ToolDescriptor`], in declared order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    /// The external name surfaced to the provider, which may differ from
    /// the implementation parameter name.
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enum_values: Vec<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    /// When true, the runtime supplies this parameter automatically (e.g.
    /// the current agent id) rather than the LLM. Inject parameters are
    /// never part of the provider-facing JSON schema.
    #[serde(default)]
    pub inject: bool,
}

/// A callable tool plus its reflected parameter schema (spec.md §4.B).
///
/// `invoke` takes the positional argument list built by the dispatcher
/// (declared-order, type-coerced, injected parameters filled in) and
/// returns a JSON value; non-string return values are stringified by the
/// dispatcher before becoming a `FunctionCallOutput.output`.
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    pub return_description: String,
    pub invoke: Box<dyn Fn(Vec<Value>) -> ToolFuture + Send + Sync>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// JSON function-schema object surfaced to the provider (spec.md §6 Tool
/// contract): `{name, description, parameters:{type:"object", properties,
/// required}}`. Parameter order and `enum`/`default` are preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Build the provider-facing [`ToolDefinition`] from this descriptor,
    /// excluding `inject` parameters (spec.md §6).
    pub fn to_definition(&self) -> ToolDefinition {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            if param.inject {
                continue;
            }
            let mut schema = serde_json::Map::new();
            let type_str = match param.param_type {
                ParamType::String | ParamType::Enum => "string",
                ParamType::Number => "number",
                ParamType::Boolean => "boolean",
                ParamType::Array => "array",
                ParamType::Object => "object",
            };
            schema.insert("type".into(), Value::String(type_str.into()));
            if !param.description.is_empty() {
                schema.insert("description".into(), Value::String(param.description.clone()));
            }
            if param.param_type == ParamType::Enum && !param.enum_values.is_empty() {
                schema.insert(
                    "enum".into(),
                    Value::Array(param.enum_values.iter().cloned().map(Value::String).collect()),
                );
            }
            if let Some(default) = &param.default {
                schema.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(schema));
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": Value::Object(properties),
                "required": Value::Array(required),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "calculator".into(),
            description: "adds two numbers".into(),
            parameters: vec![
                ToolParameter {
                    name: "a".into(),
                    param_type: ParamType::Number,
                    description: "first operand".into(),
                    enum_values: vec![],
                    default: None,
                    required: true,
                    inject: false,
                },
                ToolParameter {
                    name: "agent_id".into(),
                    param_type: ParamType::String,
                    description: String::new(),
                    enum_values: vec![],
                    default: None,
                    required: false,
                    inject: true,
                },
            ],
            return_description: "the sum".into(),
            invoke: Box::new(|_args| Box::pin(async { Value::Null })),
        }
    }

    #[test]
    fn to_definition_preserves_declared_param_order_not_alphabetical() {
        // Declared out of alphabetical order on purpose: if `properties`
        // were ever built on a `BTreeMap`-backed `serde_json::Map` (i.e.
        // the `preserve_order` feature were dropped), this would observe
        // "alpha" before "zebra" instead.
        let mut d = descriptor();
        d.parameters = vec![
            ToolParameter {
                name: "zebra".into(),
                param_type: ParamType::String,
                description: String::new(),
                enum_values: vec![],
                default: None,
                required: false,
                inject: false,
            },
            ToolParameter {
                name: "alpha".into(),
                param_type: ParamType::String,
                description: String::new(),
                enum_values: vec![],
                default: None,
                required: false,
                inject: false,
            },
        ];
        let def = d.to_definition();
        let props = def.parameters.get("properties").unwrap().as_object().unwrap();
        let keys: Vec<&String> = props.keys().collect();
        assert_eq!(keys, vec!["zebra", "alpha"]);
    }

    #[test]
    fn to_definition_excludes_injected_params() {
        let def = descriptor().to_definition();
        let props = def.parameters.get("properties").unwrap().as_object().unwrap();
        assert!(props.contains_key("a"));
        assert!(!props.contains_key("agent_id"));
    }

    #[test]
    fn to_definition_lists_required_params() {
        let def = descriptor().to_definition();
        let required = def.parameters.get("required").unwrap().as_array().unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "a");
    }

    #[test]
    fn to_definition_preserves_enum_values() {
        let mut d = descriptor();
        d.parameters.push(ToolParameter {
            name: "op".into(),
            param_type: ParamType::Enum,
            description: String::new(),
            enum_values: vec!["add".into(), "sub".into()],
            default: None,
            required: true,
            inject: false,
        });
        let def = d.to_definition();
        let props = def.parameters.get("properties").unwrap().as_object().unwrap();
        let op = props.get("op").unwrap();
        assert_eq!(op.get("enum").unwrap().as_array().unwrap().len(), 2);
    }
}
