//! Small shared helpers for building [`ToolDescriptor`]s and reading their
//! positional argument lists. Split out of `builtin.rs` once `descriptors.rs`
//! needed the same helpers for the shell/file tools.

use mech_domain::toolspec::{ParamType, ToolParameter};
use serde_json::Value;

pub(crate) fn param(name: &str, param_type: ParamType, description: &str, required: bool) -> ToolParameter {
    ToolParameter {
        name: name.into(),
        param_type,
        description: description.into(),
        enum_values: vec![],
        default: None,
        required,
        inject: false,
    }
}

pub(crate) fn param_default(name: &str, param_type: ParamType, description: &str, default: Value) -> ToolParameter {
    ToolParameter {
        name: name.into(),
        param_type,
        description: description.into(),
        enum_values: vec![],
        default: Some(default),
        required: false,
        inject: false,
    }
}

pub(crate) fn arg_str(args: &[Value], idx: usize) -> String {
    args.get(idx).and_then(|v| v.as_str()).map(str::to_string).unwrap_or_default()
}

pub(crate) fn arg_opt_str(args: &[Value], idx: usize) -> Option<String> {
    args.get(idx).and_then(|v| v.as_str()).map(str::to_string)
}

pub(crate) fn arg_f64(args: &[Value], idx: usize) -> f64 {
    args.get(idx).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

pub(crate) fn arg_opt_u64(args: &[Value], idx: usize) -> Option<u64> {
    args.get(idx).and_then(|v| v.as_u64())
}

pub(crate) fn arg_opt_usize(args: &[Value], idx: usize) -> Option<usize> {
    args.get(idx).and_then(|v| v.as_u64()).map(|n| n as usize)
}

pub(crate) fn arg_bool(args: &[Value], idx: usize, default: bool) -> bool {
    args.get(idx).and_then(|v| v.as_bool()).unwrap_or(default)
}
