//! Concrete tool descriptors for the shell/process/file tools (spec.md
//! §1 lists "shell, browser, file I/O" among the tools subordinate agents
//! invoke; individual tool semantics are non-goals, but the shell and file
//! tools kept from the teacher need a [`ToolDescriptor`] wrapper to be
//! reachable through the dispatcher at all). Each descriptor here is a
//! thin reflection of the request struct already defined in `exec`,
//! `process`, or `file_ops` — the business logic stays there.

use std::path::PathBuf;
use std::sync::Arc;

use mech_domain::toolspec::{ParamType, ToolDescriptor};
use serde_json::Value;

use crate::argutil::{arg_bool, arg_opt_str, arg_opt_u64, arg_opt_usize, arg_str, param};
use crate::exec::{self, ExecRequest};
use crate::file_ops::{
    self, FileAppendRequest, FileDeleteRequest, FileListRequest, FileMoveRequest, FileReadRequest, FileWriteRequest,
};
use crate::manager::ProcessManager;
use crate::process::{self, ProcessAction, ProcessRequest};

fn ok_or_error(result: Result<Value, String>) -> Value {
    match result {
        Ok(v) => v,
        Err(e) => serde_json::json!({ "error": e }),
    }
}

/// Run a shell command in the workspace, foreground or backgrounded
/// (grounded on `mech-tools::exec::exec`).
pub fn shell_descriptor(manager: Arc<ProcessManager>) -> ToolDescriptor {
    ToolDescriptor {
        name: "shell".into(),
        description: "Run a shell command. Long-running commands are auto-backgrounded and return a session_id for `process`.".into(),
        parameters: vec![
            param("command", ParamType::String, "the command to run via `sh -c`", true),
            param("background", ParamType::Boolean, "start backgrounded immediately", false),
            param("yield_ms", ParamType::Number, "milliseconds to wait before auto-backgrounding", false),
            param("timeout_sec", ParamType::Number, "hard kill timeout in seconds", false),
            param("workdir", ParamType::String, "working directory", false),
        ],
        return_description: "status, exit_code, output, and/or session_id".into(),
        invoke: Box::new(move |args| {
            let manager = manager.clone();
            let req = ExecRequest {
                command: arg_str(&args, 0),
                background: arg_bool(&args, 1, false),
                yield_ms: arg_opt_u64(&args, 2),
                timeout_sec: arg_opt_u64(&args, 3),
                workdir: arg_opt_str(&args, 4),
                env: None,
            };
            Box::pin(async move {
                let resp = exec::exec(&manager, req).await;
                serde_json::to_value(resp).unwrap_or(Value::Null)
            })
        }),
    }
}

/// Inspect or control a background process session started by `shell`
/// (grounded on `mech-tools::process::handle_process`).
pub fn process_descriptor(manager: Arc<ProcessManager>) -> ToolDescriptor {
    ToolDescriptor {
        name: "process".into(),
        description: "Manage a background shell session: list, poll, log, write, kill, clear, or remove.".into(),
        parameters: vec![
            param("action", ParamType::Enum, "list|poll|log|write|kill|clear|remove", true),
            param("session_id", ParamType::String, "target session (all actions but list/clear)", false),
            param("offset", ParamType::Number, "byte offset for poll", false),
            param("limit", ParamType::Number, "byte limit for log", false),
            param("tail_lines", ParamType::Number, "tail line count for log", false),
            param("data", ParamType::String, "stdin data for write", false),
            param("eof", ParamType::Boolean, "close stdin after writing", false),
        ],
        return_description: "success flag plus action-specific data".into(),
        invoke: Box::new(move |args| {
            let manager = manager.clone();
            let action = match arg_str(&args, 0).to_ascii_lowercase().as_str() {
                "list" => ProcessAction::List,
                "poll" => ProcessAction::Poll,
                "log" => ProcessAction::Log,
                "write" => ProcessAction::Write,
                "kill" => ProcessAction::Kill,
                "clear" => ProcessAction::Clear,
                "remove" => ProcessAction::Remove,
                other => {
                    let msg = format!("unknown process action \"{other}\"");
                    return Box::pin(async move { serde_json::json!({ "error": msg }) });
                }
            };
            let req = ProcessRequest {
                action,
                session_id: arg_opt_str(&args, 1),
                offset: arg_opt_usize(&args, 2),
                limit: arg_opt_usize(&args, 3),
                tail_lines: arg_opt_usize(&args, 4),
                data: arg_opt_str(&args, 5),
                eof: arg_bool(&args, 6, false),
            };
            Box::pin(async move {
                let resp = process::handle_process(&manager, req).await;
                serde_json::to_value(resp).unwrap_or(Value::Null)
            })
        }),
    }
}

/// Read a text file, optionally windowed by line offset/limit (grounded
/// on `mech-tools::file_ops::file_read`).
pub fn read_file_descriptor(workspace_root: PathBuf) -> ToolDescriptor {
    ToolDescriptor {
        name: "read_file".into(),
        description: "Read a text file relative to the workspace root.".into(),
        parameters: vec![
            param("path", ParamType::String, "path relative to the workspace root", true),
            param("offset", ParamType::Number, "0-indexed starting line", false),
            param("limit", ParamType::Number, "maximum number of lines", false),
        ],
        return_description: "file content or an error".into(),
        invoke: Box::new(move |args| {
            let workspace_root = workspace_root.clone();
            let req = FileReadRequest { path: arg_str(&args, 0), offset: arg_opt_usize(&args, 1), limit: arg_opt_usize(&args, 2) };
            Box::pin(async move { ok_or_error(file_ops::file_read(&workspace_root, req).await) })
        }),
    }
}

/// Overwrite (or create) a text file (grounded on `file_ops::file_write`).
pub fn write_file_descriptor(workspace_root: PathBuf) -> ToolDescriptor {
    ToolDescriptor {
        name: "write_file".into(),
        description: "Overwrite (or create) a text file relative to the workspace root.".into(),
        parameters: vec![
            param("path", ParamType::String, "path relative to the workspace root", true),
            param("content", ParamType::String, "the full file content", true),
        ],
        return_description: "bytes written or an error".into(),
        invoke: Box::new(move |args| {
            let workspace_root = workspace_root.clone();
            let req = FileWriteRequest { path: arg_str(&args, 0), content: arg_str(&args, 1) };
            Box::pin(async move { ok_or_error(file_ops::file_write(&workspace_root, req).await) })
        }),
    }
}

/// Append to a text file, creating it if absent (grounded on
/// `file_ops::file_append`).
pub fn append_file_descriptor(workspace_root: PathBuf) -> ToolDescriptor {
    ToolDescriptor {
        name: "append_file".into(),
        description: "Append text to a file relative to the workspace root, creating it if absent.".into(),
        parameters: vec![
            param("path", ParamType::String, "path relative to the workspace root", true),
            param("content", ParamType::String, "text to append", true),
        ],
        return_description: "bytes written or an error".into(),
        invoke: Box::new(move |args| {
            let workspace_root = workspace_root.clone();
            let req = FileAppendRequest { path: arg_str(&args, 0), content: arg_str(&args, 1) };
            Box::pin(async move { ok_or_error(file_ops::file_append(&workspace_root, req).await) })
        }),
    }
}

/// Move/rename a file within the workspace (grounded on
/// `file_ops::file_move`).
pub fn move_file_descriptor(workspace_root: PathBuf) -> ToolDescriptor {
    ToolDescriptor {
        name: "move_file".into(),
        description: "Move or rename a file within the workspace root.".into(),
        parameters: vec![
            param("source", ParamType::String, "current path relative to the workspace root", true),
            param("destination", ParamType::String, "new path relative to the workspace root", true),
        ],
        return_description: "acknowledgement or an error".into(),
        invoke: Box::new(move |args| {
            let workspace_root = workspace_root.clone();
            let req = FileMoveRequest { source: arg_str(&args, 0), destination: arg_str(&args, 1) };
            Box::pin(async move { ok_or_error(file_ops::file_move(&workspace_root, req).await) })
        }),
    }
}

/// Delete a file within the workspace (grounded on
/// `file_ops::file_delete`).
pub fn delete_file_descriptor(workspace_root: PathBuf) -> ToolDescriptor {
    ToolDescriptor {
        name: "delete_file".into(),
        description: "Delete a file relative to the workspace root.".into(),
        parameters: vec![param("path", ParamType::String, "path relative to the workspace root", true)],
        return_description: "acknowledgement or an error".into(),
        invoke: Box::new(move |args| {
            let workspace_root = workspace_root.clone();
            let req = FileDeleteRequest { path: arg_str(&args, 0) };
            Box::pin(async move { ok_or_error(file_ops::file_delete(&workspace_root, req).await) })
        }),
    }
}

/// List a directory's entries (grounded on `file_ops::file_list`).
pub fn list_files_descriptor(workspace_root: PathBuf) -> ToolDescriptor {
    ToolDescriptor {
        name: "list_files".into(),
        description: "List the entries of a directory relative to the workspace root.".into(),
        parameters: vec![param("path", ParamType::String, "directory, defaults to the workspace root", false)],
        return_description: "directory entries or an error".into(),
        invoke: Box::new(move |args| {
            let workspace_root = workspace_root.clone();
            let path = arg_opt_str(&args, 0).unwrap_or_else(|| ".".to_string());
            let req = FileListRequest { path };
            Box::pin(async move { ok_or_error(file_ops::file_list(&workspace_root, req).await) })
        }),
    }
}

/// Register every built-in shell/file descriptor into `registry`, plus the
/// `calculator` demo tool (spec.md §8's recurring example).
pub fn register_default_tools(registry: &mut crate::registry::ToolRegistry, manager: Arc<ProcessManager>, workspace_root: PathBuf) {
    registry.register(shell_descriptor(manager.clone()));
    registry.register(process_descriptor(manager));
    registry.register(read_file_descriptor(workspace_root.clone()));
    registry.register(write_file_descriptor(workspace_root.clone()));
    registry.register(append_file_descriptor(workspace_root.clone()));
    registry.register(move_file_descriptor(workspace_root.clone()));
    registry.register(delete_file_descriptor(workspace_root.clone()));
    registry.register(list_files_descriptor(workspace_root));
    registry.register(crate::builtin::calculator_descriptor());
}
