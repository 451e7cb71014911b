//! The two distinguished control-flow escapes (spec.md §4.B/§9):
//! `task_complete` and `task_fatal_error` bypass dispatch's ordinary
//! per-call error wrapping and terminate the MECH run.
//!
//! Rather than threading an exception back through `dispatch`, the tool
//! descriptors built in [`crate::builtin`] capture a `SignalSink`
//! implementation at registration time and call it directly — per the
//! design note in spec.md §9, this keeps `mechComplete`/`mechOutcome` in a
//! per-run context record (owned by `mech-core`'s driver) instead of
//! global mutable state.

use serde_json::Value;

pub trait SignalSink: Send + Sync {
    /// The run completed successfully with `result`.
    fn complete(&self, result: Value);
    /// The run ended in a fatal, unrecoverable error.
    fn fatal(&self, error: String);
}
