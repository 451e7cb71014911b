use serde::{Deserialize, Serialize};

/// Tuning for the shell/process tools (`mech-tools::exec`/`manager`):
/// background-promotion threshold, hard timeout, output-buffer cap, and
/// stale-session cleanup interval. Not named by `spec.md` (tool semantics
/// are explicitly out of scope there), but required for the concrete
/// `shell` tool kept from the teacher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Milliseconds after which a still-running foreground command is
    /// auto-promoted to a background session instead of blocking the caller.
    #[serde(default = "d_background_ms")]
    pub background_ms: u64,
    /// Hard kill timeout for a command, in seconds.
    #[serde(default = "d_timeout_sec")]
    pub timeout_sec: u64,
    /// Maximum buffered stdout+stderr characters kept per session.
    #[serde(default = "d_max_output_chars")]
    pub max_output_chars: usize,
    /// Milliseconds a finished session is retained before `cleanup_stale`
    /// removes it.
    #[serde(default = "d_cleanup_ms")]
    pub cleanup_ms: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            background_ms: d_background_ms(),
            timeout_sec: d_timeout_sec(),
            max_output_chars: d_max_output_chars(),
            cleanup_ms: d_cleanup_ms(),
        }
    }
}

fn d_background_ms() -> u64 {
    3_000
}
fn d_timeout_sec() -> u64 {
    120
}
fn d_max_output_chars() -> usize {
    100_000
}
fn d_cleanup_ms() -> u64 {
    600_000
}
