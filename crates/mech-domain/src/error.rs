/// Shared error type used across all MECH crates.
///
/// The two distinguished task signals (`task_complete`/`task_fatal_error`)
/// do not round-trip through this type: they are delivered directly to a
/// per-run `SignalSink` rather than unwound as an error (see
/// `mech-tools::signals` and `mech-core::state::MechRunContext`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
