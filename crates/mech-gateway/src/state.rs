//! Process-wide application state (grounded on the teacher's
//! `state::AppState` grouped-by-concern shape): the provider registry,
//! base tool registry, process manager, and memory store a `run`
//! invocation shares across its MECH loop.

use std::sync::Arc;

use mech_domain::config::Config;
use mech_providers::ProviderRegistry;
use mech_tools::{ProcessManager, ToolRegistry};

use crate::memory::MemoryStore;

pub struct AppState {
    pub config: Arc<Config>,
    pub providers: Arc<ProviderRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub process_manager: Arc<ProcessManager>,
    pub memory: Arc<MemoryStore>,
}
