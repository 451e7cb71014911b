//! Wires a loaded [`Config`] into a runnable [`AppState`] (grounded on the
//! teacher's `workspace::bootstrap::BootstrapTracker` idiom, trimmed to
//! what this crate still needs: provider registry, tool registry, process
//! manager, memory store).

use std::path::PathBuf;
use std::sync::Arc;

use mech_domain::config::Config;
use mech_providers::ProviderRegistry;
use mech_tools::{descriptors, ProcessManager, ToolRegistry};

use crate::memory::MemoryStore;
use crate::state::AppState;

/// The workspace root shell/file tools are confined to (spec.md names
/// "file I/O" a subordinate-agent tool but leaves its sandbox root
/// unspecified; `MECH_WORKSPACE` lets an operator pin it, defaulting to
/// the current working directory).
pub fn workspace_root() -> PathBuf {
    std::env::var("MECH_WORKSPACE").map(PathBuf::from).unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Build the process-wide [`AppState`] from a loaded config. Provider
/// initialization failures are logged and skipped (see
/// `ProviderRegistry::from_config`); this never aborts startup unless the
/// config's `llm.require_provider` flag is set and every provider fails.
pub fn bootstrap(config: Arc<Config>) -> anyhow::Result<AppState> {
    let providers = ProviderRegistry::from_config(&config.llm).map_err(|e| anyhow::anyhow!("provider registry: {e}"))?;
    for init_error in providers.init_errors() {
        tracing::warn!(provider_id = %init_error.provider_id, error = %init_error.error, "provider failed to initialize");
    }

    let process_manager = Arc::new(ProcessManager::new(config.exec));

    let mut tools = ToolRegistry::new();
    descriptors::register_default_tools(&mut tools, process_manager.clone(), workspace_root());

    let memory = Arc::new(MemoryStore::new(config.memory.clone()));

    Ok(AppState { config, providers: Arc::new(providers), tools: Arc::new(tools), process_manager, memory })
}
