//! Tool registry (spec.md §4.B) — holds callable [`ToolDescriptor`]s keyed
//! by name, surfaced to a provider as an ordered list of [`ToolDefinition`]s
//! per an agent's declared `tools` list.

use mech_domain::toolspec::{ToolDefinition, ToolDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolDescriptor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool descriptor, replacing any prior entry with the same
    /// name.
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        self.tools.insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    /// Register an already-`Arc`-wrapped descriptor, replacing any prior
    /// entry with the same name. Used by the MECH driver (spec.md §4.E) to
    /// build a per-run registry that shares the process-wide tool set but
    /// adds descriptors closed over this run's [`crate::SignalSink`].
    pub fn register_arc(&mut self, descriptor: Arc<ToolDescriptor>) {
        self.tools.insert(descriptor.name.clone(), descriptor);
    }

    /// Every registered descriptor, for copying into a fresh registry.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<ToolDescriptor>> {
        self.tools.values()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Build the provider-facing tool-schema list for an agent's declared
    /// tool names, in declared order. Names with no registered descriptor
    /// are silently skipped (a misconfigured agent should not crash a run).
    pub fn definitions_for(&self, names: &[String]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|d| d.to_definition())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mech_domain::toolspec::ParamType;
    use serde_json::Value;

    fn dummy(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: "test".into(),
            parameters: vec![],
            return_description: String::new(),
            invoke: Box::new(|_| Box::pin(async { Value::Null })),
        }
    }

    #[test]
    fn register_and_get_roundtrips() {
        let mut reg = ToolRegistry::new();
        reg.register(dummy("calculator"));
        assert!(reg.contains("calculator"));
        assert!(reg.get("calculator").is_some());
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn definitions_for_skips_unregistered_names() {
        let mut reg = ToolRegistry::new();
        reg.register(dummy("a"));
        let defs = reg.definitions_for(&["a".into(), "ghost".into()]);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "a");
    }

    #[test]
    fn definitions_for_preserves_declared_order() {
        let mut reg = ToolRegistry::new();
        reg.register(dummy("a"));
        reg.register(dummy("b"));
        let defs = reg.definitions_for(&["b".into(), "a".into()]);
        assert_eq!(defs[0].name, "b");
        assert_eq!(defs[1].name, "a");
    }

    #[test]
    fn register_overwrites_same_name() {
        let mut reg = ToolRegistry::new();
        reg.register(dummy("a"));
        reg.register(dummy("a"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn param_type_variants_exist() {
        // smoke test: ensure the enum is reachable from this module's imports
        let _ = ParamType::String;
    }
}
