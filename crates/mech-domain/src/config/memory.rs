use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Paths and caps for the persisted short/long-term memory files
/// (spec.md §6 "Persisted state"). This is the one piece of the
/// out-of-scope "persistence of memories to disk" collaborator that is
/// fully implemented, since §6 gives its exact format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "d_short_path")]
    pub short_term_path: PathBuf,
    #[serde(default = "d_long_path")]
    pub long_term_path: PathBuf,
    #[serde(default = "d_short_max_entries")]
    pub short_term_max_entries: usize,
    #[serde(default = "d_short_max_chars")]
    pub short_term_max_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_path: d_short_path(),
            long_term_path: d_long_path(),
            short_term_max_entries: d_short_max_entries(),
            short_term_max_chars: d_short_max_chars(),
        }
    }
}

fn d_short_path() -> PathBuf {
    PathBuf::from("/magi_output/memory/short/memories.json")
}
fn d_long_path() -> PathBuf {
    PathBuf::from("/magi_output/memory/long/memories.json")
}
fn d_short_max_entries() -> usize {
    10
}
fn d_short_max_chars() -> usize {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_paths() {
        let cfg = MemoryConfig::default();
        assert_eq!(cfg.short_term_path, PathBuf::from("/magi_output/memory/short/memories.json"));
        assert_eq!(cfg.long_term_path, PathBuf::from("/magi_output/memory/long/memories.json"));
        assert_eq!(cfg.short_term_max_entries, 10);
        assert_eq!(cfg.short_term_max_chars, 2000);
    }
}
