//! Persisted memory (spec.md §6 "Persisted state"): the one piece of the
//! out-of-scope "persistence of memories to disk" collaborator with an
//! exact format given by the spec, so it is implemented in full here
//! rather than left as an interface contract. Deliberately not the
//! teacher's `serialmemory-client` REST/MCP-backed RAG memory crate,
//! which remains out of scope (see DESIGN.md).

use std::path::Path;

use chrono::Utc;
use mech_domain::config::MemoryConfig;
use mech_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// A single short-term memory entry: a plain string capped at
/// `short_term_max_chars`, with the oldest entries evicted once
/// `short_term_max_entries` is exceeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermMemory {
    pub content: String,
}

/// A single long-term memory entry with a monotonically increasing id and
/// a millisecond timestamp (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermMemory {
    pub id: u64,
    pub content: String,
    pub created_at_ms: i64,
}

/// Reads and writes the two JSON memory files spec.md §6 describes.
/// Directories are created on first use.
pub struct MemoryStore {
    config: MemoryConfig,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    async fn read_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = fs::read_to_string(path).await?;
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&raw).map_err(Error::from)
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(path, raw).await.map_err(Error::from)
    }

    pub async fn load_short_term(&self) -> Result<Vec<ShortTermMemory>> {
        Self::read_json(&self.config.short_term_path).await
    }

    /// Append a short-term memory, truncating to `short_term_max_chars`
    /// and evicting the oldest entry once `short_term_max_entries` is
    /// exceeded (spec.md §6: max 10 entries, each ≤2000 chars).
    pub async fn add_short_term(&self, content: impl Into<String>) -> Result<Vec<ShortTermMemory>> {
        let mut entries = self.load_short_term().await?;
        let content: String = content.into();
        let truncated: String = content.chars().take(self.config.short_term_max_chars).collect();
        entries.push(ShortTermMemory { content: truncated });
        while entries.len() > self.config.short_term_max_entries {
            entries.remove(0);
        }
        Self::write_json(&self.config.short_term_path, &entries).await?;
        Ok(entries)
    }

    pub async fn load_long_term(&self) -> Result<Vec<LongTermMemory>> {
        Self::read_json(&self.config.long_term_path).await
    }

    /// Append a long-term memory with the next monotonic id and the
    /// current millisecond timestamp.
    pub async fn add_long_term(&self, content: impl Into<String>) -> Result<LongTermMemory> {
        let mut entries = self.load_long_term().await?;
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let entry = LongTermMemory { id: next_id, content: content.into(), created_at_ms: Utc::now().timestamp_millis() };
        entries.push(entry.clone());
        Self::write_json(&self.config.long_term_path, &entries).await?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> MemoryConfig {
        MemoryConfig {
            short_term_path: dir.join("short/memories.json"),
            long_term_path: dir.join("long/memories.json"),
            short_term_max_entries: 3,
            short_term_max_chars: 10,
        }
    }

    #[tokio::test]
    async fn load_short_term_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(config_in(dir.path()));
        assert!(store.load_short_term().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_short_term_creates_directory_and_persists() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(config_in(dir.path()));
        let entries = store.add_short_term("hello").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(dir.path().join("short/memories.json").exists());
    }

    #[tokio::test]
    async fn add_short_term_truncates_long_content() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(config_in(dir.path()));
        let entries = store.add_short_term("this is longer than ten chars").await.unwrap();
        assert_eq!(entries[0].content.len(), 10);
    }

    #[tokio::test]
    async fn add_short_term_evicts_oldest_past_cap() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(config_in(dir.path()));
        for i in 0..5 {
            store.add_short_term(format!("m{i}")).await.unwrap();
        }
        let entries = store.load_short_term().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].content, "m2");
        assert_eq!(entries.last().unwrap().content, "m4");
    }

    #[tokio::test]
    async fn add_long_term_assigns_monotonic_ids() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(config_in(dir.path()));
        let a = store.add_long_term("first").await.unwrap();
        let b = store.add_long_term("second").await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(b.created_at_ms >= a.created_at_ms);
    }
}
