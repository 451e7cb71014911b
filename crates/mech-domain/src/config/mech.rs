use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the universal fallback model class walked after an agent's own
/// model class is exhausted (spec.md §4.C fallback policy).
pub const STANDARD_CLASS: &str = "standard";

/// Configuration for the MECH driver loop (spec.md §3 `MECHState`, §4.E,
/// §6 env vars). Distinct from per-agent config (`config::agents`): this
/// holds the process-wide defaults the driver resets into `MECHState` at
/// the start of every `runMECH`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MechConfig {
    /// Allowed values per spec.md §3: {5, 10, 20, 40}.
    #[serde(default = "d_meta_frequency")]
    pub default_meta_frequency: u32,
    /// Allowed values per spec.md §3: {0,2,4,8,16,32,64,128} seconds.
    #[serde(default = "d_thought_delay")]
    pub default_thought_delay_secs: u32,
    /// Inactivity timeout per provider stream event (spec.md §4.C).
    #[serde(default = "d_inactivity_timeout")]
    pub inactivity_timeout_secs: u64,
    /// Chunk size for the interruptible thought-delay sleep (spec.md §5).
    #[serde(default = "d_delay_chunk_ms")]
    pub delay_chunk_ms: u64,
    /// Probability of a temporary "mind wander" thought nudge per tick
    /// (spec.md §4.E "prompt guide").
    #[serde(default = "d_wander_probability")]
    pub wander_probability: f64,
    /// Model class -> ordered list of model ids. The `"standard"` entry is
    /// the universal fallback list walked after an agent's own class.
    #[serde(default)]
    pub model_classes: HashMap<String, Vec<String>>,
    /// Display name of the Overseer (env `AI_NAME`).
    #[serde(default = "d_ai_name")]
    pub ai_name: String,
    /// Display name of the human operator (env `YOUR_NAME`).
    #[serde(default = "d_your_name")]
    pub your_name: String,
}

impl Default for MechConfig {
    fn default() -> Self {
        Self {
            default_meta_frequency: d_meta_frequency(),
            default_thought_delay_secs: d_thought_delay(),
            inactivity_timeout_secs: d_inactivity_timeout(),
            delay_chunk_ms: d_delay_chunk_ms(),
            wander_probability: d_wander_probability(),
            model_classes: HashMap::new(),
            ai_name: d_ai_name(),
            your_name: d_your_name(),
        }
    }
}

impl MechConfig {
    /// Read the env-var overrides spec.md §6 names, falling back to
    /// config/defaults when unset.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("AI_NAME") {
            self.ai_name = v;
        }
        if let Ok(v) = std::env::var("YOUR_NAME") {
            self.your_name = v;
        }
        self
    }

    /// The model ids for a given class, or an empty slice if undeclared.
    pub fn class_models(&self, class: &str) -> &[String] {
        self.model_classes
            .get(class)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn d_meta_frequency() -> u32 {
    5
}
fn d_thought_delay() -> u32 {
    0
}
fn d_inactivity_timeout() -> u64 {
    300
}
fn d_delay_chunk_ms() -> u64 {
    100
}
fn d_wander_probability() -> f64 {
    0.1
}
fn d_ai_name() -> String {
    "MAGI".into()
}
fn d_your_name() -> String {
    "User".into()
}
