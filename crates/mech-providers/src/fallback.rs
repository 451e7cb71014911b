//! Model selection and fallback policy (spec.md §4.C).
//!
//! Implemented as stateless, pure functions rather than a stateful router:
//! the mutable state they read (`disabledModels`, `modelScores`, the
//! per-run attempted-model set) belongs to `MECHState`, which is owned by
//! `mech-core`'s driver, a layer above this crate. `mech-core` calls these
//! functions and folds their result back into its own state.

use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Default score assigned to a model absent an explicit entry in
/// `modelScores` (spec.md §3).
const DEFAULT_SCORE: u8 = 50;

/// Why a fallback model was chosen, for `TraceEvent::ModelFallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The failing model had a declared `rate_limit_fallback` (HTTP 429).
    RateLimit,
    /// Drawn from the agent's own model class.
    AgentClass,
    /// Drawn from the universal "standard" class after the agent's class
    /// was exhausted.
    StandardClass,
}

/// Select a model from a candidate list, weighted by `modelScores` (higher
/// score -> higher probability; unknown model defaults to
/// [`DEFAULT_SCORE`]), excluding `disabled` and already-`attempted` models.
///
/// Returns `None` if every candidate is excluded.
pub fn select_model(
    candidates: &[String],
    disabled: &HashSet<String>,
    scores: &HashMap<String, u8>,
    attempted: &HashSet<String>,
) -> Option<String> {
    let eligible: Vec<&String> = candidates
        .iter()
        .filter(|m| !disabled.contains(*m) && !attempted.contains(*m))
        .collect();

    weighted_pick(&eligible, scores)
}

fn weighted_pick(eligible: &[&String], scores: &HashMap<String, u8>) -> Option<String> {
    if eligible.is_empty() {
        return None;
    }
    if eligible.len() == 1 {
        return Some(eligible[0].clone());
    }

    let weights: Vec<u32> = eligible
        .iter()
        .map(|m| scores.get(m.as_str()).copied().unwrap_or(DEFAULT_SCORE) as u32 + 1)
        .collect();
    let total: u32 = weights.iter().sum();

    let mut pick = rand::thread_rng().gen_range(0..total);
    for (model, weight) in eligible.iter().zip(weights.iter()) {
        if pick < *weight {
            return Some((*model).clone());
        }
        pick -= weight;
    }
    eligible.last().map(|m| (*m).clone())
}

/// Decide the next model to try after the current attempt failed
/// (spec.md §4.C fallback policy). `agent_class` and `standard_class` are
/// the agent's own model-class list and the universal `"standard"`
/// fallback list respectively; both are walked skipping models already in
/// `attempted` or `disabled`.
#[allow(clippy::too_many_arguments)]
pub fn pick_fallback(
    last_error_message: &str,
    last_model: &str,
    rate_limit_fallback: &HashMap<String, String>,
    agent_class: &[String],
    standard_class: &[String],
    disabled: &HashSet<String>,
    scores: &HashMap<String, u8>,
    attempted: &HashSet<String>,
) -> Option<(String, FallbackReason)> {
    if is_rate_limited(last_error_message) {
        if let Some(candidate) = rate_limit_fallback.get(last_model) {
            if !disabled.contains(candidate) && !attempted.contains(candidate) {
                return Some((candidate.clone(), FallbackReason::RateLimit));
            }
        }
    }

    if let Some(model) = select_model(agent_class, disabled, scores, attempted) {
        return Some((model, FallbackReason::AgentClass));
    }

    if let Some(model) = select_model(standard_class, disabled, scores, attempted) {
        return Some((model, FallbackReason::StandardClass));
    }

    None
}

fn is_rate_limited(message: &str) -> bool {
    message.contains("429") || message.contains("Too Many Requests")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn select_model_single_candidate_is_deterministic() {
        let candidates = vec!["gpt-4o".to_string()];
        let picked = select_model(&candidates, &HashSet::new(), &HashMap::new(), &HashSet::new());
        assert_eq!(picked.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn select_model_excludes_disabled() {
        let candidates = vec!["a".to_string(), "b".to_string()];
        let disabled = set(&["a"]);
        let picked = select_model(&candidates, &disabled, &HashMap::new(), &HashSet::new()).unwrap();
        assert_eq!(picked, "b");
    }

    #[test]
    fn select_model_excludes_attempted() {
        let candidates = vec!["a".to_string(), "b".to_string()];
        let attempted = set(&["a"]);
        let picked = select_model(&candidates, &HashSet::new(), &HashMap::new(), &attempted).unwrap();
        assert_eq!(picked, "b");
    }

    #[test]
    fn select_model_empty_candidates_is_none() {
        assert!(select_model(&[], &HashSet::new(), &HashMap::new(), &HashSet::new()).is_none());
    }

    #[test]
    fn select_model_all_excluded_is_none() {
        let candidates = vec!["a".to_string()];
        let disabled = set(&["a"]);
        assert!(select_model(&candidates, &disabled, &HashMap::new(), &HashSet::new()).is_none());
    }

    #[test]
    fn pick_fallback_429_uses_rate_limit_fallback() {
        let mut rlf = HashMap::new();
        rlf.insert("free-A".to_string(), "paid-A".to_string());
        let (model, reason) = pick_fallback(
            "HTTP 429 Too Many Requests",
            "free-A",
            &rlf,
            &["standard-1".to_string()],
            &[],
            &HashSet::new(),
            &HashMap::new(),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(model, "paid-A");
        assert_eq!(reason, FallbackReason::RateLimit);
    }

    #[test]
    fn pick_fallback_429_without_declared_fallback_walks_classes() {
        let (model, reason) = pick_fallback(
            "429",
            "free-A",
            &HashMap::new(),
            &["agent-1".to_string()],
            &["standard-1".to_string()],
            &HashSet::new(),
            &HashMap::new(),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(model, "agent-1");
        assert_eq!(reason, FallbackReason::AgentClass);
    }

    #[test]
    fn pick_fallback_non_rate_limit_error_skips_rate_limit_map() {
        let mut rlf = HashMap::new();
        rlf.insert("free-A".to_string(), "paid-A".to_string());
        let (model, reason) = pick_fallback(
            "connection reset",
            "free-A",
            &rlf,
            &["agent-1".to_string()],
            &[],
            &HashSet::new(),
            &HashMap::new(),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(model, "agent-1");
        assert_eq!(reason, FallbackReason::AgentClass);
    }

    #[test]
    fn pick_fallback_falls_through_to_standard_class() {
        let attempted = set(&["agent-1"]);
        let (model, reason) = pick_fallback(
            "timeout",
            "agent-1",
            &HashMap::new(),
            &["agent-1".to_string()],
            &["standard-1".to_string()],
            &HashSet::new(),
            &HashMap::new(),
            &attempted,
        )
        .unwrap();
        assert_eq!(model, "standard-1");
        assert_eq!(reason, FallbackReason::StandardClass);
    }

    #[test]
    fn pick_fallback_exhausted_is_none() {
        let attempted = set(&["agent-1", "standard-1"]);
        let result = pick_fallback(
            "timeout",
            "agent-1",
            &HashMap::new(),
            &["agent-1".to_string()],
            &["standard-1".to_string()],
            &HashSet::new(),
            &HashMap::new(),
            &attempted,
        );
        assert!(result.is_none());
    }

    #[test]
    fn pick_fallback_never_revisits_disabled_model() {
        let disabled = set(&["bad-model"]);
        let result = pick_fallback(
            "timeout",
            "x",
            &HashMap::new(),
            &["bad-model".to_string()],
            &[],
            &disabled,
            &HashMap::new(),
            &HashSet::new(),
        );
        assert!(result.is_none());
    }
}
