//! Interruptible thought-delay sleep (spec.md §3 `delayInterrupted`, §5,
//! IS1). A single-run concept, unlike the teacher's per-session
//! `CancelMap` with cascading groups: MECH has exactly one delay timer per
//! `runMECH` call, set by whoever observes a new user message or a
//! priority system event arriving mid-sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mech_domain::trace::TraceEvent;

#[derive(Clone)]
pub struct CancelToken {
    interrupted: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self { interrupted: Arc::new(AtomicBool::new(false)) }
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.interrupted.store(false, Ordering::Release);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `total`, checking `cancel` every `chunk` (spec.md §5: chunked
/// into 100 ms awaits). Returns early, without completing the remaining
/// duration, as soon as `cancel.is_interrupted()` is observed (IS1: within
/// `chunk` of the interrupt being set).
pub async fn sleep_interruptible(total: Duration, chunk: Duration, cancel: &CancelToken) {
    let start = std::time::Instant::now();
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if cancel.is_interrupted() {
            TraceEvent::ThoughtDelayInterrupted { elapsed_ms: start.elapsed().as_millis() as u64 }.emit();
            return;
        }
        let step = remaining.min(chunk);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
        if cancel.is_interrupted() {
            TraceEvent::ThoughtDelayInterrupted { elapsed_ms: start.elapsed().as_millis() as u64 }.emit();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_lifecycle() {
        let token = CancelToken::new();
        assert!(!token.is_interrupted());
        token.interrupt();
        assert!(token.is_interrupted());
    }

    #[test]
    fn cancel_token_reset() {
        let token = CancelToken::new();
        token.interrupt();
        token.reset();
        assert!(!token.is_interrupted());
    }

    #[test]
    fn cancel_token_clone_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.interrupt();
        assert!(clone.is_interrupted());
    }

    #[tokio::test]
    async fn sleep_interruptible_runs_full_duration_uninterrupted() {
        let cancel = CancelToken::new();
        let start = std::time::Instant::now();
        sleep_interruptible(Duration::from_millis(30), Duration::from_millis(10), &cancel).await;
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn sleep_interruptible_returns_promptly_when_interrupted() {
        let cancel = CancelToken::new();
        let cancel2 = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            cancel2.interrupt();
        });
        let start = std::time::Instant::now();
        sleep_interruptible(Duration::from_secs(5), Duration::from_millis(100), &cancel).await;
        // IS1: returns within ~100ms + epsilon of the interrupt being set.
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn sleep_interruptible_zero_duration_returns_immediately() {
        let cancel = CancelToken::new();
        let start = std::time::Instant::now();
        sleep_interruptible(Duration::ZERO, Duration::from_millis(100), &cancel).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
