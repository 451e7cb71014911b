//! The conversation history model (spec.md §3/§4.A): an append-only log
//! with per-agent pending sub-threads and the repair pass that enforces
//! tool-call/result pairing (IH1/IH2).

use std::collections::{HashMap, HashSet};

use mech_domain::history::{HistoryItem, HistoryStatus, MessageContent, Role};
use mech_domain::trace::TraceEvent;
use parking_lot::Mutex;

/// Repair a history so that every `FunctionCall` is immediately followed by
/// its matching `FunctionCallOutput` (IH1), with no orphaned outputs
/// (IH2). Total: always terminates, never panics, and is a fixed point —
/// `ensure_tool_result_sequence(ensure_tool_result_sequence(h)) ==
/// ensure_tool_result_sequence(h)`.
pub fn ensure_tool_result_sequence(mut items: Vec<HistoryItem>) -> Vec<HistoryItem> {
    // Phase 1: orphan outputs become plain user messages.
    let call_ids: HashSet<String> = items
        .iter()
        .filter_map(|it| match it {
            HistoryItem::FunctionCall { call_id, .. } => Some(call_id.clone()),
            _ => None,
        })
        .collect();

    let mut orphans_converted = 0usize;
    for item in items.iter_mut() {
        if let HistoryItem::FunctionCallOutput { call_id, name, output, .. } = item {
            if !call_ids.contains(call_id) {
                orphans_converted += 1;
                *item = HistoryItem::Message {
                    role: Role::User,
                    content: MessageContent::Text(format!("Tool result ({name}): {output}")),
                    status: None,
                };
            }
        }
    }

    // Phase 2: pair completion, iterated to a fixed point.
    let mut pairs_synthesized = 0usize;
    loop {
        let mut modified = false;
        let mut i = 0;
        while i < items.len() {
            let needs_fix = match (&items[i], items.get(i + 1)) {
                (HistoryItem::FunctionCall { call_id, .. }, Some(HistoryItem::FunctionCallOutput { call_id: out_id, .. })) => {
                    call_id != out_id
                }
                (HistoryItem::FunctionCall { .. }, _) => true,
                _ => false,
            };

            if needs_fix {
                let (call_id, name) = match &items[i] {
                    HistoryItem::FunctionCall { call_id, name, .. } => (call_id.clone(), name.clone()),
                    _ => unreachable!(),
                };
                let found = items.iter().enumerate().skip(i + 1).find_map(|(j, it)| match it {
                    HistoryItem::FunctionCallOutput { call_id: cid, .. } if *cid == call_id => Some(j),
                    _ => None,
                });
                match found {
                    Some(j) => {
                        let out = items.remove(j);
                        items.insert(i + 1, out);
                    }
                    None => {
                        pairs_synthesized += 1;
                        let synth = HistoryItem::FunctionCallOutput {
                            call_id,
                            name,
                            output: serde_json::json!({"error": "Tool call did not complete or output was missing."}).to_string(),
                            status: Some(HistoryStatus::Incomplete),
                        };
                        items.insert(i + 1, synth);
                    }
                }
                modified = true;
                break;
            }
            i += 1;
        }
        if !modified {
            break;
        }
    }

    if orphans_converted > 0 || pairs_synthesized > 0 {
        TraceEvent::HistoryRepair { orphans_converted, pairs_synthesized }.emit();
    }

    items
}

/// Append-only conversation log (spec.md §4.A). Pending per-agent
/// sub-threads are buffered separately and merged into the main log only
/// at `drain_threads`, which the MECH driver calls once at the top of
/// every loop iteration — guaranteeing an agent's sub-conversation lands
/// atomically between two user-visible appends.
pub struct HistoryStore {
    main: Mutex<Vec<HistoryItem>>,
    // Ordered by first-arrival agent id so `drain_threads` merges threads
    // in arrival order, not hash order.
    pending: Mutex<Vec<(String, Vec<HistoryItem>)>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self { main: Mutex::new(Vec::new()), pending: Mutex::new(Vec::new()) }
    }

    pub fn append(&self, item: HistoryItem) {
        self.main.lock().push(item);
    }

    pub fn append_thread(&self, agent_id: &str, items: Vec<HistoryItem>) {
        let mut pending = self.pending.lock();
        if let Some((_, buf)) = pending.iter_mut().find(|(id, _)| id == agent_id) {
            buf.extend(items);
        } else {
            pending.push((agent_id.to_string(), items));
        }
    }

    /// Move every pending thread into the main log in arrival order,
    /// leaving the pending map empty. Returns the number of items moved.
    pub fn drain_threads(&self) -> usize {
        let mut pending = self.pending.lock();
        let drained: Vec<(String, Vec<HistoryItem>)> = pending.drain(..).collect();
        drop(pending);
        let mut main = self.main.lock();
        let mut count = 0;
        for (_, items) in drained {
            count += items.len();
            main.extend(items);
        }
        count
    }

    /// A compact rendering of the most recent `window` items, for prompting
    /// (spec.md §4.A `describe`).
    pub fn describe(&self, window: usize) -> String {
        let main = self.main.lock();
        let start = main.len().saturating_sub(window);
        main[start..].iter().map(describe_item).collect::<Vec<_>>().join("\n")
    }

    /// Run the repair pass over the main log in place.
    pub fn repair(&self) {
        let mut main = self.main.lock();
        let taken = std::mem::take(&mut *main);
        *main = ensure_tool_result_sequence(taken);
    }

    pub fn snapshot(&self) -> Vec<HistoryItem> {
        self.main.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.main.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.lock().is_empty()
    }
}

fn describe_item(item: &HistoryItem) -> String {
    match item {
        HistoryItem::Message { role, content, .. } => format!("[{role:?}] {}", content.extract_all_text()),
        HistoryItem::Thinking { content, .. } => format!("[thinking] {content}"),
        HistoryItem::FunctionCall { name, arguments, .. } => format!("[call] {name}({arguments})"),
        HistoryItem::FunctionCallOutput { name, output, .. } => format!("[result] {name} -> {output}"),
    }
}

/// Snapshot of pending-thread state, used only by tests that need to
/// assert on arrival order without reaching into private fields.
#[cfg(test)]
fn pending_agent_ids(store: &HistoryStore) -> Vec<String> {
    store.pending.lock().iter().map(|(id, _)| id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> HistoryItem {
        HistoryItem::user(text)
    }

    #[test]
    fn identity_on_well_formed_history() {
        let h = vec![
            msg("hi"),
            HistoryItem::function_call("c1", "calc", "{}"),
            HistoryItem::function_call_output("c1", "calc", "4"),
        ];
        let repaired = ensure_tool_result_sequence(h.clone());
        assert_eq!(serde_json::to_string(&repaired).unwrap(), serde_json::to_string(&h).unwrap());
    }

    #[test]
    fn idempotent_on_already_repaired_history() {
        let h = vec![HistoryItem::function_call("c1", "calc", "{}"), HistoryItem::function_call_output("c1", "calc", "4")];
        let once = ensure_tool_result_sequence(h);
        let twice = ensure_tool_result_sequence(once.clone());
        assert_eq!(serde_json::to_string(&once).unwrap(), serde_json::to_string(&twice).unwrap());
    }

    #[test]
    fn orphan_output_becomes_user_message() {
        let h = vec![msg("hi"), HistoryItem::function_call_output("z", "t", "x")];
        let repaired = ensure_tool_result_sequence(h);
        assert_eq!(repaired.len(), 2);
        match &repaired[1] {
            HistoryItem::Message { role, content, .. } => {
                assert_eq!(*role, Role::User);
                assert_eq!(content.extract_all_text(), "Tool result (t): x");
            }
            other => panic!("expected orphan to become a message, got {other:?}"),
        }
    }

    #[test]
    fn missing_output_is_synthesized_with_incomplete_status() {
        let h = vec![HistoryItem::function_call("c1", "calc", "{}")];
        let repaired = ensure_tool_result_sequence(h);
        assert_eq!(repaired.len(), 2);
        match &repaired[1] {
            HistoryItem::FunctionCallOutput { call_id, status, output, .. } => {
                assert_eq!(call_id, "c1");
                assert_eq!(*status, Some(HistoryStatus::Incomplete));
                assert!(output.contains("did not complete"));
            }
            other => panic!("expected synthesized output, got {other:?}"),
        }
    }

    #[test]
    fn out_of_place_output_is_spliced_into_position() {
        let h = vec![
            HistoryItem::function_call("c1", "calc", "{}"),
            msg("interleaved noise"),
            HistoryItem::function_call_output("c1", "calc", "4"),
        ];
        let repaired = ensure_tool_result_sequence(h);
        assert_eq!(repaired[0].call_id(), Some("c1"));
        assert_eq!(repaired[1].call_id(), Some("c1"));
        match &repaired[1] {
            HistoryItem::FunctionCallOutput { status, .. } => assert_eq!(*status, None),
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn multiple_calls_each_get_paired() {
        let h = vec![
            HistoryItem::function_call("c1", "a", "{}"),
            HistoryItem::function_call("c2", "b", "{}"),
            HistoryItem::function_call_output("c2", "b", "2"),
            HistoryItem::function_call_output("c1", "a", "1"),
        ];
        let repaired = ensure_tool_result_sequence(h);
        assert_eq!(repaired[0].call_id(), Some("c1"));
        assert_eq!(repaired[1].call_id(), Some("c1"));
        assert_eq!(repaired[2].call_id(), Some("c2"));
        assert_eq!(repaired[3].call_id(), Some("c2"));
    }

    #[test]
    fn store_append_and_snapshot() {
        let store = HistoryStore::new();
        store.append(msg("one"));
        store.append(msg("two"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn drain_threads_preserves_arrival_order_and_empties_pending() {
        let store = HistoryStore::new();
        store.append_thread("agent-a", vec![msg("a1")]);
        store.append_thread("agent-b", vec![msg("b1")]);
        store.append_thread("agent-a", vec![msg("a2")]);
        assert_eq!(pending_agent_ids(&store), vec!["agent-a".to_string(), "agent-b".to_string()]);

        let moved = store.drain_threads();
        assert_eq!(moved, 3);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(pending_agent_ids(&store).len(), 0);
    }

    #[test]
    fn describe_returns_last_window_items() {
        let store = HistoryStore::new();
        for i in 0..5 {
            store.append(msg(&format!("m{i}")));
        }
        let desc = store.describe(2);
        assert!(desc.contains("m3"));
        assert!(desc.contains("m4"));
        assert!(!desc.contains("m0"));
    }

    #[test]
    fn repair_mutates_main_log_in_place() {
        let store = HistoryStore::new();
        store.append(HistoryItem::function_call("c1", "calc", "{}"));
        store.repair();
        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
    }
}
