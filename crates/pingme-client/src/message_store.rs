//! Transcript of the selected thread.
//!
//! Entries live in a slot vector with an id → slot index, so reconciling an
//! optimistic send or applying a receipt is a single lookup regardless of
//! transcript length. Removed entries leave a tombstone until enough of them
//! accumulate to warrant compaction; slot order is transcript order.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use pingme_shared::{Message, MessageId, MessageStatus, ThreadId};

use crate::thread_store::SelectionChanged;

/// Externally visible state of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// No thread selected.
    Idle,
    Loading,
    /// Loaded and non-empty.
    Ready,
    /// Loaded; the thread has no messages.
    Empty,
    /// The last load failed; whatever was shown before is still held.
    Failed { reason: String },
}

/// A transcript fetch the caller must perform and hand back to
/// [`MessageStore::complete_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptLoad {
    pub thread_id: ThreadId,
}

/// Result of handing a finished fetch back to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    Failed { reason: String },
    /// The selection moved on while the fetch was in flight; result dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug)]
pub struct MessageStore {
    thread_id: Option<ThreadId>,
    slots: Vec<Option<Message>>,
    index: HashMap<MessageId, usize>,
    tombstones: usize,
    phase: Phase,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            thread_id: None,
            slots: Vec::new(),
            index: HashMap::new(),
            tombstones: 0,
            phase: Phase::Idle,
        }
    }

    /// Drop the current transcript and start over for the new selection.
    pub fn on_selection_changed(&mut self, change: &SelectionChanged) -> Option<TranscriptLoad> {
        self.clear();
        self.thread_id = change.current;
        match change.current {
            Some(thread_id) => {
                self.phase = Phase::Loading;
                debug!(thread = %thread_id, "Transcript invalidated, loading");
                Some(TranscriptLoad { thread_id })
            }
            None => {
                self.phase = Phase::Idle;
                None
            }
        }
    }

    /// Refetch the current thread, keeping the visible transcript meanwhile.
    pub fn begin_reload(&mut self) -> Option<TranscriptLoad> {
        let thread_id = self.thread_id?;
        self.phase = Phase::Loading;
        Some(TranscriptLoad { thread_id })
    }

    /// Apply a finished fetch.
    ///
    /// Results for a thread other than the current one are stale and
    /// dropped. On failure the held transcript is left as it is. On success
    /// the fetched messages are merged with anything already held (messages
    /// pushed or confirmed while the fetch was in flight), confirmed entries
    /// are ordered by `(created_at, id)` and pending optimistic entries stay
    /// after them in their original order.
    pub fn complete_load(
        &mut self,
        thread_id: ThreadId,
        result: Result<Vec<Message>, String>,
    ) -> LoadOutcome {
        if self.thread_id != Some(thread_id) {
            debug!(thread = %thread_id, "Dropping stale transcript load");
            return LoadOutcome::Stale;
        }

        let fetched = match result {
            Ok(messages) => messages,
            Err(reason) => {
                self.phase = Phase::Failed(reason.clone());
                return LoadOutcome::Failed { reason };
            }
        };

        let held: Vec<Message> = self.slots.drain(..).flatten().collect();
        let (optimistic, held_confirmed): (Vec<Message>, Vec<Message>) =
            held.into_iter().partition(Message::is_optimistic);

        let mut confirmed: HashMap<MessageId, Message> = HashMap::new();
        for m in fetched.into_iter().filter(|m| m.thread_id == thread_id) {
            confirmed.insert(m.id.clone(), m);
        }
        for m in held_confirmed {
            match confirmed.get_mut(&m.id) {
                Some(fetched) => {
                    // Receipts seen locally may be ahead of the fetched copy
                    if !m.status.is_ahead_of(fetched.status) {
                        continue;
                    }
                    fetched.status = m.status;
                }
                None => {
                    confirmed.insert(m.id.clone(), m);
                }
            }
        }

        let mut ordered: Vec<Message> = confirmed.into_values().collect();
        ordered.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        ordered.extend(optimistic);

        self.slots = ordered.into_iter().map(Some).collect();
        self.tombstones = 0;
        self.reindex();
        self.phase = Phase::Loaded;

        LoadOutcome::Loaded { count: self.len() }
    }

    /// Append an optimistic message at the tail and return its handle.
    ///
    /// A message for a thread other than the current one is not shown; its
    /// later reconciliation is then a no-op.
    pub fn append(&mut self, message: Message) -> MessageId {
        let id = message.id.clone();
        if self.thread_id != Some(message.thread_id) {
            debug!(msg = %id, thread = %message.thread_id, "Not appending to foreign transcript");
            return id;
        }
        if self.index.contains_key(&id) {
            return id;
        }
        self.index.insert(id.clone(), self.slots.len());
        self.slots.push(Some(message));
        id
    }

    /// Replace an optimistic entry with its confirmed counterpart in place.
    ///
    /// Returns `false` when the optimistic entry is gone (already reconciled,
    /// or the thread was switched away). If the confirmed message is already
    /// present (delivered by push first), the optimistic entry is removed
    /// instead so the message never appears twice.
    pub fn reconcile_success(&mut self, optimistic_id: &MessageId, confirmed: Message) -> bool {
        let Some(&slot) = self.index.get(optimistic_id) else {
            debug!(msg = %optimistic_id, "Reconcile for unknown optimistic id ignored");
            return false;
        };

        if self.index.contains_key(&confirmed.id) {
            self.remove_slot(optimistic_id);
            debug!(msg = %confirmed.id, "Confirmed message already present, dropped optimistic copy");
            return true;
        }

        self.index.remove(optimistic_id);
        self.index.insert(confirmed.id.clone(), slot);
        self.slots[slot] = Some(confirmed);
        true
    }

    /// Remove an optimistic entry whose send failed, returning it.
    pub fn reconcile_failure(&mut self, optimistic_id: &MessageId) -> Option<Message> {
        if !optimistic_id.is_local() {
            return None;
        }
        self.remove_slot(optimistic_id)
    }

    /// Advance a message's status if the move is forward in the lattice.
    /// Backward or unknown updates are dropped and return `false`.
    pub fn apply_status_update(&mut self, id: &MessageId, status: MessageStatus) -> bool {
        let Some(message) = self
            .index
            .get(id)
            .and_then(|&slot| self.slots[slot].as_mut())
        else {
            return false;
        };
        if !message.status.can_advance_to(status) {
            debug!(msg = %id, from = %message.status, to = %status, "Dropping illegal status transition");
            return false;
        }
        message.status = status;
        true
    }

    /// Insert a confirmed message that arrived from outside a fetch.
    ///
    /// Duplicates only merge their status, keeping whichever copy is further
    /// along. New messages go after the last confirmed entry that sorts at or
    /// before them, ahead of any trailing optimistic entries.
    pub fn insert_confirmed(&mut self, message: Message) -> bool {
        if self.thread_id != Some(message.thread_id) {
            return false;
        }
        if let Some(&slot) = self.index.get(&message.id) {
            if let Some(held) = self.slots[slot].as_mut() {
                if message.status.is_ahead_of(held.status) {
                    held.status = message.status;
                }
            }
            return false;
        }

        self.compact();
        let key = message.sort_key();
        let pos = self
            .slots
            .iter()
            .rposition(|slot| {
                slot.as_ref()
                    .is_some_and(|m| !m.is_optimistic() && m.sort_key() <= key)
            })
            .map_or(0, |p| p + 1);

        if pos == self.slots.len() {
            self.index.insert(message.id.clone(), pos);
            self.slots.push(Some(message));
        } else {
            self.slots.insert(pos, Some(message));
            self.reindex();
        }
        true
    }

    /// Messages in transcript order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.slots.iter().flatten()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.index.get(id).and_then(|&slot| self.slots[slot].as_ref())
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.tombstones
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread_id
    }

    pub fn state(&self) -> LoadState {
        match &self.phase {
            Phase::Idle => LoadState::Idle,
            Phase::Loading => LoadState::Loading,
            Phase::Loaded if self.is_empty() => LoadState::Empty,
            Phase::Loaded => LoadState::Ready,
            Phase::Failed(reason) => LoadState::Failed {
                reason: reason.clone(),
            },
        }
    }

    fn remove_slot(&mut self, id: &MessageId) -> Option<Message> {
        let slot = self.index.remove(id)?;
        let removed = self.slots[slot].take();

        if slot + 1 == self.slots.len() {
            self.slots.pop();
            while matches!(self.slots.last(), Some(None)) {
                self.slots.pop();
                self.tombstones -= 1;
            }
        } else {
            self.tombstones += 1;
            if self.tombstones > self.len() {
                self.compact();
            }
        }
        removed
    }

    fn compact(&mut self) {
        if self.tombstones == 0 {
            return;
        }
        self.slots.retain(Option::is_some);
        self.tombstones = 0;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|m| (m.id.clone(), i)))
            .collect();
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.tombstones = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pingme_shared::User;

    const T: ThreadId = ThreadId(2);

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn ben() -> User {
        User::new(2, "ben", "Ben")
    }

    fn confirmed(id: &str, minutes: i64) -> Message {
        Message {
            id: MessageId::from(id),
            thread_id: T,
            text: format!("msg {id}"),
            sender: ben(),
            created_at: base() + Duration::minutes(minutes),
            status: MessageStatus::Sent,
        }
    }

    fn optimistic(text: &str) -> Message {
        Message::optimistic(T, User::new(1, "ana", "Ana"), text)
    }

    fn loaded(messages: Vec<Message>) -> MessageStore {
        let mut store = MessageStore::new();
        let load = store
            .on_selection_changed(&SelectionChanged {
                previous: None,
                current: Some(T),
            })
            .unwrap();
        assert_eq!(store.state(), LoadState::Loading);
        store.complete_load(load.thread_id, Ok(messages));
        store
    }

    fn ids(store: &MessageStore) -> Vec<String> {
        store.messages().map(|m| m.id.to_string()).collect()
    }

    #[test]
    fn test_load_orders_by_time_then_id() {
        let store = loaded(vec![confirmed("b", 1), confirmed("c", 0), confirmed("a", 1)]);
        assert_eq!(ids(&store), vec!["c", "a", "b"]);
        assert_eq!(store.state(), LoadState::Ready);
    }

    #[test]
    fn test_empty_and_failed_states() {
        let mut store = loaded(vec![]);
        assert_eq!(store.state(), LoadState::Empty);

        let mut with_data = loaded(vec![confirmed("m1", 0)]);
        let reload = with_data.begin_reload().unwrap();
        assert_eq!(with_data.state(), LoadState::Loading);
        assert_eq!(with_data.len(), 1);
        let outcome = with_data.complete_load(reload.thread_id, Err("boom".into()));
        assert_eq!(outcome, LoadOutcome::Failed { reason: "boom".into() });
        assert_eq!(with_data.state(), LoadState::Failed { reason: "boom".into() });
        assert_eq!(ids(&with_data), vec!["m1"]);

        store.on_selection_changed(&SelectionChanged {
            previous: Some(T),
            current: None,
        });
        assert_eq!(store.state(), LoadState::Idle);
    }

    #[test]
    fn test_stale_load_is_dropped() {
        let mut store = MessageStore::new();
        store.on_selection_changed(&SelectionChanged {
            previous: None,
            current: Some(ThreadId(1)),
        });
        store.on_selection_changed(&SelectionChanged {
            previous: Some(ThreadId(1)),
            current: Some(T),
        });
        store.complete_load(T, Ok(vec![confirmed("b1", 0)]));

        let mut late = confirmed("a1", 0);
        late.thread_id = ThreadId(1);
        assert_eq!(store.complete_load(ThreadId(1), Ok(vec![late])), LoadOutcome::Stale);
        assert_eq!(ids(&store), vec!["b1"]);
    }

    #[test]
    fn test_reconcile_success_keeps_position() {
        let mut store = loaded(vec![confirmed("m1", 0)]);
        let first = store.append(optimistic("one"));
        let second = store.append(optimistic("two"));
        assert_eq!(store.len(), 3);

        assert!(store.reconcile_success(&first, confirmed("m9", 5)));
        assert_eq!(ids(&store), vec!["m1".to_string(), "m9".into(), second.to_string()]);
        assert_eq!(store.get(&MessageId::from("m9")).unwrap().status, MessageStatus::Sent);

        // Second reconcile of the same handle is a no-op
        assert!(!store.reconcile_success(&first, confirmed("m9", 5)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_reconcile_failure_restores_previous_state() {
        let mut store = loaded(vec![confirmed("m1", 0), confirmed("m2", 1)]);
        let before = ids(&store);

        let middle = store.append(optimistic("a"));
        let tail = store.append(optimistic("b"));

        assert_eq!(store.reconcile_failure(&middle).unwrap().text, "a");
        assert_eq!(store.reconcile_failure(&tail).unwrap().text, "b");
        assert_eq!(ids(&store), before);
        assert_eq!(store.len(), 2);
        assert!(store.reconcile_failure(&tail).is_none());
    }

    #[test]
    fn test_push_before_response_does_not_duplicate() {
        let mut store = loaded(vec![confirmed("m1", 0)]);
        let handle = store.append(optimistic("hello"));

        assert!(store.insert_confirmed(confirmed("m9", 5)));
        assert!(store.reconcile_success(&handle, confirmed("m9", 5)));
        assert_eq!(ids(&store), vec!["m1", "m9"]);
    }

    #[test]
    fn test_status_updates_only_move_forward() {
        let mut store = loaded(vec![confirmed("m1", 0)]);
        let id = MessageId::from("m1");

        assert!(store.apply_status_update(&id, MessageStatus::Delivered));
        assert!(store.apply_status_update(&id, MessageStatus::Read));
        assert!(!store.apply_status_update(&id, MessageStatus::Sent));
        assert!(!store.apply_status_update(&id, MessageStatus::Delivered));
        assert_eq!(store.get(&id).unwrap().status, MessageStatus::Read);

        assert!(!store.apply_status_update(&MessageId::from("nope"), MessageStatus::Read));
    }

    #[test]
    fn test_read_receipt_cannot_skip_delivered() {
        let mut store = loaded(vec![confirmed("m1", 0)]);
        let id = MessageId::from("m1");
        assert!(!store.apply_status_update(&id, MessageStatus::Read));
        assert_eq!(store.get(&id).unwrap().status, MessageStatus::Sent);
    }

    #[test]
    fn test_insert_confirmed_orders_ahead_of_pending() {
        let mut store = loaded(vec![confirmed("m1", 0), confirmed("m3", 10)]);
        let pending = store.append(optimistic("mine"));

        assert!(store.insert_confirmed(confirmed("m2", 5)));
        assert!(store.insert_confirmed(confirmed("m4", 20)));
        assert_eq!(
            ids(&store),
            vec!["m1".to_string(), "m2".into(), "m3".into(), "m4".into(), pending.to_string()]
        );
        assert!(!store.insert_confirmed(confirmed("m2", 5)));
    }

    #[test]
    fn test_reload_keeps_pending_and_local_receipts() {
        let mut store = loaded(vec![confirmed("m1", 0)]);
        store.apply_status_update(&MessageId::from("m1"), MessageStatus::Delivered);
        store.apply_status_update(&MessageId::from("m1"), MessageStatus::Read);
        let pending = store.append(optimistic("mine"));

        let reload = store.begin_reload().unwrap();
        store.complete_load(reload.thread_id, Ok(vec![confirmed("m1", 0), confirmed("m2", 1)]));

        assert_eq!(ids(&store), vec!["m1".to_string(), "m2".into(), pending.to_string()]);
        assert_eq!(store.get(&MessageId::from("m1")).unwrap().status, MessageStatus::Read);
        assert!(store.get(&pending).is_some());
    }

    #[test]
    fn test_tombstones_compact() {
        let mut store = loaded(vec![]);
        let handles: Vec<MessageId> = (0..6).map(|i| store.append(optimistic(&i.to_string()))).collect();
        for h in &handles[..4] {
            store.reconcile_failure(h);
        }
        assert_eq!(store.len(), 2);
        let texts: Vec<&str> = store.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["4", "5"]);
        assert!(store.get(&handles[5]).is_some());
    }

    #[test]
    fn test_append_to_other_thread_is_ignored() {
        let mut store = loaded(vec![]);
        let foreign = Message::optimistic(ThreadId(77), ben(), "x");
        let handle = store.append(foreign);
        assert!(store.is_empty());
        assert!(!store.reconcile_success(&handle, confirmed("m1", 0)));
    }
}
