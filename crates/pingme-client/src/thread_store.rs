//! Thread list and the current selection.
//!
//! The list is kept ordered by `updated_at` descending, ties broken by thread
//! id. Selection changes are reported to the caller as [`SelectionChanged`]
//! values; nothing outside this store reads its internals.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use pingme_shared::{Message, MessageId, MessageStatus, Thread, ThreadId};

/// Emitted whenever the selected thread id changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChanged {
    pub previous: Option<ThreadId>,
    pub current: Option<ThreadId>,
}

/// Which messages a thread's `unread_count` already accounts for.
#[derive(Debug, Default)]
struct UnreadLedger {
    /// Newest message seen when the thread was last marked read.
    read_through: Option<(DateTime<Utc>, MessageId)>,
    /// Messages counted since then.
    counted: HashSet<MessageId>,
}

impl UnreadLedger {
    /// Record `message` as unread; `false` if it was already counted or read.
    fn count(&mut self, message: &Message) -> bool {
        let (at, id) = message.sort_key();
        if let Some((read_at, read_id)) = &self.read_through {
            if (at, id) <= (*read_at, read_id) {
                return false;
            }
        }
        self.counted.insert(id.clone())
    }
}

#[derive(Debug, Default)]
pub struct ThreadStore {
    threads: Vec<Thread>,
    selected: Option<ThreadId>,
    unread: HashMap<ThreadId, UnreadLedger>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held set with a freshly fetched list.
    ///
    /// Local activity newer than the fetched summary is kept. The selection
    /// survives if its id is still present, otherwise it is cleared and the
    /// change is returned.
    pub fn replace_all(&mut self, threads: Vec<Thread>) -> Option<SelectionChanged> {
        let mut previous = std::mem::take(&mut self.threads);
        self.threads = threads
            .into_iter()
            .map(|mut fresh| {
                if let Some(pos) = previous.iter().position(|t| t.id == fresh.id) {
                    let old = previous.swap_remove(pos);
                    merge_summary(&mut fresh, old);
                }
                fresh
            })
            .collect();
        self.sort();

        debug!(count = self.threads.len(), "Thread list replaced");

        match self.selected {
            Some(id) if self.get(id).is_none() => {
                self.selected = None;
                debug!(thread = %id, "Selected thread vanished, clearing selection");
                Some(SelectionChanged {
                    previous: Some(id),
                    current: None,
                })
            }
            _ => None,
        }
    }

    /// Select a thread.
    ///
    /// Unknown ids and re-selecting the current thread are no-ops and
    /// return `None`.
    pub fn select(&mut self, id: ThreadId) -> Option<SelectionChanged> {
        if self.get(id).is_none() {
            debug!(thread = %id, "Ignoring selection of unknown thread");
            return None;
        }
        if self.selected == Some(id) {
            return None;
        }
        let previous = self.selected.replace(id);
        Some(SelectionChanged {
            previous,
            current: Some(id),
        })
    }

    /// Insert a thread that appeared outside of a full list load, or refresh
    /// an existing one.
    pub fn upsert(&mut self, mut thread: Thread) {
        match self.threads.iter().position(|t| t.id == thread.id) {
            Some(pos) => {
                let old = self.threads.remove(pos);
                merge_summary(&mut thread, old);
                self.threads.push(thread);
            }
            None => self.threads.push(thread),
        }
        self.sort();
    }

    /// Fold a message into its thread's summary.  Returns `false` if the
    /// thread is unknown.
    ///
    /// With `unread` set, the message bumps the unread count once per id;
    /// redeliveries and messages older than the last read point do not.
    pub fn record_activity(&mut self, thread_id: ThreadId, message: &Message, unread: bool) -> bool {
        let Some(thread) = self.threads.iter_mut().find(|t| t.id == thread_id) else {
            return false;
        };
        let already_seen = thread
            .last_message
            .as_ref()
            .is_some_and(|last| last.id == message.id);
        thread.record_activity(message);
        if unread && !already_seen && self.unread.entry(thread_id).or_default().count(message) {
            thread.unread_count = thread.unread_count.saturating_add(1);
        }
        self.sort();
        true
    }

    /// Advance the status of a thread's last-message snapshot if it matches.
    pub fn apply_status(&mut self, message_id: &MessageId, status: MessageStatus) {
        for thread in &mut self.threads {
            if let Some(last) = thread.last_message.as_mut() {
                if last.id == *message_id && last.status.can_advance_to(status) {
                    last.status = status;
                }
            }
        }
    }

    pub fn mark_read(&mut self, id: ThreadId) {
        let Some(thread) = self.threads.iter_mut().find(|t| t.id == id) else {
            return;
        };
        thread.unread_count = 0;
        let ledger = self.unread.entry(id).or_default();
        ledger.counted.clear();
        if let Some(last) = &thread.last_message {
            let (at, last_id) = last.sort_key();
            ledger.read_through = Some((at, last_id.clone()));
        }
    }

    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    /// Ordered thread list.
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn selected_id(&self) -> Option<ThreadId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Thread> {
        self.selected.and_then(|id| self.get(id))
    }

    fn sort(&mut self) {
        self.threads
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
    }
}

/// Carry forward local knowledge the fetched summary may lack.
fn merge_summary(fresh: &mut Thread, old: Thread) {
    if old.updated_at > fresh.updated_at {
        fresh.updated_at = old.updated_at;
    }
    if let Some(old_last) = old.last_message {
        let keep_old = fresh
            .last_message
            .as_ref()
            .map_or(true, |new_last| old_last.sort_key() > new_last.sort_key());
        if keep_old {
            fresh.last_message = Some(old_last);
        }
    }
}
