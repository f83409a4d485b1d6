//! Session state owned by the controller, and the read-only snapshot handed
//! to the presentation layer.
//!
//! [`SessionState`] is wrapped in `Arc<Mutex<>>` by [`crate::ChatSession`];
//! the lock is only ever held between awaits, never across one.

use serde::Serialize;

use pingme_shared::{Message, Thread, User};

use crate::composer::Composer;
use crate::message_store::{LoadState, MessageStore};
use crate::search::filter_messages;
use crate::thread_store::ThreadStore;
use crate::typing::{TypingIndicator, TypingState};

pub struct SessionState {
    pub threads: ThreadStore,
    pub messages: MessageStore,
    pub composer: Composer,
    /// Current transcript filter; empty shows everything.
    pub search_query: String,
}

impl SessionState {
    pub fn new(typing: TypingIndicator) -> Self {
        Self {
            threads: ThreadStore::new(),
            messages: MessageStore::new(),
            composer: Composer::new(typing),
            search_query: String::new(),
        }
    }

    /// Project the current state, filtering the transcript by the current
    /// query in the same critical section.
    pub fn snapshot(&self, me: &User) -> SessionSnapshot {
        let visible_messages = filter_messages(self.messages.messages(), &self.search_query)
            .into_iter()
            .map(|m| VisibleMessage {
                is_own: m.is_own(&me.id),
                message: m.clone(),
            })
            .collect();

        SessionSnapshot {
            threads: self.threads.threads().to_vec(),
            selected_thread: self.threads.selected().cloned(),
            visible_messages,
            typing: self.composer.typing().state(),
            send_in_flight: self.composer.is_in_flight(),
            transcript: self.messages.state(),
            draft: self.composer.draft().to_string(),
            search_query: self.search_query.clone(),
        }
    }
}

/// A transcript entry as shown, with its ownership classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleMessage {
    pub message: Message,
    pub is_own: bool,
}

/// Point-in-time, internally consistent view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub threads: Vec<Thread>,
    pub selected_thread: Option<Thread>,
    pub visible_messages: Vec<VisibleMessage>,
    pub typing: TypingState,
    pub send_in_flight: bool,
    pub transcript: LoadState,
    pub draft: String,
    pub search_query: String,
}
