//! Domain model structs observed in thread and message payloads.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DIRECT_CHAT_LABEL, EMPTY_PREVIEW};
use crate::status::MessageStatus;
use crate::types::{MessageId, ThreadId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user identity.  Immutable once observed; threads and messages carry
/// copies, never references into a shared registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct User {
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Human-readable name; falls back to `username` when the server has none.
    pub display_name: String,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            username: username.into(),
            display_name: display_name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message, either optimistic (local id, `Pending`) or
/// confirmed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    /// The thread this message belongs to.
    pub thread_id: ThreadId,
    pub text: String,
    pub sender: User,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    /// Build an optimistic message for a send that has not completed yet.
    pub fn optimistic(thread_id: ThreadId, sender: User, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::local(),
            thread_id,
            text: text.into(),
            sender,
            created_at: Utc::now(),
            status: MessageStatus::Pending,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.is_local()
    }

    pub fn is_own(&self, me: &UserId) -> bool {
        self.sender.id == *me
    }

    /// Transcript ordering key: `created_at` ascending, ties broken by id.
    pub fn sort_key(&self) -> (DateTime<Utc>, &MessageId) {
        (self.created_at, &self.id)
    }
}

// ---------------------------------------------------------------------------
// Thread
// ---------------------------------------------------------------------------

/// A conversation between a set of users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thread {
    pub id: ThreadId,
    /// Group name.  `None` means a direct chat whose label is derived.
    pub name: Option<String>,
    /// Unordered member set.
    pub members: Vec<User>,
    /// Informational snapshot of the latest message; may be stale.
    pub last_message: Option<Message>,
    pub unread_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Display label: the name if set, else the first other member's
    /// display name, else "Direct Chat".
    pub fn label(&self, me: &UserId) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        self.members
            .iter()
            .find(|m| m.id != *me)
            .map(|m| m.display_name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DIRECT_CHAT_LABEL.to_string())
    }

    /// Text of the last message, or the empty-thread placeholder.
    pub fn preview(&self) -> &str {
        self.last_message
            .as_ref()
            .map(|m| m.text.as_str())
            .unwrap_or(EMPTY_PREVIEW)
    }

    /// Fold a newer message into the thread summary.
    ///
    /// `updated_at` never moves backwards and `last_message` is only replaced
    /// by a message at least as recent as the current one.
    pub fn record_activity(&mut self, message: &Message) {
        let newer = self
            .last_message
            .as_ref()
            .map_or(true, |last| message.sort_key() >= last.sort_key());
        if newer {
            self.last_message = Some(message.clone());
        }
        if message.created_at > self.updated_at {
            self.updated_at = message.created_at;
        }
    }
}
