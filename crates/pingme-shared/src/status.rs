//! Delivery status of a message and the transitions allowed between them.
//!
//! ```text
//! pending ──► sent ──► delivered ──► read
//!    │
//!    └──► failed
//! ```
//!
//! Transitions move forward one step at a time; only the send round trip
//! (`pending → sent | failed`) collapses the network-level acks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Optimistic message awaiting the send round trip.
    #[default]
    Pending,
    /// Accepted by the server.
    Sent,
    /// Received by at least one other member.
    Delivered,
    /// Read by at least one other member.
    Read,
    /// The send round trip failed.
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
        }
    }

    /// Whether `self → next` is an allowed transition.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Sent) | (Pending, Failed) | (Sent, Delivered) | (Delivered, Read)
        )
    }

    /// Whether `self` lies further along the lifecycle than `other`.
    ///
    /// Used when two copies of the same message disagree; unlike
    /// [`can_advance_to`](Self::can_advance_to) it does not require adjacency.
    pub fn is_ahead_of(self, other: MessageStatus) -> bool {
        self.progress() > other.progress()
    }

    fn progress(self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Sent | MessageStatus::Failed => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
