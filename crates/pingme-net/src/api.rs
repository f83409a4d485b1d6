//! The collaborator contract consumed by the chat session core.

use async_trait::async_trait;
use pingme_shared::{Message, Thread, ThreadId};

use crate::error::Result;

/// Remote operations on threads and messages.
///
/// Implementations own the transport and wire format; callers only see
/// domain values. A send that times out surfaces as an error like any other
/// failure.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Threads the signed-in user is a member of.
    async fn list_threads(&self) -> Result<Vec<Thread>>;

    /// Transcript of one thread, in any order.
    async fn list_messages(&self, thread_id: ThreadId) -> Result<Vec<Message>>;

    /// Post a message; returns the confirmed message with its server id.
    async fn send_message(&self, thread_id: ThreadId, text: &str) -> Result<Message>;

    /// Fetch or create the direct thread with `username`.
    async fn open_direct_thread(&self, username: &str) -> Result<Thread>;
}
