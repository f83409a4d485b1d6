use thiserror::Error;

use pingme_shared::ThreadId;

/// What a failed load was trying to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    Threads,
    Transcript(ThreadId),
    DirectThread(String),
}

impl std::fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadTarget::Threads => write!(f, "thread list"),
            LoadTarget::Transcript(id) => write!(f, "transcript of thread {id}"),
            LoadTarget::DirectThread(username) => write!(f, "direct thread with {username}"),
        }
    }
}

/// Network-origin failures surfaced to the presentation layer.
///
/// Expected races (stale completions, backward receipts, unknown
/// selections) never appear here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A fetch failed; previously held state is unchanged.
    #[error("Failed to load {target}: {reason}")]
    LoadFailure { target: LoadTarget, reason: String },

    /// A send failed; the optimistic entry was removed and `text` can be
    /// offered for retry.
    #[error("Failed to send message to thread {thread_id}: {reason}")]
    SendFailure {
        thread_id: ThreadId,
        text: String,
        reason: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;
