use serde::Serialize;

use pingme_shared::{MessageId, ThreadId};

/// Notifications pushed to whoever renders the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ThreadsLoaded {
        count: usize,
    },
    TranscriptLoaded {
        thread_id: ThreadId,
        count: usize,
    },
    LoadFailed {
        target: String,
        reason: String,
    },
    MessageConfirmed {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    /// `text` is the rejected draft, available for retry.
    SendFailed {
        thread_id: ThreadId,
        text: String,
        reason: String,
    },
    MessageReceived {
        thread_id: ThreadId,
        message_id: MessageId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_tagged() {
        let event = SessionEvent::SendFailed {
            thread_id: ThreadId(3),
            text: "hello".into(),
            reason: "timeout".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "send_failed");
        assert_eq!(json["thread_id"], 3);
        assert_eq!(json["text"], "hello");
    }
}
