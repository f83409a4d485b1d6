//! Draft buffer and the optimistic-send policy.
//!
//! At most one send is outstanding per composer. Submitting the draft clears
//! it immediately; a failed send puts the text back if the user has not
//! started a new draft in the meantime.

use serde::Serialize;
use tracing::debug;

use pingme_shared::{Message, MessageId, ThreadId, User};

use crate::typing::TypingIndicator;

/// Why a submit did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitRejected {
    EmptyDraft,
    NoSelection,
    SendInFlight,
}

impl std::fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SubmitRejected::EmptyDraft => "draft is empty",
            SubmitRejected::NoSelection => "no thread selected",
            SubmitRejected::SendInFlight => "a send is already in flight",
        };
        f.write_str(reason)
    }
}

/// A send the caller must now perform.
#[derive(Debug, Clone)]
pub struct Submission {
    pub thread_id: ThreadId,
    pub text: String,
    /// To be appended to the transcript before the network call.
    pub optimistic: Message,
}

#[derive(Debug)]
pub struct Composer {
    draft: String,
    in_flight: Option<MessageId>,
    typing: TypingIndicator,
}

impl Composer {
    pub fn new(typing: TypingIndicator) -> Self {
        Self {
            draft: String::new(),
            in_flight: None,
            typing,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn typing(&self) -> &TypingIndicator {
        &self.typing
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Replace the draft and register typing activity.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.typing.pulse();
    }

    /// Append to the draft (emoji palette, paste).
    pub fn insert(&mut self, text: &str) {
        self.draft.push_str(text);
        self.typing.pulse();
    }

    /// Submit the current draft.
    pub fn submit(
        &mut self,
        thread: Option<ThreadId>,
        sender: &User,
    ) -> Result<Submission, SubmitRejected> {
        let text = self.draft.clone();
        let submission = self.begin(text, thread, sender)?;
        self.draft.clear();
        Ok(submission)
    }

    /// Submit `text` directly. The draft is not touched, whether or not the
    /// submit is accepted.
    pub fn submit_text(
        &mut self,
        text: &str,
        thread: Option<ThreadId>,
        sender: &User,
    ) -> Result<Submission, SubmitRejected> {
        self.begin(text.to_string(), thread, sender)
    }

    /// Settle the outstanding send.  `failed_text` is the rejected text when
    /// the send failed.
    pub fn finish(&mut self, optimistic_id: &MessageId, failed_text: Option<&str>) {
        if self.in_flight.as_ref() != Some(optimistic_id) {
            return;
        }
        self.in_flight = None;
        if let Some(text) = failed_text {
            if self.draft.trim().is_empty() {
                self.draft = text.to_string();
                debug!("Restored failed send into draft");
            }
        }
    }

    fn begin(
        &mut self,
        text: String,
        thread: Option<ThreadId>,
        sender: &User,
    ) -> Result<Submission, SubmitRejected> {
        if text.trim().is_empty() {
            return Err(SubmitRejected::EmptyDraft);
        }
        let Some(thread_id) = thread else {
            return Err(SubmitRejected::NoSelection);
        };
        if self.in_flight.is_some() {
            return Err(SubmitRejected::SendInFlight);
        }

        let optimistic = Message::optimistic(thread_id, sender.clone(), text.clone());
        self.in_flight = Some(optimistic.id.clone());
        self.typing.stop();

        Ok(Submission {
            thread_id,
            text,
            optimistic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use pingme_shared::MessageStatus;

    use crate::typing::tests::ManualTimer;

    fn composer() -> Composer {
        let timer = Arc::new(ManualTimer::default());
        Composer::new(TypingIndicator::new(timer, Duration::from_millis(1500)))
    }

    fn me() -> User {
        User::new(1, "ana", "Ana")
    }

    #[test]
    fn test_update_draft_pulses_typing() {
        let mut c = composer();
        c.update_draft("he");
        assert_eq!(c.draft(), "he");
        assert!(c.typing().is_active());
        c.insert("🎉");
        assert_eq!(c.draft(), "he🎉");
    }

    #[test]
    fn test_submit_rejections() {
        let mut c = composer();
        c.update_draft("   ");
        assert_eq!(c.submit(Some(ThreadId(1)), &me()).unwrap_err(), SubmitRejected::EmptyDraft);

        c.update_draft("hi");
        assert_eq!(c.submit(None, &me()).unwrap_err(), SubmitRejected::NoSelection);
        assert_eq!(c.draft(), "hi");
    }

    #[test]
    fn test_submit_builds_optimistic_and_clears_draft() {
        let mut c = composer();
        c.update_draft("hello");
        let sub = c.submit(Some(ThreadId(2)), &me()).unwrap();

        assert_eq!(sub.thread_id, ThreadId(2));
        assert_eq!(sub.text, "hello");
        assert_eq!(sub.optimistic.status, MessageStatus::Pending);
        assert!(sub.optimistic.is_optimistic());
        assert_eq!(c.draft(), "");
        assert!(c.is_in_flight());
        assert!(!c.typing().is_active());
    }

    #[test]
    fn test_single_outstanding_send() {
        let mut c = composer();
        c.update_draft("one");
        let first = c.submit(Some(ThreadId(2)), &me()).unwrap();

        c.update_draft("two");
        assert_eq!(c.submit(Some(ThreadId(2)), &me()).unwrap_err(), SubmitRejected::SendInFlight);
        assert_eq!(c.draft(), "two");

        c.finish(&first.optimistic.id, None);
        assert!(!c.is_in_flight());
        assert!(c.submit(Some(ThreadId(2)), &me()).is_ok());
    }

    #[test]
    fn test_failure_restores_draft_only_when_blank() {
        let mut c = composer();
        c.update_draft("hello");
        let sub = c.submit(Some(ThreadId(2)), &me()).unwrap();
        c.finish(&sub.optimistic.id, Some(&sub.text));
        assert_eq!(c.draft(), "hello");

        let sub = c.submit(Some(ThreadId(2)), &me()).unwrap();
        c.update_draft("new thought");
        c.finish(&sub.optimistic.id, Some(&sub.text));
        assert_eq!(c.draft(), "new thought");
    }

    #[test]
    fn test_submit_text_leaves_draft() {
        let mut c = composer();
        c.update_draft("half a thought");
        let sub = c.submit_text("quick reply", Some(ThreadId(2)), &me()).unwrap();
        assert_eq!(sub.text, "quick reply");
        assert_eq!(c.draft(), "half a thought");

        c.finish(&sub.optimistic.id, Some(&sub.text));
        assert_eq!(c.draft(), "half a thought");
    }

    #[test]
    fn test_finish_ignores_foreign_handle() {
        let mut c = composer();
        c.update_draft("x");
        c.submit(Some(ThreadId(2)), &me()).unwrap();
        c.finish(&MessageId::local(), None);
        assert!(c.is_in_flight());
    }
}
