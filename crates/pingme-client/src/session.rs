//! The chat session controller: the single entry point a presentation layer
//! or push transport talks to.
//!
//! Every command follows the same shape: lock the state, mutate, release,
//! await the collaborator, then lock again to apply the completion. The
//! completion step checks the thread or optimistic id it started with, so a
//! result that arrives after the user moved on is recognised and dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pingme_net::ChatApi;
use pingme_shared::{Message, MessageId, MessageStatus, Thread, ThreadId, User};

use crate::composer::{SubmitRejected, Submission};
use crate::error::{LoadTarget, Result, SessionError};
use crate::events::SessionEvent;
use crate::message_store::{LoadOutcome, TranscriptLoad};
use crate::state::{SessionSnapshot, SessionState};
use crate::typing::{Timer, TypingIndicator};

/// How a send command ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the message.
    Confirmed(Message),
    /// Nothing was sent.
    Rejected(SubmitRejected),
}

/// Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct ChatSession {
    state: Arc<Mutex<SessionState>>,
    api: Arc<dyn ChatApi>,
    me: User,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ChatSession {
    /// Create a session for `me`.  The returned receiver yields
    /// [`SessionEvent`]s for as long as any clone of the session lives.
    pub fn new(
        api: Arc<dyn ChatApi>,
        me: User,
        timer: Arc<dyn Timer>,
        typing_debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let typing = TypingIndicator::new(timer, typing_debounce);
        let session = Self {
            state: Arc::new(Mutex::new(SessionState::new(typing))),
            api,
            me,
            events,
        };
        (session, events_rx)
    }

    pub fn identity(&self) -> &User {
        &self.me
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot(&self.me)
    }

    // -----------------------------------------------------------------------
    // Threads
    // -----------------------------------------------------------------------

    /// Fetch the thread list and replace the held set.
    pub async fn load_threads(&self) -> Result<()> {
        let threads = match self.api.list_threads().await {
            Ok(threads) => threads,
            Err(e) => return Err(self.load_failed(LoadTarget::Threads, e.to_string())),
        };

        let count = threads.len();
        {
            let mut state = self.lock();
            if let Some(change) = state.threads.replace_all(threads) {
                state.messages.on_selection_changed(&change);
            }
        }

        info!(count, "Threads loaded");
        self.emit(SessionEvent::ThreadsLoaded { count });
        Ok(())
    }

    /// Select a thread and load its transcript.
    ///
    /// Unknown ids and re-selecting the current thread do nothing. If the
    /// selection moves again before this load completes, its result is
    /// discarded and this returns `Ok`.
    pub async fn select_thread(&self, thread_id: ThreadId) -> Result<()> {
        let load = {
            let mut state = self.lock();
            let Some(change) = state.threads.select(thread_id) else {
                return Ok(());
            };
            debug!(from = ?change.previous, to = %thread_id, "Selection changed");
            state.threads.mark_read(thread_id);
            state.messages.on_selection_changed(&change)
        };

        match load {
            Some(load) => self.run_load(load).await,
            None => Ok(()),
        }
    }

    /// Refetch the selected thread's transcript, e.g. after a load failure.
    pub async fn reload_transcript(&self) -> Result<()> {
        let load = { self.lock().messages.begin_reload() };
        match load {
            Some(load) => self.run_load(load).await,
            None => Ok(()),
        }
    }

    /// Open (fetching or creating) the direct thread with `username` and
    /// select it.
    pub async fn start_direct_chat(&self, username: &str) -> Result<()> {
        let thread = match self.api.open_direct_thread(username).await {
            Ok(thread) => thread,
            Err(e) => {
                let target = LoadTarget::DirectThread(username.to_string());
                return Err(self.load_failed(target, e.to_string()));
            }
        };
        let thread_id = thread.id;
        {
            self.lock().threads.upsert(thread);
        }
        info!(thread = %thread_id, username, "Direct chat opened");
        self.select_thread(thread_id).await
    }

    async fn run_load(&self, load: TranscriptLoad) -> Result<()> {
        let thread_id = load.thread_id;
        let result = self
            .api
            .list_messages(thread_id)
            .await
            .map_err(|e| e.to_string());

        let outcome = { self.lock().messages.complete_load(thread_id, result) };

        match outcome {
            LoadOutcome::Loaded { count } => {
                info!(thread = %thread_id, count, "Transcript loaded");
                self.emit(SessionEvent::TranscriptLoaded { thread_id, count });
                Ok(())
            }
            LoadOutcome::Failed { reason } => {
                Err(self.load_failed(LoadTarget::Transcript(thread_id), reason))
            }
            LoadOutcome::Stale => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Composing and sending
    // -----------------------------------------------------------------------

    /// Replace the draft; counts as typing activity.
    pub fn update_draft(&self, text: &str) {
        self.lock().composer.update_draft(text);
    }

    /// Append to the draft (emoji palette); counts as typing activity.
    pub fn insert_into_draft(&self, text: &str) {
        self.lock().composer.insert(text);
    }

    /// Typing activity without a draft change.
    pub fn notify_draft_activity(&self) {
        self.lock().composer.typing().pulse();
    }

    /// Send the current draft.
    pub async fn submit_draft(&self) -> Result<SendOutcome> {
        let submission = {
            let mut state = self.lock();
            let selected = state.threads.selected_id();
            let submission = state.composer.submit(selected, &self.me);
            Self::stage(&mut state, submission)
        };
        self.dispatch(submission).await
    }

    /// Send `text` as a new message in the selected thread.
    ///
    /// The draft is left as it is. If the send fails and the draft is blank
    /// at that point, `text` is placed there for retry.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome> {
        let submission = {
            let mut state = self.lock();
            let selected = state.threads.selected_id();
            let submission = state.composer.submit_text(text, selected, &self.me);
            Self::stage(&mut state, submission)
        };
        self.dispatch(submission).await
    }

    /// Put an accepted submission's optimistic message on screen.
    fn stage(
        state: &mut SessionState,
        submission: std::result::Result<Submission, SubmitRejected>,
    ) -> std::result::Result<Submission, SubmitRejected> {
        let submission = submission?;
        state.messages.append(submission.optimistic.clone());
        Ok(submission)
    }

    async fn dispatch(
        &self,
        submission: std::result::Result<Submission, SubmitRejected>,
    ) -> Result<SendOutcome> {
        let Submission {
            thread_id,
            text,
            optimistic,
        } = match submission {
            Ok(submission) => submission,
            Err(reason) => {
                debug!(%reason, "Submit ignored");
                return Ok(SendOutcome::Rejected(reason));
            }
        };
        let optimistic_id = optimistic.id;
        debug!(thread = %thread_id, msg = %optimistic_id, "Optimistic message staged");

        let result = self.api.send_message(thread_id, &text).await;

        let mut state = self.lock();
        match result {
            Ok(confirmed) => {
                state.messages.reconcile_success(&optimistic_id, confirmed.clone());
                state.threads.record_activity(thread_id, &confirmed, false);
                state.composer.finish(&optimistic_id, None);
                drop(state);

                info!(thread = %thread_id, msg = %confirmed.id, "Message sent");
                self.emit(SessionEvent::MessageConfirmed {
                    thread_id,
                    message_id: confirmed.id.clone(),
                });
                Ok(SendOutcome::Confirmed(confirmed))
            }
            Err(e) => {
                state.messages.reconcile_failure(&optimistic_id);
                state.composer.finish(&optimistic_id, Some(&text));
                drop(state);

                let reason = e.to_string();
                warn!(thread = %thread_id, error = %reason, "Message send failed");
                self.emit(SessionEvent::SendFailed {
                    thread_id,
                    text: text.clone(),
                    reason: reason.clone(),
                });
                Err(SessionError::SendFailure {
                    thread_id,
                    text,
                    reason,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    pub fn set_search_query(&self, query: &str) {
        self.lock().search_query = query.to_string();
    }

    // -----------------------------------------------------------------------
    // Push hooks (called by an external realtime transport)
    // -----------------------------------------------------------------------

    /// A message was delivered by the realtime transport.
    pub fn on_message_received(&self, message: Message) {
        let thread_id = message.thread_id;
        let message_id = message.id.clone();
        let known = {
            let mut state = self.lock();
            let selected = state.threads.selected_id() == Some(thread_id);
            let unread = !selected && !message.is_own(&self.me.id);
            let known = state.threads.record_activity(thread_id, &message, unread);
            if selected {
                state.messages.insert_confirmed(message);
            }
            known
        };

        if !known {
            debug!(thread = %thread_id, msg = %message_id, "Message for unknown thread");
            return;
        }
        self.emit(SessionEvent::MessageReceived {
            thread_id,
            message_id,
        });
    }

    /// A delivery or read receipt arrived.  Returns whether it was applied;
    /// receipts that would move a status backwards are dropped.
    pub fn on_status_update(&self, message_id: &MessageId, status: MessageStatus) -> bool {
        let mut state = self.lock();
        state.threads.apply_status(message_id, status);
        state.messages.apply_status_update(message_id, status)
    }

    /// A thread was created or changed elsewhere.
    pub fn on_thread_upserted(&self, thread: Thread) {
        debug!(thread = %thread.id, "Thread upserted");
        self.lock().threads.upsert(thread);
    }

    // -----------------------------------------------------------------------

    fn load_failed(&self, target: LoadTarget, reason: String) -> SessionError {
        warn!(what = %target, error = %reason, "Load failed");
        self.emit(SessionEvent::LoadFailed {
            target: target.to_string(),
            reason: reason.clone(),
        });
        SessionError::LoadFailure { target, reason }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("No session event listener");
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
