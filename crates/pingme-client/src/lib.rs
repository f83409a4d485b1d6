//! # pingme-client
//!
//! Chat session core for the PingMe direct-messaging client: thread and
//! transcript state, optimistic sends and their reconciliation, the typing
//! debounce and transcript search, composed behind [`ChatSession`].

pub mod composer;
pub mod config;
pub mod error;
pub mod events;
pub mod message_store;
pub mod search;
pub mod session;
pub mod state;
pub mod thread_store;
pub mod typing;

use tracing_subscriber::{fmt, EnvFilter};

pub use composer::SubmitRejected;
pub use config::ClientConfig;
pub use error::{LoadTarget, SessionError};
pub use events::SessionEvent;
pub use message_store::LoadState;
pub use session::{ChatSession, SendOutcome};
pub use state::{SessionSnapshot, VisibleMessage};
pub use typing::{Timer, TimerHandle, TokioTimer, TypingState};

/// Install the global tracing subscriber (respects `RUST_LOG`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("pingme=info,pingme_client=debug,pingme_net=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
