//! # pingme-shared
//!
//! Domain vocabulary shared by the PingMe networking layer and the chat
//! session core: identifiers, users, threads, messages and the delivery
//! status lattice.

pub mod constants;
pub mod display;
pub mod error;
pub mod models;
pub mod status;
pub mod types;

pub use error::PingmeError;
pub use models::{Message, Thread, User};
pub use status::MessageStatus;
pub use types::{MessageId, ThreadId, UserId};
