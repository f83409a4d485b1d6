// Messaging collaborator: the REST API the chat session core talks to.

pub mod api;
pub mod dto;
pub mod error;
pub mod http;

pub use api::ChatApi;
pub use error::{NetError, Result};
pub use http::HttpChatApi;
