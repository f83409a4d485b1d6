//! JSON shapes of the chat REST API and their conversion into domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pingme_shared::{Message, MessageId, MessageStatus, PingmeError, Thread, ThreadId, User, UserId};

/// Message ids are integers on the current backend; strings are accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Int(i64),
    Str(String),
}

impl From<WireId> for MessageId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Int(n) => MessageId(n.to_string()),
            WireId::Str(s) => MessageId(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl From<UserDto> for User {
    fn from(u: UserDto) -> Self {
        let display_name = u
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| u.username.clone());
        Self {
            id: UserId(u.id),
            username: u.username,
            display_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDto {
    pub id: WireId,
    pub thread: i64,
    pub sender: UserDto,
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered_count: u32,
    #[serde(default)]
    pub read_count: u32,
}

impl MessageDto {
    /// Receipt counters collapse into the most advanced status reached.
    pub fn status(&self) -> MessageStatus {
        if self.read_count > 0 {
            MessageStatus::Read
        } else if self.delivered_count > 0 {
            MessageStatus::Delivered
        } else {
            MessageStatus::Sent
        }
    }
}

impl TryFrom<MessageDto> for Message {
    type Error = PingmeError;

    fn try_from(m: MessageDto) -> Result<Self, Self::Error> {
        let status = m.status();
        let id = MessageId::from(m.id);
        if m.text.trim().is_empty() {
            return Err(PingmeError::InvalidPayload(format!(
                "message {id} has no text"
            )));
        }
        Ok(Self {
            id,
            thread_id: ThreadId(m.thread),
            text: m.text,
            sender: m.sender.into(),
            created_at: m.created_at,
            status,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadDto {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<UserDto>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_message: Option<MessageDto>,
    #[serde(default)]
    pub unread_count: u32,
}

impl From<ThreadDto> for Thread {
    fn from(t: ThreadDto) -> Self {
        // Attachment-only previews carry no text and are dropped.
        let last_message = t.last_message.and_then(|m| Message::try_from(m).ok());
        let updated_at = t
            .updated_at
            .or_else(|| last_message.as_ref().map(|m| m.created_at))
            .unwrap_or(t.created_at);
        Self {
            id: ThreadId(t.id),
            name: t.name.filter(|n| !n.trim().is_empty()),
            members: t.members.into_iter().map(User::from).collect(),
            last_message,
            unread_count: t.unread_count,
            updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateThreadRequest<'a> {
    pub username: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREAD_JSON: &str = r#"{
        "id": 2,
        "name": "",
        "members": [
            {"id": 1, "username": "ana", "avatar": null, "bio": ""},
            {"id": 2, "username": "ben", "avatar": null, "bio": "hi"}
        ],
        "created_at": "2024-05-01T10:00:00Z",
        "last_message": {
            "id": 17,
            "thread": 2,
            "sender": {"id": 2, "username": "ben"},
            "text": "see you",
            "attachment": null,
            "created_at": "2024-05-02T08:30:00Z",
            "delivered_count": 1,
            "read_count": 0
        },
        "unread_count": 3
    }"#;

    #[test]
    fn test_thread_dto_conversion() {
        let dto: ThreadDto = serde_json::from_str(THREAD_JSON).unwrap();
        let thread = Thread::from(dto);

        assert_eq!(thread.id, ThreadId(2));
        assert_eq!(thread.name, None);
        assert_eq!(thread.members.len(), 2);
        assert_eq!(thread.members[1].display_name, "ben");
        assert_eq!(thread.unread_count, 3);

        let last = thread.last_message.as_ref().unwrap();
        assert_eq!(last.id, MessageId::from("17"));
        assert_eq!(last.status, MessageStatus::Delivered);
        // updated_at absent: falls back to the last message time
        assert_eq!(thread.updated_at, last.created_at);
    }

    #[test]
    fn test_message_status_from_receipts() {
        let json = r#"{"id": "m9", "thread": 1, "sender": {"id": 1, "username": "ana"},
                       "text": "hello", "created_at": "2024-05-02T08:30:00Z",
                       "delivered_count": 2, "read_count": 1}"#;
        let dto: MessageDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.status(), MessageStatus::Read);

        let msg = Message::try_from(dto).unwrap();
        assert_eq!(msg.id, MessageId::from("m9"));
        assert_eq!(msg.thread_id, ThreadId(1));
    }

    #[test]
    fn test_fresh_message_is_sent() {
        let json = r#"{"id": 5, "thread": 1, "sender": {"id": 1, "username": "ana"},
                       "text": "hello", "created_at": "2024-05-02T08:30:00Z"}"#;
        let dto: MessageDto = serde_json::from_str(json).unwrap();
        assert_eq!(Message::try_from(dto).unwrap().status, MessageStatus::Sent);
    }

    #[test]
    fn test_textless_message_rejected() {
        let json = r#"{"id": 5, "thread": 1, "sender": {"id": 1, "username": "ana"},
                       "text": "", "created_at": "2024-05-02T08:30:00Z"}"#;
        let dto: MessageDto = serde_json::from_str(json).unwrap();
        assert!(Message::try_from(dto).is_err());
    }
}
