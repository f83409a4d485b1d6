use pingme_shared::Message;

/// Messages whose text contains `query`, case-insensitively, in their
/// original order. A blank query keeps everything.
pub fn filter_messages<'a, I>(messages: I, query: &str) -> Vec<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    if query.trim().is_empty() {
        return messages.into_iter().collect();
    }
    let needle = query.to_lowercase();
    messages
        .into_iter()
        .filter(|m| m.text.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pingme_shared::{MessageId, MessageStatus, ThreadId, User};

    fn msg(id: &str, text: &str) -> Message {
        Message {
            id: MessageId::from(id),
            thread_id: ThreadId(1),
            text: text.to_string(),
            sender: User::new(1, "ana", "Ana"),
            created_at: Utc::now(),
            status: MessageStatus::Sent,
        }
    }

    fn transcript() -> Vec<Message> {
        vec![
            msg("1", "Hello there"),
            msg("2", "lunch?"),
            msg("3", "HELLO again"),
            msg("4", "bye"),
        ]
    }

    #[test]
    fn test_blank_query_returns_everything() {
        let messages = transcript();
        assert_eq!(filter_messages(&messages, "").len(), 4);
        assert_eq!(filter_messages(&messages, "   ").len(), 4);
    }

    #[test]
    fn test_case_insensitive_subsequence() {
        let messages = transcript();
        let hits: Vec<&str> = filter_messages(&messages, "hElLo")
            .into_iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(hits, vec!["1", "3"]);
    }

    #[test]
    fn test_no_match() {
        let messages = transcript();
        assert!(filter_messages(&messages, "zebra").is_empty());
    }
}
