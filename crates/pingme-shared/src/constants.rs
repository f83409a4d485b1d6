/// Application name
pub const APP_NAME: &str = "PingMe";

/// Label shown for a thread that has no name and no other member to name it after
pub const DIRECT_CHAT_LABEL: &str = "Direct Chat";

/// Initials used when a label yields none
pub const DEFAULT_INITIALS: &str = "DC";

/// Preview shown for a thread without any message
pub const EMPTY_PREVIEW: &str = "No messages yet";

/// Prefix of client-generated (optimistic) message ids
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Typing indicator debounce interval in milliseconds
pub const DEFAULT_TYPING_DEBOUNCE_MS: u64 = 1500;

/// HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default REST API base URL (chat routes)
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/chat/";

/// Quick-insert emoji palette offered by the composer
pub const COMMON_EMOJIS: [&str; 10] = [
    "😊", "😂", "❤️", "👍", "🎉", "🔥", "💯", "👏", "🙏", "😍",
];
