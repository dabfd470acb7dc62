/// Provider API endpoints
pub const MINIMAX_CHAT_COMPLETION: &str = "/text/chatcompletion_v2";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.minimax.chat/v1";
pub const DEFAULT_MODEL: &str = "abab6.5s-chat";

/// Default parameter values
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_STREAM_TIMEOUT: &str = "60s";

/// Response headers
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_SSE: &str = "text/event-stream";
pub const HEADER_CACHE_CONTROL: &str = "no-cache";
pub const HEADER_CONNECTION: &str = "keep-alive";
pub const HEADER_ACCESS_CONTROL_ALLOW_ORIGIN: &str = "*";
pub const HEADER_ACCESS_CONTROL_ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const HEADER_ACCESS_CONTROL_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Error messages
pub const ERROR_MISSING_MESSAGE: &str = "Message is required";
pub const ERROR_MISSING_API_KEY: &str = "MINIMAX_API_KEY is not configured";
pub const ERROR_NO_RESPONSE_BODY: &str = "No response body from MiniMax API";

/// Health probe message for the chat route
pub const CHAT_STATUS_MESSAGE: &str =
    "Chat API is running. Use POST with { message: \"your message\" }";

/// SSE parsing constants
pub const SSE_DATA_PREFIX: &str = "data:";
pub const SSE_FRAME_PREFIX: &str = "data: ";
pub const SSE_DONE_MESSAGE: &str = "[DONE]";
pub const SSE_MESSAGE_BOUNDARY: &str = "\n\n";

/// Conversation ids generated by the relay carry this prefix
pub const CONVERSATION_ID_PREFIX: &str = "conv_";

/// Logging prefixes
pub const LOG_PREFIX_SUCCESS: &str = "✅";
pub const LOG_PREFIX_ERROR: &str = "❌";
pub const LOG_PREFIX_WARNING: &str = "⚠️";
pub const LOG_PREFIX_CONN: &str = "↔️";

/// Maximum accepted JSON body size (bytes)
pub const MAX_JSON_BODY_SIZE_BYTES: u64 = 1024 * 1024;
pub const MAX_UPSTREAM_LINE_BYTES: usize = 1024 * 1024;
