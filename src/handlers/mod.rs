pub mod chat;
pub mod context;
pub mod health;

pub use chat::handle_chat;
pub use context::RequestContext;
pub use health::{handle_chat_status, handle_health_check};
