use serde_json::{Value, json};

use crate::constants::CHAT_STATUS_MESSAGE;
use crate::handlers::RequestContext;
use crate::logging::LogConfig;

/// `GET /api/chat`: static status, never touches the provider.
pub fn handle_chat_status() -> Value {
    json!({
        "status": "ok",
        "message": CHAT_STATUS_MESSAGE
    })
}

/// `GET /health`: reports configuration without calling upstream.
pub fn handle_health_check(context: &RequestContext) -> Value {
    let response = json!({
        "status": "ok",
        "provider": context.provider_endpoint(),
        "model": context.relay.model_id,
        "stream_timeout_ms": u64::try_from(context.relay.timeout_budget.as_millis())
            .unwrap_or(u64::MAX),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "proxy_version": crate::VERSION
    });
    if LogConfig::get().debug_enabled {
        log::debug!(
            "health check response: {}",
            serde_json::to_string_pretty(&response).unwrap_or_default()
        );
    }
    response
}
