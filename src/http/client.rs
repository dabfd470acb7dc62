use serde::Serialize;

use crate::config::RelayConfig;
use crate::error::UpstreamFailure;
use crate::http::error::map_reqwest_error;
use crate::model::ChatMessage;

/// Body of the provider's chat-completion request.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub temperature: f64,
}

impl<'a> ChatCompletionRequest<'a> {
    pub fn streaming(config: &'a RelayConfig, messages: &'a [ChatMessage]) -> Self {
        Self {
            model: &config.model_id,
            messages,
            stream: true,
            temperature: config.temperature,
        }
    }
}

/// Sends the streaming request. Only transport failures are errors here; the
/// status is left for the caller to inspect.
pub async fn send_chat_completion(
    client: &reqwest::Client,
    config: &RelayConfig,
    messages: &[ChatMessage],
) -> Result<reqwest::Response, UpstreamFailure> {
    let payload = ChatCompletionRequest::streaming(config, messages);

    log::debug!(
        "opening provider stream: {} ({} messages)",
        config.model_id,
        messages.len()
    );

    client
        .post(&config.endpoint)
        .bearer_auth(&config.credential)
        .json(&payload)
        .send()
        .await
        .map_err(map_reqwest_error)
}

/// Reads the body of a rejected request for the client-facing error message.
pub async fn read_error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(text) => text,
        Err(e) => format!("<unreadable body: {}>", e),
    }
}
