use std::sync::Arc;

use crate::config::RelayConfig;

/// Shared handles a request needs; cheap to clone into a session task.
#[derive(Clone)]
pub struct RequestContext {
    pub client: reqwest::Client,
    pub relay: Arc<RelayConfig>,
}

impl RequestContext {
    pub fn provider_endpoint(&self) -> &str {
        &self.relay.endpoint
    }
}
