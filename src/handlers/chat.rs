use serde_json::Value;

use crate::error::RelayError;
use crate::handlers::RequestContext;
use crate::logging::{log_handler_io, log_request};
use crate::model::ChatRequest;
use crate::streaming::{Session, create_sse_response, open_upstream, run_session, sse_channel};

/// `POST /api/chat`: validates the request, then streams the relay session.
///
/// Validation errors come back as a plain JSON error. Once the SSE response
/// is returned the status is committed; every later failure travels in-band.
pub async fn handle_chat(
    context: RequestContext,
    body: Value,
) -> Result<warp::reply::Response, RelayError> {
    log_handler_io("chat", Some(&body), true);

    let request = ChatRequest::from_json(&body)?;
    let session = Session::start(request)?;
    log_request("POST", "/api/chat", Some(&session.conversation_id));

    let (writer, rx) = sse_channel();
    let response = create_sse_response(rx)?;

    let upstream = open_upstream(
        context.client.clone(),
        context.relay.clone(),
        session.messages.clone(),
    );
    tokio::spawn(run_session(
        session,
        writer,
        context.relay.timeout_budget,
        upstream,
    ));

    Ok(response)
}
