use std::sync::Arc;

use serde_json::Value;
use warp::Filter;

use crate::constants::MAX_JSON_BODY_SIZE_BYTES;
use crate::handlers;
use crate::http::json_response;
use crate::logging::log_request;
use crate::server::RelayServer;

pub fn create_routes(
    server: Arc<RelayServer>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_server_state = warp::any().map(move || server.clone());

    let health_route = warp::path!("health")
        .and(warp::get())
        .and(with_server_state.clone())
        .map(|s: Arc<RelayServer>| {
            let context = s.context();
            json_response(&handlers::handle_health_check(&context))
        });

    let chat_status_route = warp::path!("api" / "chat")
        .and(warp::get())
        .map(|| {
            log_request("GET", "/api/chat", None);
            json_response(&handlers::handle_chat_status())
        });

    let chat_route = warp::path!("api" / "chat")
        .and(warp::post())
        .and(tolerant_json_body())
        .and(with_server_state.clone())
        .and_then(|body: Value, s: Arc<RelayServer>| async move {
            handlers::handle_chat(s.context(), body)
                .await
                .map_err(warp::reject::custom)
        });

    health_route.or(chat_status_route).or(chat_route)
}

fn tolerant_json_body() -> impl Filter<Extract = (Value,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_JSON_BODY_SIZE_BYTES).and(warp::body::json())
}
