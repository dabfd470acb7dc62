use std::convert::Infallible;

use serde_json::json;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::error::RelayError;

/// Body errors are checked before method mismatches: a POST with a bad body
/// also fails the GET route on the same path.
pub async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(relay_err) = rejection.find::<RelayError>() {
        if relay_err.is_configuration() {
            log::error!("{}", relay_err);
        } else if relay_err.is_validation() {
            log::debug!("rejected request: {}", relay_err.message);
        }
        (
            StatusCode::from_u16(relay_err.status_code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            relay_err.message.clone(),
        )
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "endpoint not found".to_string())
    } else if let Some(body_err) = rejection.find::<warp::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid request body: {}", body_err),
        )
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "request body too large".to_string(),
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_string(),
        )
    } else {
        log::error!("unhandled rejection: {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    let error_response = json!({
        "error": message,
        "status": status.as_u16()
    });

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        status,
    ))
}
