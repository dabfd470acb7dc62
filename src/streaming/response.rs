use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::StreamBody;
use tokio::sync::mpsc;

use crate::constants::{
    CONTENT_TYPE_SSE, HEADER_ACCESS_CONTROL_ALLOW_HEADERS, HEADER_ACCESS_CONTROL_ALLOW_METHODS,
    HEADER_ACCESS_CONTROL_ALLOW_ORIGIN, HEADER_CACHE_CONTROL, HEADER_CONNECTION,
};
use crate::error::RelayError;
use crate::streaming::writer::Frame;

/// Wraps the receiving half of an SSE channel into a streaming response.
pub fn create_sse_response(
    rx: mpsc::Receiver<Frame>,
) -> Result<warp::reply::Response, RelayError> {
    let stream = tokio_stream::wrappers::ReceiverStream::new(rx);
    // Create a body using the same pattern as warp's internal wrap_stream
    let mapped_stream = stream.map(|item: Frame| {
        item.map(warp::hyper::body::Frame::data)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    });

    let body_impl = StreamBody::new(mapped_stream);
    let boxed_body = http_body_util::BodyExt::boxed(body_impl);

    let temp_response = warp::http::Response::builder()
        .status(warp::http::StatusCode::OK)
        .header("content-type", CONTENT_TYPE_SSE)
        .header("cache-control", HEADER_CACHE_CONTROL)
        .header("connection", HEADER_CONNECTION)
        .header(
            "access-control-allow-origin",
            HEADER_ACCESS_CONTROL_ALLOW_ORIGIN,
        )
        .header(
            "access-control-allow-methods",
            HEADER_ACCESS_CONTROL_ALLOW_METHODS,
        )
        .header(
            "access-control-allow-headers",
            HEADER_ACCESS_CONTROL_ALLOW_HEADERS,
        )
        .body(boxed_body)
        .map_err(|_| RelayError::internal_server_error("failed to create SSE response"))?;

    Ok(unsafe {
        std::mem::transmute::<
            warp::http::Response<
                http_body_util::combinators::BoxBody<
                    Bytes,
                    Box<dyn std::error::Error + Send + Sync>,
                >,
            >,
            warp::reply::Response,
        >(temp_response)
    })
}
