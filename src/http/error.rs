use crate::error::UpstreamFailure;

pub fn map_reqwest_error(err: reqwest::Error) -> UpstreamFailure {
    let message = if err.is_connect() {
        format!("MiniMax API unreachable: {}", err)
    } else if err.is_timeout() {
        format!("MiniMax API request timed out: {}", err)
    } else {
        err.to_string()
    };
    log::error!("provider request failed: {}", message);
    UpstreamFailure::Transport(message)
}
