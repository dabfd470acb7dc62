use bytes::Bytes;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::constants::{SSE_FRAME_PREFIX, SSE_MESSAGE_BOUNDARY};
use crate::error::DownstreamClosed;
use crate::streaming::normalizer::NormalizedEvent;

pub type Frame = Result<Bytes, std::io::Error>;

/// One frame in flight: the session waits for the client to take each frame
/// before reading further from the provider.
const DOWNSTREAM_CHANNEL_CAPACITY: usize = 1;

/// Creates the writer and the receiving half that backs the response body.
pub fn sse_channel() -> (SseWriter, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel(DOWNSTREAM_CHANNEL_CAPACITY);
    (SseWriter::new(tx), rx)
}

pub fn event_payload(event: &NormalizedEvent) -> Value {
    match event {
        NormalizedEvent::ConversationStarted { conversation_id } => {
            json!({ "conversationId": conversation_id })
        }
        NormalizedEvent::ContentDelta {
            conversation_id,
            text,
        } => json!({ "content": text, "conversationId": conversation_id }),
        NormalizedEvent::Done => json!({ "done": true }),
        NormalizedEvent::Error { message } => json!({ "error": message }),
    }
}

/// Encodes an event as `data: <json>\n\n`.
pub fn encode_frame(event: &NormalizedEvent) -> Bytes {
    let payload = event_payload(event);
    Bytes::from(format!(
        "{}{}{}",
        SSE_FRAME_PREFIX, payload, SSE_MESSAGE_BOUNDARY
    ))
}

/// Writes SSE frames to the client's open response.
///
/// `close` consumes the writer, so the stream ends exactly once no matter
/// which path the session takes.
pub struct SseWriter {
    tx: mpsc::Sender<Frame>,
    frames_written: u64,
}

impl SseWriter {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self {
            tx,
            frames_written: 0,
        }
    }

    pub async fn write(&mut self, event: &NormalizedEvent) -> Result<(), DownstreamClosed> {
        self.tx
            .send(Ok(encode_frame(event)))
            .await
            .map_err(|_| DownstreamClosed)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Resolves once the client has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Ends the response body. Returns the number of frames written.
    pub fn close(self) -> u64 {
        self.frames_written
    }
}
