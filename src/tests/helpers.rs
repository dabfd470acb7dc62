use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::streaming::writer::Frame;

/// Provider body stand-in that records how far it was read and whether it
/// was dropped.
pub struct TrackedStream {
    chunks: VecDeque<io::Result<Bytes>>,
    hang_when_empty: bool,
    probe: StreamProbe,
}

#[derive(Clone, Default)]
pub struct StreamProbe {
    reads: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl StreamProbe {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl TrackedStream {
    pub fn new(chunks: Vec<&str>) -> (Self, StreamProbe) {
        let probe = StreamProbe::default();
        let stream = Self {
            chunks: chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from(chunk.to_string())))
                .collect(),
            hang_when_empty: false,
            probe: probe.clone(),
        };
        (stream, probe)
    }

    /// Raw chunks, for splits that fall inside a multi-byte character.
    pub fn from_bytes(chunks: Vec<Vec<u8>>) -> (Self, StreamProbe) {
        let probe = StreamProbe::default();
        let stream = Self {
            chunks: chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))).collect(),
            hang_when_empty: false,
            probe: probe.clone(),
        };
        (stream, probe)
    }

    /// Never ends once the scripted chunks run out.
    pub fn hanging(chunks: Vec<&str>) -> (Self, StreamProbe) {
        let (mut stream, probe) = Self::new(chunks);
        stream.hang_when_empty = true;
        (stream, probe)
    }

    /// Appends a read failure after the scripted chunks.
    pub fn push_error(&mut self, message: &str) {
        self.chunks.push_back(Err(io::Error::other(message.to_string())));
    }
}

impl Stream for TrackedStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.chunks.pop_front() {
            Some(item) => {
                self.probe.reads.fetch_add(1, Ordering::SeqCst);
                Poll::Ready(Some(item))
            }
            None if self.hang_when_empty => Poll::Pending,
            None => Poll::Ready(None),
        }
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

pub fn delta_line(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]})
    )
}

/// Parses one `data: <json>\n\n` frame.
pub fn parse_frame(frame: &[u8]) -> Value {
    let text = std::str::from_utf8(frame).expect("frames are utf-8");
    let payload = text
        .strip_prefix("data: ")
        .and_then(|rest| rest.strip_suffix("\n\n"))
        .unwrap_or_else(|| panic!("malformed frame: {:?}", text));
    serde_json::from_str(payload).expect("frame payload is json")
}

/// Splits a whole SSE body into frame payloads.
pub fn parse_body(body: &[u8]) -> Vec<Value> {
    let text = std::str::from_utf8(body).expect("body is utf-8");
    text.split_terminator("\n\n")
        .map(|frame| parse_frame(format!("{}\n\n", frame).as_bytes()))
        .collect()
}

pub async fn collect_frames(mut rx: mpsc::Receiver<Frame>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(parse_frame(&frame.expect("writer only sends data frames")));
    }
    frames
}
