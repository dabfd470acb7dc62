use std::io;

use bytes::Bytes;
use futures_util::Stream;
use serde_json::Value;

use crate::constants::{SSE_DATA_PREFIX, SSE_DONE_MESSAGE};
use crate::streaming::upstream::{UpstreamLine, UpstreamLines};

/// Provider-independent event relayed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedEvent {
    ConversationStarted {
        conversation_id: String,
    },
    ContentDelta {
        conversation_id: String,
        text: String,
    },
    Done,
    Error {
        message: String,
    },
}

impl NormalizedEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

pub fn extract_first_choice(chunk: &Value) -> Option<&Value> {
    chunk
        .get("choices")
        .and_then(|choices| choices.as_array())
        .and_then(|array| array.first())
}

/// Text of `choices[0].delta.content`, when it is a non-empty string.
pub fn extract_delta_content(chunk: &Value) -> Option<&str> {
    extract_first_choice(chunk)
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .filter(|content| !content.is_empty())
}

/// Maps one upstream line to at most one event.
pub fn normalize_line(line: &UpstreamLine, conversation_id: &str) -> Option<NormalizedEvent> {
    match line {
        UpstreamLine::Failure(failure) => Some(NormalizedEvent::Error {
            message: failure.to_string(),
        }),
        UpstreamLine::Data(raw) => {
            let payload = raw.strip_prefix(SSE_DATA_PREFIX).unwrap_or(raw).trim();

            if payload == SSE_DONE_MESSAGE {
                return Some(NormalizedEvent::Done);
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(chunk) => match extract_delta_content(&chunk) {
                    Some(text) => Some(NormalizedEvent::ContentDelta {
                        conversation_id: conversation_id.to_string(),
                        text: text.to_string(),
                    }),
                    None => {
                        log::trace!("skipping payload without content delta");
                        None
                    }
                },
                Err(e) => {
                    log::debug!("skipping unparseable payload: {}", e);
                    None
                }
            }
        }
    }
}

/// Turns upstream lines into events, ending with exactly one terminal event.
///
/// A provider stream that ends without the sentinel still yields `Done`.
/// Once a terminal event is handed out the reader is released and never
/// polled again.
pub struct EventNormalizer<S> {
    lines: UpstreamLines<S>,
    conversation_id: String,
    finished: bool,
    skipped: u64,
}

impl<S> EventNormalizer<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    pub fn new(lines: UpstreamLines<S>, conversation_id: impl Into<String>) -> Self {
        Self {
            lines,
            conversation_id: conversation_id.into(),
            finished: false,
            skipped: 0,
        }
    }

    pub async fn next_event(&mut self) -> Option<NormalizedEvent> {
        if self.finished {
            return None;
        }

        loop {
            let Some(line) = self.lines.next_line().await else {
                return Some(self.finish(NormalizedEvent::Done));
            };

            match normalize_line(&line, &self.conversation_id) {
                Some(event) if event.is_terminal() => return Some(self.finish(event)),
                Some(event) => return Some(event),
                None => self.skipped += 1,
            }
        }
    }

    fn finish(&mut self, event: NormalizedEvent) -> NormalizedEvent {
        self.finished = true;
        self.lines.release();
        event
    }
}

impl<S> EventNormalizer<S> {
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
