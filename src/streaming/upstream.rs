use std::io;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt, TryStreamExt};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::config::RelayConfig;
use crate::constants::{MAX_UPSTREAM_LINE_BYTES, SSE_DATA_PREFIX};
use crate::error::UpstreamFailure;
use crate::http::client::{read_error_body, send_chat_completion};
use crate::model::ChatMessage;

/// Response body of the provider, boxed so every session has the same type.
pub type ProviderBody = BoxStream<'static, io::Result<Bytes>>;

type LineReader<S> = FramedRead<StreamReader<S, Bytes>, LinesCodec>;

/// A line pulled from the provider stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamLine {
    /// A trimmed `data:` line, prefix still attached.
    Data(String),
    /// The stream could not be opened or broke mid-read. Always the last line.
    Failure(UpstreamFailure),
}

/// Pull-based reader over the provider's event stream.
///
/// Owns the response body; the connection is released as soon as the body is
/// exhausted, fails, `release` is called, or the reader is dropped. The body
/// is read only when no complete line is buffered.
pub struct UpstreamLines<S> {
    lines: Option<LineReader<S>>,
    failure: Option<UpstreamFailure>,
    lines_read: u64,
}

impl<S> UpstreamLines<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    pub fn new(body: S) -> Self {
        Self::with_max_line_length(body, MAX_UPSTREAM_LINE_BYTES)
    }

    /// A line longer than `max_length` bytes fails the stream.
    pub fn with_max_line_length(body: S, max_length: usize) -> Self {
        Self {
            lines: Some(FramedRead::new(
                StreamReader::new(body),
                LinesCodec::new_with_max_length(max_length),
            )),
            failure: None,
            lines_read: 0,
        }
    }

    /// A reader that yields one failure line and nothing else.
    pub fn failed(failure: UpstreamFailure) -> Self {
        Self {
            lines: None,
            failure: Some(failure),
            lines_read: 0,
        }
    }

    /// Pulls the next event line. Lines without an event payload are
    /// skipped; a trailing line without a newline is still returned.
    pub async fn next_line(&mut self) -> Option<UpstreamLine> {
        loop {
            let Some(reader) = self.lines.as_mut() else {
                return self.failure.take().map(UpstreamLine::Failure);
            };

            match reader.next().await {
                Some(Ok(line)) => {
                    self.lines_read += 1;
                    if let Some(event) = event_line(&line) {
                        return Some(UpstreamLine::Data(event.to_string()));
                    }
                }
                Some(Err(e)) => {
                    log::warn!("provider stream broke after {} lines: {}", self.lines_read, e);
                    self.release();
                    return Some(UpstreamLine::Failure(UpstreamFailure::Transport(
                        e.to_string(),
                    )));
                }
                None => {
                    self.release();
                    return None;
                }
            }
        }
    }
}

impl<S> UpstreamLines<S> {
    /// Drops the response body, returning the connection to the pool.
    pub fn release(&mut self) {
        if self.lines.take().is_some() {
            log::debug!("provider stream released after {} lines", self.lines_read);
        }
    }

    pub fn is_released(&self) -> bool {
        self.lines.is_none()
    }
}

/// Returns the trimmed line when it carries an event payload.
pub fn event_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.starts_with(SSE_DATA_PREFIX) {
        return None;
    }
    Some(trimmed)
}

/// Issues the streaming chat-completion request and wraps the outcome.
///
/// Failures to connect, non-success statuses and empty bodies all come back
/// as a reader holding a single failure line.
pub async fn open_upstream(
    client: reqwest::Client,
    config: std::sync::Arc<RelayConfig>,
    messages: Vec<ChatMessage>,
) -> UpstreamLines<ProviderBody> {
    let response = match send_chat_completion(&client, &config, &messages).await {
        Ok(response) => response,
        Err(failure) => return UpstreamLines::failed(failure),
    };

    let status = response.status();
    if !status.is_success() {
        let body = read_error_body(response).await;
        log::warn!("provider rejected stream request: {} - {}", status, body);
        return UpstreamLines::failed(UpstreamFailure::Http {
            status: status.as_u16(),
            body,
        });
    }

    if status == reqwest::StatusCode::NO_CONTENT || response.content_length() == Some(0) {
        return UpstreamLines::failed(UpstreamFailure::MissingBody);
    }

    UpstreamLines::new(response.bytes_stream().map_err(io::Error::other).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    type ChunkStream = stream::Iter<std::vec::IntoIter<io::Result<Bytes>>>;

    fn reader_over(chunks: Vec<&[u8]>) -> UpstreamLines<ChunkStream> {
        let items: Vec<io::Result<Bytes>> = chunks
            .into_iter()
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        UpstreamLines::new(stream::iter(items))
    }

    async fn drain<S>(mut reader: UpstreamLines<S>) -> Vec<UpstreamLine>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await {
            lines.push(line);
        }
        lines
    }

    const SAMPLE: &str = concat!(
        ": keep-alive\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Grüße \"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"🦀\"}}]}\r\n",
        "event: ping\n",
        "data: [DONE]\n",
    );

    #[tokio::test]
    async fn same_lines_for_every_chunk_boundary() {
        let bytes = SAMPLE.as_bytes();
        let expected = drain(reader_over(vec![bytes])).await;
        assert_eq!(expected.len(), 3);

        for split in 1..bytes.len() {
            let lines = drain(reader_over(vec![&bytes[..split], &bytes[split..]])).await;
            assert_eq!(lines, expected, "split at byte {}", split);
        }

        let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(drain(reader_over(single_bytes)).await, expected);
    }

    #[tokio::test]
    async fn skips_blank_and_foreign_lines() {
        let lines = drain(reader_over(vec![&b"\n\nid: 4\nretry: 10\ndata: x\n"[..]])).await;
        assert_eq!(lines, vec![UpstreamLine::Data("data: x".to_string())]);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_kept() {
        let lines = drain(reader_over(vec![&b"data: a\ndata: [DO"[..], &b"NE]"[..]])).await;
        assert_eq!(
            lines,
            vec![
                UpstreamLine::Data("data: a".to_string()),
                UpstreamLine::Data("data: [DONE]".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn transport_error_becomes_final_failure_line() {
        let items: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: one\ndata: tw")),
            Err(io::Error::other("connection reset by peer")),
            Ok(Bytes::from_static(b"o\n")),
        ];
        let mut reader = UpstreamLines::new(stream::iter(items));

        assert_eq!(
            reader.next_line().await,
            Some(UpstreamLine::Data("data: one".to_string()))
        );
        assert_eq!(
            reader.next_line().await,
            Some(UpstreamLine::Failure(UpstreamFailure::Transport(
                "connection reset by peer".to_string()
            )))
        );
        assert!(reader.is_released());
        assert_eq!(reader.next_line().await, None);
    }

    #[tokio::test]
    async fn invalid_utf8_fails_the_stream() {
        let mut reader = reader_over(vec![&b"data: ok\n"[..], &b"data: \xff\xfe\n"[..]]);

        assert_eq!(
            reader.next_line().await,
            Some(UpstreamLine::Data("data: ok".to_string()))
        );
        assert!(matches!(
            reader.next_line().await,
            Some(UpstreamLine::Failure(UpstreamFailure::Transport(_)))
        ));
        assert!(reader.is_released());
        assert_eq!(reader.next_line().await, None);
    }

    #[tokio::test]
    async fn overlong_line_fails_instead_of_buffering() {
        let items: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: short\n")),
            Ok(Bytes::from_static(b"data: this line never ends")),
            Ok(Bytes::from_static(b" and keeps going without a newline")),
        ];
        let mut reader = UpstreamLines::with_max_line_length(stream::iter(items), 16);

        assert_eq!(
            reader.next_line().await,
            Some(UpstreamLine::Data("data: short".to_string()))
        );
        assert_eq!(
            reader.next_line().await,
            Some(UpstreamLine::Failure(UpstreamFailure::Transport(
                "max line length exceeded".to_string()
            )))
        );
        assert!(reader.is_released());
    }

    #[tokio::test]
    async fn failed_reader_yields_only_the_failure() {
        let mut reader: UpstreamLines<ChunkStream> =
            UpstreamLines::failed(UpstreamFailure::MissingBody);
        assert_eq!(
            reader.next_line().await,
            Some(UpstreamLine::Failure(UpstreamFailure::MissingBody))
        );
        assert_eq!(reader.next_line().await, None);
    }

    #[test]
    fn event_line_trims_and_filters() {
        assert_eq!(event_line("  data: {}\r"), Some("data: {}"));
        assert_eq!(event_line("   "), None);
        assert_eq!(event_line("event: message"), None);
    }
}
