use std::fmt::{self, Display};
use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::constants::{
    CONVERSATION_ID_PREFIX, ERROR_MISSING_MESSAGE, LOG_PREFIX_CONN, LOG_PREFIX_ERROR,
    LOG_PREFIX_SUCCESS, LOG_PREFIX_WARNING,
};
use crate::error::RelayError;
use crate::logging::{log_timed, sanitize_log_message};
use crate::model::{ChatMessage, ChatRequest};
use crate::streaming::normalizer::{EventNormalizer, NormalizedEvent};
use crate::streaming::upstream::UpstreamLines;
use crate::streaming::writer::SseWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Started,
    Streaming,
    Terminated,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Init => "init",
            SessionState::Started => "started",
            SessionState::Streaming => "streaming",
            SessionState::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// `Done` reached the client.
    Completed,
    /// An `Error` event reached the client.
    Failed,
    /// The budget ran out; the stream was closed without a terminal frame.
    TimedOut,
    /// The client went away; upstream reading stopped.
    ClientDisconnected,
}

impl Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Failed => "failed",
            SessionOutcome::TimedOut => "timed out",
            SessionOutcome::ClientDisconnected => "client disconnected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Where the session was when it ended.
    pub exit_state: SessionState,
    pub deltas: u64,
    pub frames: u64,
}

/// Per-request relay context. Never shared between requests.
#[derive(Debug)]
pub struct Session {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
    cancellation: CancellationToken,
    state: SessionState,
}

impl Session {
    /// Validates the inbound request and resolves the conversation id.
    pub fn start(request: ChatRequest) -> Result<Self, RelayError> {
        let message = request
            .message
            .filter(|m| !m.is_empty())
            .ok_or_else(|| RelayError::bad_request(ERROR_MISSING_MESSAGE))?;

        let conversation_id = request
            .conversation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_conversation_id);

        let mut messages = request.history;
        messages.push(ChatMessage::user(message));

        Ok(Self {
            conversation_id,
            messages,
            cancellation: CancellationToken::new(),
            state: SessionState::Init,
        })
    }

    /// Token that stops the session before its next upstream pull.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

pub fn generate_conversation_id() -> String {
    format!(
        "{}{}",
        CONVERSATION_ID_PREFIX,
        chrono::Utc::now().timestamp_millis()
    )
}

/// Drives one session to completion.
///
/// `ConversationStarted` is written before `upstream` is first polled. The
/// timeout budget starts when streaming begins; when it runs out the stream
/// is closed without a further frame. Every exit path drops the upstream
/// reader and closes the writer exactly once.
pub async fn run_session<U, S>(
    mut session: Session,
    mut writer: SseWriter,
    timeout_budget: Duration,
    upstream: U,
) -> SessionReport
where
    U: Future<Output = UpstreamLines<S>>,
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let start_time = Instant::now();
    let mut deltas = 0u64;

    let started = NormalizedEvent::ConversationStarted {
        conversation_id: session.conversation_id.clone(),
    };
    session.state = SessionState::Started;
    let outcome = if writer.write(&started).await.is_err() {
        session.cancellation.cancel();
        SessionOutcome::ClientDisconnected
    } else {
        session.state = SessionState::Streaming;
        match tokio::time::timeout(
            timeout_budget,
            pump_events(&session, &mut writer, upstream, &mut deltas),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => SessionOutcome::TimedOut,
        }
    };

    let exit_state = std::mem::replace(&mut session.state, SessionState::Terminated);
    let frames = writer.close();

    let prefix = match outcome {
        SessionOutcome::Completed => LOG_PREFIX_SUCCESS,
        SessionOutcome::Failed => LOG_PREFIX_ERROR,
        SessionOutcome::TimedOut => LOG_PREFIX_WARNING,
        SessionOutcome::ClientDisconnected => LOG_PREFIX_CONN,
    };
    log_timed(
        prefix,
        &format!(
            "session [{}] {} while {} | {} deltas",
            sanitize_log_message(&session.conversation_id),
            outcome,
            exit_state,
            deltas
        ),
        start_time,
    );

    SessionReport {
        outcome,
        exit_state,
        deltas,
        frames,
    }
}

async fn pump_events<U, S>(
    session: &Session,
    writer: &mut SseWriter,
    upstream: U,
    deltas: &mut u64,
) -> SessionOutcome
where
    U: Future<Output = UpstreamLines<S>>,
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let token = &session.cancellation;

    let lines = tokio::select! {
        biased;
        _ = token.cancelled() => return SessionOutcome::ClientDisconnected,
        _ = writer.closed() => {
            token.cancel();
            return SessionOutcome::ClientDisconnected;
        }
        lines = upstream => lines,
    };

    let mut normalizer = EventNormalizer::new(lines, session.conversation_id.as_str());

    loop {
        if token.is_cancelled() {
            return SessionOutcome::ClientDisconnected;
        }

        let event = tokio::select! {
            biased;
            _ = token.cancelled() => return SessionOutcome::ClientDisconnected,
            _ = writer.closed() => {
                token.cancel();
                return SessionOutcome::ClientDisconnected;
            }
            event = normalizer.next_event() => event,
        };

        let Some(event) = event else {
            return SessionOutcome::Completed;
        };

        if writer.write(&event).await.is_err() {
            token.cancel();
            return SessionOutcome::ClientDisconnected;
        }

        match event {
            NormalizedEvent::ContentDelta { .. } => *deltas += 1,
            NormalizedEvent::Done => {
                if normalizer.skipped() > 0 {
                    log::debug!(
                        "session [{}] skipped {} unparseable provider lines",
                        session.conversation_id,
                        normalizer.skipped()
                    );
                }
                return SessionOutcome::Completed;
            }
            NormalizedEvent::Error { message } => {
                log::warn!("session [{}] upstream error: {}", session.conversation_id, message);
                return SessionOutcome::Failed;
            }
            NormalizedEvent::ConversationStarted { .. } => {}
        }
    }
}
