//! Server-sent-event decoding for the chat stream endpoints.
//!
//! The backend emits newline-delimited `data: {json}` lines:
//!
//! ```text
//! data: {"type":"token","content":"Hel"}
//! data: {"type":"token","content":"lo"}
//! data: {"type":"complete","content":"Hello"}
//! ```
//!
//! [`decode`] turns a body [`ByteStream`] into an [`EventStream`] that always
//! ends with exactly one terminal event ([`StreamEvent::Done`] or
//! [`StreamEvent::Error`]) unless it is cancelled.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::http_client::ByteStream;

/// Token shown to the user when the connection drops mid-answer.
pub const INTERRUPTED_MESSAGE: &str =
    "I'm sorry, the connection was interrupted. Please try again.";

const DATA_PREFIX: &str = "data:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Token { content: String },
    Done { content: String },
    Error { message: String },
}

impl StreamEvent {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Decoded chat events, produced lazily as body chunks arrive.
pub type EventStream = BoxStream<'static, StreamEvent>;

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
    done: Option<bool>,
    message: Option<String>,
}

/// Incremental line decoder.
///
/// Bytes are buffered until a newline arrives, so a line split across
/// chunks (including inside a multi-byte character) decodes intact.
/// Once a terminal event is produced the decoder ignores further input.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one chunk; returns the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.buffer.extend_from_slice(chunk);
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = decode_line(&line[..newline]) {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    self.finish_now();
                    break;
                }
            }
        }
        events
    }

    /// Signal a clean end of input: decodes any unterminated last line and,
    /// if no terminal event was seen, closes with an empty `Done`.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        let rest = std::mem::take(&mut self.buffer);
        if let Some(event) = decode_line(&rest) {
            events.push(event);
        }
        if !events.last().is_some_and(StreamEvent::is_terminal) {
            events.push(StreamEvent::Done {
                content: String::new(),
            });
        }
        self.finish_now();
        events
    }

    /// Signal a transport failure: apology token plus empty `Done`, unless
    /// the stream already ended.
    pub fn interrupt(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finish_now();
        vec![
            StreamEvent::Token {
                content: INTERRUPTED_MESSAGE.to_string(),
            },
            StreamEvent::Done {
                content: String::new(),
            },
        ]
    }

    fn finish_now(&mut self) {
        self.finished = true;
        self.buffer.clear();
    }
}

fn decode_line(raw: &[u8]) -> Option<StreamEvent> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line,
        Err(error) => {
            trace!(%error, "skipping non-utf8 stream line");
            return None;
        }
    };

    let json = line.strip_prefix(DATA_PREFIX)?;
    let json = json.strip_prefix(' ').unwrap_or(json);
    let payload: WirePayload = match serde_json::from_str(json) {
        Ok(payload) => payload,
        Err(error) => {
            trace!(%error, line, "skipping malformed stream line");
            return None;
        }
    };

    // An error always wins; otherwise `done: true` ends the stream whatever the type.
    match payload.kind.as_deref() {
        Some("error") => Some(StreamEvent::Error {
            message: payload
                .message
                .or(payload.content)
                .unwrap_or_else(|| String::from("stream error")),
        }),
        Some("complete") => Some(StreamEvent::Done {
            content: payload.content.unwrap_or_default(),
        }),
        _ if payload.done == Some(true) => Some(StreamEvent::Done {
            content: payload.content.unwrap_or_default(),
        }),
        Some("token") => Some(StreamEvent::Token {
            content: payload.content.unwrap_or_default(),
        }),
        _ => None,
    }
}

struct DecodeState {
    body: Option<ByteStream>,
    decoder: SseLineDecoder,
    queue: VecDeque<StreamEvent>,
    cancel: CancellationToken,
}

enum Step {
    Cancelled,
    Chunk(Option<Result<Vec<u8>, crate::http_client::HttpError>>),
}

/// Decode an SSE body into chat events.
///
/// Cancelling `cancel` (or dropping the returned stream) drops the body,
/// which aborts the underlying HTTP read. A cancelled stream ends without
/// a terminal event.
pub fn decode(body: ByteStream, cancel: CancellationToken) -> EventStream {
    let state = DecodeState {
        body: Some(body),
        decoder: SseLineDecoder::new(),
        queue: VecDeque::new(),
        cancel,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.cancel.is_cancelled() {
                state.body = None;
                return None;
            }
            if let Some(event) = state.queue.pop_front() {
                return Some((event, state));
            }

            let step = {
                let body = state.body.as_mut()?;
                tokio::select! {
                    biased;
                    () = state.cancel.cancelled() => Step::Cancelled,
                    chunk = body.next() => Step::Chunk(chunk),
                }
            };

            let events = match step {
                Step::Cancelled => {
                    debug!("chat stream cancelled");
                    state.body = None;
                    return None;
                }
                Step::Chunk(Some(Ok(bytes))) => state.decoder.push(&bytes),
                Step::Chunk(Some(Err(error))) => {
                    debug!(%error, "chat stream interrupted");
                    state.decoder.interrupt()
                }
                Step::Chunk(None) => state.decoder.finish(),
            };
            if state.decoder.is_finished() {
                state.body = None;
            }
            state.queue.extend(events);
        }
    })
    .boxed()
}
