//! Incremental decoder for `data:`-prefixed event streams
//!
//! Chat completion token streams and audio transcription event streams share
//! the same framing: one JSON object per `data: ` line, blank separator
//! lines, and an optional `[DONE]` sentinel. The decoder reads one line at a
//! time, checks the cancellation token before every read, and never runs
//! ahead of the consumer by more than the events of a single line.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{DecodeError, TransportError};
use crate::types::{ChatCompletionChunk, StreamEvent, StreamMetadata, TranscriptionStreamEvent};

/// Prefix of every event line
const DATA_PREFIX: &str = "data: ";

/// Payload that ends the stream
const DONE_SENTINEL: &str = "[DONE]";

/// Decoded event stream
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, DecodeError>> + Send>>;

/// Per-stream bookkeeping shared across payloads
#[derive(Debug, Default)]
pub struct DecodeState {
    metadata_sent: bool,
    done_sent: bool,
}

impl DecodeState {
    /// Returns `true` the first time it is called
    pub const fn claim_metadata(&mut self) -> bool {
        !std::mem::replace(&mut self.metadata_sent, true)
    }

    /// Returns `true` the first time it is called
    pub const fn claim_done(&mut self) -> bool {
        !std::mem::replace(&mut self.done_sent, true)
    }
}

/// A JSON payload that maps onto stream events
pub trait EventPayload: DeserializeOwned + Send + 'static {
    /// Events derived from this payload, in emission order
    fn into_events(self, state: &mut DecodeState) -> Vec<StreamEvent>;
}

impl EventPayload for ChatCompletionChunk {
    fn into_events(self, state: &mut DecodeState) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let role = self.choices.iter().find_map(|choice| choice.delta.role);
        if (self.id.is_some() || self.model.is_some() || role.is_some()) && state.claim_metadata() {
            events.push(StreamEvent::MetadataDelta(StreamMetadata {
                id: self.id,
                model: self.model,
                role,
                language: None,
            }));
        }

        let mut finish_reason = None;
        for choice in self.choices {
            // Only a present `content` field is text, even when empty
            if let Some(content) = choice.delta.content {
                events.push(StreamEvent::ContentDelta(content.text()));
            }
            if choice.finish_reason.is_some() && finish_reason.is_none() {
                finish_reason = choice.finish_reason;
            }
        }

        if let Some(usage) = self.usage {
            events.push(StreamEvent::Usage(usage));
        }

        if finish_reason.is_some() && state.claim_done() {
            events.push(StreamEvent::Done { finish_reason });
        }

        events
    }
}

impl EventPayload for TranscriptionStreamEvent {
    fn into_events(self, state: &mut DecodeState) -> Vec<StreamEvent> {
        match self {
            Self::Language { audio_language } => {
                if state.claim_metadata() {
                    vec![StreamEvent::MetadataDelta(StreamMetadata {
                        language: Some(audio_language),
                        ..StreamMetadata::default()
                    })]
                } else {
                    vec![]
                }
            }
            Self::TextDelta { text } => vec![StreamEvent::ContentDelta(text)],
            Self::Segment { .. } => vec![],
            Self::Done { usage, .. } => {
                let mut events: Vec<StreamEvent> = usage.into_iter().map(StreamEvent::Usage).collect();
                if state.claim_done() {
                    events.push(StreamEvent::Done { finish_reason: None });
                }
                events
            }
        }
    }
}

/// Decode a chat completion token stream
pub fn decode_chat<S>(bytes: S, cancel: CancellationToken) -> EventStream
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
{
    decode::<ChatCompletionChunk, S>(bytes, cancel)
}

/// Decode an audio transcription event stream
pub fn decode_transcription<S>(bytes: S, cancel: CancellationToken) -> EventStream
where
    S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
{
    decode::<TranscriptionStreamEvent, S>(bytes, cancel)
}

/// Decode a byte stream into events using payload type `P`
///
/// Terminates on the `[DONE]` sentinel or end of input. A line that fails to
/// parse is skipped; transport failures and cancellation are yielded as a
/// final error.
pub fn decode<P, S>(bytes: S, cancel: CancellationToken) -> EventStream
where
    P: EventPayload,
    S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut lines = LineReader::new(bytes);
        let mut state = DecodeState::default();

        loop {
            if cancel.is_cancelled() {
                yield Err(DecodeError::Cancelled);
                break;
            }

            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                line = lines.next_line() => Some(line),
            };

            let line = match next {
                None => {
                    yield Err(DecodeError::Cancelled);
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "event stream transport failed");
                    yield Err(DecodeError::Transport(e));
                    break;
                }
                Some(Ok(None)) => break,
                Some(Ok(Some(line))) => line,
            };

            match parse_line::<P>(&line) {
                Line::Skip => {}
                Line::Done => break,
                Line::Payload(payload) => {
                    for event in payload.into_events(&mut state) {
                        yield Ok(event);
                    }
                }
            }
        }
    };

    Box::pin(stream)
}

enum Line<P> {
    Skip,
    Done,
    Payload(P),
}

fn parse_line<P: DeserializeOwned>(line: &str) -> Line<P> {
    if line.trim().is_empty() {
        return Line::Skip;
    }

    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        tracing::trace!(line, "skipping non-data line");
        return Line::Skip;
    };

    let data = data.trim();
    if data == DONE_SENTINEL {
        return Line::Done;
    }

    match serde_json::from_str::<P>(data) {
        Ok(payload) => Line::Payload(payload),
        Err(e) => {
            tracing::debug!(error = %e, data, "skipping unparseable stream event");
            Line::Skip
        }
    }
}

/// Splits a chunked byte stream into lines without reading ahead
struct LineReader<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl<S> LineReader<S>
where
    S: Stream<Item = Result<Bytes, TransportError>>,
{
    fn new(inner: S) -> Self {
        Self {
            inner: Box::pin(inner),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Next line without its terminator, or `None` at end of input
    ///
    /// An unterminated trailing line is returned as a final line.
    async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.buffer);
                return Ok(Some(String::from_utf8_lossy(&rest).into_owned()));
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(e),
                None => self.finished = true,
            }
        }
    }
}
