//! Server-sent events decoding shared by the streaming clients.
//!
//! Network chunks do not respect event boundaries, so the decoder buffers
//! bytes until a full line is available and dispatches an event on each
//! blank line.

use futures::{Stream, StreamExt};
use tracing::debug;

use crate::providers::provider::{ProviderError, TextStream};

/// One dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// What a client wants done with a decoded event
#[derive(Debug)]
pub enum SseAction {
    /// Forward text to the caller
    Text(String),
    /// Nothing to forward (pings, metadata)
    Skip,
    /// The provider signalled the end of the response
    Done,
    /// The provider reported an error inside the stream
    Error(ProviderError),
}

/// Incremental SSE line decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed a network chunk, returning every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

/// Decode a byte stream of SSE into provider text.
///
/// `on_event` maps each event to an [`SseAction`]. The stream ends on
/// [`SseAction::Done`], on the first error, or when the body ends.
pub fn decode_text_stream<S, B, E, F>(bytes: S, mut on_event: F) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
    F: FnMut(SseEvent) -> SseAction + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = SseDecoder::default();
        let mut finished = false;

        'body: while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err::<String, ProviderError>(e.into());
                    finished = true;
                    break 'body;
                }
            };
            for event in decoder.push(chunk.as_ref()) {
                match on_event(event) {
                    SseAction::Text(text) => {
                        if !text.is_empty() {
                            yield Ok::<String, ProviderError>(text);
                        }
                    }
                    SseAction::Skip => {}
                    SseAction::Done => {
                        finished = true;
                        break 'body;
                    }
                    SseAction::Error(e) => {
                        yield Err(e);
                        finished = true;
                        break 'body;
                    }
                }
            }
        }

        let trailing = if finished { None } else { decoder.finish() };
        if let Some(event) = trailing {
            match on_event(event) {
                SseAction::Text(text) if !text.is_empty() => {
                    yield Ok(text);
                }
                SseAction::Error(e) => {
                    yield Err(e);
                }
                _ => {}
            }
        }
        debug!("SSE stream closed");
    })
}
