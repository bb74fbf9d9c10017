//! Incremental decoder for the chat function's `text/event-stream` body.
//!
//! The decoder owns every byte it has not yet been able to decode, so callers
//! may hand it network chunks of any size. Content deltas come out in the
//! order their lines arrived on the wire.

use std::error::Error as StdError;
use std::fmt;

use memchr::memchr;
use serde_json::error::Category;
use tracing::{debug, warn};

use crate::api::ChatChunk;
use crate::core::service::error_summary;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Upper bound on undecoded bytes held between chunks.
pub const MAX_PENDING_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    /// A well-formed payload that carried an `error` member instead of content.
    ApiError(String),
    Done,
}

#[derive(Debug)]
pub enum DecodeError {
    /// A `data:` line that still failed to parse after its one retry.
    Framing {
        line: String,
        source: serde_json::Error,
    },
    /// Undecoded input grew past [`MAX_PENDING_BYTES`].
    Overflow { pending: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Framing { line, source } => {
                write!(f, "Malformed stream data ({source}): {}", preview(line))
            }
            DecodeError::Overflow { pending } => {
                write!(
                    f,
                    "Stream line exceeded {MAX_PENDING_BYTES} bytes ({pending} pending)"
                )
            }
        }
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DecodeError::Framing { source, .. } => Some(source),
            DecodeError::Overflow { .. } => None,
        }
    }
}

fn preview(line: &str) -> String {
    const LIMIT: usize = 80;
    match line.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}…", &line[..idx]),
        None => line.to_string(),
    }
}

/// A line whose payload failed to parse once. It stays at the front of the
/// buffer until the next line is available to retry against.
#[derive(Debug)]
struct Deferred {
    line: String,
    /// Text after `data: `, untrimmed, so whitespace before the break survives
    /// the join.
    raw: String,
    /// Bytes occupied in the buffer, newline included.
    len: usize,
}

enum LineKind<'a> {
    Skip,
    Done,
    Payload(&'a str),
}

fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() || line.starts_with(':') {
        return LineKind::Skip;
    }
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return LineKind::Skip;
    };
    let payload = rest.trim();
    if payload.is_empty() {
        LineKind::Skip
    } else if payload == DONE_SENTINEL {
        LineKind::Done
    } else {
        LineKind::Payload(payload)
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Syntax and EOF errors may resolve once more bytes arrive; data errors mean
/// the JSON was complete but had an unexpected shape.
fn may_complete_later(err: &serde_json::Error) -> bool {
    matches!(err.classify(), Category::Syntax | Category::Eof)
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    deferred: Option<Deferred>,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `[DONE]` was seen or [`finish`](Self::finish) was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes received but not yet decoded.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Result<Vec<SseEvent>, DecodeError> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk.as_ref());
        self.drain(false)
    }

    /// Signal end of input. A trailing line without a newline is dropped; a
    /// deferred line gets its final retry against whatever follows it.
    pub fn finish(&mut self) -> Result<Vec<SseEvent>, DecodeError> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.drain(true)
    }

    fn drain(&mut self, at_eof: bool) -> Result<Vec<SseEvent>, DecodeError> {
        let mut events = Vec::new();

        while !self.finished {
            if self.deferred.is_some() {
                if !self.retry_deferred(at_eof, &mut events)? {
                    break;
                }
                continue;
            }

            let Some(newline) = memchr(b'\n', &self.buffer) else {
                break;
            };

            let line = match std::str::from_utf8(&self.buffer[..newline]) {
                Ok(text) => strip_cr(text).to_string(),
                Err(err) => {
                    warn!(error = %err, "skipping stream line with invalid UTF-8");
                    self.buffer.drain(..=newline);
                    continue;
                }
            };

            match classify(&line) {
                LineKind::Skip => {
                    self.buffer.drain(..=newline);
                }
                LineKind::Done => {
                    debug!("stream reported [DONE]");
                    self.finish_now();
                    events.push(SseEvent::Done);
                }
                LineKind::Payload(payload) => match serde_json::from_str::<ChatChunk>(payload) {
                    Ok(chunk) => {
                        self.buffer.drain(..=newline);
                        push_chunk_events(chunk, &mut events);
                    }
                    Err(err) if may_complete_later(&err) => {
                        debug!(error = %err, "deferring incomplete stream payload");
                        let raw = line.strip_prefix(DATA_PREFIX).unwrap_or(payload);
                        self.deferred = Some(Deferred {
                            raw: raw.to_string(),
                            line,
                            len: newline + 1,
                        });
                        // Wait for more data before touching the rest of this chunk.
                        break;
                    }
                    Err(err) => {
                        debug!(error = %err, "ignoring stream payload with unexpected shape");
                        self.buffer.drain(..=newline);
                    }
                },
            }
        }

        if at_eof {
            if !self.buffer.is_empty() {
                debug!(
                    bytes = self.buffer.len(),
                    "discarding partial stream line at end of input"
                );
            }
            self.finish_now();
        } else if self.buffer.len() > MAX_PENDING_BYTES {
            return Err(DecodeError::Overflow {
                pending: self.buffer.len(),
            });
        }

        Ok(events)
    }

    /// Returns `Ok(false)` when the retry has to wait for more input.
    fn retry_deferred(
        &mut self,
        at_eof: bool,
        events: &mut Vec<SseEvent>,
    ) -> Result<bool, DecodeError> {
        let Some(deferred) = self.deferred.as_ref() else {
            return Ok(true);
        };

        let rest = &self.buffer[deferred.len..];
        let (next_end, consumed) = match memchr(b'\n', rest) {
            Some(pos) => (deferred.len + pos, deferred.len + pos + 1),
            None if at_eof => (self.buffer.len(), self.buffer.len()),
            None => return Ok(false),
        };

        let next_line = String::from_utf8_lossy(&self.buffer[deferred.len..next_end]);
        // A CR that sat inside a split string value is not preserved.
        let next_line = strip_cr(&next_line);

        // The break may have fallen between JSON tokens or inside a string value.
        let between_tokens = format!("{}\n{}", deferred.raw, next_line);
        let inside_string = format!("{}\\n{}", deferred.raw, next_line);

        let parsed = serde_json::from_str::<ChatChunk>(between_tokens.trim())
            .or_else(|_| serde_json::from_str::<ChatChunk>(inside_string.trim()));

        let Some(deferred) = self.deferred.take() else {
            return Ok(true);
        };
        match parsed {
            Ok(chunk) => {
                debug!("deferred stream payload resolved on retry");
                self.buffer.drain(..consumed);
                push_chunk_events(chunk, events);
                Ok(true)
            }
            Err(source) => {
                warn!(error = %source, "stream payload still malformed after retry");
                self.finish_now();
                Err(DecodeError::Framing {
                    line: deferred.line,
                    source,
                })
            }
        }
    }

    fn finish_now(&mut self) {
        self.finished = true;
        self.deferred = None;
        self.buffer.clear();
    }
}

fn push_chunk_events(chunk: ChatChunk, events: &mut Vec<SseEvent>) {
    if let Some(error) = chunk.error.as_ref() {
        let message = error_summary(error).unwrap_or_else(|| error.to_string());
        events.push(SseEvent::ApiError(message));
        return;
    }
    if let Some(delta) = chunk.content_delta() {
        events.push(SseEvent::Delta(delta));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    fn decode_in_chunks(input: &[u8], chunk_size: usize) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in input.chunks(chunk_size) {
            events.extend(decoder.feed(chunk).expect("feed"));
        }
        events.extend(decoder.finish().expect("finish"));
        events
    }

    #[test]
    fn delta_split_across_chunks_is_emitted_once_complete() {
        let mut decoder = SseDecoder::new();

        let first = decoder
            .feed(r#"data: {"choices":[{"delta":{"content":"Hel"#)
            .unwrap();
        assert!(first.is_empty());

        let second = decoder
            .feed("lo\"}}]}\n\ndata: [DONE]\n\n")
            .unwrap();
        assert_eq!(
            second,
            vec![SseEvent::Delta("Hello".into()), SseEvent::Done]
        );
        assert!(decoder.is_finished());
    }

    #[test]
    fn chunk_boundaries_do_not_change_output() {
        let mut body = String::new();
        for piece in ["## Bana", "nas\n", "- rich in **potassium**", " 🍌", "\n\nTip: eat ripe"] {
            body.push_str(&delta_line(piece));
        }
        body.push_str(": keepalive\r\n");
        body.push_str("event: ping\n");
        body.push_str("data: [DONE]\n\n");

        let whole = decode_in_chunks(body.as_bytes(), body.len());
        assert_eq!(whole.len(), 6);
        assert_eq!(whole.last(), Some(&SseEvent::Done));

        for size in 1..=17 {
            assert_eq!(decode_in_chunks(body.as_bytes(), size), whole, "chunk size {size}");
        }
    }

    #[test]
    fn multibyte_characters_survive_byte_splits() {
        let body = delta_line("héllo 💡");
        let events = decode_in_chunks(body.as_bytes(), 1);
        assert_eq!(events, vec![SseEvent::Delta("héllo 💡".into())]);
    }

    #[test]
    fn comments_blank_lines_and_other_fields_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .feed(":ok\n\nretry: 100\nid: 7\ndata: \ndata: {\"choices\":[]}\n")
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .feed("data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n")
            .unwrap();
        assert_eq!(events, vec![SseEvent::Delta("ok".into())]);
    }

    #[test]
    fn done_stops_decoding_and_drops_the_remainder() {
        let mut decoder = SseDecoder::new();
        let mut input = delta_line("a");
        input.push_str("data: [DONE]\n");
        input.push_str(&delta_line("ignored"));
        let events = decoder.feed(&input).unwrap();
        assert_eq!(events, vec![SseEvent::Delta("a".into()), SseEvent::Done]);
        assert!(decoder.feed(delta_line("later")).unwrap().is_empty());
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn unterminated_trailing_line_is_discarded_at_end() {
        let mut decoder = SseDecoder::new();
        let mut input = delta_line("kept");
        input.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"lost\"}}]}");
        assert_eq!(
            decoder.feed(&input).unwrap(),
            vec![SseEvent::Delta("kept".into())]
        );
        assert!(decoder.finish().unwrap().is_empty());
        assert!(decoder.is_finished());
    }

    #[test]
    fn payload_broken_between_tokens_is_joined_on_retry() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed("data: {\"choices\":\n").unwrap();
        assert!(events.is_empty());

        let events = decoder
            .feed("[{\"delta\":{\"content\":\"joined\"}}]}\n\n")
            .unwrap();
        assert_eq!(events, vec![SseEvent::Delta("joined".into())]);
    }

    #[test]
    fn payload_broken_inside_a_string_keeps_the_newline() {
        let mut decoder = SseDecoder::new();
        assert!(decoder
            .feed("data: {\"choices\":[{\"delta\":{\"content\":\"line one\n")
            .unwrap()
            .is_empty());
        let events = decoder.feed("line two\"}}]}\n\n").unwrap();
        assert_eq!(events, vec![SseEvent::Delta("line one\nline two".into())]);
    }

    #[test]
    fn whitespace_around_a_string_break_is_kept() {
        let mut decoder = SseDecoder::new();
        assert!(decoder
            .feed("data: {\"choices\":[{\"delta\":{\"content\":\"Hello \n")
            .unwrap()
            .is_empty());
        let events = decoder.feed("  world\"}}]}\n\n").unwrap();
        assert_eq!(events, vec![SseEvent::Delta("Hello \n  world".into())]);
    }

    #[test]
    fn deferral_pauses_the_rest_of_the_chunk() {
        let mut decoder = SseDecoder::new();
        let mut input = String::from("data: {\"choices\":\n");
        input.push_str("[{\"delta\":{\"content\":\"x\"}}]}\n");
        input.push_str(&delta_line("y"));

        assert!(decoder.feed(&input).unwrap().is_empty());
        assert_eq!(
            decoder.feed("").unwrap(),
            vec![SseEvent::Delta("x".into()), SseEvent::Delta("y".into())]
        );
    }

    #[test]
    fn permanently_malformed_line_becomes_a_framing_error() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed("data: {not json}\n").unwrap().is_empty());
        let err = decoder.feed("\n").unwrap_err();
        match err {
            DecodeError::Framing { line, .. } => assert_eq!(line, "data: {not json}"),
            other => panic!("expected framing error, got {other:?}"),
        }
        assert!(decoder.is_finished());
    }

    #[test]
    fn malformed_line_at_end_of_input_is_reported() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed("data: {\"choices\":[\n").unwrap().is_empty());
        assert!(matches!(
            decoder.finish(),
            Err(DecodeError::Framing { .. })
        ));
    }

    #[test]
    fn valid_json_of_unexpected_shape_yields_nothing() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed("data: {\"choices\":\"nope\"}\n\n").unwrap();
        assert!(events.is_empty());
        assert!(!decoder.is_finished());
    }

    #[test]
    fn in_band_errors_are_surfaced() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .feed("data: {\"error\":{\"message\":\"quota   exceeded\"}}\n\n")
            .unwrap();
        assert_eq!(events, vec![SseEvent::ApiError("quota exceeded".into())]);
    }

    #[test]
    fn oversized_pending_line_is_rejected() {
        let mut decoder = SseDecoder::new();
        let filler = vec![b'a'; MAX_PENDING_BYTES + 1];
        assert!(matches!(
            decoder.feed(&filler),
            Err(DecodeError::Overflow { .. })
        ));
    }

    #[test]
    fn accumulated_deltas_concatenate_in_order() {
        let pieces = ["The ", "quick ", "brown ", "fox"];
        let body: String = pieces.iter().map(|p| delta_line(p)).collect();
        let text: String = decode_in_chunks(body.as_bytes(), 7)
            .into_iter()
            .filter_map(|event| match event {
                SseEvent::Delta(delta) => Some(delta),
                _ => None,
            })
            .collect();
        assert_eq!(text, pieces.concat());
    }
}
