use std::fmt::Display;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatRequest, ScanContext};
use crate::core::message::ChatMessage;
use crate::core::service::{status_error, ServiceSettings, CHAT_FUNCTION};
use crate::core::sse::{SseDecoder, SseEvent};

const GENERIC_FAILURE: &str = "Failed to get response";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub settings: ServiceSettings,
    pub messages: Vec<ChatMessage>,
    pub context: ScanContext,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

type StreamSender = mpsc::UnboundedSender<(StreamMessage, u64)>;

#[derive(Clone)]
pub struct ChatStreamService {
    tx: StreamSender,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let cancel_token = params.cancel_token.clone();
            tokio::select! {
                _ = run_stream(params, &tx) => {}
                _ = cancel_token.cancelled() => {
                    debug!("chat stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(params: StreamParams, tx: &StreamSender) {
    let StreamParams {
        client,
        settings,
        messages,
        context,
        cancel_token,
        stream_id,
    } = params;

    let request = ChatRequest {
        messages: &messages,
        context: &context,
    };

    let url = settings.function_url(CHAT_FUNCTION);
    debug!(%url, stream_id, messages = messages.len(), "starting chat stream");

    let response = match settings.authorize(client.post(url)).json(&request).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "chat request failed");
            fail(tx, stream_id, format!("Request failed: {err}"));
            return;
        }
    };

    if !response.status().is_success() {
        let err = status_error(response, GENERIC_FAILURE).await;
        warn!(error = %err, "chat function returned an error");
        fail(tx, stream_id, err.to_string());
        return;
    }

    pump_body(response.bytes_stream(), tx, stream_id, &cancel_token).await;
}

fn fail(tx: &StreamSender, stream_id: u64, message: String) {
    let _ = tx.send((StreamMessage::Error(message), stream_id));
    let _ = tx.send((StreamMessage::End, stream_id));
}

/// Forward decoded events. Returns true when the stream is over.
fn forward_events(events: Vec<SseEvent>, tx: &StreamSender, stream_id: u64) -> bool {
    for event in events {
        match event {
            SseEvent::Delta(delta) => {
                let _ = tx.send((StreamMessage::Chunk(delta), stream_id));
            }
            SseEvent::ApiError(message) => {
                fail(tx, stream_id, message);
                return true;
            }
            SseEvent::Done => {
                let _ = tx.send((StreamMessage::End, stream_id));
                return true;
            }
        }
    }
    false
}

/// Feed a response body through an [`SseDecoder`], forwarding content deltas
/// until `[DONE]`, an error, cancellation, or the end of the body.
pub(crate) async fn pump_body<S, B, E>(
    body: S,
    tx: &StreamSender,
    stream_id: u64,
    cancel_token: &CancellationToken,
) where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = body.next().await {
        if cancel_token.is_cancelled() {
            return;
        }

        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "chat stream interrupted");
                fail(tx, stream_id, format!("Stream interrupted: {err}"));
                return;
            }
        };

        match decoder.feed(bytes) {
            Ok(events) => {
                if forward_events(events, tx, stream_id) {
                    return;
                }
            }
            Err(err) => {
                fail(tx, stream_id, err.to_string());
                return;
            }
        }
    }

    if cancel_token.is_cancelled() {
        return;
    }

    match decoder.finish() {
        Ok(events) => {
            if forward_events(events, tx, stream_id) {
                return;
            }
        }
        Err(err) => {
            fail(tx, stream_id, err.to_string());
            return;
        }
    }

    debug!(stream_id, "chat stream closed without [DONE]");
    let _ = tx.send((StreamMessage::End, stream_id));
}
