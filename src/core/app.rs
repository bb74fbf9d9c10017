//! State behind the follow-up chat panel: the conversation about one scan,
//! the stream currently feeding it, and the last notification to show.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ScanContext;
use crate::core::analysis::suggested_questions;
use crate::core::chat_stream::{StreamMessage, StreamParams};
use crate::core::conversation::{Conversation, SubmitError};
use crate::core::message::ChatMessage;
use crate::core::service::ServiceSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Error(String),
}

impl Notification {
    pub fn text(&self) -> &str {
        match self {
            Notification::Info(text) | Notification::Error(text) => text,
        }
    }
}

pub struct ChatApp {
    conversation: Conversation,
    context: ScanContext,
    client: reqwest::Client,
    settings: ServiceSettings,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
    notification: Option<Notification>,
}

impl ChatApp {
    pub fn new(client: reqwest::Client, settings: ServiceSettings, context: ScanContext) -> Self {
        Self {
            conversation: Conversation::new(),
            context,
            client,
            settings,
            current_stream_id: 0,
            cancel_token: None,
            notification: None,
        }
    }

    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn is_waiting(&self) -> bool {
        self.conversation.is_in_flight()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn set_notification(&mut self, notification: Notification) {
        self.notification = Some(notification);
    }

    pub fn clear_notification(&mut self) {
        self.notification = None;
    }

    /// Suggested opening questions; empty once the conversation has started.
    pub fn suggestions(&self) -> Vec<String> {
        if !self.conversation.is_empty() {
            return Vec::new();
        }
        suggested_questions(&self.context.name).to_vec()
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }

    /// Record `input` as the next user turn and prepare the request that will
    /// answer it. The transcript sent is everything up to and including the
    /// new user message; the assistant placeholder is opened afterwards.
    pub fn send(&mut self, input: &str) -> Result<StreamParams, SubmitError> {
        self.conversation.submit_user_message(input)?;
        let messages = self.conversation.api_messages();
        self.conversation.begin_assistant_message();

        self.current_stream_id += 1;
        let cancel_token = CancellationToken::new();
        self.cancel_token = Some(cancel_token.clone());
        self.notification = None;

        Ok(StreamParams {
            client: self.client.clone(),
            settings: self.settings.clone(),
            messages,
            context: self.context.clone(),
            cancel_token,
            stream_id: self.current_stream_id,
        })
    }

    /// Apply one message from the stream channel. Messages from superseded or
    /// cancelled streams are dropped. Returns true when the view changed.
    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) -> bool {
        if !self.is_current_stream(stream_id) || self.cancel_token.is_none() {
            debug!(stream_id, current = self.current_stream_id, "dropping stale stream message");
            return false;
        }

        match message {
            StreamMessage::Chunk(delta) => self.conversation.apply_delta(&delta),
            StreamMessage::Error(error) => {
                self.conversation.abort_on_error();
                self.notification = Some(Notification::Error(error));
                true
            }
            StreamMessage::End => {
                if self.conversation.is_in_flight() {
                    self.conversation.finalize();
                }
                self.cancel_token = None;
                true
            }
        }
    }

    /// Tear the panel down: abort any in-flight request and forget the
    /// conversation. Late chunks for the aborted stream are ignored.
    pub fn close(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.current_stream_id += 1;
        self.conversation.reset();
        self.notification = None;
    }
}
