use std::fmt;

use crate::core::message::{ChatMessage, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Input was empty or whitespace only.
    Empty,
    /// A reply is still streaming; sends are not interleaved.
    InFlight,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Empty => write!(f, "Nothing to send"),
            SubmitError::InFlight => write!(f, "Still waiting for the previous reply"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// The ordered transcript of one follow-up conversation and the single reply
/// that may be streaming into it.
///
/// There is exactly one writer. A send opens the conversation
/// (`submit_user_message`), the reply is opened with
/// `begin_assistant_message`, grown with `apply_delta`, and closed with either
/// `finalize` or `abort_on_error`.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    in_flight: bool,
    reply_open: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// True while an assistant reply accepts deltas.
    pub fn is_streaming(&self) -> bool {
        self.reply_open
    }

    pub fn submit_user_message(&mut self, text: &str) -> Result<(), SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.in_flight {
            return Err(SubmitError::InFlight);
        }
        self.messages.push(ChatMessage::user(text));
        self.in_flight = true;
        Ok(())
    }

    /// Transcript to send with the next request.
    pub fn api_messages(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn begin_assistant_message(&mut self) {
        self.messages.push(ChatMessage::new(Role::Assistant, String::new()));
        self.reply_open = true;
    }

    /// Append `delta` to the open reply. Returns false when there is no open
    /// reply or the newest message is not the assistant's.
    pub fn apply_delta(&mut self, delta: &str) -> bool {
        if !self.reply_open {
            return false;
        }
        match self.messages.last_mut() {
            Some(last) if last.is_assistant() => {
                last.content.push_str(delta);
                true
            }
            _ => false,
        }
    }

    pub fn finalize(&mut self) {
        self.reply_open = false;
        self.in_flight = false;
    }

    /// Close the current send after a failure. An assistant placeholder that
    /// never received text is removed; partial text is kept.
    pub fn abort_on_error(&mut self) {
        if matches!(self.messages.last(), Some(last) if last.is_assistant() && last.content.is_empty())
        {
            self.messages.pop();
        }
        self.reply_open = false;
        self.in_flight = false;
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.reply_open = false;
        self.in_flight = false;
    }

    /// Content of the newest assistant message, if the newest message is one.
    pub fn current_reply(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|message| message.is_assistant())
            .map(|message| message.content.as_str())
    }
}
