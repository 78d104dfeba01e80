//! Chat transcript ownership and the streaming send loop.
//!
//! A [`Conversation`] moves through three states:
//!
//! ```text
//! Idle --send--> Sending --first byte--> Streaming --end--> Idle
//!                   |                        |
//!                   +------- error ----------+--> (apology appended) Idle
//! ```
//!
//! Only one send may be in flight. A send that arrives while another is
//! running is ignored, not queued. The in-flight state is claimed through a
//! guard that resets it on every exit path, including early returns and a
//! dropped future.

use futures::StreamExt;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::api_connection::connection::ApiConnectionError;
use crate::chat_model::{ChatModel, HistoryTurn, ModelRequest, ModelRole};

/// Shown in place of a reply when the model call fails.
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Assistant,
        }
    }
}

impl From<&ChatMessage> for HistoryTurn {
    fn from(message: &ChatMessage) -> Self {
        HistoryTurn {
            role: match message.sender {
                Sender::User => ModelRole::User,
                Sender::Assistant => ModelRole::Model,
            },
            text: message.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversationState {
    Idle,
    /// Request sent, no placeholder yet.
    Sending,
    /// Placeholder appended; deltas are being written into it.
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    EmptyInput,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Ignored(IgnoredReason),
    Completed { reply: String },
}

#[derive(Debug)]
struct Inner {
    transcript: Vec<ChatMessage>,
    state: ConversationState,
}

pub struct Conversation<M> {
    model: M,
    system_instruction: String,
    inner: Mutex<Inner>,
}

/// Holds the in-flight claim; dropping it returns the conversation to idle.
struct SendingGuard<'c> {
    inner: &'c Mutex<Inner>,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.inner).state = ConversationState::Idle;
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<M: ChatModel> Conversation<M> {
    pub fn new(model: M, system_instruction: impl Into<String>) -> Self {
        Self {
            model,
            system_instruction: system_instruction.into(),
            inner: Mutex::new(Inner {
                transcript: Vec::new(),
                state: ConversationState::Idle,
            }),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        lock(&self.inner).transcript.clone()
    }

    pub fn state(&self) -> ConversationState {
        lock(&self.inner).state
    }

    pub fn is_sending(&self) -> bool {
        self.state() != ConversationState::Idle
    }

    /// Text of the most recent assistant message, complete or in progress.
    pub fn last_assistant_text(&self) -> Option<String> {
        lock(&self.inner)
            .transcript
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Assistant)
            .map(|m| m.text.clone())
    }

    /// Starts a fresh chat. Refused while a send is in flight.
    pub fn reset(&self) -> bool {
        let mut inner = lock(&self.inner);
        if inner.state != ConversationState::Idle {
            return false;
        }
        inner.transcript.clear();
        true
    }

    /// Sends one user turn and streams the reply into the transcript,
    /// calling `on_delta` with each fragment as it arrives.
    ///
    /// Blank input and sends made while another is in flight are ignored and
    /// leave the transcript untouched. On failure the apology message ends the
    /// transcript and the error is returned.
    pub async fn send<F>(&self, user_text: &str, mut on_delta: F) -> Result<SendOutcome, ApiConnectionError>
    where
        F: FnMut(&str),
    {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Ok(SendOutcome::Ignored(IgnoredReason::EmptyInput));
        }

        let (_guard, request) = {
            let mut inner = lock(&self.inner);
            if inner.state != ConversationState::Idle {
                tracing::debug!("Send ignored, a reply is still streaming");
                return Ok(SendOutcome::Ignored(IgnoredReason::Busy));
            }
            inner.state = ConversationState::Sending;

            let history = inner.transcript.iter().map(HistoryTurn::from).collect();
            inner.transcript.push(ChatMessage::user(user_text));
            let request = ModelRequest {
                system_instruction: self.system_instruction.clone(),
                history,
                user_text: user_text.to_string(),
            };
            (SendingGuard { inner: &self.inner }, request)
        };

        let mut stream = match self.model.stream_chat(request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };

        {
            let mut inner = lock(&self.inner);
            inner.transcript.push(ChatMessage::assistant(""));
            inner.state = ConversationState::Streaming;
        }

        let mut reply = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) if delta.is_empty() => {}
                Ok(delta) => {
                    reply.push_str(&delta);
                    if let Some(placeholder) = lock(&self.inner).transcript.last_mut() {
                        placeholder.text.push_str(&delta);
                    }
                    on_delta(&delta);
                }
                Err(e) => {
                    self.record_failure(&e);
                    return Err(e);
                }
            }
        }

        tracing::debug!(chars = reply.len(), "Assistant reply complete");
        Ok(SendOutcome::Completed { reply })
    }

    /// An empty placeholder is replaced by the apology; partial text is kept
    /// and the apology follows it.
    fn record_failure(&self, error: &ApiConnectionError) {
        tracing::error!(%error, "Assistant request failed");
        let mut inner = lock(&self.inner);
        let empty_placeholder = inner.state == ConversationState::Streaming
            && inner.transcript.last().is_some_and(|m| m.text.is_empty());
        if empty_placeholder {
            if let Some(placeholder) = inner.transcript.last_mut() {
                placeholder.text = APOLOGY_MESSAGE.to_string();
            }
        } else {
            inner.transcript.push(ChatMessage::assistant(APOLOGY_MESSAGE));
        }
    }
}
