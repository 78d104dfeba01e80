//! The boundary to the remote text-generation service.

use futures::Stream;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::api_connection::connection::ApiConnectionError;

/// Finite, non-restartable sequence of text deltas from one model call.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ApiConnectionError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryTurn {
    pub role: ModelRole,
    pub text: String,
}

/// Everything the model sees for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRequest {
    pub system_instruction: String,
    /// Prior turns, oldest first, not including `user_text`.
    pub history: Vec<HistoryTurn>,
    pub user_text: String,
}

pub trait ChatModel: Send + Sync {
    /// Opens a streaming call. Errors before the first delta are returned
    /// here; errors mid-stream arrive as stream items.
    fn stream_chat(&self, request: ModelRequest) -> impl Future<Output = Result<TextStream, ApiConnectionError>> + Send;
}

impl<M: ChatModel> ChatModel for &M {
    fn stream_chat(&self, request: ModelRequest) -> impl Future<Output = Result<TextStream, ApiConnectionError>> + Send {
        (**self).stream_chat(request)
    }
}
