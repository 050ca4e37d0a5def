//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::conversation::{Event, InlineAction, Input, Reply};
use crate::error::ChannelError;

/// A message received from a user on some channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel the message came from, e.g. "telegram".
    pub channel: String,
    /// Stable identity of the sender; sessions are keyed by it.
    pub user_id: String,
    pub user_name: Option<String>,
    pub content: String,
    /// Callback id when the message is a button press.
    pub callback: Option<String>,
    /// Channel-specific routing data (chat id, callback query id).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            user_name: None,
            content: content.into(),
            callback: None,
            metadata: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    /// A button press carrying `callback_id`.
    pub fn callback(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        callback_id: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(channel, user_id, String::new());
        msg.callback = Some(callback_id.into());
        msg
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    /// Classify the message as a conversation input.
    pub fn input(&self) -> Input {
        match &self.callback {
            Some(callback_id) => Input::Button(callback_id.clone()),
            None => Input::from_text(&self.content),
        }
    }

    pub fn to_event(&self) -> Event {
        Event::new(self.user_id.clone(), self.input())
    }
}

/// A reply to send back on the channel the message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    /// Inline buttons rendered under the message.
    pub actions: Vec<InlineAction>,
}

impl From<Reply> for OutgoingResponse {
    fn from(reply: Reply) -> Self {
        Self {
            content: reply.text,
            actions: reply.actions,
        }
    }
}

/// Stream of incoming messages from a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving. Called once.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a response to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
