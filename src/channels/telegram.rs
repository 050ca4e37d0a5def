//! Telegram channel: long-polls the Bot API for messages and button presses.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::conversation::InlineAction;
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API, in characters.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        method_url(&self.bot_token, method)
    }

    /// Check if a username or numeric id is in the allowed list.
    pub fn is_user_allowed(&self, identity: &str) -> bool {
        check_user_allowed(&self.allowed_users, [identity])
    }

    /// Send a text message, split to fit the length limit. Buttons go under
    /// the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        actions: &[InlineAction],
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
                "disable_web_page_preview": true,
            });
            if i == last && !actions.is_empty() {
                body["reply_markup"] = inline_keyboard(actions);
            }
            self.post("sendMessage", &body).await?;
        }
        Ok(())
    }

    async fn post(&self, method: &str, body: &Value) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status();
        let err = resp.text().await.unwrap_or_default();
        Err(ChannelError::SendFailed {
            name: "telegram".into(),
            reason: format!("{method} returned {status}: {err}"),
        })
    }
}

fn method_url(token: &SecretString, method: &str) -> String {
    format!("{API_BASE}/bot{}/{method}", token.expose_secret())
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client
                    .post(method_url(&bot_token, "getUpdates"))
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = poll_results(&data) else {
                    let description = data
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("no description");
                    tracing::warn!("Telegram getUpdates rejected: {description}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    // Stop the client-side spinner right away; the reply may
                    // take a while when it is a summary.
                    if let Some(query_id) = incoming.metadata.get("callback_query_id") {
                        let answer = client
                            .post(method_url(&bot_token, "answerCallbackQuery"))
                            .json(&json!({ "callback_query_id": query_id }))
                            .send()
                            .await;
                        if let Err(e) = answer {
                            tracing::debug!("Telegram answerCallbackQuery failed: {e}");
                        }
                    }

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        self.send_message(chat_id, &response.content, &response.actions)
            .await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Updates from a getUpdates response, or `None` when the API rejected
/// the poll (e.g. `409 Conflict` from a second poller).
fn poll_results(data: &Value) -> Option<&Vec<Value>> {
    if data.get("ok").and_then(Value::as_bool) == Some(false) {
        return None;
    }
    data.get("result").and_then(Value::as_array)
}

/// Turn one getUpdates entry into a message. Returns `None` for update
/// kinds the bot does not handle and for senders outside the allowlist.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    if let Some(query) = update.get("callback_query") {
        let from = query.get("from")?;
        let (user_id, username) = sender(from)?;
        if !is_sender_allowed(allowed_users, &user_id, &username) {
            return None;
        }
        let data = query.get("data").and_then(Value::as_str)?;
        let chat_id = query
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string())
            .unwrap_or_else(|| user_id.clone());
        let query_id = query.get("id").and_then(Value::as_str).unwrap_or_default();

        return Some(
            IncomingMessage::callback("telegram", user_id, data)
                .with_metadata(json!({
                    "chat_id": chat_id,
                    "username": username,
                    "callback_query_id": query_id,
                }))
                .with_user_name(display_name(from, &username)),
        );
    }

    let message = update.get("message")?;
    let text = message.get("text").and_then(Value::as_str)?;
    let from = message.get("from")?;
    let (user_id, username) = sender(from)?;
    if !is_sender_allowed(allowed_users, &user_id, &username) {
        return None;
    }
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    Some(
        IncomingMessage::new("telegram", user_id, text)
            .with_metadata(json!({
                "chat_id": chat_id,
                "username": username,
            }))
            .with_user_name(display_name(from, &username)),
    )
}

/// Numeric id (the session key) and username of a sender.
fn sender(from: &Value) -> Option<(String, String)> {
    let id = from.get("id").and_then(Value::as_i64)?.to_string();
    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    Some((id, username))
}

fn display_name(from: &Value, username: &str) -> String {
    from.get("first_name")
        .and_then(Value::as_str)
        .unwrap_or(username)
        .to_string()
}

fn is_sender_allowed(allowed_users: &[String], user_id: &str, username: &str) -> bool {
    let allowed = check_user_allowed(allowed_users, [username, user_id]);
    if !allowed {
        tracing::warn!(
            "Telegram: ignoring update from unauthorized user: \
             username={username}, user_id={user_id}"
        );
    }
    allowed
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// One row of buttons.
fn inline_keyboard(actions: &[InlineAction]) -> Value {
    let row: Vec<Value> = actions
        .iter()
        .map(|a| json!({ "text": a.label, "callback_data": a.callback_id }))
        .collect();
    json!({ "inline_keyboard": [row] })
}

/// Split a message into chunks of at most `max_chars` characters.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        // Byte offset just past the first `max_chars` characters, if the
        // text is longer than that.
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&at| at > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}
