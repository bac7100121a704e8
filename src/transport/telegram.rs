//! Telegram Bot API client
//!
//! JSON methods go through [`with_retry`] so flood control and gateway
//! hiccups are absorbed. A flood-control reply waits exactly as long as the
//! server asks. Uploads are streamed from disk and never retried:
//! a failed upload is reported to the user instead.

use super::traits::{AudioUpload, InlineMenu, Prompt, Transport, VideoUpload};
use crate::config::{RetryConfig, TelegramConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::{ConversationId, MessageRef};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

/// Timeout for ordinary JSON calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time granted to long polls beyond the server-side wait
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Envelope every Bot API response is wrapped in
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

/// One incoming update
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id
    pub update_id: i64,
    /// New text message
    pub message: Option<Message>,
    /// Inline button press
    pub callback_query: Option<CallbackQuery>,
}

/// A chat message
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message id within the chat
    pub message_id: i64,
    /// Chat the message belongs to
    pub chat: Chat,
    /// Text, for text messages
    pub text: Option<String>,
}

/// A chat
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat id
    pub id: i64,
}

/// An inline button press
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Id used to acknowledge the press
    pub id: String,
    /// Token attached to the button
    pub data: Option<String>,
    /// Message carrying the button
    pub message: Option<Message>,
}

impl Message {
    fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat: ConversationId(self.chat.id),
            message_id: self.message_id,
        }
    }
}

/// Client for the Telegram Bot API
pub struct TelegramClient {
    http: reqwest::Client,
    endpoint: String,
    retry: RetryConfig,
}

impl TelegramClient {
    /// Create a client for the configured bot
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &TelegramConfig, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tubedrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}",
                config.api_base_url.trim_end_matches('/'),
                config.bot_token
            ),
            retry,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;
        decode(method, response).await
    }

    async fn call_with_retry<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        with_retry(&self.retry, || self.call(method, body, REQUEST_TIMEOUT)).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>, wait: Duration) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": wait.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body, wait + POLL_GRACE).await
    }

    /// Acknowledge a button press so the client stops its spinner
    pub async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        let _: bool = self
            .call_with_retry(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }

    async fn upload(
        &self,
        method: &str,
        field: &'static str,
        chat: ConversationId,
        file: &Path,
        fields: Vec<(&'static str, String)>,
    ) -> Result<()> {
        let handle = tokio::fs::File::open(file).await?;
        let length = handle.metadata().await?.len();
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.to_string());

        let part = Part::stream_with_length(reqwest::Body::from(handle), length).file_name(file_name);
        let mut form = Form::new().text("chat_id", chat.get().to_string());
        for (name, value) in fields {
            form = form.text(name, value);
        }
        let form = form.part(field, part);

        let response = self
            .http
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;
        let _: Value = decode(method, response).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_server_error() {
        return Err(Error::Transport(format!("{method}: HTTP {status}")));
    }

    let body: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| Error::Network(e.without_url()))?;

    if body.ok {
        body.result
            .ok_or_else(|| Error::Transport(format!("{method}: response without result")))
    } else if let Some(secs) = body.parameters.and_then(|p| p.retry_after) {
        Err(Error::RateLimited {
            method: method.to_string(),
            retry_after: Duration::from_secs(secs),
        })
    } else {
        let description = body
            .description
            .unwrap_or_else(|| format!("HTTP {status}"));
        Err(Error::Transport(format!("{method}: {description}")))
    }
}

fn as_upload_error(error: Error) -> Error {
    match error {
        Error::UploadFailed(_) => error,
        Error::Transport(message) => Error::UploadFailed(message),
        other => Error::UploadFailed(other.to_string()),
    }
}

fn keyboard(menu: &InlineMenu) -> Value {
    let rows: Vec<Vec<Value>> = menu
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| {
                    json!({
                        "text": button.label,
                        "callback_data": button.action.token(),
                    })
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn prompt_body(prompt: &Prompt, mut body: Value) -> Value {
    body["text"] = json!(prompt.text);
    if prompt.html {
        body["parse_mode"] = json!("HTML");
    }
    if let Some(menu) = &prompt.menu {
        body["reply_markup"] = keyboard(menu);
    }
    body
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_prompt(&self, chat: ConversationId, prompt: &Prompt) -> Result<MessageRef> {
        let body = prompt_body(prompt, json!({ "chat_id": chat.get() }));
        let message: Message = self.call_with_retry("sendMessage", &body).await?;
        Ok(message.message_ref())
    }

    async fn edit_prompt(&self, message: MessageRef, prompt: &Prompt) -> Result<()> {
        let body = prompt_body(
            prompt,
            json!({ "chat_id": message.chat.get(), "message_id": message.message_id }),
        );
        match self.call_with_retry::<Value>("editMessageText", &body).await {
            Ok(_) => Ok(()),
            // Editing to identical content is rejected; the message already shows it
            Err(Error::Transport(msg)) if msg.contains("message is not modified") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send_audio(
        &self,
        chat: ConversationId,
        file: &Path,
        upload: &AudioUpload,
    ) -> Result<()> {
        let mut fields = vec![
            ("title", upload.title.clone()),
            ("performer", upload.performer.clone()),
        ];
        if let Some(duration) = upload.duration_secs {
            fields.push(("duration", duration.to_string()));
        }
        self.upload("sendAudio", "audio", chat, file, fields)
            .await
            .map_err(as_upload_error)
    }

    async fn send_video(
        &self,
        chat: ConversationId,
        file: &Path,
        upload: &VideoUpload,
    ) -> Result<()> {
        let mut fields = vec![
            ("caption", upload.caption.clone()),
            ("supports_streaming", upload.supports_streaming.to_string()),
        ];
        if let Some(duration) = upload.duration_secs {
            fields.push(("duration", duration.to_string()));
        }
        self.upload("sendVideo", "video", chat, file, fields)
            .await
            .map_err(as_upload_error)
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
