//! Long-polling loop feeding Telegram updates to the dispatcher
//!
//! Updates are decoded here into [`InboundEvent`]s. Button tokens outside the
//! known action set and unknown commands are dropped at this boundary; every
//! button press is acknowledged either way.

use super::telegram::{TelegramClient, Update};
use super::traits::{Command, InboundEvent};
use crate::dispatcher::DispatcherHandle;
use crate::menu::Action;
use crate::types::{ConversationId, MessageRef};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause after a failed poll before trying again
const POLL_BACKOFF: Duration = Duration::from_secs(1);

/// An update reduced to what the bot acts on
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Event for the dispatcher, if the update carries one
    pub event: Option<InboundEvent>,
    /// Button press to acknowledge
    pub callback_id: Option<String>,
}

/// Decode one update
pub fn decode_update(update: Update) -> Decoded {
    if let Some(query) = update.callback_query {
        let event = match (query.message, query.data) {
            (Some(message), Some(data)) => match data.parse::<Action>() {
                Ok(action) => Some(InboundEvent::Button {
                    message: MessageRef {
                        chat: ConversationId(message.chat.id),
                        message_id: message.message_id,
                    },
                    action,
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "dropping button press");
                    None
                }
            },
            _ => None,
        };
        return Decoded {
            event,
            callback_id: Some(query.id),
        };
    }

    let Some(message) = update.message else {
        return Decoded::default();
    };
    let Some(text) = message.text else {
        return Decoded::default();
    };
    let chat = ConversationId(message.chat.id);

    let event = if text.starts_with('/') {
        Command::parse(&text).map(|command| InboundEvent::Command { chat, command })
    } else {
        Some(InboundEvent::Text { chat, text })
    };

    Decoded {
        event,
        callback_id: None,
    }
}

/// Poll for updates until shutdown or until the dispatcher stops
pub async fn run_polling(
    client: Arc<TelegramClient>,
    handle: DispatcherHandle,
    wait: Duration,
    shutdown: CancellationToken,
) {
    let mut offset: Option<i64> = None;
    tracing::info!("polling for updates");

    loop {
        let polled = tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = client.get_updates(offset, wait) => polled,
        };

        let updates = match polled {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "polling failed");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(POLL_BACKOFF) => continue,
                }
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let decoded = decode_update(update);

            if let Some(id) = decoded.callback_id {
                // Acknowledge off the loop; polling never waits on it
                let client = client.clone();
                tokio::spawn(async move {
                    if let Err(e) = client.answer_callback(&id).await {
                        tracing::debug!(error = %e, "failed to acknowledge button press");
                    }
                });
            }

            if let Some(event) = decoded.event {
                if handle.submit(event).is_err() {
                    tracing::info!("dispatcher stopped, polling ends");
                    return;
                }
            }
        }
    }

    tracing::info!("polling stopped");
}
