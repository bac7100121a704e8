//! Per-conversation reply lanes
//!
//! Handlers on the dispatcher loop only mutate sessions and decide what to
//! say. Saying it happens here, on one task per active conversation, so a
//! slow or flood-limited chat holds up its own replies and nobody else's.
//! Effects queued for the same conversation run in order.

use super::{Input, Services, jobs};
use crate::error::{GENERIC_FAILURE, Result, UserFacing};
use crate::executor::DownloadRequest;
use crate::messages;
use crate::session::Ticket;
use crate::transport::Prompt;
use crate::types::{ConversationId, DownloadType, EntryRef, Event, MessageRef};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A lane with nothing queued for this long shuts down
const LANE_IDLE: Duration = Duration::from_secs(300);

/// Something the dispatcher decided to do for a conversation
#[derive(Debug)]
pub(crate) enum Effect {
    /// Send a new message
    Send(Prompt),
    /// Replace the content of an existing message
    Edit(MessageRef, Prompt),
    /// Broadcast a lifecycle event
    Emit(Event),
    /// Post the "analyzing" status, then classify `link` under `ticket`
    Classify { ticket: Ticket, link: String },
    /// Start a single download reporting on `status`
    Single {
        request: DownloadRequest,
        status: MessageRef,
    },
    /// Start a batch reporting on `status`
    Batch {
        entries: Vec<EntryRef>,
        download_type: DownloadType,
        status: MessageRef,
    },
    /// Signal once everything queued before it has run
    #[cfg(test)]
    Flush(tokio::sync::oneshot::Sender<()>),
}

struct Lane {
    queue: mpsc::UnboundedSender<Vec<Effect>>,
    task: JoinHandle<()>,
}

/// Reply lanes keyed by conversation
#[derive(Default)]
pub(super) struct Lanes {
    lanes: HashMap<ConversationId, Lane>,
}

impl Lanes {
    /// Queue effects for a conversation, starting its lane if needed
    pub(super) fn push(&mut self, services: &Services, chat: ConversationId, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }

        let effects = match self.lanes.get(&chat) {
            Some(lane) => match lane.queue.send(effects) {
                Ok(()) => return,
                Err(mpsc::error::SendError(effects)) => effects,
            },
            None => effects,
        };

        // An idle lane may still be draining; its successor waits for it
        let previous = self.lanes.remove(&chat).map(|lane| lane.task);
        self.lanes.retain(|_, lane| !lane.queue.is_closed());

        let (queue, rx) = mpsc::unbounded_channel();
        if queue.send(effects).is_err() {
            return;
        }
        let task = tokio::spawn(drive(services.clone(), chat, rx, previous));
        tracing::trace!(chat = %chat, lanes = self.lanes.len() + 1, "reply lane started");
        self.lanes.insert(chat, Lane { queue, task });
    }

    /// Number of lanes currently known
    pub(super) fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Wait until every open lane has run what was queued so far
    #[cfg(test)]
    pub(super) async fn flush(&self) {
        let mut pending = Vec::new();
        for lane in self.lanes.values() {
            let (done, rx) = tokio::sync::oneshot::channel();
            if lane.queue.send(vec![Effect::Flush(done)]).is_ok() {
                pending.push(rx);
            }
        }
        for rx in pending {
            rx.await.ok();
        }
    }
}

async fn drive(
    services: Services,
    chat: ConversationId,
    mut queue: mpsc::UnboundedReceiver<Vec<Effect>>,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        previous.await.ok();
    }

    loop {
        match tokio::time::timeout(LANE_IDLE, queue.recv()).await {
            Ok(Some(effects)) => run(&services, chat, effects).await,
            Ok(None) => break,
            Err(_) => {
                queue.close();
                while let Some(effects) = queue.recv().await {
                    run(&services, chat, effects).await;
                }
                break;
            }
        }
    }
    tracing::trace!(chat = %chat, "reply lane closed");
}

async fn run(services: &Services, chat: ConversationId, effects: Vec<Effect>) {
    for effect in effects {
        if let Err(e) = apply(services, chat, effect).await {
            tracing::error!(chat = %chat, code = e.error_code(), error = %e, "failed to reply");
            if let Err(e) = services
                .transport
                .send_prompt(chat, &Prompt::text(GENERIC_FAILURE))
                .await
            {
                tracing::warn!(chat = %chat, error = %e, "failed to send failure notice");
            }
        }
    }
}

async fn apply(services: &Services, chat: ConversationId, effect: Effect) -> Result<()> {
    let transport = &services.transport;
    match effect {
        Effect::Send(prompt) => {
            transport.send_prompt(chat, &prompt).await?;
        }
        Effect::Edit(message, prompt) => transport.edit_prompt(message, &prompt).await?,
        Effect::Emit(event) => services.emit(event),
        Effect::Classify { ticket, link } => {
            match transport.send_prompt(chat, &messages::analyzing()).await {
                Ok(status) => {
                    jobs::spawn_classification(services.clone(), chat, ticket, link, status)
                }
                Err(e) => {
                    services.post(Input::Abandoned { chat, ticket });
                    return Err(e);
                }
            }
        }
        Effect::Single { request, status } => {
            jobs::spawn_single(services.clone(), request, status)
        }
        Effect::Batch {
            entries,
            download_type,
            status,
        } => jobs::spawn_batch(services.clone(), chat, entries, download_type, status),
        #[cfg(test)]
        Effect::Flush(done) => {
            done.send(()).ok();
        }
    }
    Ok(())
}
