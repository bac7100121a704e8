//! Conversation dispatcher
//!
//! The dispatcher owns every session and is the only code that mutates them.
//! Inputs from the transport and from background jobs arrive on one channel
//! and are applied in order, so two conversations never contend for a lock
//! and a slow download never blocks anyone else's menu.
//!
//! Handlers never wait on the network. They update sessions and hand the
//! resulting replies to the conversation's reply lane, which talks to the
//! transport off the loop.
//!
//! Classification, downloads and batches run as spawned tasks. They report
//! back through the same channel: a classification result carries the ticket
//! it was issued under, batch checkpoints update the session counters, and
//! every job posts a final `JobFinished` whether it succeeded, failed or
//! panicked.

mod jobs;
mod lanes;


use crate::classifier::LinkClassifier;
use crate::config::Config;
use crate::delivery::DeliveryManager;
use crate::engine::MediaEngine;
use crate::error::{Error, Result, UserFacing};
use crate::executor::{DownloadExecutor, DownloadRequest};
use crate::menu::{self, Action, MenuState, Screen, Transition};
use crate::messages;
use crate::session::{Session, SessionStore, Ticket};
use crate::transport::{Command, InboundEvent, Prompt, Transport};
use crate::types::{
    BatchProgress, Classification, ConversationId, DownloadType, Event, LinkKind, MessageRef,
};
use crate::worker::WorkerPool;
use lanes::{Effect, Lanes};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Work items processed by the dispatcher loop
#[derive(Debug)]
pub(crate) enum Input {
    /// Something a user did
    Inbound(InboundEvent),
    /// A classification finished; `status` is the message announcing it
    Classified {
        chat: ConversationId,
        ticket: Ticket,
        link: String,
        status: MessageRef,
        result: Result<Classification>,
    },
    /// The status message for a submission could not be sent
    Abandoned { chat: ConversationId, ticket: Ticket },
    /// A batch finished one entry
    Progress {
        chat: ConversationId,
        progress: BatchProgress,
    },
    /// A download or batch job ended, however it ended
    JobFinished { chat: ConversationId },
}

impl Input {
    fn chat(&self) -> ConversationId {
        match self {
            Input::Inbound(event) => event.chat(),
            Input::Classified { chat, .. }
            | Input::Abandoned { chat, .. }
            | Input::Progress { chat, .. }
            | Input::JobFinished { chat } => *chat,
        }
    }
}

/// Components shared with background jobs (cheap to clone)
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) classifier: LinkClassifier,
    pub(crate) executor: Arc<DownloadExecutor>,
    pub(crate) delivery: Arc<DeliveryManager>,
    pub(crate) inputs: mpsc::UnboundedSender<Input>,
    event_tx: broadcast::Sender<Event>,
}

impl Services {
    /// Broadcast an event; having no subscribers is fine
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Post an input back to the dispatcher loop
    pub(crate) fn post(&self, input: Input) {
        if self.inputs.send(input).is_err() {
            tracing::debug!("dispatcher stopped, dropping job input");
        }
    }
}

/// Handle for feeding events into a running dispatcher (cheap to clone)
#[derive(Clone)]
pub struct DispatcherHandle {
    inputs: mpsc::UnboundedSender<Input>,
    event_tx: broadcast::Sender<Event>,
}

impl DispatcherHandle {
    /// Queue an inbound event
    ///
    /// # Errors
    /// Returns error once the dispatcher has stopped
    pub fn submit(&self, event: InboundEvent) -> Result<()> {
        self.inputs
            .send(Input::Inbound(event))
            .map_err(|_| Error::Other("dispatcher stopped".to_string()))
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

/// Owns all sessions and applies inputs one at a time
pub struct Dispatcher {
    services: Services,
    sessions: SessionStore,
    lanes: Lanes,
    inputs: mpsc::UnboundedReceiver<Input>,
    bot_name: String,
}

impl Dispatcher {
    /// Wire a dispatcher from configuration and the two external seams
    pub fn new(config: &Config, engine: Arc<dyn MediaEngine>, transport: Arc<dyn Transport>) -> Self {
        let pool = WorkerPool::new(config.download.worker_threads);
        let classifier = LinkClassifier::new(
            engine.clone(),
            pool.clone(),
            config.download.supported_hosts.clone(),
        );
        let executor = Arc::new(DownloadExecutor::new(
            engine,
            pool,
            config.download.download_dir.clone(),
        ));
        let delivery = Arc::new(DeliveryManager::new(
            transport.clone(),
            config.download.max_upload_bytes,
        ));

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (event_tx, _rx) = broadcast::channel(1000);

        Self {
            services: Services {
                transport,
                classifier,
                executor,
                delivery,
                inputs: inputs_tx,
                event_tx,
            },
            sessions: SessionStore::new(),
            lanes: Lanes::default(),
            inputs: inputs_rx,
            bot_name: config.bot_name.clone(),
        }
    }

    /// Handle for submitting events and subscribing
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            inputs: self.services.inputs.clone(),
            event_tx: self.services.event_tx.clone(),
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.services.event_tx.subscribe()
    }

    /// Menu state of a conversation
    pub fn state(&self, chat: ConversationId) -> MenuState {
        self.sessions.state(chat)
    }

    /// Classified session of a conversation, if any
    pub fn session(&self, chat: ConversationId) -> Option<&Session> {
        self.sessions.get(chat)
    }

    /// Process inputs until shutdown
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("dispatcher started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                input = self.inputs.recv() => match input {
                    Some(input) => self.process(input),
                    None => break,
                },
            }
        }
        tracing::info!(
            active_sessions = self.sessions.len(),
            reply_lanes = self.lanes.len(),
            "dispatcher stopped"
        );
    }

    /// Wait for and process a single input
    ///
    /// Returns false once no more inputs can arrive.
    pub async fn step(&mut self) -> bool {
        match self.inputs.recv().await {
            Some(input) => {
                self.process(input);
                true
            }
            None => false,
        }
    }

    /// Wait until every reply queued so far has been carried out
    #[cfg(test)]
    pub(crate) async fn settle(&self) {
        self.lanes.flush().await;
    }

    fn process(&mut self, input: Input) {
        let chat = input.chat();
        let effects = self.apply(input);
        self.lanes.push(&self.services, chat, effects);
    }

    fn apply(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Inbound(InboundEvent::Text { chat, text }) => self.on_text(chat, &text),
            Input::Inbound(InboundEvent::Command { command, .. }) => self.on_command(command),
            Input::Inbound(InboundEvent::Button { message, action }) => {
                self.on_button(message, action)
            }
            Input::Classified {
                chat,
                ticket,
                link,
                status,
                result,
            } => self.on_classified(chat, ticket, link, status, result),
            Input::Abandoned { chat, ticket } => {
                if self.sessions.abandon(chat, ticket) {
                    tracing::debug!(chat = %chat, ticket, "submission abandoned");
                }
                Vec::new()
            }
            Input::Progress { chat, progress } => {
                self.on_progress(chat, progress);
                Vec::new()
            }
            Input::JobFinished { chat } => self.on_job_finished(chat),
        }
    }

    fn on_command(&self, command: Command) -> Vec<Effect> {
        let prompt = match command {
            Command::Start => messages::welcome(),
            Command::Help => messages::help(self.services.delivery.max_upload_bytes()),
            Command::About => messages::about(&self.bot_name),
        };
        vec![Effect::Send(prompt)]
    }

    fn on_text(&mut self, chat: ConversationId, text: &str) -> Vec<Effect> {
        let Some(link) = self.services.classifier.recognize(text) else {
            return vec![Effect::Send(messages::not_a_link())];
        };

        if self.sessions.state(chat).is_busy() {
            tracing::debug!(chat = %chat, "link received while a job is running");
            return vec![Effect::Send(messages::busy())];
        }

        let ticket = self.sessions.begin_classification(chat);
        tracing::debug!(chat = %chat, ticket, link = %link, "classifying link");
        vec![Effect::Classify { ticket, link }]
    }

    fn on_classified(
        &mut self,
        chat: ConversationId,
        ticket: Ticket,
        link: String,
        status: MessageRef,
        result: Result<Classification>,
    ) -> Vec<Effect> {
        match result {
            Ok(classification) => {
                let Some(session) = self
                    .sessions
                    .commit(chat, ticket, link, classification, status)
                else {
                    tracing::debug!(chat = %chat, ticket, "discarding superseded classification");
                    return Vec::new();
                };

                let info = &session.classification;
                let prompt = match &info.kind {
                    LinkKind::Single => {
                        messages::single_found(info.title.as_deref(), info.duration_secs)
                    }
                    LinkKind::Collection { entries } => {
                        messages::collection_found(info.title.as_deref(), entries.len())
                    }
                };
                let event = Event::Classified {
                    chat,
                    collection: info.is_collection(),
                    items: info.item_count(),
                };
                vec![Effect::Edit(status, prompt), Effect::Emit(event)]
            }
            Err(error) => {
                if !self.sessions.abandon(chat, ticket) {
                    tracing::debug!(chat = %chat, ticket, "discarding superseded classification failure");
                    return Vec::new();
                }
                vec![
                    Effect::Edit(status, Prompt::text(error.user_message())),
                    Effect::Emit(Event::ClassificationFailed {
                        chat,
                        error: error.to_string(),
                    }),
                ]
            }
        }
    }

    fn on_button(&mut self, message: MessageRef, action: Action) -> Vec<Effect> {
        let chat = message.chat;
        let state = self.sessions.state(chat);

        match menu::transition(state, action) {
            Transition::ShowInfo(topic) => vec![Effect::Edit(message, messages::info(topic))],

            Transition::Prompt { next, screen } => {
                if let Some(session) = self.sessions.get_mut(chat) {
                    session.state = next;
                    session.menu_message = message;
                    session.download_type = match next {
                        MenuState::AwaitingQuality => Some(DownloadType::Video),
                        _ => None,
                    };
                    session.quality = None;
                }
                let prompt = match screen {
                    Screen::TypeSingle => messages::choose_type(),
                    Screen::Quality => messages::choose_quality(),
                };
                vec![Effect::Edit(message, prompt)]
            }

            Transition::StartSingle {
                download_type,
                quality,
            } => {
                let Some(session) = self.sessions.get_mut(chat) else {
                    return Vec::new();
                };
                session.state = MenuState::Downloading;
                session.download_type = Some(download_type);
                session.quality = Some(quality);
                session.menu_message = message;

                let request = DownloadRequest {
                    chat,
                    link: session.link.clone(),
                    download_type,
                    quality,
                };
                vec![Effect::Single {
                    request,
                    status: message,
                }]
            }

            Transition::StartBatch { download_type } => {
                let Some(session) = self.sessions.get_mut(chat) else {
                    return Vec::new();
                };
                session.state = MenuState::BatchDownloading;
                session.download_type = Some(download_type);
                session.quality = None;
                session.menu_message = message;
                session.progress = BatchProgress::default();

                vec![Effect::Batch {
                    entries: session.entries().to_vec(),
                    download_type,
                    status: message,
                }]
            }

            Transition::Cancel => {
                self.sessions.clear(chat);
                tracing::debug!(chat = %chat, "selection cancelled");
                vec![
                    Effect::Emit(Event::SessionReset { chat }),
                    Effect::Edit(message, messages::cancelled()),
                ]
            }

            Transition::Expired => {
                tracing::debug!(chat = %chat, action = %action, "menu step without a link");
                vec![Effect::Edit(
                    message,
                    Prompt::text(Error::SessionExpired.user_message()),
                )]
            }

            Transition::Ignore => {
                tracing::debug!(chat = %chat, state = ?state, action = %action, "ignoring action");
                Vec::new()
            }
        }
    }

    fn on_progress(&mut self, chat: ConversationId, progress: BatchProgress) {
        if let Some(session) = self.sessions.get_mut(chat) {
            if session.state == MenuState::BatchDownloading {
                session.progress = progress;
            }
        }
    }

    fn on_job_finished(&mut self, chat: ConversationId) -> Vec<Effect> {
        if !self.sessions.state(chat).is_busy() {
            return Vec::new();
        }
        self.sessions.clear(chat);
        tracing::debug!(chat = %chat, "job finished, conversation idle");
        vec![Effect::Emit(Event::SessionReset { chat })]
    }
}
