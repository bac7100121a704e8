//! Per-conversation session store
//!
//! Owned by the dispatcher and only ever touched from its loop, so no
//! locking is involved. A conversation is either absent (idle), waiting on
//! a classification ticket, or holding a classified session.
//!
//! Classification runs off the dispatcher loop. Each submission takes a new
//! ticket; a result is committed only if its ticket is still the latest one
//! for the conversation, so the last link a user sends always wins.

use crate::menu::MenuState;
use crate::types::{
    BatchProgress, Classification, ConversationId, DownloadType, EntryRef, LinkKind, MessageRef,
    Quality,
};
use std::collections::HashMap;

/// Identifies one classification submission
pub type Ticket = u64;

/// A classified link and the user's choices so far
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// The link bound to the conversation
    pub link: String,
    /// What the link turned out to be
    pub classification: Classification,
    /// Chosen type, once picked
    pub download_type: Option<DownloadType>,
    /// Chosen quality, once picked
    pub quality: Option<Quality>,
    /// Batch counters
    pub progress: BatchProgress,
    /// Menu position
    pub state: MenuState,
    /// The message carrying the menu
    pub menu_message: MessageRef,
}

impl Session {
    fn new(link: String, classification: Classification, menu_message: MessageRef) -> Self {
        let state = if classification.is_collection() {
            MenuState::AwaitingTypeCollection
        } else {
            MenuState::AwaitingTypeSingle
        };
        Self {
            link,
            classification,
            download_type: None,
            quality: None,
            progress: BatchProgress::default(),
            state,
            menu_message,
        }
    }

    /// Collection entries, empty for a single item
    pub fn entries(&self) -> &[EntryRef] {
        match &self.classification.kind {
            LinkKind::Collection { entries } => entries,
            LinkKind::Single => &[],
        }
    }
}

#[derive(Debug)]
enum Slot {
    Classifying { ticket: Ticket },
    Ready(Session),
}

/// Sessions keyed by conversation
#[derive(Debug, Default)]
pub struct SessionStore {
    slots: HashMap<ConversationId, Slot>,
    next_ticket: Ticket,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current menu state; absent conversations are idle
    pub fn state(&self, chat: ConversationId) -> MenuState {
        match self.slots.get(&chat) {
            None => MenuState::Idle,
            Some(Slot::Classifying { .. }) => MenuState::Classifying,
            Some(Slot::Ready(session)) => session.state,
        }
    }

    /// Start classifying a new link, replacing whatever was there
    pub fn begin_classification(&mut self, chat: ConversationId) -> Ticket {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        if let Some(previous) = self.slots.insert(chat, Slot::Classifying { ticket }) {
            tracing::debug!(chat = %chat, previous = ?previous, "replacing session with new link");
        }
        ticket
    }

    /// Commit a classification if `ticket` is still current
    ///
    /// `status` is the message that carries the menu from now on. Returns the
    /// new session, or `None` when a newer link superseded it.
    pub fn commit(
        &mut self,
        chat: ConversationId,
        ticket: Ticket,
        link: String,
        classification: Classification,
        status: MessageRef,
    ) -> Option<&Session> {
        if !self.is_pending(chat, ticket) {
            return None;
        }
        self.slots.insert(
            chat,
            Slot::Ready(Session::new(link, classification, status)),
        );
        match self.slots.get(&chat) {
            Some(Slot::Ready(session)) => Some(session),
            _ => None,
        }
    }

    /// Drop a pending classification if `ticket` is still current
    pub fn abandon(&mut self, chat: ConversationId, ticket: Ticket) -> bool {
        if !self.is_pending(chat, ticket) {
            return false;
        }
        self.slots.remove(&chat);
        true
    }

    fn is_pending(&self, chat: ConversationId, ticket: Ticket) -> bool {
        matches!(
            self.slots.get(&chat),
            Some(Slot::Classifying { ticket: current }) if *current == ticket
        )
    }

    /// Classified session, if any
    pub fn get(&self, chat: ConversationId) -> Option<&Session> {
        match self.slots.get(&chat) {
            Some(Slot::Ready(session)) => Some(session),
            _ => None,
        }
    }

    /// Classified session for mutation, if any
    pub fn get_mut(&mut self, chat: ConversationId) -> Option<&mut Session> {
        match self.slots.get_mut(&chat) {
            Some(Slot::Ready(session)) => Some(session),
            _ => None,
        }
    }

    /// Return the conversation to idle
    pub fn clear(&mut self, chat: ConversationId) -> bool {
        self.slots.remove(&chat).is_some()
    }

    /// Number of non-idle conversations
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether every conversation is idle
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
