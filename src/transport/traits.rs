//! Traits and types for the chat transport

use crate::error::Result;
use crate::menu::Action;
use crate::types::{ConversationId, MessageRef};
use async_trait::async_trait;
use std::path::Path;

/// One button of an inline menu
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuButton {
    /// Text shown on the button
    pub label: String,
    /// Action sent back when pressed
    pub action: Action,
}

impl MenuButton {
    /// Create a button
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Buttons attached to a message, row by row
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineMenu {
    /// Rows of buttons, top to bottom
    pub rows: Vec<Vec<MenuButton>>,
}

impl InlineMenu {
    /// Append a row
    pub fn row(mut self, buttons: Vec<MenuButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// Every action reachable from this menu
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.rows.iter().flatten().map(|b| b.action)
    }
}

/// A text message, optionally with a menu
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    /// Message text
    pub text: String,
    /// Whether `text` is HTML-formatted
    pub html: bool,
    /// Menu shown under the text
    pub menu: Option<InlineMenu>,
}

impl Prompt {
    /// Plain-text message without a menu
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
            menu: None,
        }
    }

    /// HTML message without a menu
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            menu: None,
        }
    }

    /// Attach a menu
    pub fn with_menu(mut self, menu: InlineMenu) -> Self {
        self.menu = Some(menu);
        self
    }
}

/// Metadata sent alongside an audio file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioUpload {
    /// Track title
    pub title: String,
    /// Performer
    pub performer: String,
    /// Duration in seconds
    pub duration_secs: Option<u64>,
}

/// Metadata sent alongside a video file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoUpload {
    /// Caption under the video
    pub caption: String,
    /// Duration in seconds
    pub duration_secs: Option<u64>,
    /// Whether clients may start playback before the download completes
    pub supports_streaming: bool,
}

/// Bot commands understood by the dispatcher
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/about`
    About,
}

impl Command {
    /// Parse a command message such as `/help` or `/help@SomeBot`
    ///
    /// Returns `None` for text that is not a known command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "about" => Some(Command::About),
            _ => None,
        }
    }
}

/// Something a user did, already decoded from the wire
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    /// Free text
    Text {
        /// Conversation
        chat: ConversationId,
        /// Message text
        text: String,
    },
    /// A known command
    Command {
        /// Conversation
        chat: ConversationId,
        /// Parsed command
        command: Command,
    },
    /// A press on one of the bot's buttons
    Button {
        /// Message carrying the button
        message: MessageRef,
        /// Parsed action
        action: Action,
    },
}

impl InboundEvent {
    /// Conversation the event belongs to
    pub fn chat(&self) -> ConversationId {
        match self {
            InboundEvent::Text { chat, .. } | InboundEvent::Command { chat, .. } => *chat,
            InboundEvent::Button { message, .. } => message.chat,
        }
    }
}

/// Trait for chat transports
///
/// The dispatcher and delivery only ever talk to the chat platform through
/// this trait. Implementations decide how prompts and files are encoded on
/// the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a new message and return a reference for later edits
    async fn send_prompt(&self, chat: ConversationId, prompt: &Prompt) -> Result<MessageRef>;

    /// Replace the text and menu of an earlier message
    async fn edit_prompt(&self, message: MessageRef, prompt: &Prompt) -> Result<()>;

    /// Upload an audio file
    ///
    /// # Errors
    ///
    /// Returns [`Error::UploadFailed`](crate::error::Error::UploadFailed) when
    /// the platform rejects or drops the upload.
    async fn send_audio(&self, chat: ConversationId, file: &Path, upload: &AudioUpload)
    -> Result<()>;

    /// Upload a video file
    ///
    /// # Errors
    ///
    /// Returns [`Error::UploadFailed`](crate::error::Error::UploadFailed) when
    /// the platform rejects or drops the upload.
    async fn send_video(&self, chat: ConversationId, file: &Path, upload: &VideoUpload)
    -> Result<()>;

    /// Get the name of this transport implementation
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help@TubeBot"), Some(Command::Help));
        assert_eq!(Command::parse("/about extra words"), Some(Command::About));
    }

    #[test]
    fn rejects_unknown_commands_and_plain_text() {
        assert_eq!(Command::parse("/settings"), None);
        assert_eq!(Command::parse("start"), None);
        assert_eq!(Command::parse(""), None);
    }
}
