//! Selection menu state machine
//!
//! Button presses arrive as opaque tokens. They are parsed once, at the
//! transport boundary, into the closed [`Action`] set; unknown tokens never
//! reach [`transition`]. The transition function is pure: it takes the
//! current state and an action and says what should happen, leaving the
//! side effects to the dispatcher.

use crate::types::{DownloadType, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a conversation is in the menu flow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuState {
    /// No link bound
    #[default]
    Idle,
    /// A link was received and is being classified
    Classifying,
    /// Single item: waiting for video or audio
    AwaitingTypeSingle,
    /// Single item, video chosen: waiting for a quality tier
    AwaitingQuality,
    /// Collection: waiting for video or audio
    AwaitingTypeCollection,
    /// A single-item download is running
    Downloading,
    /// A batch is running
    BatchDownloading,
}

impl MenuState {
    /// Whether a job is running for the conversation
    pub fn is_busy(&self) -> bool {
        matches!(self, MenuState::Downloading | MenuState::BatchDownloading)
    }
}

/// Help topics reachable from the welcome menu
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoTopic {
    /// How video downloads work
    Video,
    /// How audio downloads work
    Audio,
    /// How collection downloads work
    Playlist,
}

/// Every button the bot can render
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Show a help topic
    Info(InfoTopic),
    /// Abandon the current selection
    Cancel,
    /// Single item: download video
    TypeVideo,
    /// Single item: download audio
    TypeAudio,
    /// Back from quality selection to type selection
    BackType,
    /// Pick a quality tier
    Quality(Quality),
    /// Collection: download every entry as video
    PlaylistVideo,
    /// Collection: download every entry as audio
    PlaylistAudio,
}

impl Action {
    /// Wire token carried by the button
    pub fn token(&self) -> &'static str {
        match self {
            Action::Info(InfoTopic::Video) => "info_video",
            Action::Info(InfoTopic::Audio) => "info_audio",
            Action::Info(InfoTopic::Playlist) => "info_playlist",
            Action::Cancel => "cancel",
            Action::TypeVideo => "type_video",
            Action::TypeAudio => "type_audio",
            Action::BackType => "back_type",
            Action::Quality(Quality::Best) => "quality_best",
            Action::Quality(Quality::P720) => "quality_720",
            Action::Quality(Quality::P480) => "quality_480",
            Action::Quality(Quality::P360) => "quality_360",
            Action::PlaylistVideo => "playlist_video",
            Action::PlaylistAudio => "playlist_audio",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A button token outside the known set
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown action token: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let action = match token {
            "info_video" => Action::Info(InfoTopic::Video),
            "info_audio" => Action::Info(InfoTopic::Audio),
            "info_playlist" => Action::Info(InfoTopic::Playlist),
            "cancel" => Action::Cancel,
            "type_video" => Action::TypeVideo,
            "type_audio" => Action::TypeAudio,
            "back_type" => Action::BackType,
            "quality_best" => Action::Quality(Quality::Best),
            "quality_720" => Action::Quality(Quality::P720),
            "quality_480" => Action::Quality(Quality::P480),
            "quality_360" => Action::Quality(Quality::P360),
            "playlist_video" => Action::PlaylistVideo,
            "playlist_audio" => Action::PlaylistAudio,
            other => return Err(UnknownAction(other.to_string())),
        };
        Ok(action)
    }
}

/// Menu screens the dispatcher can render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Video / audio choice for a single item
    TypeSingle,
    /// Quality tiers
    Quality,
}

/// Outcome of applying an action to a state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Show a help topic; the session is untouched
    ShowInfo(InfoTopic),
    /// Move to another menu screen
    Prompt {
        /// State after the move
        next: MenuState,
        /// Screen to render
        screen: Screen,
    },
    /// Start a single-item download
    StartSingle {
        /// Chosen type
        download_type: DownloadType,
        /// Chosen quality
        quality: Quality,
    },
    /// Start a batch over the collection
    StartBatch {
        /// Chosen type
        download_type: DownloadType,
    },
    /// Drop the session and return to idle
    Cancel,
    /// A menu step was reached with no link bound
    Expired,
    /// Not applicable in this state
    Ignore,
}

/// Apply an action to a state
///
/// States where a job is running accept nothing but help topics, so a late
/// press on an old menu can never start a second job.
pub fn transition(state: MenuState, action: Action) -> Transition {
    use Action as A;
    use MenuState as S;

    if let A::Info(topic) = action {
        return Transition::ShowInfo(topic);
    }

    match state {
        S::Idle => match action {
            A::Cancel => Transition::Ignore,
            _ => Transition::Expired,
        },

        S::Classifying | S::Downloading | S::BatchDownloading => Transition::Ignore,

        S::AwaitingTypeSingle => match action {
            A::TypeAudio => Transition::StartSingle {
                download_type: DownloadType::Audio,
                quality: Quality::Best,
            },
            A::TypeVideo => Transition::Prompt {
                next: S::AwaitingQuality,
                screen: Screen::Quality,
            },
            A::Cancel => Transition::Cancel,
            A::BackType | A::Quality(_) | A::PlaylistVideo | A::PlaylistAudio | A::Info(_) => {
                Transition::Ignore
            }
        },

        S::AwaitingQuality => match action {
            A::Quality(quality) => Transition::StartSingle {
                download_type: DownloadType::Video,
                quality,
            },
            A::BackType => Transition::Prompt {
                next: S::AwaitingTypeSingle,
                screen: Screen::TypeSingle,
            },
            A::Cancel => Transition::Cancel,
            A::TypeVideo | A::TypeAudio | A::PlaylistVideo | A::PlaylistAudio | A::Info(_) => {
                Transition::Ignore
            }
        },

        S::AwaitingTypeCollection => match action {
            A::PlaylistVideo => Transition::StartBatch {
                download_type: DownloadType::Video,
            },
            A::PlaylistAudio => Transition::StartBatch {
                download_type: DownloadType::Audio,
            },
            A::Cancel => Transition::Cancel,
            A::TypeVideo | A::TypeAudio | A::BackType | A::Quality(_) | A::Info(_) => {
                Transition::Ignore
            }
        },
    }
}
