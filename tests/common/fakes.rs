//! Fake engine and transport implemented against the public traits

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use tubedrop::transport::{AudioUpload, Prompt, VideoUpload};
use tubedrop::types::{EntryRef, MediaKind, MessageRef};
use tubedrop::{
    Artifact, Classification, ConversationId, DownloadError, Error, FormatPolicy, LinkKind,
    MediaEngine, OutputSpec, Result, Transport,
};

/// Engine that knows a fixed set of links
#[derive(Default)]
pub struct ScriptedEngine {
    singles: HashMap<String, String>,
    collections: HashMap<String, usize>,
    failing: HashSet<String>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(mut self, link: &str, title: &str) -> Self {
        self.singles.insert(link.to_string(), title.to_string());
        self
    }

    /// Collection whose entries have ids `item1..itemN`
    pub fn collection(mut self, link: &str, n: usize) -> Self {
        self.collections.insert(link.to_string(), n);
        self
    }

    pub fn failing(mut self, link: &str) -> Self {
        self.failing.insert(link.to_string());
        self
    }
}

impl MediaEngine for ScriptedEngine {
    fn probe(&self, link: &str) -> Result<Classification> {
        if let Some(title) = self.singles.get(link) {
            return Ok(Classification {
                title: Some(title.clone()),
                duration_secs: Some(90),
                kind: LinkKind::Single,
            });
        }
        match self.collections.get(link) {
            Some(&n) => Ok(Classification {
                title: Some("Mix".to_string()),
                duration_secs: None,
                kind: LinkKind::Collection {
                    entries: (1..=n)
                        .map(|i| EntryRef {
                            id: Some(format!("item{i}")),
                            url: None,
                            title: Some(format!("Track {i}")),
                        })
                        .collect(),
                },
            }),
            None => Err(Error::Classification(format!("unknown link {link}"))),
        }
    }

    fn materialize(
        &self,
        link: &str,
        policy: &FormatPolicy,
        output: &OutputSpec,
    ) -> Result<Artifact> {
        if self.failing.contains(link) {
            return Err(DownloadError::ToolFailed {
                cause: "Video unavailable".to_string(),
            }
            .into());
        }

        let (ext, media_kind) = if policy.audio.is_some() {
            ("mp3", MediaKind::Audio)
        } else {
            ("mp4", MediaKind::Video)
        };
        let path = output.dir.join(format!("{}-clip.{ext}", output.stem));
        std::fs::write(&path, link.as_bytes())?;
        let size_bytes = std::fs::metadata(&path)?.len();

        Ok(Artifact {
            path,
            size_bytes,
            title: Some(format!("Title of {link}")),
            uploader: Some("Channel".to_string()),
            duration_secs: Some(90),
            media_kind,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// What a fake chat saw
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEntry {
    Message { id: i64, text: String },
    Edit { id: i64, text: String },
    Audio { title: String },
    Video { caption: String },
}

/// Transport that records everything it is asked to send
#[derive(Default)]
pub struct ChatLog {
    entries: Mutex<Vec<ChatEntry>>,
    next_id: AtomicI64,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ChatEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Id of the most recent new message
    pub fn last_message_id(&self) -> i64 {
        self.entries()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                ChatEntry::Message { id, .. } => Some(id),
                _ => None,
            })
            .expect("no message was sent")
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                ChatEntry::Message { text, .. } | ChatEntry::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| matches!(e, ChatEntry::Audio { .. } | ChatEntry::Video { .. }))
            .count()
    }

    fn push(&self, entry: ChatEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Transport for ChatLog {
    async fn send_prompt(&self, chat: ConversationId, prompt: &Prompt) -> Result<MessageRef> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.push(ChatEntry::Message {
            id,
            text: prompt.text.clone(),
        });
        Ok(MessageRef {
            chat,
            message_id: id,
        })
    }

    async fn edit_prompt(&self, message: MessageRef, prompt: &Prompt) -> Result<()> {
        self.push(ChatEntry::Edit {
            id: message.message_id,
            text: prompt.text.clone(),
        });
        Ok(())
    }

    async fn send_audio(
        &self,
        _chat: ConversationId,
        file: &Path,
        upload: &AudioUpload,
    ) -> Result<()> {
        assert!(file.exists(), "audio file missing at upload time");
        self.push(ChatEntry::Audio {
            title: upload.title.clone(),
        });
        Ok(())
    }

    async fn send_video(
        &self,
        _chat: ConversationId,
        file: &Path,
        upload: &VideoUpload,
    ) -> Result<()> {
        assert!(file.exists(), "video file missing at upload time");
        self.push(ChatEntry::Video {
            caption: upload.caption.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "chat-log"
    }
}
