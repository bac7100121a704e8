//! Shared test doubles for the engine and transport seams.

use crate::engine::{MediaEngine, OutputSpec};
use crate::error::{DownloadError, Error, Result};
use crate::format::FormatPolicy;
use crate::transport::{AudioUpload, Prompt, Transport, VideoUpload};
use crate::types::{
    Artifact, Classification, ConversationId, EntryRef, LinkKind, MediaKind, MessageRef,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Reported size of fake downloads unless overridden
pub(crate) const DEFAULT_FAKE_SIZE: u64 = 1024 * 1024;

/// Collection entries `vid1..vidN` without direct URLs
pub(crate) fn numbered_entries(n: usize) -> Vec<EntryRef> {
    (1..=n)
        .map(|i| EntryRef {
            id: Some(format!("vid{i}")),
            url: None,
            title: Some(format!("Item {i}")),
        })
        .collect()
}

/// Create a small file and wrap it as an artifact reporting `size_bytes`
pub(crate) fn artifact_in(dir: &Path, name: &str, size_bytes: u64, kind: MediaKind) -> Artifact {
    let path = dir.join(name);
    std::fs::write(&path, b"media").unwrap();
    Artifact {
        path,
        size_bytes,
        title: Some("Test clip".into()),
        uploader: Some("Uploader".into()),
        duration_secs: Some(60),
        media_kind: kind,
    }
}

/// Blocks fake downloads until opened
#[derive(Clone, Default)]
pub(crate) struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub(crate) fn open(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    fn wait(&self) {
        let (lock, cvar) = &*self.0;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }
}

enum ProbePlan {
    Classified(Classification),
    Panic,
}

enum DownloadPlan {
    Size(u64),
    Fail(String),
}

/// Scripted engine; unknown links fail to classify and download at the default size
#[derive(Default)]
pub(crate) struct FakeEngine {
    probes: HashMap<String, ProbePlan>,
    downloads: HashMap<String, DownloadPlan>,
    gate: Option<Gate>,
    probe_calls: Mutex<Vec<String>>,
    materialize_calls: Mutex<Vec<(String, FormatPolicy)>>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_single(mut self, link: &str, title: &str, duration_secs: u64) -> Self {
        self.probes.insert(
            link.to_string(),
            ProbePlan::Classified(Classification {
                title: Some(title.to_string()),
                duration_secs: Some(duration_secs),
                kind: LinkKind::Single,
            }),
        );
        self
    }

    pub(crate) fn with_entries(mut self, link: &str, entries: Vec<EntryRef>) -> Self {
        self.probes.insert(
            link.to_string(),
            ProbePlan::Classified(Classification {
                title: Some("Test playlist".to_string()),
                duration_secs: None,
                kind: LinkKind::Collection { entries },
            }),
        );
        self
    }

    pub(crate) fn with_collection(self, link: &str, n: usize) -> Self {
        self.with_entries(link, numbered_entries(n))
    }

    pub(crate) fn with_probe_panic(mut self, link: &str) -> Self {
        self.probes.insert(link.to_string(), ProbePlan::Panic);
        self
    }

    pub(crate) fn with_download_size(mut self, link: &str, size_bytes: u64) -> Self {
        self.downloads
            .insert(link.to_string(), DownloadPlan::Size(size_bytes));
        self
    }

    pub(crate) fn with_download_failure(mut self, link: &str, cause: &str) -> Self {
        self.downloads
            .insert(link.to_string(), DownloadPlan::Fail(cause.to_string()));
        self
    }

    pub(crate) fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn probe_calls(&self) -> Vec<String> {
        self.probe_calls.lock().unwrap().clone()
    }

    pub(crate) fn materialize_calls(&self) -> Vec<(String, FormatPolicy)> {
        self.materialize_calls.lock().unwrap().clone()
    }
}

impl MediaEngine for FakeEngine {
    fn probe(&self, link: &str) -> Result<Classification> {
        self.probe_calls.lock().unwrap().push(link.to_string());
        match self.probes.get(link) {
            Some(ProbePlan::Classified(classification)) => Ok(classification.clone()),
            Some(ProbePlan::Panic) => panic!("probe crashed for {link}"),
            None => Err(Error::Classification(format!("unsupported link {link}"))),
        }
    }

    fn materialize(
        &self,
        link: &str,
        policy: &FormatPolicy,
        output: &OutputSpec,
    ) -> Result<Artifact> {
        self.materialize_calls
            .lock()
            .unwrap()
            .push((link.to_string(), policy.clone()));

        if let Some(gate) = &self.gate {
            gate.wait();
        }

        let size_bytes = match self.downloads.get(link) {
            Some(DownloadPlan::Fail(cause)) => {
                return Err(DownloadError::ToolFailed {
                    cause: cause.clone(),
                }
                .into());
            }
            Some(DownloadPlan::Size(size)) => *size,
            None => DEFAULT_FAKE_SIZE,
        };

        let (ext, media_kind) = if policy.audio.is_some() {
            ("mp3", MediaKind::Audio)
        } else {
            ("mp4", MediaKind::Video)
        };
        let path = output.dir.join(format!("{}-fake.{ext}", output.stem));
        std::fs::write(&path, b"media")?;

        Ok(Artifact {
            path,
            size_bytes,
            title: Some(format!("Title of {link}")),
            uploader: Some("Uploader".to_string()),
            duration_secs: Some(60),
            media_kind,
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Everything the bot sent, in order
#[derive(Debug, Clone)]
pub(crate) enum Outbound {
    Sent {
        chat: ConversationId,
        message: MessageRef,
        prompt: Prompt,
    },
    Edited {
        message: MessageRef,
        prompt: Prompt,
    },
    Audio {
        chat: ConversationId,
        upload: AudioUpload,
        file_existed: bool,
    },
    Video {
        chat: ConversationId,
        upload: VideoUpload,
        file_existed: bool,
    },
}

/// Transport that records traffic instead of sending it
pub(crate) struct RecordingTransport {
    log: Mutex<Vec<Outbound>>,
    next_id: AtomicI64,
    upload_failure: Mutex<Option<String>>,
    blocked: Mutex<HashSet<ConversationId>>,
    stalled: Mutex<HashSet<ConversationId>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            upload_failure: Mutex::new(None),
            blocked: Mutex::new(HashSet::new()),
            stalled: Mutex::new(HashSet::new()),
        }
    }

    /// Reject every prompt to `chat`, as if the user blocked the bot
    pub(crate) fn block_chat(&self, chat: ConversationId) {
        self.blocked.lock().unwrap().insert(chat);
    }

    /// Never answer prompts to `chat`
    pub(crate) fn stall_chat(&self, chat: ConversationId) {
        self.stalled.lock().unwrap().insert(chat);
    }

    async fn reach(&self, chat: ConversationId) -> Result<()> {
        if self.blocked.lock().unwrap().contains(&chat) {
            return Err(Error::Transport(
                "sendMessage: Forbidden: bot was blocked by the user".into(),
            ));
        }
        let stalled = self.stalled.lock().unwrap().contains(&chat);
        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    pub(crate) fn fail_uploads(&self, cause: &str) {
        *self.upload_failure.lock().unwrap() = Some(cause.to_string());
    }

    pub(crate) fn outbound(&self) -> Vec<Outbound> {
        self.log.lock().unwrap().clone()
    }

    /// Texts of every sent or edited prompt, in order
    pub(crate) fn texts(&self) -> Vec<String> {
        self.outbound()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Sent { prompt, .. } | Outbound::Edited { prompt, .. } => {
                    Some(prompt.text)
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    fn upload_result(&self) -> Result<()> {
        match self.upload_failure.lock().unwrap().clone() {
            Some(cause) => Err(Error::UploadFailed(cause)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_prompt(&self, chat: ConversationId, prompt: &Prompt) -> Result<MessageRef> {
        self.reach(chat).await?;
        let message = MessageRef {
            chat,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        self.log.lock().unwrap().push(Outbound::Sent {
            chat,
            message,
            prompt: prompt.clone(),
        });
        Ok(message)
    }

    async fn edit_prompt(&self, message: MessageRef, prompt: &Prompt) -> Result<()> {
        self.reach(message.chat).await?;
        self.log.lock().unwrap().push(Outbound::Edited {
            message,
            prompt: prompt.clone(),
        });
        Ok(())
    }

    async fn send_audio(
        &self,
        chat: ConversationId,
        file: &Path,
        upload: &AudioUpload,
    ) -> Result<()> {
        self.upload_result()?;
        self.log.lock().unwrap().push(Outbound::Audio {
            chat,
            upload: upload.clone(),
            file_existed: file.exists(),
        });
        Ok(())
    }

    async fn send_video(
        &self,
        chat: ConversationId,
        file: &Path,
        upload: &VideoUpload,
    ) -> Result<()> {
        self.upload_result()?;
        self.log.lock().unwrap().push(Outbound::Video {
            chat,
            upload: upload.clone(),
            file_existed: file.exists(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
