//! Sequential batch downloads over a collection
//!
//! Entries are processed strictly one after another. Each one is
//! materialized, delivered and deleted before the next starts, so at most one
//! artifact of a batch exists on disk at any time. A failing entry is counted
//! and the batch moves on.

use crate::delivery::{DeliveryContext, DeliveryManager};
use crate::error::{Error, UserFacing};
use crate::executor::{DownloadExecutor, DownloadRequest};
use crate::messages;
use crate::transport::Transport;
use crate::types::{BatchProgress, ConversationId, DownloadType, EntryRef, Quality};
use std::sync::Arc;

/// Progress notices are sent for the first entry and every fifth one
pub const PROGRESS_INTERVAL: usize = 5;

/// Whether entry `index` (1-based) gets a progress notice
pub fn is_checkpoint(index: usize) -> bool {
    index == 1 || index % PROGRESS_INTERVAL == 0
}

/// What happened to one entry
#[derive(Debug)]
pub enum ItemOutcome {
    /// Downloaded and delivered
    Delivered,
    /// The entry carried no usable link
    Skipped,
    /// Download or delivery failed
    Failed(Error),
}

/// Outcome of one entry with its position
#[derive(Debug)]
pub struct ItemReport {
    /// 1-based position in the collection
    pub index: usize,
    /// Entry title, if known
    pub title: Option<String>,
    /// What happened
    pub outcome: ItemOutcome,
}

/// Totals reported when a batch finishes
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Entries delivered
    pub succeeded: usize,
    /// Entries that failed
    pub failed: usize,
    /// Entries in the collection, skipped ones included
    pub total: usize,
    /// Per-entry outcomes in collection order
    pub items: Vec<ItemReport>,
}

impl BatchSummary {
    /// Entries that carried no usable link
    pub fn skipped(&self) -> usize {
        self.total - self.succeeded - self.failed
    }

    /// Failed entries with their causes
    pub fn failures(&self) -> impl Iterator<Item = (&ItemReport, &Error)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            ItemOutcome::Failed(e) => Some((item, e)),
            _ => None,
        })
    }
}

/// Runs a collection through the executor and delivery one entry at a time
#[derive(Clone)]
pub struct BatchOrchestrator {
    executor: Arc<DownloadExecutor>,
    delivery: Arc<DeliveryManager>,
    transport: Arc<dyn Transport>,
}

impl BatchOrchestrator {
    /// Create an orchestrator
    pub fn new(
        executor: Arc<DownloadExecutor>,
        delivery: Arc<DeliveryManager>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            executor,
            delivery,
            transport,
        }
    }

    /// Download and deliver every entry
    ///
    /// Entries always use the best quality tier. `on_progress` is called
    /// after each entry with the running counters. Progress notices are
    /// best effort; a failed notice never stops the batch.
    pub async fn run_batch<F>(
        &self,
        chat: ConversationId,
        entries: &[EntryRef],
        download_type: DownloadType,
        mut on_progress: F,
    ) -> BatchSummary
    where
        F: FnMut(BatchProgress),
    {
        let total = entries.len();
        let mut progress = BatchProgress::default();
        let mut items = Vec::with_capacity(total);

        tracing::info!(chat = %chat, total, download_type = ?download_type, "batch started");

        for (offset, entry) in entries.iter().enumerate() {
            let index = offset + 1;

            if is_checkpoint(index) {
                let notice = messages::batch_progress(index, total);
                if let Err(e) = self.transport.send_prompt(chat, &notice).await {
                    tracing::warn!(chat = %chat, index, error = %e, "failed to send progress notice");
                }
            }

            let outcome = match entry.resolve_link() {
                None => {
                    tracing::debug!(chat = %chat, index, "skipping entry without link");
                    ItemOutcome::Skipped
                }
                Some(link) => match self.run_item(chat, link, download_type, index, total).await {
                    Ok(()) => ItemOutcome::Delivered,
                    Err(e) => {
                        tracing::warn!(
                            chat = %chat,
                            index,
                            code = e.error_code(),
                            error = %e,
                            "batch entry failed"
                        );
                        ItemOutcome::Failed(e)
                    }
                },
            };

            progress.processed += 1;
            match outcome {
                ItemOutcome::Delivered => progress.succeeded += 1,
                ItemOutcome::Failed(_) => progress.failed += 1,
                ItemOutcome::Skipped => {}
            }
            on_progress(progress);

            items.push(ItemReport {
                index,
                title: entry.title.clone(),
                outcome,
            });
        }

        tracing::info!(
            chat = %chat,
            succeeded = progress.succeeded,
            failed = progress.failed,
            total,
            "batch complete"
        );

        BatchSummary {
            succeeded: progress.succeeded,
            failed: progress.failed,
            total,
            items,
        }
    }

    async fn run_item(
        &self,
        chat: ConversationId,
        link: String,
        download_type: DownloadType,
        index: usize,
        total: usize,
    ) -> crate::Result<()> {
        let request = DownloadRequest {
            chat,
            link,
            download_type,
            quality: Quality::Best,
        };
        let artifact = self.executor.execute(&request).await?;
        self.delivery
            .deliver(artifact, DeliveryContext::batch_item(chat, index, total))
            .await
            .into_result()
            .map(|_| ())
    }
}
