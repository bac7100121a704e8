//! Background jobs spawned by the dispatcher

use super::{Input, Services};
use crate::batch::BatchOrchestrator;
use crate::delivery::DeliveryContext;
use crate::error::{Result, UserFacing};
use crate::executor::DownloadRequest;
use crate::messages;
use crate::session::Ticket;
use crate::transport::Prompt;
use crate::types::{ConversationId, DownloadType, EntryRef, Event, MessageRef};
use std::future::Future;

pub(super) fn spawn_classification(
    services: Services,
    chat: ConversationId,
    ticket: Ticket,
    link: String,
    status: MessageRef,
) {
    tokio::spawn(async move {
        let result = services.classifier.classify(&link).await;
        services.post(Input::Classified {
            chat,
            ticket,
            link,
            status,
            result,
        });
    });
}

pub(super) fn spawn_single(services: Services, request: DownloadRequest, status: MessageRef) {
    let chat = request.chat;
    supervise(services.clone(), chat, status, run_single(services, request, status));
}

pub(super) fn spawn_batch(
    services: Services,
    chat: ConversationId,
    entries: Vec<EntryRef>,
    download_type: DownloadType,
    status: MessageRef,
) {
    supervise(
        services.clone(),
        chat,
        status,
        run_batch(services, chat, entries, download_type, status),
    );
}

/// Run a job and always report back, even if it panics
fn supervise<F>(services: Services, chat: ConversationId, status: MessageRef, job: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let inner = tokio::spawn(job);

    tokio::spawn(async move {
        let notice = match inner.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                tracing::error!(chat = %chat, code = e.error_code(), error = %e, "job failed");
                Some(e.user_message())
            }
            Err(e) => {
                tracing::error!(chat = %chat, error = %e, "job panicked");
                Some(crate::error::GENERIC_FAILURE.to_string())
            }
        };

        if let Some(text) = notice {
            if let Err(e) = services
                .transport
                .edit_prompt(status, &Prompt::text(text))
                .await
            {
                tracing::warn!(chat = %chat, error = %e, "failed to report job failure");
            }
        }

        services.post(Input::JobFinished { chat });
    });
}

async fn run_single(services: Services, request: DownloadRequest, status: MessageRef) -> Result<()> {
    let chat = request.chat;
    let transport = &services.transport;

    transport
        .edit_prompt(
            status,
            &messages::downloading(request.download_type, request.quality),
        )
        .await?;
    services.emit(Event::DownloadStarted {
        chat,
        download_type: request.download_type,
        quality: request.quality,
    });

    let artifact = match services.executor.execute(&request).await {
        Ok(artifact) => artifact,
        Err(e) => {
            services.emit(Event::Failed {
                chat,
                code: e.error_code().to_string(),
                error: e.to_string(),
            });
            return transport
                .edit_prompt(status, &Prompt::text(e.user_message()))
                .await;
        }
    };

    if services.delivery.within_limit(artifact.size_bytes) {
        if let Err(e) = transport
            .edit_prompt(status, &messages::uploading(artifact.size_mib()))
            .await
        {
            tracing::warn!(chat = %chat, error = %e, "failed to update status");
        }
    }

    let outcome = services
        .delivery
        .deliver(artifact, DeliveryContext::single(chat))
        .await;

    match outcome.into_result() {
        Ok(size_bytes) => {
            services.emit(Event::Delivered { chat, size_bytes });
            transport.edit_prompt(status, &messages::done()).await
        }
        Err(e) => {
            services.emit(Event::Failed {
                chat,
                code: e.error_code().to_string(),
                error: e.to_string(),
            });
            transport
                .edit_prompt(status, &Prompt::text(e.user_message()))
                .await
        }
    }
}

async fn run_batch(
    services: Services,
    chat: ConversationId,
    entries: Vec<EntryRef>,
    download_type: DownloadType,
    status: MessageRef,
) -> Result<()> {
    let total = entries.len();
    if let Err(e) = services
        .transport
        .edit_prompt(status, &messages::batch_started(total, download_type))
        .await
    {
        tracing::warn!(chat = %chat, error = %e, "failed to update status");
    }
    services.emit(Event::BatchStarted { chat, total });

    let orchestrator = BatchOrchestrator::new(
        services.executor.clone(),
        services.delivery.clone(),
        services.transport.clone(),
    );
    let progress_sink = services.clone();
    let summary = orchestrator
        .run_batch(chat, &entries, download_type, move |progress| {
            progress_sink.post(Input::Progress { chat, progress });
        })
        .await;

    services.emit(Event::BatchComplete {
        chat,
        succeeded: summary.succeeded,
        failed: summary.failed,
        total: summary.total,
    });
    services
        .transport
        .send_prompt(chat, &messages::batch_summary(&summary))
        .await?;
    Ok(())
}
