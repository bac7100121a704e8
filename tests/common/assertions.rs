//! Event helpers for integration tests

use std::time::Duration;
use tokio::sync::broadcast;
use tubedrop::Event;

/// Receive events until one matches `predicate`
///
/// Returns every event seen, the matching one last. Panics on timeout or a
/// closed channel.
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    mut predicate: F,
) -> Vec<Event>
where
    F: FnMut(&Event) -> bool,
{
    let mut seen = Vec::new();
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let done = predicate(&event);
                    seen.push(event);
                    if done {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    panic!("event receiver lagged by {n}");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    panic!("event channel closed");
                }
            }
        }
    })
    .await;

    assert!(result.is_ok(), "timed out waiting for event; saw {seen:?}");
    seen
}

/// Number of entries left in a directory (zero if it does not exist)
pub fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
