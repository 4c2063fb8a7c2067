use std::future::Future;

use tokio::task::JoinSet;
use tracing::debug;

use crate::error_sink::ErrorSink;
use crate::errors::Result;

/// Runs one transfer worker per item with bounded concurrency and shared
/// error aggregation.
///
/// `items` is consumed from the tail in chunks of at most `max_concurrency`.
/// Every worker of a chunk is joined before the shared [`ErrorSink`] is
/// inspected: a hard barrier, so no worker outlives its own batch and
/// batches never overlap. A non-empty sink aborts the run at that point: the
/// aggregated error (prefixed with `context`) propagates and the un-popped
/// items are abandoned, while side effects of completed batches persist.
///
/// Workers report failures as messages, never by raising; a task that dies
/// anyway (panic) is recorded through the same sink so one item can never
/// crash its siblings. Empty input completes immediately.
///
/// `max_concurrency` is validated to be positive where the settings are
/// constructed.
pub(crate) async fn run_batches<T, F, Fut>(
    mut items: Vec<T>,
    max_concurrency: usize,
    context: &str,
    worker: F,
) -> Result<()>
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = std::result::Result<(), String>> + Send + 'static,
{
    let sink = ErrorSink::new();

    while !items.is_empty() {
        let batch_size = items.len().min(max_concurrency);
        let mut workers = JoinSet::new();

        for _ in 0..batch_size {
            let Some(item) = items.pop() else { break };
            let sink = sink.clone();
            let transfer = worker(item);
            workers.spawn(async move {
                if let Err(message) = transfer.await {
                    sink.record(message);
                }
            });
        }

        debug!("batch of {batch_size} transfers running, {} items remaining", items.len());
        while let Some(joined) = workers.join_next().await {
            if let Err(join_error) = joined {
                sink.record(format!("transfer task aborted: {join_error}"));
            }
        }

        sink.drain(context)?;
    }

    Ok(())
}
