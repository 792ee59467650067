use crate::access::{AccessGuard, LocalResource, ResourceHandle, Serialized};
use crate::error::{ErrorKind, Result};
use crate::file::{ConversionTask, FailureKind, ItemOutcome, ItemResult, convert_task, mark_collisions};
use crate::orchestrator::{Orchestrator, Selection};
use crate::scan;
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use raw2dng_convert::ConverterHandle;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Progress events emitted by [`Orchestrator::events`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    total number of items.
/// 3. [`ItemStarted`](Self::ItemStarted) and [`ItemFinished`](Self::ItemFinished),
///    once each per item launched. Items start in input order; with more than
///    one job they may finish out of order.
/// 4. [`Complete`](Self::Complete) or [`Cancelled`](Self::Cancelled), exactly
///    once, ending the stream.
///
/// A batch that can't start (nothing to convert, folder unavailable) yields
/// a single `Err` after `Started` and ends there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchEvent {
    Started,
    /// All inputs are known; the total count is now fixed.
    DiscoveryComplete(usize),
    ItemStarted {
        index: usize,
        name: String,
    },
    ItemFinished(ItemResult),
    /// Every item has been processed.
    Complete,
    /// Cancellation was requested; in-flight items were allowed to finish
    /// but nothing new was started.
    Cancelled,
}

impl Orchestrator {
    /// Stream the [`BatchEvent`]s of converting `selection` into `output`.
    ///
    /// At most `jobs` items are in flight at a time; the next pending item is
    /// promoted as soon as one finishes. `cancel` is checked before each item
    /// is launched.
    pub fn events(
        &self,
        selection: Selection,
        output: ResourceHandle,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<BatchEvent>> + Send + '_ {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            yield Ok(BatchEvent::Started);

            let inputs = match self.resolve(selection).await {
                Ok(inputs) => inputs,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            if inputs.is_empty() {
                yield Err(exn::Exn::from(ErrorKind::Empty));
                return;
            }

            let output_dir = output.path().to_path_buf();
            // Shared by every in-flight item; its access calls must not interleave.
            let output = Arc::new(Serialized::new(output));
            let mut pending: VecDeque<_> = inputs
                .into_iter()
                .enumerate()
                .map(|(index, input)| ConversionTask::new(index, input, &output_dir))
                .collect();
            mark_collisions(pending.iter_mut());
            yield Ok(BatchEvent::DiscoveryComplete(pending.len()));

            let mut processing = FuturesUnordered::new();
            let mut cancelled = false;
            loop {
                while !cancelled && processing.len() < self.options().jobs && !pending.is_empty() {
                    if cancel.is_cancelled() {
                        tracing::info!(remaining = pending.len(), "Cancellation requested, not starting new items");
                        cancelled = true;
                        break;
                    }
                    let Some(task) = pending.pop_front() else {
                        break;
                    };
                    yield Ok(BatchEvent::ItemStarted { index: task.index, name: task.name.clone() });
                    processing.push(launch(self.converter().clone(), output.clone(), task, self.options().preflight));
                }
                match processing.next().await {
                    Some(result) => yield Ok(BatchEvent::ItemFinished(result)),
                    None => break,
                }
            }

            yield Ok(match cancelled {
                true => BatchEvent::Cancelled,
                false => BatchEvent::Complete,
            });
        })
    }

    /// Turn a selection into the ordered list of inputs to convert.
    async fn resolve(&self, selection: Selection) -> Result<Vec<ResourceHandle>> {
        let folder = match selection {
            Selection::Files(files) => return Ok(files),
            Selection::Folder(folder) => folder,
        };
        let Some(_access) = AccessGuard::acquire(&*folder) else {
            exn::bail!(ErrorKind::AccessDenied(folder.path().to_path_buf()));
        };
        let found = scan::discover(folder.path(), self.options().recursive).await?;
        Ok(found.into_iter().map(|path| LocalResource::file(path).into_handle()).collect())
    }
}

/// Convert one item on the blocking pool.
async fn launch(converter: ConverterHandle, output: Arc<Serialized>, task: ConversionTask, preflight: bool) -> ItemResult {
    let index = task.index;
    let name = task.name.clone();
    let input = task.input.path().to_path_buf();
    let target = task.output.clone();
    tracing::debug!(index, name = %name, "Converting");

    let outcome = match tokio::task::spawn_blocking(move || convert_task(&*converter, &*output, &task, preflight)).await
    {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            ItemOutcome::failure(FailureKind::ConversionFailed, format!("converter panicked: {}", panic_message(e.into_panic())))
        },
        Err(e) => ItemOutcome::failure(FailureKind::ConversionFailed, e.to_string()),
    };
    ItemResult { index, name, input, output: target, outcome }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast_ref::<&str>() {
            Some(message) => (*message).to_string(),
            None => "unknown panic".to_string(),
        },
    }
}
