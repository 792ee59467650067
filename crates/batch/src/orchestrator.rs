use crate::access::{LocalResource, ResourceHandle};
use crate::error::ErrorKind;
use crate::file::{ItemOutcome, ItemResult};
use crate::state::BatchState;
use crate::stream::BatchEvent;
use derive_more::Display;
use futures::StreamExt;
use raw2dng_convert::ConverterHandle;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Tuning for a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Options {
    /// Maximum number of items converted at the same time. `1` is strictly
    /// sequential.
    pub jobs: usize,
    /// Descend into sub-folders of a [`Selection::Folder`].
    pub recursive: bool,
    /// Read the start of every input before handing it to the converter.
    pub preflight: bool,
}
impl Default for Options {
    fn default() -> Self {
        Self { jobs: 1, recursive: true, preflight: true }
    }
}

/// What to convert.
pub enum Selection {
    /// Converted verbatim and in order; no extension filtering.
    Files(Vec<ResourceHandle>),
    /// Scanned for RAW files, which are converted in file name order.
    Folder(ResourceHandle),
}
impl Selection {
    /// An explicit list of local files.
    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::Files(paths.into_iter().map(|path| LocalResource::file(path).into_handle()).collect())
    }

    /// A local folder to scan.
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self::Folder(LocalResource::source_directory(path).into_handle())
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum RunStatus {
    /// Every item was processed (some may have failed).
    #[display("completed")]
    Completed,
    /// Stopped early on request.
    #[display("cancelled")]
    Cancelled,
    /// There was nothing to convert.
    #[display("empty")]
    Empty,
    /// The selected folder couldn't be accessed or scanned.
    #[display("unavailable")]
    Unavailable,
}

/// Delivered exactly once at the end of every run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// `true` only if the run completed and no item failed.
    pub success: bool,
    pub summary: String,
    pub status: RunStatus,
    /// One entry per processed item, in the order they finished.
    pub results: Vec<ItemResult>,
}

/// Observer side of a spawned batch.
pub struct BatchHandle {
    pub state: watch::Receiver<BatchState>,
    pub completion: oneshot::Receiver<Completion>,
}

/// Converts a selection of RAW files into DNG files in an output folder.
pub struct Orchestrator {
    converter: ConverterHandle,
    options: Options,
}

impl Orchestrator {
    pub fn new(converter: ConverterHandle, options: Options) -> Self {
        let options = Options { jobs: options.jobs.max(1), ..options };
        Self { converter, options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn converter(&self) -> &ConverterHandle {
        &self.converter
    }

    /// Run a batch to the end, publishing every state change to `state`.
    ///
    /// Item failures never stop the batch; they're logged, counted, and
    /// listed in [`Completion::results`].
    #[instrument(level = "debug", skip_all, fields(jobs = self.options.jobs))]
    pub async fn run(
        &self,
        selection: Selection,
        output: ResourceHandle,
        cancel: CancellationToken,
        state: &watch::Sender<BatchState>,
    ) -> Completion {
        let mut results = Vec::new();
        let mut status = RunStatus::Completed;
        let mut events = std::pin::pin!(self.events(selection, output, cancel));
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    let (status, message) = match &*e {
                        ErrorKind::Empty => (RunStatus::Empty, "No RAW files found"),
                        ErrorKind::AccessDenied(_) | ErrorKind::Scan(_) => {
                            (RunStatus::Unavailable, "Unable to access folder")
                        },
                    };
                    tracing::error!(error = ?e, "Batch could not start");
                    state.send_modify(|s| s.abort(message));
                    return Completion { success: false, summary: message.to_string(), status, results };
                },
            };
            log_event(&event);
            if event == BatchEvent::Cancelled {
                status = RunStatus::Cancelled;
            }
            state.send_modify(|s| s.apply(&event));
            if let BatchEvent::ItemFinished(result) = event {
                results.push(result);
            }
        }

        let (summary, failed) = {
            let snapshot = state.borrow();
            (snapshot.summary(), snapshot.failed)
        };
        Completion { success: status == RunStatus::Completed && failed == 0, summary, status, results }
    }

    /// Run a batch on a background task.
    pub fn spawn(self: Arc<Self>, selection: Selection, output: ResourceHandle, cancel: CancellationToken) -> BatchHandle {
        let (state_tx, state_rx) = watch::channel(BatchState::default());
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let completion = self.run(selection, output, cancel, &state_tx).await;
            if done_tx.send(completion).is_err() {
                tracing::debug!("Batch completion dropped: nobody is waiting for it");
            }
        });
        BatchHandle { state: state_rx, completion: done_rx }
    }
}

fn log_event(event: &BatchEvent) {
    match event {
        BatchEvent::Started => tracing::debug!("Batch started"),
        BatchEvent::DiscoveryComplete(total) => tracing::info!(total, "Found RAW files"),
        BatchEvent::ItemStarted { .. } => {},
        BatchEvent::ItemFinished(result) => match &result.outcome {
            ItemOutcome::Success => tracing::info!(
                input = %result.input.display(),
                output = ?result.output,
                "Converted"
            ),
            ItemOutcome::Failure(failure) => tracing::warn!(
                input = %result.input.display(),
                kind = %failure.kind,
                descriptor = %failure.descriptor,
                "Conversion failed"
            ),
        },
        BatchEvent::Complete => tracing::info!("Batch complete"),
        BatchEvent::Cancelled => tracing::warn!("Batch cancelled"),
    }
}
