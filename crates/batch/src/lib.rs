//! Batch conversion of camera RAW files into DNG.
//!
//! Given a [`Selection`] of inputs (an explicit file list, or a folder to be
//! scanned) and an output folder, the [`Orchestrator`] converts every input
//! through a [`Converter`](raw2dng_convert::Converter), one call per file.
//! A failing file is counted and reported but never stops the batch.
//!
//! Progress is published as a [`BatchState`] on a [`tokio::sync::watch`]
//! channel, and the run ends with exactly one [`Completion`]. The underlying
//! [`BatchEvent`] stream is available through [`Orchestrator::events`] for
//! callers that want to drive it themselves.

pub mod access;
pub mod error;
pub mod extension;
mod file;
mod orchestrator;
pub mod scan;
mod state;
mod stream;
#[cfg(test)]
mod testing;

pub use crate::access::{AccessGuard, LocalResource, ResourceHandle, ScopedResource};
pub use crate::file::{ConversionTask, Failure, FailureKind, ItemOutcome, ItemResult};
pub use crate::orchestrator::{BatchHandle, Completion, Options, Orchestrator, RunStatus, Selection};
pub use crate::state::BatchState;
pub use crate::stream::BatchEvent;
