use crate::stream::BatchEvent;

/// Observable progress of a batch.
///
/// Published on a [`tokio::sync::watch`] channel by
/// [`Orchestrator::spawn`](crate::Orchestrator::spawn); every update is a
/// complete, consistent snapshot. `succeeded + failed == completed` and
/// `completed <= total` hold at every point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchState {
    pub running: bool,
    /// Display name of the item most recently started or finished.
    pub current_item: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Human-readable status line.
    pub status: String,
    pub has_error: bool,
}

impl BatchState {
    /// Fraction of items resolved so far, between `0.0` and `1.0`.
    pub fn progress(&self) -> f64 {
        match self.total {
            0 => 0.0,
            total => self.completed as f64 / total as f64,
        }
    }

    pub(crate) fn apply(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::Started => {
                *self = Self { status: "Scanning for RAW files...".to_string(), ..Self::default() };
            },
            BatchEvent::DiscoveryComplete(total) => {
                self.running = true;
                self.total = *total;
                self.status = format!("Found {total} RAW files");
            },
            BatchEvent::ItemStarted { name, .. } => {
                self.current_item = Some(name.clone());
            },
            BatchEvent::ItemFinished(result) => {
                self.completed += 1;
                match result.outcome.is_success() {
                    true => self.succeeded += 1,
                    false => self.failed += 1,
                }
                self.current_item = Some(result.name.clone());
                self.status = format!("Converted: {}, Failed: {}", self.succeeded, self.failed);
                self.has_error = self.failed > 0;
            },
            BatchEvent::Complete => {
                self.running = false;
                self.current_item = None;
                self.status = "Conversion complete!".to_string();
                self.has_error = self.failed > 0;
            },
            BatchEvent::Cancelled => {
                self.running = false;
                self.current_item = None;
                self.status = "Conversion cancelled".to_string();
                self.has_error = true;
            },
        }
    }

    /// End the batch early with a batch-level error message.
    pub(crate) fn abort(&mut self, message: impl Into<String>) {
        self.running = false;
        self.current_item = None;
        self.status = message.into();
        self.has_error = true;
    }

    /// Final user-facing summary, once the batch has finished or been cancelled.
    pub(crate) fn summary(&self) -> String {
        format!("{}\nSuccessfully converted: {}\nFailed: {}", self.status, self.succeeded, self.failed)
    }
}
