//! The output region and the status surface that writes into it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use disentangler_types::{Output, Status};

/// Accepts short human-visible status strings during bootstrap.
pub trait StatusSurface: Send + Sync {
    fn show(&self, status: Status);
}

#[derive(Debug, Default)]
struct RegionState {
    output: Output,
    revision: u64,
}

/// The single visible output area. Successes, failures and statuses all
/// replace its whole content.
#[derive(Debug, Clone, Default)]
pub struct OutputRegion {
    inner: Arc<Mutex<RegionState>>,
}

impl OutputRegion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, output: Output) {
        let mut state = self.lock();
        state.output = output;
        state.revision = state.revision.wrapping_add(1);
    }

    #[must_use]
    pub fn snapshot(&self) -> Output {
        self.lock().output.clone()
    }

    /// Bumped on every replacement.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    fn lock(&self) -> MutexGuard<'_, RegionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusSurface for OutputRegion {
    fn show(&self, status: Status) {
        self.replace(Output::Status(status));
    }
}
