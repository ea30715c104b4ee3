//! Load-once bookkeeping for the rendering library.

use crate::error::LibraryLoadError;
use crate::pending::{Pending, Poll};

/// A library load in flight.
pub type PendingLibrary<L> = Pending<L, LibraryLoadError>;

enum Slot<L> {
    Idle,
    Loading(PendingLibrary<L>),
    Loaded(L),
}

/// What [`LibraryLoader::poll`] found.
#[derive(Debug)]
pub enum LibraryStatus<'a, L> {
    /// No load has been started (or the last one failed).
    Idle,
    /// A load is in flight.
    Loading,
    /// The library is available.
    Loaded(&'a L),
    /// The load just failed; the loader is idle again.
    Failed(LibraryLoadError),
}

/// Ensures the rendering library is loaded at most once at a time.
///
/// A failed load returns the loader to idle so a later `begin` can retry;
/// nothing retries automatically.
pub struct LibraryLoader<L> {
    slot: Slot<L>,
}

impl<L> Default for LibraryLoader<L> {
    fn default() -> Self {
        Self { slot: Slot::Idle }
    }
}

impl<L> LibraryLoader<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load with `start` unless one is in flight or already done.
    ///
    /// Returns true when a new load was started.
    pub fn begin(&mut self, start: impl FnOnce() -> PendingLibrary<L>) -> bool {
        match self.slot {
            Slot::Idle => {
                self.slot = Slot::Loading(start());
                true
            }
            Slot::Loading(_) | Slot::Loaded(_) => false,
        }
    }

    /// Collect the result of an in-flight load, if it has arrived.
    pub fn poll(&mut self) -> LibraryStatus<'_, L> {
        if let Slot::Loading(pending) = &self.slot {
            match pending.poll() {
                Poll::Pending => return LibraryStatus::Loading,
                Poll::Ready(Ok(library)) => self.slot = Slot::Loaded(library),
                Poll::Ready(Err(e)) => {
                    self.slot = Slot::Idle;
                    return LibraryStatus::Failed(e);
                }
            }
        }

        match &self.slot {
            Slot::Idle => LibraryStatus::Idle,
            Slot::Loading(_) => LibraryStatus::Loading,
            Slot::Loaded(library) => LibraryStatus::Loaded(library),
        }
    }

    pub fn get(&self) -> Option<&L> {
        match &self.slot {
            Slot::Loaded(library) => Some(library),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.slot, Slot::Idle)
    }
}
