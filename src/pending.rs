//! One-shot results produced off the frame thread.
//!
//! The library load and external object loads run on worker threads. Their
//! results come back through a [`Pending`], which the owner polls on its own
//! thread without ever blocking the frame loop.

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::WorkerLost;

/// Outcome of polling a [`Pending`].
#[derive(Debug)]
pub enum Poll<T, E> {
    Pending,
    Ready(Result<T, E>),
}

/// A result that will arrive later.
#[derive(Debug)]
pub struct Pending<T, E> {
    rx: Receiver<Result<T, E>>,
}

/// The sending half of a [`Pending`]. Dropping it unfulfilled reports
/// [`WorkerLost`] to the receiver.
#[derive(Debug)]
pub struct Completer<T, E> {
    tx: Sender<Result<T, E>>,
}

impl<T, E> Completer<T, E> {
    pub fn complete(self, result: Result<T, E>) {
        // The receiver may have been dropped; nobody is waiting then.
        let _ = self.tx.send(result);
    }
}

impl<T, E> Pending<T, E>
where
    E: From<WorkerLost>,
{
    /// A pending result and the handle that fulfills it.
    pub fn channel() -> (Completer<T, E>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (Completer { tx }, Self { rx })
    }

    /// An already-completed result.
    pub fn ready(result: Result<T, E>) -> Self {
        let (completer, pending) = Self::channel();
        completer.complete(result);
        pending
    }

    /// Run `job` on a named worker thread.
    pub fn spawn<F>(name: &str, job: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (completer, pending) = Self::channel();
        let spawned = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || completer.complete(job()));
        if let Err(e) = spawned {
            // The completer was moved into the failed closure and dropped with it,
            // so the next poll reports WorkerLost.
            log::error!("failed to spawn worker thread '{name}': {e}");
        }
        pending
    }

    /// Check for the result without blocking.
    pub fn poll(&self) -> Poll<T, E> {
        match self.rx.try_recv() {
            Ok(result) => Poll::Ready(result),
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Disconnected) => Poll::Ready(Err(E::from(WorkerLost))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryLoadError;

    #[test]
    fn stays_pending_until_completed() {
        let (completer, pending) = Pending::<u32, LibraryLoadError>::channel();
        assert!(matches!(pending.poll(), Poll::Pending));
        completer.complete(Ok(7));
        assert!(matches!(pending.poll(), Poll::Ready(Ok(7))));
    }

    #[test]
    fn dropped_completer_reports_worker_lost() {
        let (completer, pending) = Pending::<u32, LibraryLoadError>::channel();
        drop(completer);
        assert!(matches!(
            pending.poll(),
            Poll::Ready(Err(LibraryLoadError::WorkerLost))
        ));
    }

    #[test]
    fn spawned_job_delivers_result() {
        let pending = Pending::<u32, LibraryLoadError>::spawn("test-worker", || Ok(42));
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            match pending.poll() {
                Poll::Ready(result) => {
                    assert_eq!(result, Ok(42));
                    break;
                }
                Poll::Pending if std::time::Instant::now() < deadline => std::thread::yield_now(),
                Poll::Pending => panic!("worker never finished"),
            }
        }
    }
}
