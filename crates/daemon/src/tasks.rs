//! Tokio task utilities

use std::future::Future;

use tokio::task::{JoinError, JoinSet};

/// A [`JoinSet`] of fallible tasks where the first failure takes every other task
/// down with it.
///
/// - a task returning `Err` or panicking aborts the rest, which are awaited before
///   the error is handed back
/// - a cancelled task is only logged
/// - dropping the set aborts whatever is still running
pub struct FailFastJoinSet<T, E> {
    tasks: JoinSet<Result<T, E>>,
    /// First failure seen, kept until a `try_wait_all` call returns it.
    failure: Option<TryWaitAllError<E>>,
}

impl<T, E> Default for FailFastJoinSet<T, E> {
    fn default() -> Self {
        Self {
            tasks: JoinSet::new(),
            failure: None,
        }
    }
}

impl<T, E> FailFastJoinSet<T, E> {
    /// Creates a new empty fail-fast join set
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task in the set
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Number of tasks still tracked by the set.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when no task is tracked.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T, E> FailFastJoinSet<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Waits for every task, returning on the first error or panic.
    ///
    /// Cancel safe: if the returned future is dropped, even while the other tasks are
    /// being shut down after a failure, the next call finishes the shutdown and
    /// returns that same failure.
    pub async fn try_wait_all(&mut self) -> Result<(), TryWaitAllError<E>> {
        if self.failure.is_none() {
            while let Some(result) = self.tasks.join_next().await {
                match result {
                    Ok(Ok(_)) => continue,
                    Ok(Err(err)) => {
                        self.failure = Some(TryWaitAllError::Error(err));
                        break;
                    }
                    Err(err) if err.is_cancelled() => {
                        tracing::trace!("task {} was cancelled", err.id());
                        continue;
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "task {} panicked", err.id());
                        self.failure = Some(TryWaitAllError::Panic(err));
                        break;
                    }
                }
            }
        }

        if self.failure.is_none() {
            return Ok(());
        }
        self.tasks.shutdown().await;
        match self.failure.take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// The error type returned by [`FailFastJoinSet::try_wait_all`]
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum TryWaitAllError<E> {
    /// A task returned `Err`.
    Error(E),
    /// A task panicked.
    Panic(JoinError),
}
