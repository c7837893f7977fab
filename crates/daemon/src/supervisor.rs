//! Fans a dump run out to one worker per collection.

use std::future::Future;
use std::sync::Arc;

use mgosd_core::{new_dir_lock, DirLock, DocumentSource, DumpError, DumperConfig};
use thiserror::Error;
use tokio::task::JoinError;

use crate::tasks::{FailFastJoinSet, TryWaitAllError};
use crate::worker::DumpWorker;

/// Why a dump run ended abnormally.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A worker returned an error; every other worker was aborted.
    #[error("worker for collection '{collection}' failed")]
    Worker {
        /// Collection the failing worker was bound to.
        collection: String,
        /// What went wrong.
        #[source]
        source: DumpError,
    },

    /// A worker task panicked; every other worker was aborted.
    #[error("worker task panicked")]
    Panic(#[source] JoinError),
}

impl From<TryWaitAllError<SupervisorError>> for SupervisorError {
    fn from(err: TryWaitAllError<SupervisorError>) -> Self {
        match err {
            TryWaitAllError::Error(e) => e,
            TryWaitAllError::Panic(e) => SupervisorError::Panic(e),
        }
    }
}

/// Owns every worker of a run.
///
/// Workers share nothing but the directory lock. The first one to fail aborts all
/// the others and its error is returned.
pub struct Supervisor<S: DocumentSource> {
    config: DumperConfig,
    workers: Vec<(String, Arc<DumpWorker<S>>)>,
    lock: DirLock,
}

impl<S: DocumentSource> Supervisor<S> {
    /// One worker per distinct configured collection, all opening sessions through
    /// `source`. Repeated names get a single worker.
    pub fn new(source: Arc<S>, config: DumperConfig) -> Self {
        let mut workers: Vec<(String, Arc<DumpWorker<S>>)> = Vec::new();
        for name in &config.collections {
            if workers.iter().any(|(existing, _)| existing == name) {
                tracing::warn!(collection = %name, "collection listed twice; dumping it once");
                continue;
            }
            let worker = DumpWorker::new(source.clone(), config.interval, &config.output);
            workers.push((name.clone(), Arc::new(worker)));
        }
        Self {
            config,
            workers,
            lock: new_dir_lock(),
        }
    }

    /// The configuration this run was built from.
    pub fn config(&self) -> &DumperConfig {
        &self.config
    }

    /// Workers keyed by collection, in configuration order.
    pub fn workers(&self) -> &[(String, Arc<DumpWorker<S>>)] {
        &self.workers
    }

    /// Runs until a worker fails. Workers never stop on their own, so an `Ok` only
    /// comes back for an empty collection list.
    pub async fn run(self) -> Result<(), SupervisorError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until a worker fails or `shutdown` resolves.
    ///
    /// On shutdown every worker is stopped; in-flight cycles finish before this
    /// returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), SupervisorError>
    where
        F: Future<Output = ()>,
    {
        if self.workers.is_empty() {
            tracing::warn!("no collections configured; nothing to dump");
            return Ok(());
        }

        let mut set = FailFastJoinSet::<(), SupervisorError>::new();
        for (collection, worker) in &self.workers {
            tracing::info!(collection = %collection, "spawning worker");
            let worker = Arc::clone(worker);
            let lock = self.lock.clone();
            let collection = collection.clone();
            set.spawn(async move {
                let res = worker.start(lock, &collection).await;
                res.map_err(|source| SupervisorError::Worker { collection, source })
            });
        }

        tokio::pin!(shutdown);
        tokio::select! {
            res = set.try_wait_all() => return res.map_err(SupervisorError::from),
            _ = &mut shutdown => {}
        }

        tracing::info!(workers = set.len(), "shutdown requested; stopping workers");
        for (_, worker) in &self.workers {
            worker.stop();
        }
        set.try_wait_all().await.map_err(SupervisorError::from)
    }
}
