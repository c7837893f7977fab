//! Per-collection scheduled dump worker.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mgosd_core::snapshot::write_snapshot;
use mgosd_core::transform::wrap_snapshot;
use mgosd_core::{DirLock, DocumentSource, Result, Session, SnapshotPathResolver};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Where a worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Built, `start` not called yet.
    Created,
    /// Opening the database session.
    SessionEstablishing,
    /// Waiting for the next tick.
    Polling,
    /// Reading the whole collection.
    FetchingDocuments,
    /// Wrapping identifier fields.
    TransformingDocuments,
    /// Creating the timestamp directory.
    ResolvingPath,
    /// Writing the snapshot file.
    Persisting,
    /// Stopped or failed; the session has been released.
    Terminated,
}

/// Timer driving a worker: first tick one `period` from now, fixed cadence after that.
///
/// An overrun cycle leaves at most one tick pending; it fires as soon as the cycle
/// ends and the following ticks stay on the original schedule.
pub fn dump_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Dumps one collection every `interval` until stopped or until a cycle fails.
pub struct DumpWorker<S: DocumentSource> {
    source: Arc<S>,
    interval: Duration,
    output: PathBuf,
    stop: watch::Sender<bool>,
    phase: watch::Sender<WorkerPhase>,
}

impl<S: DocumentSource> DumpWorker<S> {
    /// Worker that will open its session through `source` and write under `output`.
    pub fn new(source: Arc<S>, interval: Duration, output: impl Into<PathBuf>) -> Self {
        Self {
            source,
            interval,
            output: output.into(),
            stop: watch::Sender::new(false),
            phase: watch::Sender::new(WorkerPhase::Created),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> WorkerPhase {
        *self.phase.borrow()
    }

    /// Receiver that observes every phase change.
    pub fn watch_phase(&self) -> watch::Receiver<WorkerPhase> {
        self.phase.subscribe()
    }

    /// Halts the timer; the running `start` releases its session and returns `Ok`.
    ///
    /// Idempotent. A cycle already in flight is allowed to finish.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Opens a session and dumps `collection` on every tick.
    ///
    /// Returns the connection error if the session cannot be opened, the first fetch
    /// or persist error otherwise, and `Ok(())` once [`stop`](Self::stop) is called.
    pub async fn start(&self, lock: DirLock, collection: &str) -> Result<()> {
        let mut stop_rx = self.stop.subscribe();
        if *stop_rx.borrow_and_update() {
            self.set_phase(WorkerPhase::Terminated);
            return Ok(());
        }

        tracing::info!(collection, "spawned");
        self.set_phase(WorkerPhase::SessionEstablishing);
        let session = match self.source.connect().await {
            Ok(s) => s,
            Err(e) => {
                self.set_phase(WorkerPhase::Terminated);
                return Err(e);
            }
        };
        tracing::info!(collection, interval = ?self.interval, "session established");

        let resolver = SnapshotPathResolver::new(&self.output, lock);
        let result = self.poll(&session, &resolver, collection, &mut stop_rx).await;

        session.close().await;
        self.set_phase(WorkerPhase::Terminated);
        match &result {
            Ok(()) => tracing::info!(collection, "stopped"),
            Err(e) => tracing::error!(collection, error = %e, "worker failed"),
        }
        result
    }

    async fn poll(
        &self,
        session: &S::Session,
        resolver: &SnapshotPathResolver,
        collection: &str,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let mut ticker = dump_ticker(self.interval);
        loop {
            self.set_phase(WorkerPhase::Polling);
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        return Ok(());
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }
            self.cycle(session, resolver, collection).await?;
        }
    }

    async fn cycle(
        &self,
        session: &S::Session,
        resolver: &SnapshotPathResolver,
        collection: &str,
    ) -> Result<()> {
        self.set_phase(WorkerPhase::FetchingDocuments);
        tracing::info!(collection, "fetching documents");
        let docs = session.fetch_all(collection).await?;

        self.set_phase(WorkerPhase::TransformingDocuments);
        let docs = wrap_snapshot(docs);

        self.set_phase(WorkerPhase::ResolvingPath);
        let path = resolver.resolve(collection).await?;

        self.set_phase(WorkerPhase::Persisting);
        tracing::info!(collection, documents = docs.len(), "saving documents");
        let bytes = write_snapshot(&path, collection, &docs).await?;
        tracing::info!(collection, path = %path.display(), bytes, "saved");
        Ok(())
    }

    fn set_phase(&self, phase: WorkerPhase) {
        self.phase.send_replace(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mgosd_core::{new_dir_lock, Document, DumpError};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct Counters {
        fetches: AtomicUsize,
        closed: AtomicBool,
    }

    struct FixedSource {
        docs: Vec<Document>,
        refuse: bool,
        counters: Arc<Counters>,
    }

    struct FixedSession {
        docs: Vec<Document>,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl DocumentSource for FixedSource {
        type Session = FixedSession;

        async fn connect(&self) -> Result<FixedSession> {
            if self.refuse {
                return Err(DumpError::Connection {
                    url: "mongodb://nowhere:1/x".into(),
                    message: "connection refused".into(),
                });
            }
            Ok(FixedSession {
                docs: self.docs.clone(),
                counters: self.counters.clone(),
            })
        }
    }

    #[async_trait]
    impl Session for FixedSession {
        async fn fetch_all(&self, _collection: &str) -> Result<Vec<Document>> {
            self.counters.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.docs.clone())
        }

        async fn close(&self) {
            self.counters.closed.store(true, Ordering::SeqCst);
        }
    }

    fn source(docs: Vec<serde_json::Value>, refuse: bool) -> (Arc<FixedSource>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let docs = docs
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        let src = FixedSource {
            docs,
            refuse,
            counters: counters.clone(),
        };
        (Arc::new(src), counters)
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_buffers_a_single_missed_tick() {
        let period = Duration::from_secs(10);
        let start = Instant::now();
        let mut ticker = dump_ticker(period);

        ticker.tick().await;
        assert_eq!(start.elapsed(), period);

        // A cycle that overruns by two and a half periods.
        tokio::time::sleep(Duration::from_secs(25)).await;
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(35));

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn connection_failure_returns_immediately() {
        let tmp = tempdir().unwrap();
        let (src, counters) = source(vec![], true);
        let worker = DumpWorker::new(src, Duration::from_millis(10), tmp.path().join("out"));

        let err = worker.start(new_dir_lock(), "users").await.unwrap_err();

        assert!(matches!(err, DumpError::Connection { .. }), "{err}");
        assert_eq!(worker.phase(), WorkerPhase::Terminated);
        assert_eq!(counters.fetches.load(Ordering::SeqCst), 0);
        assert!(!tmp.path().join("out").exists());
    }

    #[tokio::test]
    async fn stop_before_start_never_connects() {
        let tmp = tempdir().unwrap();
        let (src, _counters) = source(vec![], true);
        let worker = DumpWorker::new(src, Duration::from_millis(10), tmp.path());
        worker.stop();
        worker.stop();
        worker.start(new_dir_lock(), "users").await.unwrap();
        assert_eq!(worker.phase(), WorkerPhase::Terminated);
    }

    #[tokio::test]
    async fn dumps_on_tick_then_stops_and_closes_session() {
        let tmp = tempdir().unwrap();
        let (src, counters) = source(vec![json!({"_id": "a1", "n": 1})], false);
        let worker = Arc::new(DumpWorker::new(
            src,
            Duration::from_millis(20),
            tmp.path().to_path_buf(),
        ));

        let mut phases = worker.watch_phase();
        let task = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.start(new_dir_lock(), "users").await })
        };

        // Wait for the first completed cycle.
        while counters.fetches.load(Ordering::SeqCst) == 0 || worker.phase() != WorkerPhase::Polling {
            phases.changed().await.unwrap();
        }
        worker.stop();
        task.await.unwrap().unwrap();

        assert!(counters.closed.load(Ordering::SeqCst));
        assert_eq!(worker.phase(), WorkerPhase::Terminated);

        let dirs: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(!dirs.is_empty());
        let written = std::fs::read_to_string(dirs[0].join("users.json")).unwrap();
        assert_eq!(written, r#"[{"_id":{"$oid":"a1"},"n":1}]"#);
    }

    #[tokio::test]
    async fn write_failure_terminates_and_closes_session() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("taken");
        std::fs::write(&root, b"not a dir").unwrap();
        let (src, counters) = source(vec![json!({"id": "1"})], false);
        let worker = DumpWorker::new(src, Duration::from_millis(10), &root);

        let err = tokio::time::timeout(Duration::from_secs(5), worker.start(new_dir_lock(), "users"))
            .await
            .expect("worker should stop on the first failed cycle")
            .unwrap_err();

        assert!(matches!(err, DumpError::Filesystem { .. }), "{err}");
        assert_eq!(worker.phase(), WorkerPhase::Terminated);
        assert_eq!(counters.fetches.load(Ordering::SeqCst), 1);
        assert!(counters.closed.load(Ordering::SeqCst));
    }
}
