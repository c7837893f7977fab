//! Snapshot file layout: `<output>/<YYYY-Month-D-H-M-S>/<collection>.json`.

use std::fmt::Display;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use tokio::sync::Mutex;

use crate::error::{DumpError, Result};
use crate::model::Document;

/// Lock shared by every worker of a run.
///
/// Guards directory existence checks and creation only; never held across a
/// database call or a snapshot write.
pub type DirLock = Arc<Mutex<()>>;

/// Creates a fresh [`DirLock`].
pub fn new_dir_lock() -> DirLock {
    Arc::new(Mutex::new(()))
}

/// Directory name for the wall-clock second `at`, e.g. `2019-March-5-14-3-9`.
///
/// No zero padding, full English month name.
pub fn time_signature<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{}-{}-{}-{}-{}-{}",
        at.year(),
        at.format("%B"),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// Resolves (and lazily creates) where a collection's snapshot goes.
#[derive(Debug, Clone)]
pub struct SnapshotPathResolver {
    root: PathBuf,
    lock: DirLock,
}

impl SnapshotPathResolver {
    /// Resolver writing under `root`, serialising directory creation on `lock`.
    pub fn new(root: impl Into<PathBuf>, lock: DirLock) -> Self {
        Self {
            root: root.into(),
            lock,
        }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the file path for `collection` at the current local time.
    pub async fn resolve(&self, collection: &str) -> Result<PathBuf> {
        self.resolve_at(collection, &Local::now()).await
    }

    /// Resolves the file path for `collection` at `at`, creating the output root and
    /// the timestamp directory if either is missing.
    pub async fn resolve_at<Tz>(&self, collection: &str, at: &DateTime<Tz>) -> Result<PathBuf>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let dir = self.root.join(time_signature(at));
        let file = dir.join(format!("{collection}.json"));

        let _guard = self.lock.lock().await;
        ensure_dir(&self.root).await?;
        ensure_dir(&dir).await?;

        Ok(file)
    }
}

async fn ensure_dir(path: &Path) -> Result<()> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| DumpError::fs(path, e))?;
    if !exists {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| DumpError::fs(path, e))?;
        tracing::debug!(path = %path.display(), "created directory");
    }
    Ok(())
}

/// Writes a snapshot as one JSON array.
///
/// The bytes land in a uniquely named hidden sibling file first and are renamed over
/// `path`, so a failed write never leaves a truncated `<collection>.json` behind and
/// two writers racing for the same path each install a complete file.
pub async fn write_snapshot(path: &Path, collection: &str, docs: &[Document]) -> Result<usize> {
    let bytes = serde_json::to_vec(docs).map_err(|source| DumpError::Serialize {
        collection: collection.to_string(),
        source,
    })?;
    let len = bytes.len();

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || persist(&target, &bytes))
        .await
        .map_err(|e| DumpError::fs(path, io::Error::other(e)))??;
    Ok(len)
}

/// Temp file in the target directory, then rename. The temp file is removed on drop
/// if anything fails before the rename.
fn persist(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| DumpError::fs(dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| DumpError::fs(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| DumpError::fs(path, e.error))?;
    Ok(())
}
