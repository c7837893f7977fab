//! The database capability a dump worker is driven by.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Document;

/// Opens sessions against the document database.
///
/// One session is opened per worker and never shared.
#[async_trait]
pub trait DocumentSource: Send + Sync + 'static {
    /// Session type handed to a worker.
    type Session: Session;

    /// Establishes a session; failures are reported as [`DumpError::Connection`].
    ///
    /// [`DumpError::Connection`]: crate::error::DumpError::Connection
    async fn connect(&self) -> Result<Self::Session>;
}

/// A live session bound to one database.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Returns every document of `collection`: no filter, no projection, no paging.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Releases the session. Calling it more than once is harmless.
    async fn close(&self);
}
