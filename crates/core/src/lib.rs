#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and logic for mgosd: document transformation, interval parsing,
//! snapshot layout and the database capability workers consume.

pub mod error;
pub mod interval;
pub mod model;
pub mod snapshot;
pub mod source;
pub mod transform;

mod util;

pub use error::{DumpError, Result};
pub use interval::parse_interval;
pub use model::{Document, DumperConfig, MongoConfig, Snapshot};
pub use snapshot::{new_dir_lock, DirLock, SnapshotPathResolver};
pub use source::{DocumentSource, Session};
pub use transform::wrap_identifiers;
pub use util::{default_output_dir, home_dir};
