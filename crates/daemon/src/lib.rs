#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! mgosd daemon: one scheduled dump worker per collection, supervised fail-fast.

pub mod config;
pub mod logging;
pub mod mongo;
pub mod supervisor;
pub mod tasks;
pub mod worker;

pub use supervisor::{Supervisor, SupervisorError};
pub use worker::{DumpWorker, WorkerPhase};
