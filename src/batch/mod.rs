//! Concurrent batch upload subsystem.
//!
//! A batch is a client-submitted group of upload tasks sharing one id and
//! one progress record. The coordinator admits batches, the workers upload
//! individual files through the API fallback chain, and the progress store
//! tracks counters and per-file results until the process exits.

mod coordinator;
mod progress;
mod worker;

pub use coordinator::{
    AdmissionError, BatchCoordinator, BatchKind, DEFAULT_MAX_CONCURRENCY, MAX_BATCH_SIZE,
};
pub use progress::{BatchProgress, BatchStatus, ProgressStore, ProgressStoreError, UploadResult};
pub use worker::{run_fallback_chain, TaskSource, UploadTask};

#[cfg(test)]
pub(crate) use worker::tests as worker_test_support;
