//! Run-level errors
//!
//! Only load-time and persistence-time failures reach this level; a single
//! item's enrichment failure never does.

use newsenrich_core::ExecutorKind;
use newsenrich_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Dataset could not be loaded; nothing was processed or written.
    #[error("cannot load dataset: {0}")]
    Load(StoreError),

    /// A checkpoint flush failed; the run stopped without further writes.
    #[error("checkpoint failed, run aborted: {0}")]
    Persistence(StoreError),

    #[error("cannot start {kind} executor: {message}")]
    Executor { kind: ExecutorKind, message: String },
}
