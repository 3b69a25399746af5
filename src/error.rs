// ============================================================
// Core error type
// ============================================================
// Failures raised by the data pipeline, the batch loss engine,
// the training loop and checkpoint persistence. None of them is
// recovered locally: the application layer wraps them with
// anyhow context (epoch, batch index, path) and aborts the run.

use std::path::PathBuf;

use burn::record::RecorderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Seq2SeqError {
    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Empty dataset: the {split} split produced no batches")]
    EmptyDataset { split: String },

    #[error("Checkpoint entry '{}' failed: {source}", path.display())]
    Checkpoint {
        path:   PathBuf,
        #[source]
        source: RecorderError,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data: {0}")]
    Data(String),
}

impl Seq2SeqError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub fn empty(split: impl Into<String>) -> Self {
        Self::EmptyDataset { split: split.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Seq2SeqResult<T> = Result<T, Seq2SeqError>;
