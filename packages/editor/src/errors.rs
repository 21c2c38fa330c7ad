//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Format error: {0}")]
    Format(#[from] crate::serializer::FormatError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] crate::correlator::EvaluationError),

    #[error("Document is not file-backed")]
    NotFileBacked,
}
