use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a verification before a judgment is reached.
///
/// Missing or short files inside a multi-file torrent are not errors; they
/// lower the matched-piece count instead.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("single-file torrent expects a file, got {}", .0.display())]
    ExpectedFile(PathBuf),

    #[error("multi-file torrent expects a directory, got {}", .0.display())]
    ExpectedDirectory(PathBuf),

    #[error("path traversal detected in file path: {0}")]
    PathTraversal(String),

    #[error("tolerance must be a non-negative fraction, got {0}")]
    InvalidTolerance(f64),

    #[error("invalid piece length: {0}")]
    InvalidPieceLength(u64),
}
