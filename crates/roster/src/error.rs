//! Error types for catalog access.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or writing package catalogs.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog file does not exist.
    #[error("catalog not found at {}", .0.display())]
    CatalogNotFound(PathBuf),

    /// Reading or writing the catalog file failed.
    #[error("catalog io error: {0}")]
    Io(#[from] std::io::Error),
}
