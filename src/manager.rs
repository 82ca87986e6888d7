//! Convenience functions for opening memory-mapped files.
//!
//! Thin wrappers over the [`MappedFile`] constructors for callers that
//! prefer a free-function surface.

use std::path::Path;

use crate::errors::Result;
use crate::mmap::{AccessMode, MappedFile};

/// Memory-map the named file for reading.
///
/// # Errors
///
/// Returns errors from [`MappedFile::open_ro`].
pub fn open<P: AsRef<Path>>(path: P) -> Result<MappedFile> {
    MappedFile::open_ro(path)
}

/// Memory-map the named file in the requested access mode.
///
/// # Errors
///
/// Returns errors from [`MappedFile::open_with`].
pub fn open_file<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<MappedFile> {
    MappedFile::open_with(path, mode)
}
