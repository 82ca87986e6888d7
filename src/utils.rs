//! Offset and cursor validation helpers shared by the I/O calls.

use crate::errors::{MmapFileError, Result};

/// Validate a random-access offset against the mapped extent.
///
/// `offset == len` is legal and addresses the empty span at the end of the
/// extent; anything beyond is an error.
///
/// # Errors
///
/// Returns `MmapFileError::InvalidOffset` if `offset > len`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn checked_offset(offset: u64, len: usize) -> Result<usize> {
    if offset > len as u64 {
        return Err(MmapFileError::InvalidOffset { offset, len });
    }
    // Fits: offset <= len <= usize::MAX.
    Ok(offset as usize)
}

/// Cursor position as an index into the extent, or `None` with the cursor
/// at or past the end.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn cursor_index(pos: u64, len: usize) -> Option<usize> {
    if pos >= len as u64 {
        return None;
    }
    // Fits: pos < len <= usize::MAX.
    Some(pos as usize)
}
