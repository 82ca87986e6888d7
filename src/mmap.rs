//! Core memory-mapped file handle with POSIX-file-like I/O semantics.

use std::fmt;
use std::fs::{Metadata, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::errors::{MmapFileError, Result};
use crate::sys::MappedRegion;
use crate::utils::{checked_offset, cursor_index};

/// Access mode for a memory-mapped file.
///
/// Fixed at open time; there is no mode upgrade. `Write` is write-only at
/// the I/O level even though the file itself is opened readable: mapping
/// APIs need a readable descriptor to establish the mapping object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only mapping.
    Read,
    /// Write-only I/O over a read-write mapping.
    Write,
    /// Read-write mapping.
    ReadWrite,
}

impl AccessMode {
    /// Whether read operations are permitted.
    #[must_use]
    pub fn readable(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    /// Whether write operations and [`MappedFile::sync`] are permitted.
    #[must_use]
    pub fn writable(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }

    fn open_options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.read(true).write(self.writable());
        opts
    }
}

/// Memory-mapped view of a regular file with a movable read/write cursor.
///
/// The whole file is mapped once, shared, at open time. Sequential
/// operations ([`read`](Self::read), [`write`](Self::write),
/// [`seek`](Self::seek), and the byte variants) go through the cursor and
/// take `&mut self`. [`read_at`](Self::read_at) and
/// [`write_at`](Self::write_at) are cursor-independent, take `&self`, and
/// may be called from several threads at once on disjoint byte ranges;
/// callers remain responsible for not racing on overlapping ranges.
///
/// Writes through the mapping land in the OS page cache and are visible to
/// any other reader of the same file; [`sync`](Self::sync) forces them to
/// stable storage.
///
/// The size and metadata snapshot is captured at open time and never
/// refreshed. If the file is truncated externally while mapped, touching
/// pages past the new end is undefined at the OS level (SIGBUS on POSIX);
/// avoiding that is the caller's responsibility.
///
/// Dropping the handle releases the mapping as a last-chance backstop;
/// [`close`](Self::close) releases it eagerly, reports the OS result, and
/// disarms the backstop.
///
/// # Examples
///
/// ```no_run
/// use mmap_file::MappedFile;
///
/// let f = MappedFile::open_rw("data.bin")?;
/// f.write_at(b"hello", 0)?;
/// f.sync()?;
///
/// let mut buf = [0u8; 5];
/// let n = f.read_at(&mut buf, 0)?;
/// assert_eq!(&buf[..n], b"hello");
/// # Ok::<(), mmap_file::MmapFileError>(())
/// ```
pub struct MappedFile {
    region: Option<MappedRegion>,
    pos: u64,
    mode: AccessMode,
    meta: Metadata,
    path: PathBuf,
}

impl fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("len", &self.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl MappedFile {
    /// Open and map the named file read-only.
    ///
    /// # Errors
    ///
    /// Returns errors from [`MappedFile::open_with`].
    pub fn open_ro<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, AccessMode::Read)
    }

    /// Open and map the named file read-write.
    ///
    /// # Errors
    ///
    /// Returns errors from [`MappedFile::open_with`].
    pub fn open_rw<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, AccessMode::ReadWrite)
    }

    /// Open and map the named file in the given access mode.
    ///
    /// A zero-length file yields a valid handle with an empty extent and no
    /// OS mapping resources; mapping zero bytes is rejected by at least one
    /// platform and is never attempted.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::Io` verbatim if opening or stat-ing the file
    /// fails, `MmapFileError::InvalidFile` if the file size cannot be
    /// represented on this host, and `MmapFileError::Map` naming the path
    /// if the OS refuses the mapping.
    pub fn open_with<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref();
        let file = mode.open_options().open(path)?;
        let meta = file.metadata()?;
        let len = usize::try_from(meta.len()).map_err(|_| MmapFileError::InvalidFile {
            path: path.to_path_buf(),
            reason: "size exceeds the host address width",
        })?;
        let region = if len == 0 {
            MappedRegion::empty()
        } else {
            MappedRegion::map(file, len, mode).map_err(|source| MmapFileError::Map {
                path: path.to_path_buf(),
                source,
            })?
        };
        log::debug!("mapped {} ({len} bytes, {mode:?})", path.display());
        Ok(Self {
            region: Some(region),
            pos: 0,
            mode,
            meta,
            path: path.to_path_buf(),
        })
    }

    /// Length of the mapped extent in bytes; `0` for empty and closed
    /// handles. Never fails.
    #[must_use]
    pub fn len(&self) -> usize {
        self.region.as_ref().map_or(0, MappedRegion::len)
    }

    /// Whether the mapped extent holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access mode the handle was opened with.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata snapshot captured when the file was opened. Never refreshed;
    /// may go stale if the file is resized externally.
    #[must_use]
    pub fn stat(&self) -> &Metadata {
        &self.meta
    }

    /// Byte at index `i` of the mapped extent.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()` or the mapping has been closed; validate
    /// against [`len`](Self::len) first.
    #[must_use]
    pub fn byte_at(&self, i: usize) -> u8 {
        match &self.region {
            Some(region) => region.as_slice()[i],
            None => panic!("byte_at on closed mapping"),
        }
    }

    fn region(&self) -> Result<&MappedRegion> {
        self.region.as_ref().ok_or(MmapFileError::Closed)
    }

    fn require_read(&self) -> Result<()> {
        if self.mode.readable() {
            Ok(())
        } else {
            Err(MmapFileError::BadDescriptor)
        }
    }

    fn require_write(&self) -> Result<()> {
        if self.mode.writable() {
            Ok(())
        } else {
            Err(MmapFileError::BadDescriptor)
        }
    }

    /// Copy bytes from the cursor into `buf`, advancing the cursor by the
    /// copied count.
    ///
    /// Returns `Ok(0)` once the cursor is at or past the end of the extent.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::BadDescriptor` if the handle is not readable
    /// and `MmapFileError::Closed` after [`close`](Self::close).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.require_read()?;
        let data = self.region()?.as_slice();
        let Some(start) = cursor_index(self.pos, data.len()) else {
            return Ok(0);
        };
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    /// Single-byte variant of [`read`](Self::read).
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read), plus `MmapFileError::EndOfStream` with the
    /// cursor at or past the end of the extent.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.require_read()?;
        let data = self.region()?.as_slice();
        let Some(start) = cursor_index(self.pos, data.len()) else {
            return Err(MmapFileError::EndOfStream);
        };
        let b = data[start];
        self.pos += 1;
        Ok(b)
    }

    /// Copy bytes starting at `offset` into `buf` without touching the
    /// cursor.
    ///
    /// Copies as many bytes as the extent holds past `offset`; a returned
    /// count shorter than `buf.len()` means the end of the extent was
    /// reached (a short read, not a failure). `offset == len` is legal and
    /// reads zero bytes.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::BadDescriptor` if the handle is not
    /// readable, `MmapFileError::Closed` after [`close`](Self::close), and
    /// `MmapFileError::InvalidOffset` if `offset` lies beyond the extent.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.require_read()?;
        let data = self.region()?.as_slice();
        let start = checked_offset(offset, data.len())?;
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    /// Copy `buf` into the extent at the cursor, advancing the cursor by
    /// the copied count.
    ///
    /// Never grows the mapping: when the extent cannot hold every byte the
    /// fitting prefix is still written, the cursor advances over it, and
    /// the true partial count is reported through the error.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::BadDescriptor` if the handle is not
    /// writable, `MmapFileError::Closed` after [`close`](Self::close), and
    /// `MmapFileError::ShortWrite` carrying the written count when the
    /// extent ran out (zero if the cursor already sat at or past the end).
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.require_write()?;
        let data = self
            .region
            .as_mut()
            .ok_or(MmapFileError::Closed)?
            .as_mut_slice();
        let n = match cursor_index(self.pos, data.len()) {
            Some(start) => {
                let n = (data.len() - start).min(buf.len());
                data[start..start + n].copy_from_slice(&buf[..n]);
                n
            }
            None => 0,
        };
        self.pos += n as u64;
        if n < buf.len() {
            return Err(MmapFileError::ShortWrite {
                written: n,
                requested: buf.len(),
            });
        }
        Ok(n)
    }

    /// Single-byte variant of [`write`](Self::write), with the same
    /// boundary behavior.
    ///
    /// # Errors
    ///
    /// Returns errors from [`write`](Self::write).
    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        self.write(&[b]).map(|_| ())
    }

    /// Copy `buf` into the extent at `offset` without touching the cursor.
    ///
    /// Safe to call from several threads on disjoint ranges; racing
    /// overlapping writes is the caller's responsibility. The boundary
    /// policy matches [`write`](Self::write): the fitting prefix is
    /// written and a short write is reported with the true partial count.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::BadDescriptor` if the handle is not
    /// writable, `MmapFileError::Closed` after [`close`](Self::close),
    /// `MmapFileError::InvalidOffset` if `offset` lies beyond the extent,
    /// and `MmapFileError::ShortWrite` when the extent ran out.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        self.require_write()?;
        let region = self.region()?;
        let start = checked_offset(offset, region.len())?;
        let n = (region.len() - start).min(buf.len());
        region.copy_at(start, &buf[..n]);
        if n < buf.len() {
            return Err(MmapFileError::ShortWrite {
                written: n,
                requested: buf.len(),
            });
        }
        Ok(n)
    }

    /// Reposition the cursor relative to the start, the current position,
    /// or the end of the extent, returning the new position.
    ///
    /// The cursor may legally land past the end of the extent: subsequent
    /// reads report end-of-stream and writes report a short write.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::Closed` after [`close`](Self::close) and
    /// `MmapFileError::NegativePosition`, with the cursor unchanged, if
    /// the computed position falls below zero.
    pub fn seek(&mut self, from: SeekFrom) -> Result<u64> {
        self.region()?;
        let target = match from {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(d) => i128::from(self.pos) + i128::from(d),
            SeekFrom::End(d) => self.len() as i128 + i128::from(d),
        };
        if target < 0 {
            return Err(MmapFileError::NegativePosition);
        }
        let pos = u64::try_from(target).unwrap_or(u64::MAX);
        self.pos = pos;
        Ok(pos)
    }

    /// Flush modified pages to the backing file.
    ///
    /// On Windows this flushes the mapped view and then the file's I/O
    /// buffers; on POSIX a synchronous `msync` covers both. A no-op for an
    /// empty extent.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::BadDescriptor` unless the handle was opened
    /// with write capability, `MmapFileError::Closed` after
    /// [`close`](Self::close), and `MmapFileError::Sync` if either flush
    /// step fails.
    pub fn sync(&self) -> Result<()> {
        self.require_write()?;
        let region = self.region()?;
        log::trace!("sync {} ({} bytes)", self.path.display(), region.len());
        region.sync().map_err(|e| MmapFileError::Sync(e.to_string()))
    }

    /// Release the mapping.
    ///
    /// Idempotent: closing an already-closed or never-mapped (zero-length)
    /// handle succeeds as a no-op. The first call also disarms the drop
    /// backstop, and the handle is marked released even when the OS unmap
    /// fails, so a retry can never touch an invalid mapping. Every
    /// subsequent I/O call reports `MmapFileError::Closed`.
    ///
    /// # Errors
    ///
    /// Returns `MmapFileError::Io` with the OS error if releasing the
    /// mapping fails.
    pub fn close(&mut self) -> Result<()> {
        match self.region.take() {
            None => Ok(()),
            Some(region) => {
                log::debug!("unmapping {}", self.path.display());
                region.unmap()?;
                Ok(())
            }
        }
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        if let Some(region) = self.region.take() {
            if let Err(err) = region.unmap() {
                log::warn!("unmap of {} failed on drop: {err}", self.path.display());
            }
        }
    }
}

impl Read for MappedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        MappedFile::read(self, buf).map_err(Into::into)
    }
}

impl Write for MappedFile {
    /// Per the `std::io::Write` contract a partial count is returned as
    /// `Ok(n)`; the crate-level [`MappedFile::write`] reports it as
    /// [`MmapFileError::ShortWrite`] instead.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match MappedFile::write(self, buf) {
            Ok(n) | Err(MmapFileError::ShortWrite { written: n, .. }) => Ok(n),
            Err(e) => Err(e.into()),
        }
    }

    /// No-op: stores land directly in the shared page cache. Durability is
    /// [`MappedFile::sync`]'s job.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MappedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        MappedFile::seek(self, pos).map_err(Into::into)
    }
}
