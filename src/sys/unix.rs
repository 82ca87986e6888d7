//! POSIX mapping backend: `mmap`/`munmap`/`msync`.

use std::fs::File;
use std::io;
use std::mem;
use std::os::unix::io::AsRawFd;
use std::ptr;
use std::slice;

use crate::mmap::AccessMode;

/// One shared mapping of a whole file extent.
///
/// The base pointer doubles as the released-state sentinel: `release` nulls
/// it before reporting the OS result, so a second release attempt is a
/// no-op and the freed extent can never be dereferenced again.
pub(crate) struct MappedRegion {
    ptr: *mut libc::c_void,
    len: usize,
}

// SAFETY: the region is exclusively owned by one handle and points at a
// shared file mapping that stays valid until `release`, which only runs
// with exclusive access (consuming `unmap` or `Drop`).
unsafe impl Send for MappedRegion {}
// SAFETY: concurrent `&self` access is limited to disjoint byte ranges by
// the handle's documented contract.
unsafe impl Sync for MappedRegion {}

impl MappedRegion {
    /// Region with no addressable bytes and no OS resources.
    pub(crate) fn empty() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
        }
    }

    /// Map the whole `len`-byte extent of `file` as a shared mapping.
    ///
    /// The descriptor is not retained: POSIX keeps a mapping alive after
    /// its file descriptor closes.
    pub(crate) fn map(file: File, len: usize, mode: AccessMode) -> io::Result<Self> {
        let prot = if mode.writable() {
            libc::PROT_READ | libc::PROT_WRITE
        } else {
            libc::PROT_READ
        };
        // SAFETY: the descriptor is open and `len` is the non-zero file
        // length resolved by the caller.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                prot,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { ptr, len })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: `ptr` is a live mapping of `len` bytes.
        unsafe { slice::from_raw_parts(self.ptr.cast::<u8>(), self.len) }
    }

    /// Mutable view of the extent. Only write-mode handles reach this path;
    /// the mapping was established with `PROT_WRITE` for them.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        // SAFETY: `ptr` is a live mapping of `len` bytes, exclusively
        // borrowed for the lifetime of the slice.
        unsafe { slice::from_raw_parts_mut(self.ptr.cast::<u8>(), self.len) }
    }

    /// Copy `src` into the mapping at `start` through a shared reference.
    ///
    /// Caller guarantees `start + src.len() <= len` and that no other
    /// thread accesses the same byte range concurrently.
    pub(crate) fn copy_at(&self, start: usize, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        debug_assert!(start + src.len() <= self.len);
        // SAFETY: the range was bounds-checked by the caller and the
        // mapping is writable on every path that reaches here.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.cast::<u8>().add(start), src.len());
        }
    }

    /// Flush modified pages synchronously to the backing file.
    pub(crate) fn sync(&self) -> io::Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        // SAFETY: `ptr`/`len` describe a live mapping.
        if unsafe { libc::msync(self.ptr, self.len, libc::MS_SYNC) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Release the mapping, surfacing the OS result.
    pub(crate) fn unmap(mut self) -> io::Result<()> {
        self.release()
    }

    fn release(&mut self) -> io::Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        let ptr = mem::replace(&mut self.ptr, ptr::null_mut());
        let len = mem::take(&mut self.len);
        // SAFETY: `ptr`/`len` came from a successful `mmap` and the nulled
        // sentinel guarantees this runs at most once per region.
        if unsafe { libc::munmap(ptr, len) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::warn!("munmap failed on drop: {err}");
        }
    }
}
