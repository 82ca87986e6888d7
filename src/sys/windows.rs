//! Windows mapping backend: file-mapping object, view, and flush.

use std::fs::File;
use std::io;
use std::mem;
use std::os::windows::io::AsRawHandle;
use std::ptr;
use std::slice;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
use windows_sys::Win32::Storage::FileSystem::FlushFileBuffers;
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, FlushViewOfFile, MapViewOfFile, UnmapViewOfFile, FILE_MAP_READ,
    FILE_MAP_WRITE, MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READONLY, PAGE_READWRITE,
};

use crate::mmap::AccessMode;

/// One shared view of a whole file extent.
///
/// The base pointer doubles as the released-state sentinel: `release` nulls
/// it before reporting the OS result, so a second release attempt is a
/// no-op and the freed extent can never be dereferenced again. The file
/// handle is retained because `FlushFileBuffers` needs it; the intermediate
/// file-mapping object is transient and closed inside `map`.
pub(crate) struct MappedRegion {
    ptr: *mut core::ffi::c_void,
    len: usize,
    file: Option<File>,
}

// SAFETY: the region is exclusively owned by one handle and points at a
// shared file view that stays valid until `release`, which only runs with
// exclusive access (consuming `unmap` or `Drop`).
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
            file: None,
        }
    }

    /// Map the whole `len`-byte extent of `file` as a shared view.
    pub(crate) fn map(file: File, len: usize, mode: AccessMode) -> io::Result<Self> {
        let (prot, access) = if mode.writable() {
            (PAGE_READWRITE, FILE_MAP_WRITE)
        } else {
            (PAGE_READONLY, FILE_MAP_READ)
        };
        let size = len as u64;
        // SAFETY: the file handle is open; the mapping object is unnamed
        // and sized to the non-zero extent resolved by the caller.
        let mapping = unsafe {
            CreateFileMappingW(
                file.as_raw_handle() as HANDLE,
                ptr::null(),
                prot,
                (size >> 32) as u32,
                size as u32,
                ptr::null(),
            )
        };
        if mapping.is_null() {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `mapping` is a live file-mapping object handle.
        let view = unsafe { MapViewOfFile(mapping, access, 0, 0, len) };
        let view_err = if view.Value.is_null() {
            Some(io::Error::last_os_error())
        } else {
            None
        };
        // The view keeps the section alive on its own, so the mapping
        // object is released as soon as the view call has run.
        // SAFETY: `mapping` is owned here and closed exactly once.
        unsafe { CloseHandle(mapping) };
        if let Some(err) = view_err {
            return Err(err);
        }
        Ok(Self {
            ptr: view.Value,
            len,
            file: Some(file),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: `ptr` is a live view of `len` bytes.
        unsafe { slice::from_raw_parts(self.ptr.cast::<u8>(), self.len) }
    }

    /// Mutable view of the extent. Only write-mode handles reach this path;
    /// the view was established with `FILE_MAP_WRITE` for them.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        // SAFETY: `ptr` is a live view of `len` bytes, exclusively borrowed
        // for the lifetime of the slice.
        unsafe { slice::from_raw_parts_mut(self.ptr.cast::<u8>(), self.len) }
    }

    /// Copy `src` into the view at `start` through a shared reference.
    ///
    /// Caller guarantees `start + src.len() <= len` and that no other
    /// thread accesses the same byte range concurrently.
    pub(crate) fn copy_at(&self, start: usize, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        debug_assert!(start + src.len() <= self.len);
        // SAFETY: the range was bounds-checked by the caller and the view
        // is writable on every path that reaches here.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.cast::<u8>().add(start), src.len());
        }
    }

    /// Flush modified pages to the view, then the file's I/O buffers.
    pub(crate) fn sync(&self) -> io::Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        // SAFETY: `ptr`/`len` describe a live view.
        if unsafe { FlushViewOfFile(self.ptr, self.len) } == 0 {
            return Err(io::Error::last_os_error());
        }
        if let Some(file) = &self.file {
            // SAFETY: the retained file handle is open until release.
            if unsafe { FlushFileBuffers(file.as_raw_handle() as HANDLE) } == 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    /// Release the view and the retained file handle, surfacing the OS
    /// result.
    pub(crate) fn unmap(mut self) -> io::Result<()> {
        self.release()
    }

    fn release(&mut self) -> io::Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        let ptr = mem::replace(&mut self.ptr, ptr::null_mut());
        self.len = 0;
        let file = self.file.take();
        // SAFETY: `ptr` came from a successful `MapViewOfFile` and the
        // nulled sentinel guarantees this runs at most once per region.
        let ok = unsafe { UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: ptr }) };
        drop(file);
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::warn!("UnmapViewOfFile failed on drop: {err}");
        }
    }
}
