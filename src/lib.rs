//! # mmap-file: memory-mapped file I/O with file-like semantics
//!
//! This crate maps whole regular files into the address space and exposes
//! the mapped bytes behind a POSIX-file-like surface: a movable cursor
//! with sequential reads and writes, cursor-independent `read_at`/
//! `write_at` for random access, standard seek semantics, and explicit
//! durability via `sync`.
//!
//! Exactly one platform backend compiles per target: POSIX
//! `mmap`/`munmap`/`msync`, or the Windows file-mapping object and view
//! family. The mapping is released exactly once however the handle goes
//! away — eagerly through `close`, or through `Drop` as a backstop.
//!
//! ## Quick start
//!
//! ```no_run
//! use mmap_file::{AccessMode, MappedFile};
//!
//! let f = MappedFile::open_with("data.bin", AccessMode::ReadWrite)?;
//! f.write_at(b"hello", 0)?;
//! f.sync()?;
//!
//! let mut buf = vec![0u8; f.len()];
//! f.read_at(&mut buf, 0)?;
//! # Ok::<(), mmap_file::MmapFileError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: error types for all operations
//! - [`mmap`]: the core [`MappedFile`] handle and [`AccessMode`]
//! - [`manager`]: free-function conveniences for opening files

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/mmap-file")]

pub mod errors;
pub mod manager;
pub mod mmap;
mod sys;
mod utils;

pub use errors::MmapFileError;
pub use manager::{open, open_file};
pub use mmap::{AccessMode, MappedFile};
