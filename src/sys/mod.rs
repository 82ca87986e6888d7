//! Platform mapping backends.
//!
//! Exactly one backend compiles per target family, each exposing the same
//! `MappedRegion` surface: `map`, `sync`, a consuming `unmap`, and `empty`
//! for zero-length files. `Drop` on a region is the release backstop; an
//! explicit `unmap` disarms it by nulling the base pointer first.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub(crate) use unix::MappedRegion;
    } else if #[cfg(windows)] {
        mod windows;
        pub(crate) use windows::MappedRegion;
    } else {
        compile_error!("mmap-file supports only POSIX and Windows targets");
    }
}
