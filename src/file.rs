//! File handle (component D): open/close with access/share/buffering
//! modes, positioned read/write, zero-fill, size/resize, created-flag.
//!
//! Reads and writes are positional (`pread`/`pwrite` via
//! `std::os::unix::fs::FileExt`) rather than cursor-based, so a shard's
//! reader lock holders can read the content file concurrently with the
//! writer appending to it (spec.md §5, "share::full").

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::error::FileError;

/// Whether `open` must find an existing file or may create one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fail if the file does not already exist.
    Open,
    /// Create the file if it is missing (tracked via [`FileHandle::created`]).
    Always,
}

/// Read-only vs. read-write intent. A shard never opens its files for
/// write from more than one handle at a time (spec.md §5, single-writer
/// rule) but that invariant is enforced by the shard, not this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Sharing mode requested at open time. `Full` allows other processes
/// (and, within this process, other `FileHandle`s) to read and write the
/// same file concurrently; this implementation does not take OS-level
/// advisory locks for either mode — cross-process exclusion is the
/// caller's responsibility (spec.md §9, open question 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Share {
    Full,
    Exclusive,
}

/// Buffering hint. Tracked for parity with the spec's contract; this
/// implementation always uses the OS page cache and does not issue
/// `posix_fadvise` calls, since the shard never needs more than
/// best-effort sequential/random hinting to behave correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buffering {
    None,
    Sequential,
    Random,
}

/// A file opened under one of the above modes, supporting positioned I/O.
pub struct FileHandle {
    file: Option<File>,
    path: PathBuf,
    created: bool,
    write_cursor: u64,
}

impl FileHandle {
    pub fn open(path: impl AsRef<Path>, mode: Mode, access: Access, _share: Share, _buffering: Buffering) -> Result<Self, FileError> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        match access {
            Access::Read => {
                options.read(true);
            }
            Access::Write => {
                options.read(true).write(true);
            }
        }

        let existed_before = path.exists();
        match mode {
            Mode::Open => {}
            Mode::Always => {
                options.create(true);
            }
        }

        let file = options.open(&path).map_err(FileError::Open)?;
        let size_at_open = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(FileHandle {
            file: Some(file),
            path,
            created: mode == Mode::Always && !existed_before,
            write_cursor: size_at_open,
        })
    }

    /// True iff `open` had to create a new file (didn't exist before).
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn close(&mut self) {
        self.file = None;
    }

    fn file(&self) -> Result<&File, FileError> {
        self.file.as_ref().ok_or(FileError::Closed)
    }

    /// Read exactly `buf.len()` bytes starting at `offset`. A short read
    /// (end of file reached early) is reported as `ShortRead` rather than
    /// silently returning partial data — callers treat this as corruption
    /// (spec.md §7, "I/O-read").
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), FileError> {
        let file = self.file()?;
        match file.read_exact_at(buf, offset) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(FileError::ShortRead { requested: buf.len(), got: 0 })
            }
            Err(e) => Err(FileError::Open(e)),
        }
    }

    /// Convenience for K's 8-byte offset field and similar fixed-width
    /// reads.
    pub fn read_u64_at(&self, offset: u64) -> Result<u64, FileError> {
        let mut buf = [0u8; 8];
        self.read_at(offset, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Append `buf` at the current logical end of the file, returning the
    /// offset it was written at. This is the only write path the shard
    /// uses (content and index files are append-mostly).
    pub fn append(&mut self, buf: &[u8]) -> Result<u64, FileError> {
        let offset = self.write_cursor;
        let file = self.file.as_ref().ok_or(FileError::Closed)?;
        file.write_all_at(buf, offset).map_err(FileError::Write)?;
        self.write_cursor += buf.len() as u64;
        Ok(offset)
    }

    /// Overwrite the bytes at `offset` with `buf` in place (used to zero
    /// an erased index slot or a thoroughly-erased content extent, and to
    /// patch an already-written record).
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), FileError> {
        let file = self.file.as_ref().ok_or(FileError::Closed)?;
        file.write_all_at(buf, offset).map_err(FileError::Write)?;
        self.write_cursor = self.write_cursor.max(offset + buf.len() as u64);
        Ok(())
    }

    /// Overwrite `n` bytes starting at `offset` with zeros.
    pub fn zero(&mut self, offset: u64, n: u64) -> Result<(), FileError> {
        const CHUNK: usize = 4096;
        let zeros = [0u8; CHUNK];
        let mut remaining = n;
        let mut at = offset;
        while remaining > 0 {
            let take = remaining.min(CHUNK as u64) as usize;
            self.write_at(at, &zeros[..take])?;
            at += take as u64;
            remaining -= take as u64;
        }
        Ok(())
    }

    /// Current logical end of file (the position the next `append` would
    /// write at).
    pub fn tell(&self) -> u64 {
        self.write_cursor
    }

    pub fn size(&self) -> Result<u64, FileError> {
        self.file()?.metadata().map(|m| m.len()).map_err(FileError::Open)
    }

    /// Truncate (or extend) to exactly `n` bytes. Used to unwind a
    /// partially written append on failure (spec.md §7, "I/O-write").
    pub fn resize(&mut self, n: u64) -> Result<(), FileError> {
        let file = self.file.as_ref().ok_or(FileError::Closed)?;
        file.set_len(n).map_err(FileError::Resize)?;
        self.write_cursor = n;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), FileError> {
        use std::io::Write;
        if let Some(file) = self.file.as_mut() {
            file.flush().map_err(FileError::Write)?;
        }
        Ok(())
    }
}
