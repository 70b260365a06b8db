//! In-memory [`GroupFs`] with deterministic timestamps and fault injection.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::fs::{FileStat, GroupFs, StagedFile};

/// Base timestamp for files written to a [`MemoryFs`]; every write advances one nanosecond.
const EPOCH_OFFSET: Duration = Duration::from_secs(1_700_000_000);

/// Metadata lookup or staged-write step that [`MemoryFs::fail_next`] can make fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Stat,
    Stage,
    Write,
    Sync,
    Commit,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    bytes: Vec<u8>,
    modified: SystemTime,
}

impl MemoryFile {
    fn stat(&self) -> FileStat {
        FileStat {
            size: self.bytes.len() as u64,
            modified: self.modified,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, MemoryFile>,
    ticks: u64,
    staged: usize,
    fault: Option<Fault>,
}

impl MemoryState {
    fn next_modified(&mut self) -> SystemTime {
        self.ticks += 1;
        UNIX_EPOCH + EPOCH_OFFSET + Duration::from_nanos(self.ticks)
    }

    fn take_fault(&mut self, step: Fault) -> io::Result<()> {
        if self.fault == Some(step) {
            self.fault = None;
            return Err(io::Error::other(format!("injected {step:?} failure")));
        }
        Ok(())
    }
}

/// A filesystem that lives in a map. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a file directly, bypassing staging.
    pub fn insert(&self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        let modified = state.next_modified();
        state.files.insert(
            path.as_ref().to_path_buf(),
            MemoryFile {
                bytes: bytes.into(),
                modified,
            },
        );
    }

    /// Advance a file's modification time without changing its contents.
    pub fn touch(&self, path: impl AsRef<Path>) -> bool {
        let mut state = self.lock();
        let modified = state.next_modified();
        match state.files.get_mut(path.as_ref()) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock()
            .files
            .get(path.as_ref())
            .map(|file| file.bytes.clone())
    }

    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock().files.contains_key(path.as_ref())
    }

    /// Staged files that were neither committed nor discarded.
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.lock().staged
    }

    /// Make the next occurrence of `step` fail.
    pub fn fail_next(&self, step: Fault) {
        self.lock().fault = Some(step);
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl GroupFs for MemoryFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let mut state = self.lock();
        state.take_fault(Fault::Stat)?;
        state
            .files
            .get(path)
            .map(MemoryFile::stat)
            .ok_or_else(|| not_found(path))
    }

    fn read(&self, path: &Path) -> io::Result<(Vec<u8>, FileStat)> {
        self.lock()
            .files
            .get(path)
            .map(|file| (file.bytes.clone(), file.stat()))
            .ok_or_else(|| not_found(path))
    }

    fn stage(&self, path: &Path) -> io::Result<Box<dyn StagedFile>> {
        let mut state = self.lock();
        state.take_fault(Fault::Stage)?;
        state.staged += 1;
        Ok(Box::new(MemoryStaged {
            fs: self.clone(),
            target: path.to_path_buf(),
            buffer: Vec::new(),
            open: true,
        }))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

struct MemoryStaged {
    fs: MemoryFs,
    target: PathBuf,
    buffer: Vec<u8>,
    open: bool,
}

impl MemoryStaged {
    fn close(&mut self, state: &mut MemoryState) {
        if self.open {
            self.open = false;
            state.staged -= 1;
        }
    }
}

impl Write for MemoryStaged {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.fs.lock().take_fault(Fault::Write)?;
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl StagedFile for MemoryStaged {
    fn sync(&mut self) -> io::Result<()> {
        self.fs.lock().take_fault(Fault::Sync)
    }

    fn commit(mut self: Box<Self>) -> io::Result<()> {
        let fs = self.fs.clone();
        let mut state = fs.lock();
        self.close(&mut state);
        state.take_fault(Fault::Commit)?;
        let modified = state.next_modified();
        state.files.insert(
            self.target.clone(),
            MemoryFile {
                bytes: std::mem::take(&mut self.buffer),
                modified,
            },
        );
        Ok(())
    }

    fn discard(mut self: Box<Self>) -> io::Result<()> {
        let fs = self.fs.clone();
        self.close(&mut fs.lock());
        Ok(())
    }
}

impl Drop for MemoryStaged {
    fn drop(&mut self) {
        let fs = self.fs.clone();
        self.close(&mut fs.lock());
    }
}
