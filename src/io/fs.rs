//! Filesystem seam used by the store.
//!
//! The store only needs to stat, read, stage-then-publish and remove whole files. Publication
//! goes through a [`StagedFile`]: bytes are written beside the target, flushed, and then renamed
//! over it, so a reader opening the target sees either the previous file or the new one.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::SystemTime;

use atomic_write_file::AtomicWriteFile;

use crate::types::ETag;

/// Size and modification time of a file; together they identify a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: SystemTime,
}

impl FileStat {
    #[must_use]
    pub fn etag(&self) -> ETag {
        ETag::from_parts(self.size, self.modified)
    }
}

/// New contents for a file that are not visible until [`commit`](StagedFile::commit).
///
/// Dropping a staged file without committing it discards it.
pub trait StagedFile: Write {
    /// Flush written bytes to durable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Close the staged file and rename it over the target.
    fn commit(self: Box<Self>) -> io::Result<()>;

    /// Remove the staged file, leaving the target untouched.
    fn discard(self: Box<Self>) -> io::Result<()>;
}

/// The operations a [`GroupStore`](crate::GroupStore) performs on its root directory.
///
/// A missing file is reported as [`io::ErrorKind::NotFound`].
pub trait GroupFs: Send + Sync + fmt::Debug {
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Read a whole file together with the stat taken from the same open handle.
    fn read(&self, path: &Path) -> io::Result<(Vec<u8>, FileStat)>;

    /// Start replacing `path`; the staging file lives in the same directory.
    fn stage(&self, path: &Path) -> io::Result<Box<dyn StagedFile>>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`GroupFs`] backed by the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

fn stat_of(metadata: &std::fs::Metadata, path: &Path) -> io::Result<FileStat> {
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a regular file", path.display()),
        ));
    }
    Ok(FileStat {
        size: metadata.len(),
        modified: metadata.modified()?,
    })
}

impl GroupFs for OsFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        stat_of(&fs_err::metadata(path)?, path)
    }

    fn read(&self, path: &Path) -> io::Result<(Vec<u8>, FileStat)> {
        let mut file = fs_err::File::open(path)?;
        let stat = stat_of(&file.metadata()?, path)?;
        let mut bytes = Vec::with_capacity(usize::try_from(stat.size).unwrap_or(0));
        file.read_to_end(&mut bytes)?;
        Ok((bytes, stat))
    }

    fn stage(&self, path: &Path) -> io::Result<Box<dyn StagedFile>> {
        Ok(Box::new(OsStaged {
            atomic: AtomicWriteFile::open(path)?,
        }))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs_err::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs_err::create_dir_all(path)
    }
}

struct OsStaged {
    atomic: AtomicWriteFile,
}

impl Write for OsStaged {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.atomic.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.atomic.flush()
    }
}

impl StagedFile for OsStaged {
    fn sync(&mut self) -> io::Result<()> {
        self.atomic.flush()?;
        self.atomic.as_file().sync_all()
    }

    fn commit(self: Box<Self>) -> io::Result<()> {
        self.atomic.commit()
    }

    fn discard(self: Box<Self>) -> io::Result<()> {
        self.atomic.discard()
    }
}
