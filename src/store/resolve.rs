//! Group name validation and the walk from a name to the file that configures it.

use std::io;
use std::path::{Path, PathBuf};

use crate::constants::{GROUP_FILE_EXTENSION, GROUP_NAME_SEPARATOR};
use crate::error::{GroupError, Result};
use crate::store::GroupStore;

/// True for `/`-separated names with no empty, `.` or `..` segment.
///
/// A leading or trailing separator produces an empty segment, so `/foo` and `foo/` are
/// rejected along with `""`.
#[must_use]
pub fn valid_group_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split(GROUP_NAME_SEPARATOR)
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

pub(crate) fn check_name(name: &str) -> Result<()> {
    if valid_group_name(name) {
        Ok(())
    } else {
        Err(GroupError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Name with its last segment removed, or `None` for a top-level name.
fn parent_name(name: &str) -> Option<&str> {
    name.rsplit_once(GROUP_NAME_SEPARATOR)
        .map(|(parent, _)| parent)
}

/// Outcome of [`GroupStore::locate`].
#[derive(Debug)]
pub(crate) struct Located<T> {
    pub value: T,
    pub path: PathBuf,
    /// The file belongs to a strict ancestor of the requested name.
    pub inherited: bool,
}

impl GroupStore {
    /// Path of the file that would configure exactly `name`.
    ///
    /// `name` must already be valid.
    pub(crate) fn group_path(&self, name: &str) -> PathBuf {
        let (dirs, leaf) = match name.rsplit_once(GROUP_NAME_SEPARATOR) {
            Some((dirs, leaf)) => (Some(dirs), leaf),
            None => (None, name),
        };
        let mut path = self.options.root.clone();
        if let Some(dirs) = dirs {
            path.extend(dirs.split(GROUP_NAME_SEPARATOR));
        }
        path.push(format!("{leaf}.{GROUP_FILE_EXTENSION}"));
        path
    }

    /// Check `name` and then each of its ancestors until `lookup` finds a file.
    ///
    /// Only [`io::ErrorKind::NotFound`] moves the walk upward; any other failure aborts it.
    pub(crate) fn locate<T>(
        &self,
        name: &str,
        mut lookup: impl FnMut(&Path) -> io::Result<T>,
    ) -> Result<Located<T>> {
        check_name(name)?;
        let mut current = Some(name);
        while let Some(candidate) = current {
            let path = self.group_path(candidate);
            match lookup(&path) {
                Ok(value) => {
                    return Ok(Located {
                        value,
                        path,
                        inherited: candidate != name,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    current = parent_name(candidate);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(GroupError::not_found(name))
    }
}
