//! Create, update and delete under optimistic concurrency.
//!
//! Every mutation holds the store-wide mutation lock from the tag comparison until the new
//! file is published or removed. Writes address the file named after the group itself; an
//! ancestor that currently serves the name as an auto-subgroup is never the current version.

use std::io::{self, Write};
use std::path::Path;

use crate::error::{GroupError, Result};
use crate::migrate::upgrade_description;
use crate::store::GroupStore;
use crate::store::resolve::check_name;
use crate::types::{Description, ETag};

impl GroupStore {
    /// Replace the configuration of `name`, or create it when `expected` is the empty tag.
    ///
    /// `description` must be sanitised: users, fallback users and auth keys are carried over
    /// from the version being replaced. Returns the tag of the new file, or the empty tag when
    /// the file was published but could not be stat'ed afterwards; the update has still taken
    /// effect and [`get_description_tag`](Self::get_description_tag) recovers the tag.
    pub fn update_description(
        &self,
        name: &str,
        expected: &ETag,
        description: &Description,
    ) -> Result<ETag> {
        check_name(name)?;
        if !description.is_sanitised() {
            return Err(GroupError::InvalidInput {
                reason: "users, fallback users and auth keys cannot be set through this path"
                    .to_string(),
            });
        }

        let upgraded = upgrade_description(description.clone());
        for warning in &upgraded.warnings {
            tracing::warn!(target: "groupconf::migrate", group = name, %warning, "obsolete field in update");
        }
        let mut next = upgraded.description;
        next.file = None;
        next.subgroup = false;

        let _guard = self.lock_mutations();
        let path = self.group_path(name);

        let (previous, current) = match self.fs.read(&path) {
            Ok((bytes, stat)) => (Some(bytes), stat.etag()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => (None, ETag::none()),
            Err(err) => return Err(err.into()),
        };
        self.check_tag(name, expected, current)?;

        if let Some(bytes) = previous {
            let previous = self.decode(&path, &bytes)?;
            next.users = previous.users;
            next.fallback_users = previous.fallback_users;
            next.auth_keys = previous.auth_keys;
        }

        let bytes = next.to_json_vec(self.options.pretty)?;
        self.persist(&path, &bytes)?;
        self.evict_file(&path);

        let tag = match self.fs.stat(&path) {
            Ok(stat) => stat.etag(),
            Err(err) => {
                tracing::warn!(
                    target: "groupconf::store",
                    group = name,
                    error = %err,
                    "group description written but its tag could not be read"
                );
                ETag::none()
            }
        };
        tracing::info!(target: "groupconf::store", group = name, %tag, "group description written");
        Ok(tag)
    }

    /// Remove the file configuring exactly `name`.
    pub fn delete_description(&self, name: &str, expected: &ETag) -> Result<()> {
        check_name(name)?;

        let _guard = self.lock_mutations();
        let path = self.group_path(name);

        let current = match self.fs.stat(&path) {
            Ok(stat) => stat.etag(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(GroupError::not_found(name));
            }
            Err(err) => return Err(err.into()),
        };
        self.check_tag(name, expected, current)?;

        self.fs.remove(&path)?;
        self.evict_file(&path);
        tracing::info!(target: "groupconf::store", group = name, "group description deleted");
        Ok(())
    }

    fn check_tag(&self, name: &str, expected: &ETag, current: ETag) -> Result<()> {
        if *expected == current {
            return Ok(());
        }
        tracing::debug!(
            target: "groupconf::store",
            group = name,
            %expected,
            %current,
            "tag mismatch"
        );
        Err(GroupError::Conflict {
            name: name.to_string(),
            expected: expected.clone(),
            current,
        })
    }

    /// Write `bytes` beside `path`, flush them and rename over `path`.
    ///
    /// On failure the staged file is discarded and `path` keeps its previous contents.
    fn persist(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path.parent().filter(|_| self.options.create_directories);
        if let Some(parent) = parent {
            self.fs.create_dir_all(parent)?;
        }

        let mut staged = self.fs.stage(path)?;
        if let Err(err) = staged.write_all(bytes).and_then(|()| staged.sync()) {
            if let Err(cleanup) = staged.discard() {
                tracing::error!(
                    target: "groupconf::store",
                    path = %path.display(),
                    error = %cleanup,
                    "failed to discard staged group file"
                );
            }
            return Err(err.into());
        }
        staged.commit()?;
        Ok(())
    }
}
