//! Cached reads and the sanitised views served to administrators.
//!
//! The cache holds one entry per group file, keyed by path. An entry is used only while the
//! name still resolves to that path and the file keeps the size and modification time it was
//! parsed at. Anything else, including a different ancestor now winning the walk, forces a
//! reparse. Auto-subgroups share their ancestor's entry, so requests for arbitrary subgroup
//! names never grow the cache. Concurrent reparses of the same file are harmless: they decode
//! identical bytes and the last one to finish keeps the slot.

use std::path::Path;
use std::sync::Arc;

use crate::error::{GroupError, Result};
use crate::migrate::upgrade_description;
use crate::store::GroupStore;
use crate::store::lifecycle::CachedFile;
use crate::types::{Description, ETag, FileInfo, UserDescription};

impl GroupStore {
    /// Current description of `name`, from cache when the backing file is unchanged.
    pub fn get_description(&self, name: &str) -> Result<Arc<Description>> {
        let located = match self.locate(name, |path| self.fs.stat(path)) {
            Ok(located) => located,
            Err(err) => {
                if err.is_not_found() {
                    self.evict_file(&self.group_path(name));
                }
                return Err(err);
            }
        };

        let cached = self
            .cache_read()
            .get(&located.path)
            .filter(|entry| entry.is_current(&located.value))
            .cloned();
        let entry = match cached {
            Some(entry) => {
                tracing::trace!(target: "groupconf::store", group = name, "cache hit");
                entry
            }
            None => match self.load_file(&located.path) {
                Ok(entry) => {
                    self.cache_write()
                        .insert(located.path.clone(), entry.clone());
                    entry
                }
                Err(err) => {
                    self.evict_file(&located.path);
                    return Err(err);
                }
            },
        };

        if !located.inherited {
            return Ok(entry.own);
        }
        entry.subgroup.ok_or_else(|| {
            tracing::debug!(
                target: "groupconf::store",
                group = name,
                ancestor = %located.path.display(),
                "ancestor does not allow auto-subgroups"
            );
            GroupError::not_found(name)
        })
    }

    /// Description without users, fallback users or auth keys, with the tag of its file.
    ///
    /// Auto-subgroups have no document of their own and are reported as not found.
    pub fn get_sanitised_description(&self, name: &str) -> Result<(Description, ETag)> {
        let description = self.addressable(name)?;
        let tag = stored_tag(&description);
        Ok((description.sanitised(), tag))
    }

    /// Tag of the file configuring exactly `name`.
    pub fn get_description_tag(&self, name: &str) -> Result<ETag> {
        let located = self.locate(name, |path| self.fs.stat(path))?;
        if located.inherited {
            return Err(GroupError::not_found(name));
        }
        Ok(located.value.etag())
    }

    /// Configured usernames in lexicographic order. Fallback users are anonymous and not listed.
    pub fn get_users(&self, name: &str) -> Result<(Vec<String>, ETag)> {
        let description = self.addressable(name)?;
        let users = description.users.keys().cloned().collect();
        Ok((users, stored_tag(&description)))
    }

    /// One user's entry with its credential removed.
    pub fn get_sanitised_user(
        &self,
        name: &str,
        username: &str,
    ) -> Result<(UserDescription, ETag)> {
        let description = self.addressable(name)?;
        let user = description
            .users
            .get(username)
            .ok_or_else(|| GroupError::NotFound {
                name: format!("{name}: user {username}"),
            })?;
        let sanitised = UserDescription {
            password: None,
            permissions: user.permissions.clone(),
        };
        Ok((sanitised, stored_tag(&description)))
    }

    /// Description backed by a file named after `name` itself.
    fn addressable(&self, name: &str) -> Result<Arc<Description>> {
        let description = self.get_description(name)?;
        if description.is_subgroup() {
            return Err(GroupError::not_found(name));
        }
        Ok(description)
    }

    /// Read, decode and upgrade one group file.
    fn load_file(&self, path: &Path) -> Result<CachedFile> {
        let (bytes, stat) = self.fs.read(path)?;
        let mut description = self.decode(path, &bytes)?;
        description.file = Some(FileInfo {
            path: path.to_path_buf(),
            size: stat.size,
            modified: stat.modified,
        });
        tracing::debug!(target: "groupconf::store", path = %path.display(), "group file parsed");
        Ok(CachedFile::new(description))
    }

    /// Strictly decode a group file and run the schema upgrade, logging its warnings.
    pub(crate) fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Description> {
        let decoded: Description =
            serde_json::from_slice(bytes).map_err(|err| GroupError::MalformedConfig {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        if decoded.has_obsolete_fields() {
            tracing::debug!(
                target: "groupconf::migrate",
                path = %path.display(),
                "upgrading legacy group file"
            );
        }
        let upgraded = upgrade_description(decoded);
        for warning in &upgraded.warnings {
            tracing::warn!(
                target: "groupconf::migrate",
                path = %path.display(),
                %warning,
                "obsolete group configuration"
            );
        }
        Ok(upgraded.description)
    }

    /// Forget the cached parse of `path` and the subgroup view derived from it.
    pub(crate) fn evict_file(&self, path: &Path) {
        self.cache_write().remove(path);
    }
}

fn stored_tag(description: &Description) -> ETag {
    description.etag().unwrap_or_else(ETag::none)
}
