//! Construction and shared state of a [`GroupStore`].
//!
//! A store is built once at server start and shared by reference for the life of the process.
//! It owns the description cache, the host-wide mutation lock, the filesystem backend and the
//! credential verifier.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::auth::{CredentialVerifier, StandardVerifier};
use crate::error::Result;
use crate::io::{FileStat, GroupFs, OsFs};
use crate::types::{Description, StoreOptions};

/// Last successful parse of one group file, with the view it gives its auto-subgroups.
#[derive(Debug, Clone)]
pub(crate) struct CachedFile {
    pub own: Arc<Description>,
    /// Shared by every subgroup name resolving to this file; `None` without auto-subgroups.
    pub subgroup: Option<Arc<Description>>,
}

impl CachedFile {
    pub(crate) fn new(description: Description) -> Self {
        let subgroup = description
            .auto_subgroups
            .then(|| Arc::new(description.clone().into_subgroup()));
        Self {
            own: Arc::new(description),
            subgroup,
        }
    }

    /// True while the file still has the size and mtime it was parsed at.
    pub(crate) fn is_current(&self, stat: &FileStat) -> bool {
        self.own
            .file()
            .is_some_and(|file| file.size == stat.size && file.modified == stat.modified)
    }
}

/// Parsed group files keyed by path. Bounded by the number of files on disk, however many
/// subgroup names are requested.
pub(crate) type DescriptionCache = HashMap<PathBuf, CachedFile>;

/// Group configuration store rooted at one directory.
///
/// Reads never take the mutation lock; they rely on writes publishing whole files by rename.
/// Create, update and delete are serialised against each other for every group.
pub struct GroupStore {
    pub(crate) options: StoreOptions,
    pub(crate) fs: Box<dyn GroupFs>,
    pub(crate) verifier: Box<dyn CredentialVerifier>,
    pub(crate) cache: RwLock<DescriptionCache>,
    pub(crate) mutation: Mutex<()>,
}

impl std::fmt::Debug for GroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupStore")
            .field("options", &self.options)
            .field("fs", &self.fs)
            .field("cached", &self.cache_read().len())
            .finish_non_exhaustive()
    }
}

impl GroupStore {
    /// Open a store on the host filesystem, creating the root directory when allowed.
    pub fn open(options: StoreOptions) -> Result<Self> {
        if options.create_directories {
            OsFs.create_dir_all(&options.root)?;
        }
        tracing::info!(
            target: "groupconf::store",
            root = %options.root.display(),
            "group store opened"
        );
        Ok(Self::with_fs(options, OsFs))
    }

    /// Build a store over any filesystem backend, verifying credentials with
    /// [`StandardVerifier`].
    #[must_use]
    pub fn with_fs(options: StoreOptions, fs: impl GroupFs + 'static) -> Self {
        Self {
            options,
            fs: Box::new(fs),
            verifier: Box::new(StandardVerifier),
            cache: RwLock::new(HashMap::new()),
            mutation: Mutex::new(()),
        }
    }

    /// Replace the credential verifier, e.g. with one that understands hashed passwords.
    #[must_use]
    pub fn with_verifier(mut self, verifier: impl CredentialVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.options.root
    }

    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Drop every cached description; the next read of each group reparses its file.
    pub fn clear_cache(&self) {
        self.cache_write().clear();
    }

    pub(crate) fn cache_read(&self) -> RwLockReadGuard<'_, DescriptionCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cache_write(&self) -> RwLockWriteGuard<'_, DescriptionCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.mutation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
