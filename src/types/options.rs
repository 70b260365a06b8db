//! Builder-style configuration for a [`GroupStore`](crate::GroupStore).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_GROUP_ROOT, GROUP_ROOT_ENV};

fn default_true() -> bool {
    true
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_GROUP_ROOT)
}

/// Where group files live and how they are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Directory holding every group file.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Create missing parent directories when a nested group is first written.
    #[serde(default = "default_true")]
    pub create_directories: bool,
    /// Pretty-print persisted files so administrators can edit them by hand.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            root: default_root(),
            create_directories: true,
            pretty: true,
        }
    }
}

impl StoreOptions {
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Defaults, with `root` taken from `GROUPCONF_ROOT` when it is set and non-empty.
    #[must_use]
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(root) = std::env::var_os(GROUP_ROOT_ENV).filter(|value| !value.is_empty()) {
            options.root = PathBuf::from(root);
        }
        options
    }

    #[must_use]
    pub fn builder() -> StoreOptionsBuilder {
        StoreOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreOptionsBuilder {
    inner: StoreOptions,
}

impl StoreOptionsBuilder {
    #[must_use]
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.inner.root = root.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn create_directories(mut self, enabled: bool) -> Self {
        self.inner.create_directories = enabled;
        self
    }

    #[must_use]
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.inner.pretty = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> StoreOptions {
        self.inner
    }
}
