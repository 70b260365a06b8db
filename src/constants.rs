//! Fixed names and defaults shared across the crate.

use std::time::Duration;

/// Extension of a persisted group file; `a/b` lives at `<root>/a/b.json`.
pub const GROUP_FILE_EXTENSION: &str = "json";

/// Separator between the segments of a hierarchical group name.
pub const GROUP_NAME_SEPARATOR: char = '/';

/// History retention applied when a group leaves `max-history-age` unset.
pub const DEFAULT_MAX_HISTORY_AGE: Duration = Duration::from_secs(4 * 60 * 60);

/// Environment variable overriding the group directory.
pub const GROUP_ROOT_ENV: &str = "GROUPCONF_ROOT";

/// Directory used when no root is configured.
pub const DEFAULT_GROUP_ROOT: &str = "groups";

pub const CAP_OP: &str = "op";
pub const CAP_PRESENT: &str = "present";
pub const CAP_TOKEN: &str = "token";
pub const CAP_RECORD: &str = "record";
pub const CAP_ADMIN: &str = "admin";
