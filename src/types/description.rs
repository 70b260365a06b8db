//! In-memory form of a persisted group configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::etag::ETag;
use super::password::Password;
use super::permission::{GroupPolicy, Permissions};
use crate::constants::DEFAULT_MAX_HISTORY_AGE;
use crate::error::{GroupError, Result};

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Identity of the file a description was parsed from.
///
/// For an auto-subgroup this is the ancestor's file, not a file named after the subgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl FileInfo {
    #[must_use]
    pub fn etag(&self) -> ETag {
        ETag::from_parts(self.size, self.modified)
    }
}

/// A credential paired with the permission it grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserDescription {
    /// Absent in sanitised views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Password>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl UserDescription {
    #[must_use]
    pub fn new(password: Password, permissions: impl Into<Permissions>) -> Self {
        Self {
            password: Some(password),
            permissions: permissions.into(),
        }
    }
}

/// Obsolete per-role client entry, only read so it can be upgraded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Password>,
}

/// One group's configuration, as stored in `<root>/<name>.json`.
///
/// Unknown top-level fields are rejected when decoding. The obsolete fields at the end are
/// only populated by files written for older servers and are emptied by
/// [`upgrade_description`](crate::upgrade_description) before a description is handed out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Description {
    #[serde(skip)]
    pub(crate) file: Option<FileInfo>,
    #[serde(skip)]
    pub(crate) subgroup: bool,

    /// User-facing group name.
    #[serde(rename = "displayName", default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Typically an e-mail address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contact: String,
    /// Ignored by the server.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Listed on the landing page.
    #[serde(default, skip_serializing_if = "is_false")]
    pub public: bool,
    /// When set, clients are sent elsewhere and most other fields are ignored.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub redirect: String,
    /// Maximum simultaneous clients; 0 is unlimited.
    #[serde(rename = "max-clients", default, skip_serializing_if = "is_zero")]
    pub max_clients: u32,
    /// Chat history retention in seconds; 0 selects the default.
    #[serde(rename = "max-history-age", default, skip_serializing_if = "is_zero")]
    pub max_history_age: u64,
    #[serde(rename = "allow-recording", default, skip_serializing_if = "is_false")]
    pub allow_recording: bool,
    #[serde(rename = "unrestricted-tokens", default, skip_serializing_if = "is_false")]
    pub unrestricted_tokens: bool,
    /// Names below this group resolve to it when they have no file of their own.
    #[serde(rename = "auto-subgroups", default, skip_serializing_if = "is_false")]
    pub auto_subgroups: bool,
    /// Lock the group when the last operator leaves.
    #[serde(default, skip_serializing_if = "is_false")]
    pub autolock: bool,
    /// Kick everyone when the last operator leaves.
    #[serde(default, skip_serializing_if = "is_false")]
    pub autokick: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<String, UserDescription>,
    /// Matched by secret alone, under whatever username the client supplies.
    #[serde(rename = "fallback-users", default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_users: Vec<UserDescription>,
    /// Public keys of the token-issuing authentication server, kept verbatim.
    #[serde(rename = "authKeys", default, skip_serializing_if = "Vec::is_empty")]
    pub auth_keys: Vec<Map<String, Value>>,
    #[serde(rename = "authServer", default, skip_serializing_if = "String::is_empty")]
    pub auth_server: String,
    #[serde(rename = "authPortal", default, skip_serializing_if = "String::is_empty")]
    pub auth_portal: String,
    /// Codec preference order; empty lets the media layer pick.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codecs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub op: Vec<ClientPattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presenter: Vec<ClientPattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<ClientPattern>,
    #[serde(rename = "allow-subgroups", default, skip_serializing_if = "is_false")]
    pub allow_subgroups: bool,
    #[serde(rename = "allow-anonymous", default, skip_serializing_if = "is_false")]
    pub allow_anonymous: bool,
}

impl Description {
    /// Decode an administrator-supplied body with the same strict schema as group files.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|err| GroupError::InvalidInput {
            reason: err.to_string(),
        })
    }

    pub(crate) fn to_json_vec(&self, pretty: bool) -> Result<Vec<u8>> {
        let mut bytes = if pretty {
            serde_json::to_vec_pretty(self)
        } else {
            serde_json::to_vec(self)
        }
        .map_err(GroupError::Encode)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// File this description was read from, if it came from storage.
    #[must_use]
    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref()
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|file| file.path.as_path())
    }

    /// Tag of the backing file at parse time.
    #[must_use]
    pub fn etag(&self) -> Option<ETag> {
        self.file.as_ref().map(FileInfo::etag)
    }

    /// True when synthesised from an ancestor that allows auto-subgroups.
    #[must_use]
    pub fn is_subgroup(&self) -> bool {
        self.subgroup
    }

    #[must_use]
    pub fn policy(&self) -> GroupPolicy {
        GroupPolicy {
            allow_recording: self.allow_recording,
            unrestricted_tokens: self.unrestricted_tokens,
        }
    }

    #[must_use]
    pub fn max_history_age(&self) -> Duration {
        if self.max_history_age == 0 {
            DEFAULT_MAX_HISTORY_AGE
        } else {
            Duration::from_secs(self.max_history_age)
        }
    }

    /// `None` when the number of clients is unlimited.
    #[must_use]
    pub fn max_clients(&self) -> Option<u32> {
        (self.max_clients != 0).then_some(self.max_clients)
    }

    /// True when none of the secret-bearing fields is populated, obsolete client lists included.
    #[must_use]
    pub fn is_sanitised(&self) -> bool {
        self.users.is_empty()
            && self.fallback_users.is_empty()
            && self.auth_keys.is_empty()
            && self.op.is_empty()
            && self.presenter.is_empty()
            && self.other.is_empty()
    }

    /// Copy without users, fallback users or auth keys.
    #[must_use]
    pub fn sanitised(&self) -> Self {
        Self {
            users: BTreeMap::new(),
            fallback_users: Vec::new(),
            auth_keys: Vec::new(),
            op: Vec::new(),
            presenter: Vec::new(),
            other: Vec::new(),
            ..self.clone()
        }
    }

    pub(crate) fn has_obsolete_fields(&self) -> bool {
        !self.op.is_empty()
            || !self.presenter.is_empty()
            || !self.other.is_empty()
            || self.allow_subgroups
            || self.allow_anonymous
    }

    /// Turn a description inherited from an ancestor into a subgroup view.
    pub(crate) fn into_subgroup(mut self) -> Self {
        self.subgroup = true;
        self.public = false;
        self.description.clear();
        self
    }
}
