//! Permission model: named roles, explicit capability lists and policy augmentation.
//!
//! A user's stored permission is either a role drawn from a fixed table or a verbatim list of
//! capability strings. Roles are expanded against the group's policy flags at resolution time;
//! explicit lists are returned untouched.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::{CAP_ADMIN, CAP_OP, CAP_PRESENT, CAP_RECORD, CAP_TOKEN};
use crate::error::{GroupError, Result};

/// Named permission bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Op,
    Present,
    Observe,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Op, Role::Present, Role::Observe, Role::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Op => "op",
            Role::Present => "present",
            Role::Observe => "observe",
            Role::Admin => "admin",
        }
    }

    /// Capabilities granted by the role before any policy flag is applied.
    #[must_use]
    pub fn base_capabilities(self) -> &'static [&'static str] {
        match self {
            Role::Op => &[CAP_OP, CAP_PRESENT, CAP_TOKEN],
            Role::Present => &[CAP_PRESENT],
            Role::Observe => &[],
            Role::Admin => &[CAP_ADMIN],
        }
    }
}

impl FromStr for Role {
    type Err = GroupError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| GroupError::UnknownRole {
                role: s.to_string(),
            })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group-wide flags consulted when a named role is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupPolicy {
    pub allow_recording: bool,
    pub unrestricted_tokens: bool,
}

/// A user's stored permission value.
///
/// Serialises as a bare role string (`"op"`) or as a string array (`["present", "record"]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    Named(Role),
    Explicit(Vec<String>),
}

impl Default for Permissions {
    fn default() -> Self {
        Self::Explicit(Vec::new())
    }
}

impl From<Role> for Permissions {
    fn from(role: Role) -> Self {
        Self::Named(role)
    }
}

impl Permissions {
    /// Build a named permission, rejecting names outside the role table.
    pub fn named(name: &str) -> Result<Self> {
        name.parse().map(Self::Named)
    }

    #[must_use]
    pub fn explicit<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Explicit(capabilities.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Named(role) => Some(*role),
            Self::Explicit(_) => None,
        }
    }

    /// Expand into the concrete capability list granted under `policy`.
    ///
    /// Only named roles are augmented: `record` is prepended to roles carrying `op` when
    /// recording is allowed, and `token` to roles carrying `present` when tokens are
    /// unrestricted.
    #[must_use]
    pub fn resolve(&self, policy: GroupPolicy) -> Vec<String> {
        let role = match self {
            Self::Explicit(capabilities) => return capabilities.clone(),
            Self::Named(role) => *role,
        };

        let base = role.base_capabilities();
        let grants = |capability: &str| base.contains(&capability);
        let mut capabilities: Vec<String> = base.iter().map(|cap| (*cap).to_string()).collect();

        if policy.allow_recording && grants(CAP_OP) && !grants(CAP_RECORD) {
            capabilities.insert(0, CAP_RECORD.to_string());
        }
        if policy.unrestricted_tokens && grants(CAP_PRESENT) && !grants(CAP_TOKEN) {
            capabilities.insert(0, CAP_TOKEN.to_string());
        }
        capabilities
    }

    /// Decode from a JSON value: a string array first, then a single role name.
    ///
    /// `null` is an empty capability list, as written by older servers for users without
    /// permissions.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        GroupError::InvalidPermissionFormat {
                            reason: format!("expected a string capability, found {item}"),
                        }
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Explicit),
            Value::String(name) => Self::named(name),
            Value::Null => Ok(Self::default()),
            other => Err(GroupError::InvalidPermissionFormat {
                reason: format!("expected a role name or a list of capabilities, found {other}"),
            }),
        }
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Named(role) => serializer.serialize_str(role.as_str()),
            Self::Explicit(capabilities) => serializer.collect_seq(capabilities),
        }
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}
