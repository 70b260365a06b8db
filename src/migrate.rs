//! Upgrade of group files written for older servers.
//!
//! Runs on every load, after decoding and before a description is handed out. The upgrade
//! is a pure function of the decoded description so it can be exercised without touching
//! the filesystem, and it is idempotent: the obsolete fields it consumes are empty afterwards.

use std::collections::btree_map::Entry;
use std::fmt;
use std::mem;

use crate::types::{ClientPattern, Description, Password, Permissions, Role, UserDescription};

/// Non-fatal finding recorded while upgrading a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeWarning {
    /// `allow-anonymous` was set; the feature no longer exists and the flag was dropped.
    AllowAnonymousIgnored,
    /// A legacy entry reused a username that was already configured; it was dropped.
    DuplicateUser { username: String },
}

impl fmt::Display for UpgradeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowAnonymousIgnored => f.write_str("field allow-anonymous is obsolete, ignored"),
            Self::DuplicateUser { username } => write!(f, "duplicate user {username}, ignored"),
        }
    }
}

/// Result of [`upgrade_description`].
#[derive(Debug, Clone)]
pub struct Upgraded {
    pub description: Description,
    pub warnings: Vec<UpgradeWarning>,
}

/// Translate obsolete fields into their current equivalents.
///
/// - `allow-anonymous` is cleared with a warning.
/// - `allow-subgroups` becomes `auto-subgroups`.
/// - The `op`, `presenter` and `other` client lists become `users` entries with the matching
///   role, or `fallback-users` entries when they carry no username. A legacy entry without a
///   password accepts any secret. The first entry for a username wins.
#[must_use]
pub fn upgrade_description(mut description: Description) -> Upgraded {
    let mut warnings = Vec::new();

    if description.allow_anonymous {
        description.allow_anonymous = false;
        warnings.push(UpgradeWarning::AllowAnonymousIgnored);
    }

    if description.allow_subgroups {
        description.auto_subgroups = true;
        description.allow_subgroups = false;
    }

    let legacy = [
        (mem::take(&mut description.op), Role::Op),
        (mem::take(&mut description.presenter), Role::Present),
        (mem::take(&mut description.other), Role::Observe),
    ];
    for (patterns, role) in legacy {
        for pattern in patterns {
            upgrade_pattern(&mut description, pattern, role, &mut warnings);
        }
    }

    Upgraded {
        description,
        warnings,
    }
}

fn upgrade_pattern(
    description: &mut Description,
    pattern: ClientPattern,
    role: Role,
    warnings: &mut Vec<UpgradeWarning>,
) {
    let user = UserDescription {
        password: Some(pattern.password.unwrap_or(Password::Wildcard)),
        permissions: Permissions::Named(role),
    };

    let Some(username) = pattern.username.filter(|name| !name.is_empty()) else {
        description.fallback_users.push(user);
        return;
    };

    match description.users.entry(username) {
        Entry::Vacant(slot) => {
            slot.insert(user);
        }
        Entry::Occupied(existing) => warnings.push(UpgradeWarning::DuplicateUser {
            username: existing.key().clone(),
        }),
    }
}
