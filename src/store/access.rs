//! Connection-time checks made against the current description of a group.

use crate::auth::Authorised;
use crate::error::{GroupError, Result};
use crate::store::GroupStore;

impl GroupStore {
    /// Authenticate a connecting client.
    ///
    /// Credential mismatches are [`GroupError::NotAuthorised`]; an unknown group or an
    /// invalid name is reported as such so the caller can tell a missing room from a refused
    /// login.
    pub fn authenticate(&self, name: &str, username: &str, secret: &str) -> Result<Authorised> {
        let description = self.get_description(name)?;
        let outcome = description.authorise(username, secret, self.verifier.as_ref());
        match &outcome {
            Ok(authorised) => tracing::debug!(
                target: "groupconf::auth",
                group = name,
                username,
                capabilities = ?authorised.capabilities,
                "client authorised"
            ),
            Err(GroupError::NotAuthorised) => tracing::debug!(
                target: "groupconf::auth",
                group = name,
                username,
                "client refused"
            ),
            Err(_) => {}
        }
        outcome
    }

    /// True when `username` is configured by name in the group. Any failure to load the group
    /// counts as absent.
    #[must_use]
    pub fn user_exists(&self, name: &str, username: &str) -> bool {
        self.get_description(name)
            .is_ok_and(|description| description.user_exists(username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryFs;
    use crate::types::{Password, StoreOptions};

    fn store() -> GroupStore {
        let fs = MemoryFs::new();
        fs.insert(
            "/g/class.json",
            r#"{
                "auto-subgroups": true,
                "allow-recording": true,
                "users": {"tutor": {"password": "chalk", "permissions": "op"}},
                "fallback-users": [{"password": "pupil", "permissions": "observe"}]
            }"#,
        );
        GroupStore::with_fs(StoreOptions::new("/g"), fs)
    }

    #[test]
    fn subgroups_share_the_ancestor_credentials() {
        let store = store();
        let tutor = store.authenticate("class/room-1", "tutor", "chalk").unwrap();
        assert_eq!(tutor.capabilities, ["record", "op", "present", "token"]);

        let pupil = store.authenticate("class/room-1", "ada", "pupil").unwrap();
        assert_eq!(pupil.username, "ada");
        assert!(pupil.capabilities.is_empty());
    }

    #[test]
    fn refusals_and_missing_groups_are_distinct() {
        let store = store();
        assert!(matches!(
            store.authenticate("class", "tutor", "pupil"),
            Err(GroupError::NotAuthorised)
        ));
        assert!(store.authenticate("gym", "tutor", "chalk").unwrap_err().is_not_found());
        assert!(matches!(
            store.authenticate("../class", "tutor", "chalk"),
            Err(GroupError::InvalidName { .. })
        ));
    }

    #[test]
    fn store_verifier_is_used() {
        let store = store().with_verifier(|password: &Password, secret: &str| {
            matches!(password, Password::Plain(p) if p.eq_ignore_ascii_case(secret))
        });
        assert!(store.authenticate("class", "tutor", "CHALK").is_ok());
    }

    #[test]
    fn user_exists_by_name_only() {
        let store = store();
        assert!(store.user_exists("class", "tutor"));
        assert!(store.user_exists("class/room-1", "tutor"));
        assert!(!store.user_exists("class", "ada"));
        assert!(!store.user_exists("class", ""));
        assert!(!store.user_exists("gym", "tutor"));
    }
}
