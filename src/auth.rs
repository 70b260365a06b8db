//! Matching a connecting client's credentials against a group description.

use crate::error::{GroupError, Result};
use crate::types::{Description, Password, UserDescription};

/// Decides whether a secret matches a stored credential.
///
/// Implemented for plain functions and closures so tests and servers with their own password
/// hashing can plug in without a wrapper type.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, password: &Password, secret: &str) -> bool;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&Password, &str) -> bool + Send + Sync,
{
    fn verify(&self, password: &Password, secret: &str) -> bool {
        self(password, secret)
    }
}

/// Verifier for plain and wildcard credentials.
///
/// Plain secrets are compared through their BLAKE3 digests, whose equality check runs in
/// constant time. Hashed credentials are refused; supply a verifier that understands them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardVerifier;

impl CredentialVerifier for StandardVerifier {
    fn verify(&self, password: &Password, secret: &str) -> bool {
        match password {
            Password::Plain(expected) => {
                blake3::hash(expected.as_bytes()) == blake3::hash(secret.as_bytes())
            }
            Password::Wildcard => true,
            Password::Hashed(hashed) => {
                tracing::warn!(
                    target: "groupconf::auth",
                    kind = %hashed.kind,
                    "no verifier configured for hashed password"
                );
                false
            }
        }
    }
}

/// A successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorised {
    /// The username the client supplied; fallback users have no name of their own.
    pub username: String,
    pub capabilities: Vec<String>,
}

impl Description {
    /// Check `username` and `secret` against this description.
    ///
    /// A username configured in `users` is checked against that entry only. Any other
    /// username, including the empty one, is matched against the fallback users in order.
    /// Every mismatch is the same [`GroupError::NotAuthorised`].
    pub fn authorise(
        &self,
        username: &str,
        secret: &str,
        verifier: &dyn CredentialVerifier,
    ) -> Result<Authorised> {
        let accepts = |user: &UserDescription| {
            user.password
                .as_ref()
                .is_some_and(|password| verifier.verify(password, secret))
        };

        let named = self.users.get(username).filter(|_| !username.is_empty());
        let user = match named {
            Some(user) => Some(user).filter(|&user| accepts(user)),
            None => self.fallback_users.iter().find(|&user| accepts(user)),
        };

        user.map(|user| Authorised {
            username: username.to_string(),
            capabilities: user.permissions.resolve(self.policy()),
        })
        .ok_or(GroupError::NotAuthorised)
    }

    /// True when `username` is a key of `users`. Fallback users never count.
    #[must_use]
    pub fn user_exists(&self, username: &str) -> bool {
        !username.is_empty() && self.users.contains_key(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HashedPassword;

    const DESC_JSON: &str = r#"
    {
        "auto-subgroups": true,
        "users": {
            "jch": {"password": "topsecret", "permissions": "op"},
            "john": {"password": "secret", "permissions": "present"},
            "james": {"password": "secret2", "permissions": "observe"},
            "peter": {"password": "secret4"}
        },
        "fallback-users": [
            {"permissions": "observe", "password": {"type":"wildcard"}}
        ]
    }"#;

    fn description() -> Description {
        serde_json::from_str(DESC_JSON).unwrap()
    }

    fn sorted(mut caps: Vec<String>) -> Vec<String> {
        caps.sort();
        caps
    }

    #[test]
    fn good_clients() {
        let desc = description();
        let cases: [(&str, &str, &[&str]); 5] = [
            ("jch", "topsecret", &["op", "present", "token"]),
            ("john", "secret", &["present"]),
            ("james", "secret2", &[]),
            ("peter", "secret4", &[]),
            ("paul", "secret3", &[]),
        ];
        for (username, secret, expected) in cases {
            let authorised = desc.authorise(username, secret, &StandardVerifier).unwrap();
            assert_eq!(authorised.username, username);
            assert_eq!(sorted(authorised.capabilities), expected, "{username}");
        }
    }

    #[test]
    fn bad_clients() {
        let desc = description();
        for username in ["jch", "john", "james"] {
            let err = desc.authorise(username, "foo", &StandardVerifier).unwrap_err();
            assert!(matches!(err, GroupError::NotAuthorised), "{username}");
        }
    }

    #[test]
    fn fallback_keeps_supplied_name() {
        let mut desc = description();
        desc.fallback_users = vec![UserDescription::new(
            Password::plain("guest"),
            crate::types::Role::Present,
        )];
        desc.unrestricted_tokens = true;

        let anyone = desc.authorise("visitor", "guest", &StandardVerifier).unwrap();
        assert_eq!(anyone.username, "visitor");
        assert_eq!(anyone.capabilities, ["token", "present"]);
        assert!(desc.authorise("visitor", "nope", &StandardVerifier).is_err());

        let nameless = desc.authorise("", "guest", &StandardVerifier).unwrap();
        assert_eq!(nameless.username, "");
    }

    #[test]
    fn policy_flags_augment_named_roles() {
        let mut desc = description();
        desc.allow_recording = true;
        let jch = desc.authorise("jch", "topsecret", &StandardVerifier).unwrap();
        assert_eq!(
            sorted(jch.capabilities),
            ["op", "present", "record", "token"]
        );
    }

    #[test]
    fn user_without_password_never_matches() {
        let mut desc = Description::default();
        desc.users.insert(
            "ghost".to_string(),
            UserDescription {
                password: None,
                permissions: crate::types::Role::Op.into(),
            },
        );
        assert!(desc.authorise("ghost", "", &StandardVerifier).is_err());
    }

    #[test]
    fn user_exists_ignores_fallback_users() {
        let desc = description();
        assert!(desc.user_exists("jch"));
        assert!(!desc.user_exists("paul"));
        assert!(!desc.user_exists(""));
    }

    #[test]
    fn hashed_passwords_need_a_custom_verifier() {
        let hashed = Password::Hashed(HashedPassword {
            kind: "pbkdf2".to_string(),
            hash: Some("sha-256".to_string()),
            key: Some("00ff".to_string()),
            salt: Some("abcd".to_string()),
            iterations: Some(4096),
        });
        assert!(!StandardVerifier.verify(&hashed, "anything"));

        let accept_pbkdf2 =
            |password: &Password, secret: &str| password.kind() == "pbkdf2" && secret == "pw";
        assert!(accept_pbkdf2.verify(&hashed, "pw"));
        assert!(!accept_pbkdf2.verify(&hashed, "other"));
    }

    #[test]
    fn plain_comparison() {
        assert!(StandardVerifier.verify(&Password::plain("pw"), "pw"));
        assert!(!StandardVerifier.verify(&Password::plain("pw"), "pw "));
        assert!(StandardVerifier.verify(&Password::Wildcard, ""));
    }
}
