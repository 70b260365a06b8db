//! Stored credentials.
//!
//! Only the shape is interpreted here. Checking a secret against a hashed credential is the
//! job of a [`CredentialVerifier`](crate::CredentialVerifier).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TYPE_PLAIN: &str = "plain";
const TYPE_WILDCARD: &str = "wildcard";

/// A credential as written in a group file.
///
/// A bare JSON string is a plain password. An object carries a `type` and the parameters
/// that type needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Password {
    Plain(String),
    /// Accepts any secret.
    Wildcard,
    Hashed(HashedPassword),
}

/// Parameters of a hashed credential (`pbkdf2`, `bcrypt`, ...), kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashedPassword {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

impl Password {
    #[must_use]
    pub fn plain(secret: impl Into<String>) -> Self {
        Self::Plain(secret.into())
    }

    /// The `type` tag this credential is written with.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Plain(_) => TYPE_PLAIN,
            Self::Wildcard => TYPE_WILDCARD,
            Self::Hashed(hashed) => &hashed.kind,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PasswordRepr {
    Bare(String),
    Record(HashedPassword),
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = match PasswordRepr::deserialize(deserializer)? {
            PasswordRepr::Bare(secret) => return Ok(Self::Plain(secret)),
            PasswordRepr::Record(record) => record,
        };
        let hashing = record.hash.is_some() || record.salt.is_some() || record.iterations.is_some();
        match record.kind.as_str() {
            TYPE_WILDCARD if hashing || record.key.is_some() => Err(D::Error::custom(
                "wildcard password takes no key or hashing parameters",
            )),
            TYPE_WILDCARD => Ok(Self::Wildcard),
            TYPE_PLAIN if hashing => Err(D::Error::custom(
                "plain password takes no hashing parameters",
            )),
            TYPE_PLAIN => record
                .key
                .map(Self::Plain)
                .ok_or_else(|| D::Error::custom("plain password without key")),
            _ => Ok(Self::Hashed(record)),
        }
    }
}

impl Serialize for Password {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Plain(secret) => serializer.serialize_str(secret),
            Self::Wildcard => HashedPassword {
                kind: TYPE_WILDCARD.to_string(),
                hash: None,
                key: None,
                salt: None,
                iterations: None,
            }
            .serialize(serializer),
            Self::Hashed(hashed) => hashed.serialize(serializer),
        }
    }
}
