#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::cast_possible_truncation
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Strategic lint exceptions - these are allowed project-wide for pragmatic reasons:
//
// Documentation lints: Many internal/self-documenting functions don't need extensive docs.
// Public APIs should still have proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: file sizes and timestamps fit comfortably in the target types.
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
//
// Pattern matching: These pedantic lints often suggest changes that reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
//
// Performance/ergonomics trade-offs that are acceptable for this codebase:
#![allow(clippy::needless_pass_by_value)] // Builders take owned values intentionally
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't need must_use on every method
//
// Low-value pedantic lints that add noise:
#![allow(clippy::struct_excessive_bools)] // Group descriptions naturally have many flags
#![allow(clippy::default_trait_access)]
#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::incompatible_msrv)]
#![allow(clippy::unused_self)]

/// The groupconf-core crate version (matches `Cargo.toml`).
pub const GROUPCONF_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

mod auth;
pub mod constants;
mod error;
pub mod io;
mod migrate;
mod store;
pub mod types;

pub use auth::{Authorised, CredentialVerifier, StandardVerifier};
pub use error::{GroupError, Result};
pub use migrate::{UpgradeWarning, Upgraded, upgrade_description};
pub use store::{GroupStore, valid_group_name};
pub use types::{
    ClientPattern, Description, ETag, FileInfo, GroupPolicy, HashedPassword, Password,
    Permissions, Role, StoreOptions, StoreOptionsBuilder, UserDescription,
};
