//! Public types exposed by the `groupconf-core` crate.

pub mod description;
pub mod etag;
pub mod options;
pub mod password;
pub mod permission;

pub use description::{ClientPattern, Description, FileInfo, UserDescription};
pub use etag::ETag;
pub use options::{StoreOptions, StoreOptionsBuilder};
pub use password::{HashedPassword, Password};
pub use permission::{GroupPolicy, Permissions, Role};
