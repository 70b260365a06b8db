//! The group description store: name resolution, cached reads, guarded writes and
//! authentication, split by concern over several `impl GroupStore` blocks.

mod access;
mod lifecycle;
mod mutation;
mod read;
mod resolve;

pub use lifecycle::GroupStore;
pub use resolve::valid_group_name;
