pub mod fs;
pub mod memory;

pub use fs::{FileStat, GroupFs, OsFs, StagedFile};
pub use memory::{Fault, MemoryFs};
