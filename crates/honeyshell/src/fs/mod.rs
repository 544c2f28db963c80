//! Virtual filesystem for Honeyshell
//!
//! The emulated machine's file tree. Sessions only see it through the
//! async [`FileSystem`] trait; [`InMemoryFs`] is the default implementation.

mod glob;
mod memory;
mod path;
mod traits;

pub use glob::{expand_glob, has_glob_chars};
pub use memory::InMemoryFs;
pub use path::resolve_path;
pub use traits::{DirEntry, FileSystem, FileType, Metadata};
