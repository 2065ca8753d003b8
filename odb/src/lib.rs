// Common modules

mod error;
mod object;
mod oid;
mod walker;

pub use error::OdbError;
pub use object::{MemoryObjectSource, ObjectKind, ObjectSource, Tree, TreeEntry};
pub use oid::ObjectId;
pub use walker::{TreeEntryIter, TreeWalker, WalkedEntry};
