//! Log trees: the raw nested document and the filtered arena built from it

pub mod filter;
pub mod node;
pub mod raw;

pub use filter::TreeFilter;
pub use node::{NodeId, TableNode, TableTree};
pub use raw::{scan_directory, RawChild, RawTree, TableDocument, DEFAULT_HEADERS, FILES_KEY};
