//! Catalog parsing and generation.
//!
//! The catalog is a plain-text list of package declarations, one per line.

pub mod parser;
pub mod writer;

pub use parser::{parse_file, parse_str};
pub use writer::{WriteOptions, write_file, write_string};
