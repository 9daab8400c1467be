//! Domain services: stateless operations over value objects and entities
//! that don't belong on any single one of them.

mod file_chunker;

pub use file_chunker::{ByteRange, FileChunker};
