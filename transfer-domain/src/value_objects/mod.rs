//! Value objects: immutable, structurally-compared domain types.

mod chunk;
mod chunk_size;

pub use chunk::{Chunk, HASH_LEN};
pub use chunk_size::ChunkSize;
