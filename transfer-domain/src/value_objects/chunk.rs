// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Value Object
//!
//! `Chunk` represents one contiguous byte range of a source file, transported
//! as a single broker message. It is immutable after construction and
//! compared structurally, including its payload — see
//! [`Chunk::metadata_eq`] for the weaker comparison that ignores `data`.
//!
//! ## Two path modes
//!
//! `file_path` means different things on the two sides of the wire: on the
//! producer it is the absolute path the file was read from; on the consumer
//! it is the path the file will be written to under `output_dir`. The two
//! are never compared to each other. Reconstruction identity is instead
//! `(file_name, subdir, file_hash)` — see [`Chunk::download_key`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Length in bytes of a SHA-512 digest.
pub const HASH_LEN: usize = 64;

/// An immutable chunk of file data for upload or download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    file_path: String,
    file_name: String,
    file_hash: [u8; HASH_LEN],
    chunk_hash: [u8; HASH_LEN],
    file_offset: u64,
    chunk_offset: u64,
    length: u64,
    index: u32,
    n_total: u32,
    subdir: Vec<String>,
    filename_append: String,
    data: Option<Vec<u8>>,
}

impl Chunk {
    /// Creates a new chunk. `data`'s length must equal `length` when data is
    /// present.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        file_hash: [u8; HASH_LEN],
        chunk_hash: [u8; HASH_LEN],
        file_offset: u64,
        chunk_offset: u64,
        length: u64,
        index: u32,
        n_total: u32,
        subdir: Vec<String>,
        filename_append: impl Into<String>,
        data: Option<Vec<u8>>,
    ) -> Self {
        Chunk {
            file_path: file_path.into(),
            file_name: file_name.into(),
            file_hash,
            chunk_hash,
            file_offset,
            chunk_offset,
            length,
            index,
            n_total,
            subdir,
            filename_append: filename_append.into(),
            data,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_hash(&self) -> &[u8; HASH_LEN] {
        &self.file_hash
    }

    pub fn chunk_hash(&self) -> &[u8; HASH_LEN] {
        &self.chunk_hash
    }

    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    pub fn chunk_offset(&self) -> u64 {
        self.chunk_offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn n_total(&self) -> u32 {
        self.n_total
    }

    pub fn subdir(&self) -> &[String] {
        &self.subdir
    }

    /// Optional string appended to the basename when the consumer writes
    /// this file to disk, distinguishing the reconstructed file from its
    /// source (see `DownloadDaemon::output_path_for`).
    pub fn filename_append(&self) -> &str {
        &self.filename_append
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Creates a copy of this chunk with its payload attached.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Chunk {
            data: Some(data),
            ..self.clone()
        }
    }

    /// Creates a metadata-only copy of this chunk (no payload).
    ///
    /// A chunk without data never compares equal to the same chunk with
    /// data attached, even when every other field matches (invariant 5,
    /// §8).
    pub fn without_data(&self) -> Self {
        Chunk {
            data: None,
            ..self.clone()
        }
    }

    /// Verifies `chunk_hash == SHA-512(data)` (invariant 1, §8). Returns
    /// `true` vacuously if no payload is attached.
    pub fn verify_chunk_hash(&self) -> bool {
        match &self.data {
            Some(data) => sha512(data) == self.chunk_hash,
            None => true,
        }
    }

    /// The `(file_name, subdir, file_hash)` triple that identifies which
    /// `DownloadFile` this chunk belongs to, per the Open Question
    /// resolution in DESIGN.md: equality across the wire must not depend on
    /// `file_path`, whose meaning differs between producer and consumer.
    pub fn download_key(&self) -> (String, Vec<String>, [u8; HASH_LEN]) {
        (self.file_name.clone(), self.subdir.clone(), self.file_hash)
    }
}

pub(crate) fn sha512(data: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(data: Option<Vec<u8>>) -> Chunk {
        let file_hash = sha512(b"abc");
        let chunk_hash = sha512(b"ab");
        Chunk::new(
            "/tmp/abc.txt",
            "abc.txt",
            file_hash,
            chunk_hash,
            0,
            0,
            2,
            1,
            2,
            vec![],
            "",
            data,
        )
    }

    #[test]
    fn equality_requires_matching_data() {
        let with_data = sample(Some(b"ab".to_vec()));
        let without_data = sample(None);
        assert_ne!(with_data, without_data);
        assert_eq!(with_data, sample(Some(b"ab".to_vec())));
    }

    #[test]
    fn chunk_hash_matches_data() {
        let chunk = sample(Some(b"ab".to_vec()));
        assert!(chunk.verify_chunk_hash());
    }

    #[test]
    fn without_data_strips_payload_but_keeps_metadata() {
        let chunk = sample(Some(b"ab".to_vec()));
        let stripped = chunk.without_data();
        assert_eq!(stripped.data(), None);
        assert_eq!(stripped.file_hash(), chunk.file_hash());
    }
}
