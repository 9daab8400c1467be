// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # DownloadFile Entity
//!
//! Reconstructs a file on disk from chunks arriving in arbitrary order
//! across threads. Each instance owns a lock around its own written-chunk
//! bookkeeping so concurrent writers for the *same* file serialize, while
//! writers for different files never contend.

use crate::value_objects::{Chunk, HASH_LEN};
use crate::TransferError;
use parking_lot::Mutex;
use sha2::{Digest, Sha512};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// Result of writing one chunk to the on-disk reconstruction of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// This chunk's index was already written; the write was a no-op.
    AlreadyWritten,
    /// The chunk was written; more chunks are still outstanding.
    InProgress,
    /// The chunk was written and it completed the file; the reconstructed
    /// hash matched `file_hash`.
    Success,
    /// The chunk was written and completed the file, but the reconstructed
    /// hash did not match `file_hash`. The file is left on disk for
    /// inspection rather than deleted.
    HashMismatch,
    /// The chunk's `(file_name, subdir, file_hash)` does not match this
    /// `DownloadFile`; nothing was written.
    PathMismatch,
}

struct DownloadState {
    written_indices: HashSet<u32>,
    finished: bool,
}

/// A file being reconstructed from chunks delivered by a broker consumer.
pub struct DownloadFile {
    output_path: PathBuf,
    file_name: String,
    subdir: Vec<String>,
    file_hash: [u8; HASH_LEN],
    n_total_chunks: u32,
    state: Mutex<DownloadState>,
}

impl DownloadFile {
    pub fn new(
        output_path: PathBuf,
        file_name: String,
        subdir: Vec<String>,
        file_hash: [u8; HASH_LEN],
        n_total_chunks: u32,
    ) -> Self {
        DownloadFile {
            output_path,
            file_name,
            subdir,
            file_hash,
            n_total_chunks,
            state: Mutex::new(DownloadState {
                written_indices: HashSet::new(),
                finished: false,
            }),
        }
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The `(file_name, subdir, file_hash)` key this file was created for;
    /// see [`Chunk::download_key`].
    pub fn key(&self) -> (String, Vec<String>, [u8; HASH_LEN]) {
        (self.file_name.clone(), self.subdir.clone(), self.file_hash)
    }

    /// Writes one chunk's payload to its offset in the reconstructed file.
    ///
    /// Creates parent directories and the output file on first write.
    /// Idempotent per chunk index: a chunk already written is a no-op, not
    /// an error, so redelivery from an at-least-once broker is safe
    /// (invariant 4, §8). When the last outstanding index is written, reads
    /// the whole file back and checks its SHA-512 against `file_hash`.
    pub fn write(&self, chunk: &Chunk) -> Result<WriteOutcome, TransferError> {
        if chunk.download_key() != self.key() {
            return Ok(WriteOutcome::PathMismatch);
        }
        let Some(data) = chunk.data() else {
            return Err(TransferError::io(
                self.output_path.display().to_string(),
                "chunk carried no data",
            ));
        };

        let mut state = self.state.lock();
        if state.finished || state.written_indices.contains(&chunk.index()) {
            return Ok(WriteOutcome::AlreadyWritten);
        }

        if let Some(parent) = self.output_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TransferError::io(self.output_path.display().to_string(), e.to_string()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .open(&self.output_path)
            .map_err(|e| TransferError::io(self.output_path.display().to_string(), e.to_string()))?;
        file.seek(SeekFrom::Start(chunk.chunk_offset()))
            .map_err(|e| TransferError::io(self.output_path.display().to_string(), e.to_string()))?;
        file.write_all(data)
            .map_err(|e| TransferError::io(self.output_path.display().to_string(), e.to_string()))?;
        file.flush()
            .map_err(|e| TransferError::io(self.output_path.display().to_string(), e.to_string()))?;
        file.sync_all()
            .map_err(|e| TransferError::io(self.output_path.display().to_string(), e.to_string()))?;

        state.written_indices.insert(chunk.index());

        if (state.written_indices.len() as u32) < self.n_total_chunks {
            return Ok(WriteOutcome::InProgress);
        }

        state.finished = true;
        drop(state);

        let actual_hash = hash_file(&self.output_path)
            .map_err(|e| TransferError::io(self.output_path.display().to_string(), e.to_string()))?;
        if actual_hash == self.file_hash {
            Ok(WriteOutcome::Success)
        } else {
            Ok(WriteOutcome::HashMismatch)
        }
    }
}

fn hash_file(path: &PathBuf) -> std::io::Result<[u8; HASH_LEN]> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sha512(data: &[u8]) -> [u8; HASH_LEN] {
        let mut hasher = Sha512::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        out
    }

    fn chunk(file_hash: [u8; HASH_LEN], offset: u64, index: u32, n_total: u32, data: &[u8]) -> Chunk {
        Chunk::new(
            "unused",
            "f.bin",
            file_hash,
            sha512(data),
            offset,
            offset,
            data.len() as u64,
            index,
            n_total,
            vec![],
            "",
            Some(data.to_vec()),
        )
    }

    #[test]
    fn reassembles_out_of_order_chunks_and_verifies_hash() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("f.bin");
        let file_hash = sha512(b"abcdef");
        let download = DownloadFile::new(out.clone(), "f.bin".into(), vec![], file_hash, 3);

        let c2 = chunk(file_hash, 2, 2, 3, b"cd");
        let c1 = chunk(file_hash, 0, 1, 3, b"ab");
        let c3 = chunk(file_hash, 4, 3, 3, b"ef");

        assert_eq!(download.write(&c2).unwrap(), WriteOutcome::InProgress);
        assert_eq!(download.write(&c1).unwrap(), WriteOutcome::InProgress);
        assert_eq!(download.write(&c3).unwrap(), WriteOutcome::Success);

        let contents = std::fs::read(&out).unwrap();
        assert_eq!(contents, b"abcdef");
    }

    #[test]
    fn redelivered_chunk_is_a_no_op() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("f.bin");
        let file_hash = sha512(b"ab");
        let download = DownloadFile::new(out, "f.bin".into(), vec![], file_hash, 1);

        let c1 = chunk(file_hash, 0, 1, 1, b"ab");
        assert_eq!(download.write(&c1).unwrap(), WriteOutcome::Success);
        assert_eq!(download.write(&c1).unwrap(), WriteOutcome::AlreadyWritten);
    }

    #[test]
    fn wrong_file_hash_leaves_file_on_disk() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("f.bin");
        let claimed_hash = sha512(b"zz");
        let download = DownloadFile::new(out.clone(), "f.bin".into(), vec![], claimed_hash, 1);

        let c1 = chunk(claimed_hash, 0, 1, 1, b"ab");
        assert_eq!(download.write(&c1).unwrap(), WriteOutcome::HashMismatch);
        assert!(out.exists());
    }

    #[test]
    fn chunk_for_a_different_file_is_rejected() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("f.bin");
        let file_hash = sha512(b"ab");
        let other_hash = sha512(b"zz");
        let download = DownloadFile::new(out, "f.bin".into(), vec![], file_hash, 1);

        let foreign = chunk(other_hash, 0, 1, 1, b"ab");
        assert_eq!(download.write(&foreign).unwrap(), WriteOutcome::PathMismatch);
    }
}
