// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Chunker
//!
//! Splits a file on disk into an ordered sequence of [`Chunk`]s and computes
//! the whole-file SHA-512 hash in the same pass. This is the only place in
//! the domain layer that touches the filesystem directly; everything else
//! operates on values already in memory.

use crate::value_objects::chunk::sha512;
use crate::value_objects::{Chunk, ChunkSize, HASH_LEN};
use crate::TransferError;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A half-open `[start, stop)` byte range selecting part of a file to chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub stop: u64,
}

impl ByteRange {
    pub fn new(start: u64, stop: u64) -> Self {
        ByteRange { start, stop }
    }

    fn len(&self) -> u64 {
        self.stop - self.start
    }
}

/// Splits a file into chunks, returning the whole-file hash and the ordered
/// chunk list.
///
/// `file_path` is recorded on every emitted chunk verbatim (the producer's
/// view of the path); `subdir` is the path between the configured root
/// directory and the file, recorded on every chunk so the consumer can
/// recreate the directory hierarchy.
///
/// When `selected_ranges` is `None`, the whole file is read sequentially in
/// `chunk_size`-sized blocks. When present, only the selected byte ranges
/// are read, `chunk_offset` advances densely from zero over just the
/// selected bytes, and `file_offset` retains the absolute position in the
/// original file.
pub struct FileChunker;

impl FileChunker {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        file_path: &Path,
        file_name: &str,
        subdir: Vec<String>,
        chunk_size: ChunkSize,
        filename_append: &str,
        selected_ranges: Option<&[ByteRange]>,
    ) -> Result<([u8; HASH_LEN], Vec<Chunk>), TransferError> {
        match selected_ranges {
            None => Self::build_whole_file(file_path, file_name, subdir, chunk_size, filename_append),
            Some(ranges) => Self::build_selected_ranges(file_path, file_name, subdir, chunk_size, filename_append, ranges),
        }
    }

    fn build_whole_file(
        file_path: &Path,
        file_name: &str,
        subdir: Vec<String>,
        chunk_size: ChunkSize,
        filename_append: &str,
    ) -> Result<([u8; HASH_LEN], Vec<Chunk>), TransferError> {
        let path_str = file_path.display().to_string();
        let mut file = File::open(file_path).map_err(|e| TransferError::chunking(&path_str, e.to_string()))?;

        let mut file_hasher = Sha512::new();
        let mut raw_chunks: Vec<(u64, u64, [u8; HASH_LEN], Vec<u8>)> = Vec::new();
        let mut offset: u64 = 0;
        let mut buf = vec![0u8; chunk_size.bytes()];

        loop {
            let n = read_fully(&mut file, &mut buf).map_err(|e| TransferError::chunking(&path_str, e.to_string()))?;
            if n == 0 {
                break;
            }
            let block = &buf[..n];
            file_hasher.update(block);
            let chunk_hash = sha512(block);
            raw_chunks.push((offset, n as u64, chunk_hash, block.to_vec()));
            offset += n as u64;
        }

        let file_hash = finalize(file_hasher);
        let n_total = raw_chunks.len() as u32;
        let chunks = raw_chunks
            .into_iter()
            .enumerate()
            .map(|(i, (off, len, chunk_hash, data))| {
                Chunk::new(
                    path_str.clone(),
                    file_name.to_string(),
                    file_hash,
                    chunk_hash,
                    off,
                    off,
                    len,
                    (i + 1) as u32,
                    n_total,
                    subdir.clone(),
                    filename_append,
                    Some(data),
                )
            })
            .collect();

        Ok((file_hash, chunks))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_selected_ranges(
        file_path: &Path,
        file_name: &str,
        subdir: Vec<String>,
        chunk_size: ChunkSize,
        filename_append: &str,
        ranges: &[ByteRange],
    ) -> Result<([u8; HASH_LEN], Vec<Chunk>), TransferError> {
        let path_str = file_path.display().to_string();
        if ranges.is_empty() {
            return Err(TransferError::chunking(&path_str, "selected_ranges must not be empty"));
        }
        let mut sorted: Vec<ByteRange> = ranges.to_vec();
        sorted.sort_by_key(|r| r.start);
        for r in &sorted {
            if r.start >= r.stop {
                return Err(TransferError::chunking(
                    &path_str,
                    format!("invalid range [{}, {})", r.start, r.stop),
                ));
            }
        }
        for w in sorted.windows(2) {
            if w[1].start < w[0].stop {
                return Err(TransferError::chunking(&path_str, "selected_ranges overlap"));
            }
        }

        let mut file = File::open(file_path).map_err(|e| TransferError::chunking(&path_str, e.to_string()))?;
        let mut file_hasher = Sha512::new();
        let mut raw_chunks: Vec<(u64, u64, u64, [u8; HASH_LEN], Vec<u8>)> = Vec::new();
        let mut reconstructed_offset: u64 = 0;
        let step = chunk_size.bytes() as u64;

        for range in &sorted {
            let mut file_offset = range.start;
            while file_offset < range.stop {
                let want = step.min(range.stop - file_offset);
                file.seek(SeekFrom::Start(file_offset))
                    .map_err(|e| TransferError::chunking(&path_str, e.to_string()))?;
                let mut buf = vec![0u8; want as usize];
                read_fully(&mut file, &mut buf).map_err(|e| TransferError::chunking(&path_str, e.to_string()))?;
                file_hasher.update(&buf);
                let chunk_hash = sha512(&buf);
                let len = buf.len() as u64;
                raw_chunks.push((file_offset, reconstructed_offset, len, chunk_hash, buf));
                file_offset += len;
                reconstructed_offset += len;
            }
            let _ = range.len();
        }

        let file_hash = finalize(file_hasher);
        let n_total = raw_chunks.len() as u32;
        let chunks = raw_chunks
            .into_iter()
            .enumerate()
            .map(|(i, (file_off, chunk_off, len, chunk_hash, data))| {
                Chunk::new(
                    path_str.clone(),
                    file_name.to_string(),
                    file_hash,
                    chunk_hash,
                    file_off,
                    chunk_off,
                    len,
                    (i + 1) as u32,
                    n_total,
                    subdir.clone(),
                    filename_append,
                    Some(data),
                )
            })
            .collect();

        Ok((file_hash, chunks))
    }
}

/// Reads into `buf` until it is full or EOF, returning the number of bytes
/// actually read (short of `buf.len()` only at EOF).
fn read_fully(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

fn finalize(hasher: Sha512) -> [u8; HASH_LEN] {
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn s1_three_byte_file_two_byte_chunks() {
        let f = write_temp(b"abc");
        let (file_hash, chunks) =
            FileChunker::build(f.path(), "abc.txt", vec![], ChunkSize::new(2).unwrap(), "", None).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].data().unwrap(), b"ab");
        assert_eq!(chunks[0].file_offset(), 0);
        assert_eq!(chunks[0].index(), 1);
        assert_eq!(chunks[1].data().unwrap(), b"c");
        assert_eq!(chunks[1].file_offset(), 2);
        assert_eq!(chunks[1].index(), 2);
        assert_eq!(file_hash, sha512(b"abc"));
        for c in &chunks {
            assert_eq!(*c.file_hash(), file_hash);
            assert!(c.verify_chunk_hash());
        }
    }

    #[test]
    fn s2_file_of_exactly_one_chunk() {
        let f = write_temp(&vec![7u8; 4]);
        let (_hash, chunks) = FileChunker::build(f.path(), "f", vec![], ChunkSize::new(4).unwrap(), "", None).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].length(), 4);
        assert_eq!(chunks[0].index(), 1);
        assert_eq!(chunks[0].n_total(), 1);
    }

    #[test]
    fn s3_empty_file_produces_zero_chunks() {
        let f = write_temp(b"");
        let (_hash, chunks) = FileChunker::build(f.path(), "f", vec![], ChunkSize::default(), "", None).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn s4_selected_ranges() {
        let f = write_temp(b"abcdefg");
        let ranges = [ByteRange::new(0, 2), ByteRange::new(5, 7)];
        let (file_hash, chunks) = FileChunker::build(
            f.path(),
            "f",
            vec![],
            ChunkSize::new(4).unwrap(),
            "",
            Some(&ranges),
        )
        .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].data().unwrap(), b"ab");
        assert_eq!(chunks[0].file_offset(), 0);
        assert_eq!(chunks[0].chunk_offset(), 0);
        assert_eq!(chunks[1].data().unwrap(), b"fg");
        assert_eq!(chunks[1].file_offset(), 5);
        assert_eq!(chunks[1].chunk_offset(), 2);
        assert_eq!(file_hash, sha512(b"abfg"));
    }

    #[test]
    fn rejects_malformed_ranges() {
        let f = write_temp(b"abcdefg");
        let bad = [ByteRange::new(3, 1)];
        assert!(FileChunker::build(f.path(), "f", vec![], ChunkSize::default(), "", Some(&bad)).is_err());
        let empty: [ByteRange; 0] = [];
        assert!(FileChunker::build(f.path(), "f", vec![], ChunkSize::default(), "", Some(&empty)).is_err());
    }

    #[test]
    fn index_is_dense_permutation() {
        let f = write_temp(&vec![1u8; 10]);
        let (_hash, chunks) = FileChunker::build(f.path(), "f", vec![], ChunkSize::new(2).unwrap(), "", None).unwrap();
        let mut indices: Vec<u32> = chunks.iter().map(|c| c.index()).collect();
        indices.sort();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
        assert!(chunks.iter().all(|c| c.n_total() == 5));
    }

    #[test]
    fn filename_append_is_recorded_on_every_chunk() {
        let f = write_temp(b"abcd");
        let (_hash, chunks) =
            FileChunker::build(f.path(), "f", vec![], ChunkSize::new(2).unwrap(), "_copy", None).unwrap();
        assert!(chunks.iter().all(|c| c.filename_append() == "_copy"));
    }
}
