// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # UploadFile Entity
//!
//! Tracks a single source file on its way into the upload queue. Identity is
//! the file path; two `UploadFile`s for the same path are the same upload.
//!
//! Chunking is lazy: `FileChunker::build` only runs on the first call to
//! [`UploadFile::enqueue_chunks`], not at discovery time, so only the file
//! currently being drained holds its chunk bytes in memory - the directory
//! scan itself never chunks anything.

use crate::services::{ByteRange, FileChunker};
use crate::value_objects::{Chunk, ChunkSize, HASH_LEN};
use crate::TransferError;
use std::collections::VecDeque;
use std::path::PathBuf;

/// Where an `UploadFile` stands in the upload lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// Chunking failed or the file was filtered out; never enqueue from it.
    WillNotUpload,
    /// No chunks have been enqueued yet (chunking may not have run yet).
    Waiting,
    /// Some but not all chunks have been enqueued.
    InProgress,
    /// Every chunk has been handed to the producer.
    FullyEnqueued,
}

/// A source file being split into chunks and enqueued to the broker.
#[derive(Debug, Clone)]
pub struct UploadFile {
    file_path: PathBuf,
    file_name: String,
    subdir: Vec<String>,
    chunk_size: ChunkSize,
    filename_append: String,
    selected_ranges: Option<Vec<ByteRange>>,
    pending: VecDeque<Chunk>,
    chunks_built: bool,
    file_hash: Option<[u8; HASH_LEN]>,
    n_total_chunks: usize,
    n_enqueued: usize,
    status: UploadStatus,
    chunking_error: Option<TransferError>,
}

impl UploadFile {
    /// Registers a file to be chunked and enqueued. Chunking does not
    /// happen here - it is deferred to the first [`UploadFile::enqueue_chunks`]
    /// call.
    pub fn new(file_path: PathBuf, file_name: String, subdir: Vec<String>, chunk_size: ChunkSize, filename_append: String) -> Self {
        UploadFile {
            file_path,
            file_name,
            subdir,
            chunk_size,
            filename_append,
            selected_ranges: None,
            pending: VecDeque::new(),
            chunks_built: false,
            file_hash: None,
            n_total_chunks: 0,
            n_enqueued: 0,
            status: UploadStatus::Waiting,
            chunking_error: None,
        }
    }

    /// Registers a file to be chunked over only `selected_ranges` rather
    /// than its full contents.
    pub fn with_selected_ranges(mut self, selected_ranges: Vec<ByteRange>) -> Self {
        self.selected_ranges = Some(selected_ranges);
        self
    }

    /// Marks a file that is filtered out before chunking (e.g. skipped by
    /// `new_files_only`) so the worker pool skips it without ever touching
    /// the filesystem.
    pub fn will_not_upload(file_path: PathBuf, file_name: String) -> Self {
        UploadFile {
            file_path,
            file_name,
            subdir: Vec::new(),
            chunk_size: ChunkSize::default(),
            filename_append: String::new(),
            selected_ranges: None,
            pending: VecDeque::new(),
            chunks_built: true,
            file_hash: None,
            n_total_chunks: 0,
            n_enqueued: 0,
            status: UploadStatus::WillNotUpload,
            chunking_error: None,
        }
    }

    pub fn file_path(&self) -> &PathBuf {
        &self.file_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// The whole-file hash, known only once chunking has run (after the
    /// first `enqueue_chunks` call).
    pub fn file_hash(&self) -> Option<&[u8; HASH_LEN]> {
        self.file_hash.as_ref()
    }

    /// `true` once `FileChunker::build` has run for this file, successfully
    /// or not.
    pub fn chunks_built(&self) -> bool {
        self.chunks_built
    }

    /// The error from the lazy chunking attempt, if it failed.
    pub fn chunking_error(&self) -> Option<&TransferError> {
        self.chunking_error.as_ref()
    }

    /// Total chunk count. `0` until chunking has run.
    pub fn n_total_chunks(&self) -> usize {
        self.n_total_chunks
    }

    pub fn n_enqueued(&self) -> usize {
        self.n_enqueued
    }

    /// Attempts to hand up to `max_chunks` not-yet-enqueued chunks to
    /// `try_send`, in ascending index order. If this is the first call for
    /// this file, builds its chunk list first (the only point in the
    /// lifecycle that reads the file from disk); a chunking failure marks
    /// the file `WillNotUpload` and returns `0`.
    ///
    /// `try_send` returns `false` when the producer's local queue is full;
    /// on a `false` this stops early and leaves the remaining chunks for the
    /// next call, mirroring the reference implementation's per-call cap
    /// combined with a queue-full no-op rather than a blocking put.
    ///
    /// Returns the number of chunks actually enqueued.
    pub fn enqueue_chunks(&mut self, max_chunks: usize, mut try_send: impl FnMut(&Chunk) -> bool) -> usize {
        if self.status == UploadStatus::WillNotUpload {
            return 0;
        }

        if !self.chunks_built {
            match FileChunker::build(
                &self.file_path,
                &self.file_name,
                self.subdir.clone(),
                self.chunk_size,
                &self.filename_append,
                self.selected_ranges.as_deref(),
            ) {
                Ok((file_hash, chunks)) => {
                    self.file_hash = Some(file_hash);
                    self.n_total_chunks = chunks.len();
                    self.pending = chunks.into();
                    self.chunks_built = true;
                }
                Err(e) => {
                    self.chunking_error = Some(e);
                    self.chunks_built = true;
                    self.status = UploadStatus::WillNotUpload;
                    return 0;
                }
            }
            if self.pending.is_empty() {
                self.status = UploadStatus::FullyEnqueued;
                return 0;
            }
        }

        let mut sent = 0;
        while sent < max_chunks {
            let Some(chunk) = self.pending.front() else { break };
            if !try_send(chunk) {
                break;
            }
            self.pending.pop_front();
            self.n_enqueued += 1;
            sent += 1;
        }

        self.status = if self.pending.is_empty() {
            UploadStatus::FullyEnqueued
        } else if self.n_enqueued > 0 {
            UploadStatus::InProgress
        } else {
            UploadStatus::Waiting
        };

        sent
    }
}
