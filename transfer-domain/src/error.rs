// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! Errors that can occur while chunking a file on disk or reconstructing one
//! from chunks. These are the only errors the domain layer produces; broker
//! and wire-format failures live in the `transfer` crate since they are
//! infrastructure concerns.

use thiserror::Error;

/// Domain-specific errors for the chunked file transfer engine.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    /// Chunking a file failed: I/O error or malformed `selected_ranges`.
    #[error("failed to chunk {path}: {reason}")]
    Chunking { path: String, reason: String },

    /// A chunk was invalid on construction (e.g. empty data, length mismatch).
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    /// `chunk_size` was not a positive power of two.
    #[error("invalid chunk size {0}: must be a positive power of two")]
    InvalidChunkSize(usize),

    /// A chunk arrived addressed to the wrong `DownloadFile`.
    #[error("path mismatch: chunk for {chunk_path} delivered to download file for {expected_path}")]
    PathMismatch { chunk_path: String, expected_path: String },

    /// The reconstructed file's hash did not match the chunk's `file_hash`.
    #[error("hash mismatch reconstructing {path}: file kept on disk for inspection")]
    HashMismatch { path: String },

    /// Writing a chunk to, or reading a file back from, disk failed.
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl TransferError {
    pub fn chunking(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Chunking {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
