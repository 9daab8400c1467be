// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer Domain
//!
//! Pure business logic for the chunked file transfer engine: the `Chunk`
//! and `ChunkSize` value objects, the `UploadFile` and `DownloadFile`
//! aggregates, and the `FileChunker` service that splits a file on disk
//! into chunks.
//!
//! This crate has no knowledge of brokers, wire formats, or threads - those
//! are infrastructure concerns that live in the `transfer` crate. The one
//! exception is filesystem access inside `FileChunker` and `DownloadFile`,
//! which is domain-level by necessity: chunking and reconstruction *are*
//! file I/O.

pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

pub use entities::{DownloadFile, UploadFile, UploadStatus, WriteOutcome};
pub use error::TransferError;
pub use services::{ByteRange, FileChunker};
pub use value_objects::{Chunk, ChunkSize, HASH_LEN};
