// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Argument Parsing
//!
//! `clap`-derived argument structs for the two binaries, plus the path
//! validation shared by both: canonicalization, existence checks, and a
//! protected-system-directory guard so neither daemon can be pointed at
//! `/etc`, `/proc`, and the like.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use transfer_bootstrap::cli::UploadArgs;
//! use clap::Parser;
//!
//! let args = UploadArgs::parse();
//! println!("uploading from {}", args.upload_dir.display());
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum canonicalized path length accepted from the CLI.
const MAX_PATH_LENGTH: usize = 4096;

/// System directories no upload/output root may resolve into.
const PROTECTED_DIRS: &[&str] = &["/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev"];

/// Errors raised validating CLI arguments before the daemon starts running.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("path exceeds maximum length (max {MAX_PATH_LENGTH})")]
    PathTooLong,

    #[error("access to protected system directory denied: {0}")]
    ProtectedDirectory(String),
}

/// Canonicalizes and validates a path that must already exist (`upload_dir`,
/// an existing `output_dir`, a config file).
pub fn validate_existing_path(path: &Path) -> Result<PathBuf, ParseError> {
    let canonical = path.canonicalize().map_err(|e| {
        if !path.exists() {
            ParseError::PathNotFound(path.display().to_string())
        } else {
            ParseError::InvalidPath {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        }
    })?;
    check_length_and_protection(canonical)
}

/// Validates a path that will be created if it doesn't exist yet
/// (`output_dir`). Canonicalizes the nearest existing ancestor and rejoins
/// the remaining components, since `canonicalize` requires the full path to
/// exist.
pub fn validate_creatable_path(path: &Path) -> Result<PathBuf, ParseError> {
    let mut existing = path;
    let mut tail = Vec::new();
    while !existing.exists() {
        match existing.parent() {
            Some(parent) => {
                if let Some(name) = existing.file_name() {
                    tail.push(name.to_owned());
                }
                existing = parent;
            }
            None => {
                return Err(ParseError::InvalidPath {
                    path: path.display().to_string(),
                    reason: "no existing ancestor directory".to_string(),
                })
            }
        }
    }
    let mut canonical = existing.canonicalize().map_err(|e| ParseError::InvalidPath {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    for component in tail.into_iter().rev() {
        canonical.push(component);
    }
    check_length_and_protection(canonical)
}

fn check_length_and_protection(canonical: PathBuf) -> Result<PathBuf, ParseError> {
    if canonical.to_string_lossy().len() > MAX_PATH_LENGTH {
        return Err(ParseError::PathTooLong);
    }
    for protected in PROTECTED_DIRS {
        if canonical.starts_with(protected) {
            return Err(ParseError::ProtectedDirectory(canonical.display().to_string()));
        }
    }
    Ok(canonical)
}

/// CLI arguments for `transfer-upload`.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "transfer-upload", about = "Chunk files under a directory and publish them to a broker")]
pub struct UploadArgs {
    /// Directory watched for files to chunk and upload. Must already exist.
    pub upload_dir: PathBuf,

    /// Path to a TOML config file overlaying the defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Broker topic chunks are published to.
    #[arg(long)]
    pub topic_name: Option<String>,

    /// Number of upload worker threads.
    #[arg(long)]
    pub n_threads: Option<usize>,

    /// Chunk size in bytes; must be a power of two.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum number of chunks buffered in the in-process producer queue.
    #[arg(long)]
    pub queue_max_size: Option<usize>,

    /// Seconds between "still alive" liveness log lines.
    #[arg(long)]
    pub update_seconds: Option<u64>,

    /// Only upload files that have not already been fully enqueued in a
    /// previous run (tracked via the persisted state file).
    #[arg(long)]
    pub new_files_only: bool,

    /// String appended to each file's basename, ahead of its extension, when
    /// the consumer reconstructs it on disk.
    #[arg(long, default_value = "")]
    pub filename_append: String,
}

/// CLI arguments for `transfer-download`.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "transfer-download", about = "Consume chunks from a broker and reconstruct files on disk")]
pub struct DownloadArgs {
    /// Directory files are reconstructed into. Created if it doesn't exist.
    pub output_dir: PathBuf,

    /// Path to a TOML config file overlaying the defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Broker topic to consume chunks from.
    #[arg(long)]
    pub topic_name: Option<String>,

    /// Number of download worker threads.
    #[arg(long)]
    pub n_threads: Option<usize>,

    /// Seconds between "still alive" liveness log lines.
    #[arg(long)]
    pub update_seconds: Option<u64>,

    /// Consumer group id, so multiple downloader instances can share the
    /// topic's partitions instead of each receiving every chunk.
    #[arg(long)]
    pub consumer_group_id: Option<String>,
}
