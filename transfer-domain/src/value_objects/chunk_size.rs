// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Size Value Object
//!
//! A validated chunk size used by [`crate::services::FileChunker`] and by the
//! `chunk_size` configuration knob. Unlike a generic byte-count wrapper, a
//! `ChunkSize` is only ever constructed from a positive power of two — this
//! matches the upstream convention of carving files on power-of-two
//! boundaries so partial final blocks and buffer reuse behave predictably.
//!
//! # Examples
//!
//! ```
//! use transfer_domain::value_objects::ChunkSize;
//!
//! let chunk = ChunkSize::new(524_288).unwrap();
//! assert_eq!(chunk.bytes(), 524_288);
//!
//! assert!(ChunkSize::new(0).is_err());
//! assert!(ChunkSize::new(3).is_err()); // not a power of two
//! ```

use crate::TransferError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated, positive, power-of-two chunk size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkSize {
    bytes: usize,
}

impl ChunkSize {
    /// Default chunk size (512KiB), matching the reference configuration.
    pub const DEFAULT_SIZE: usize = 524_288;

    /// Creates a new chunk size, validating that it is a positive power of
    /// two.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidChunkSize`] if `bytes` is zero or not
    /// a power of two.
    pub fn new(bytes: usize) -> Result<Self, TransferError> {
        if bytes == 0 || !bytes.is_power_of_two() {
            return Err(TransferError::InvalidChunkSize(bytes));
        }
        Ok(ChunkSize { bytes })
    }

    /// The chunk size in bytes.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        ChunkSize {
            bytes: Self::DEFAULT_SIZE,
        }
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_powers_of_two() {
        assert_eq!(ChunkSize::new(1).unwrap().bytes(), 1);
        assert_eq!(ChunkSize::new(2).unwrap().bytes(), 2);
        assert_eq!(ChunkSize::new(524_288).unwrap().bytes(), 524_288);
    }

    #[test]
    fn rejects_zero_and_non_powers_of_two() {
        assert!(ChunkSize::new(0).is_err());
        assert!(ChunkSize::new(3).is_err());
        assert!(ChunkSize::new(100).is_err());
    }

    #[test]
    fn default_matches_spec() {
        assert_eq!(ChunkSize::default().bytes(), 524_288);
    }
}
