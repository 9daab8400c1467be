// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Wire Format
//!
//! Encodes a [`Chunk`] as a broker message value: every field in a fixed
//! order, variable-length fields as `[u32 LE length][bytes]`, fixed-width
//! fields as plain little-endian integers, with a trailing format-version
//! byte so the layout can evolve. There is no external schema dependency -
//! this mirrors the length-prefixed binary framing the teacher crate uses
//! for its on-disk container format, adapted to message-sized payloads
//! instead of whole files.
//!
//! A message's key is the file name alone, produced separately by the
//! caller so a real partitioned broker can route same-file chunks to the
//! same partition; the key is not part of the value encoding here.

use crate::error::TransferRuntimeError;
use transfer_domain::{Chunk, HASH_LEN};

const WIRE_VERSION: u8 = 1;

fn put_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_str_vec(buf: &mut Vec<u8>, items: &[String]) {
    buf.extend_from_slice(&(items.len() as u32).to_le_bytes());
    for item in items {
        put_str(buf, item);
    }
}

/// Serializes a chunk into a broker message value.
pub fn encode(chunk: &Chunk) -> Vec<u8> {
    let mut buf = Vec::new();
    put_str(&mut buf, chunk.file_path());
    put_str(&mut buf, chunk.file_name());
    buf.extend_from_slice(chunk.file_hash());
    buf.extend_from_slice(chunk.chunk_hash());
    buf.extend_from_slice(&chunk.file_offset().to_le_bytes());
    buf.extend_from_slice(&chunk.chunk_offset().to_le_bytes());
    buf.extend_from_slice(&chunk.length().to_le_bytes());
    buf.extend_from_slice(&chunk.index().to_le_bytes());
    buf.extend_from_slice(&chunk.n_total().to_le_bytes());
    put_str_vec(&mut buf, chunk.subdir());
    put_str(&mut buf, chunk.filename_append());
    put_bytes(&mut buf, chunk.data().unwrap_or(&[]));
    buf.push(WIRE_VERSION);
    buf
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TransferRuntimeError> {
        if self.pos + n > self.buf.len() {
            return Err(TransferRuntimeError::Wire("message truncated".into()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, TransferRuntimeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, TransferRuntimeError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn str(&mut self) -> Result<String, TransferRuntimeError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| TransferRuntimeError::Wire(format!("invalid utf-8: {e}")))
    }

    fn bytes(&mut self) -> Result<Vec<u8>, TransferRuntimeError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn hash(&mut self) -> Result<[u8; HASH_LEN], TransferRuntimeError> {
        let bytes = self.take(HASH_LEN)?;
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn str_vec(&mut self) -> Result<Vec<String>, TransferRuntimeError> {
        let len = self.u32()? as usize;
        (0..len).map(|_| self.str()).collect()
    }
}

/// Deserializes a broker message value back into a `Chunk`. Rejects
/// messages with an unrecognized trailing version byte or that are
/// truncated anywhere in the middle of a field.
pub fn decode(message: &[u8]) -> Result<Chunk, TransferRuntimeError> {
    if message.is_empty() {
        return Err(TransferRuntimeError::Wire("empty message".into()));
    }
    let version = *message.last().unwrap();
    if version != WIRE_VERSION {
        return Err(TransferRuntimeError::Wire(format!("unsupported wire version {version}")));
    }
    let body = &message[..message.len() - 1];
    let mut reader = Reader::new(body);

    let file_path = reader.str()?;
    let file_name = reader.str()?;
    let file_hash = reader.hash()?;
    let chunk_hash = reader.hash()?;
    let file_offset = reader.u64()?;
    let chunk_offset = reader.u64()?;
    let length = reader.u64()?;
    let index = reader.u32()?;
    let n_total = reader.u32()?;
    let subdir = reader.str_vec()?;
    let filename_append = reader.str()?;
    let data = reader.bytes()?;

    if reader.pos != reader.buf.len() {
        return Err(TransferRuntimeError::Wire("trailing bytes after last field".into()));
    }

    Ok(Chunk::new(
        file_path,
        file_name,
        file_hash,
        chunk_hash,
        file_offset,
        chunk_offset,
        length,
        index,
        n_total,
        subdir,
        filename_append,
        Some(data),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk::new(
            "/tmp/a/b.bin",
            "b.bin",
            [1u8; HASH_LEN],
            [2u8; HASH_LEN],
            10,
            10,
            4,
            1,
            2,
            vec!["a".to_string()],
            "_append",
            Some(b"data".to_vec()),
        )
    }

    #[test]
    fn round_trips_every_field() {
        let chunk = sample_chunk();
        let encoded = encode(&chunk);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, chunk);
    }

    #[test]
    fn rejects_truncated_message() {
        let encoded = encode(&sample_chunk());
        let truncated = &encoded[..encoded.len() / 2];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut encoded = encode(&sample_chunk());
        *encoded.last_mut().unwrap() = 99;
        assert!(decode(&encoded).is_err());
    }

    #[test]
    fn rejects_empty_message() {
        assert!(decode(&[]).is_err());
    }
}
