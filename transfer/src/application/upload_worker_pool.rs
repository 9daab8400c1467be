// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Worker Pool
//!
//! The body of one upload worker thread: take a chunk from the queue, load
//! its bytes from disk if the chunker left them unpopulated, serialize, and
//! publish. No ordering is imposed across chunks or across files -
//! reconstruction relies on `chunk_offset` and `file_hash` alone.

use crate::broker::Producer;
use crate::error::TransferRuntimeError;
use crate::wire;
use crossbeam::channel::Receiver;
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;
use transfer_domain::Chunk;

const MAX_PUBLISH_ATTEMPTS: u32 = 3;

/// One unit of work handed to an upload worker thread.
pub enum WorkItem {
    Chunk(Chunk),
    /// Sent once per worker at shutdown to unblock a pending `recv()`.
    Shutdown,
}

/// Runs one worker's body until a `Shutdown` sentinel arrives (or the
/// sender side is dropped). `worker_id` is only used for log context.
pub fn upload_worker_loop(worker_id: usize, receiver: &Receiver<WorkItem>, producer: &dyn Producer, topic: &str) {
    loop {
        let item = match receiver.recv() {
            Ok(item) => item,
            Err(_) => return,
        };
        let chunk = match item {
            WorkItem::Shutdown => return,
            WorkItem::Chunk(chunk) => chunk,
        };

        let chunk = match load_chunk_data(chunk) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::error!(worker_id, error = %e, "failed to read chunk bytes from disk, dropping chunk");
                continue;
            }
        };

        let message = wire::encode(&chunk);
        if let Err(e) = publish_with_retries(producer, topic, chunk.file_name(), &message) {
            tracing::error!(
                worker_id,
                file = chunk.file_name(),
                index = chunk.index(),
                error = %e,
                "giving up publishing chunk after retries"
            );
        }
    }
}

/// Populates `data` from disk when a chunk was queued metadata-only (the
/// "lazy population" allowance).
fn load_chunk_data(chunk: Chunk) -> std::io::Result<Chunk> {
    if chunk.data().is_some() {
        return Ok(chunk);
    }
    let mut file = std::fs::File::open(chunk.file_path())?;
    file.seek(SeekFrom::Start(chunk.file_offset()))?;
    let mut buf = vec![0u8; chunk.length() as usize];
    file.read_exact(&mut buf)?;
    Ok(chunk.with_data(buf))
}

fn publish_with_retries(producer: &dyn Producer, topic: &str, key: &str, message: &[u8]) -> Result<(), TransferRuntimeError> {
    let mut last_err = None;
    for attempt in 1..=MAX_PUBLISH_ATTEMPTS {
        match producer.produce(topic, key, message) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(attempt, max_attempts = MAX_PUBLISH_ATTEMPTS, error = %e, "publish attempt failed");
                last_err = Some(e);
                if attempt < MAX_PUBLISH_ATTEMPTS {
                    std::thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
        }
    }
    Err(last_err.unwrap())
}
