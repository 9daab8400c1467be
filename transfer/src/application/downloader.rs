// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Download Daemon
//!
//! `n_threads` workers each poll the [`Consumer`], decode the broker
//! message into a `Chunk`, look up (or lazily create) the matching
//! `DownloadFile` keyed by `(file_name, subdir, file_hash)`, and write it.

use super::controlled_process::{ControlledProcessHooks, ControlledProcessMultiThreaded, MultiThreadHooks};
use crate::broker::Consumer;
use crate::config::TransferConfig;
use crate::wire;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use transfer_domain::{DownloadFile, WriteOutcome, HASH_LEN};

const POLL_TIMEOUT: Duration = Duration::from_millis(200);

type DownloadKey = (String, Vec<String>, [u8; HASH_LEN]);

/// Appends `append` to `file_name`'s stem, ahead of its extension. An empty
/// `append` leaves the name unchanged.
fn appended_file_name(file_name: &str, append: &str) -> String {
    if append.is_empty() {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}{append}.{ext}"),
        _ => format!("{file_name}{append}"),
    }
}

/// Long-running daemon that consumes chunks from a topic and reconstructs
/// files under `output_dir`. Constructed once, then driven by calling
/// [`DownloadDaemon::run`].
pub struct DownloadDaemon {
    output_dir: PathBuf,
    topic: String,
    n_threads: usize,
    consumer_factory: Box<dyn Fn(&str) -> Box<dyn Consumer> + Send + Sync>,
    downloads: Mutex<HashMap<DownloadKey, Arc<DownloadFile>>>,
    had_hash_mismatch: AtomicBool,
}

impl DownloadDaemon {
    pub fn new(output_dir: PathBuf, config: &TransferConfig, consumer_factory: Box<dyn Fn(&str) -> Box<dyn Consumer> + Send + Sync>) -> Arc<Self> {
        Arc::new(DownloadDaemon {
            output_dir,
            topic: config.topic_name.clone(),
            n_threads: config.n_threads,
            consumer_factory,
            downloads: Mutex::new(HashMap::new()),
            had_hash_mismatch: AtomicBool::new(false),
        })
    }

    /// Runs the daemon until shutdown (control command `q`/`quit` or an OS
    /// signal). Blocks the calling thread. Returns `false` if any
    /// reconstructed file failed its hash check, so the caller can surface
    /// a non-zero exit code after the graceful shutdown completes.
    pub fn run(self: &Arc<Self>, update_seconds: i64) -> bool {
        let mut process = ControlledProcessMultiThreaded::new(self.clone(), self.n_threads, update_seconds);
        process.run();
        !self.had_hash_mismatch.load(Ordering::SeqCst)
    }

    /// Builds the on-disk path for a reconstructed file, splicing
    /// `filename_append` onto the end of the basename's stem (before its
    /// extension, if any) so the reconstructed file never collides with one
    /// of the same name already present under `output_dir`.
    fn output_path_for(&self, file_name: &str, subdir: &[String], filename_append: &str) -> PathBuf {
        let mut path = self.output_dir.clone();
        for component in subdir {
            path.push(component);
        }
        path.push(appended_file_name(file_name, filename_append));
        path
    }

    fn download_for(
        &self,
        file_name: &str,
        subdir: &[String],
        file_hash: [u8; HASH_LEN],
        filename_append: &str,
        n_total: u32,
    ) -> Arc<DownloadFile> {
        let key: DownloadKey = (file_name.to_string(), subdir.to_vec(), file_hash);
        let mut downloads = self.downloads.lock();
        downloads
            .entry(key)
            .or_insert_with(|| {
                let output_path = self.output_path_for(file_name, subdir, filename_append);
                Arc::new(DownloadFile::new(output_path, file_name.to_string(), subdir.to_vec(), file_hash, n_total))
            })
            .clone()
    }
}

impl ControlledProcessHooks for DownloadDaemon {
    fn on_check(&self) {
        let downloads = self.downloads.lock();
        tracing::info!(tracked_files = downloads.len(), "download status check");
    }

    fn on_shutdown(&self) {
        tracing::info!("download daemon shutting down");
    }
}

impl MultiThreadHooks for DownloadDaemon {
    fn worker_loop(&self, worker_id: usize, alive: &AtomicBool) {
        let consumer = (self.consumer_factory)(&self.topic);
        while alive.load(std::sync::atomic::Ordering::SeqCst) {
            let Some(message) = consumer.poll(POLL_TIMEOUT) else {
                continue;
            };

            let chunk = match wire::decode(&message.value) {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "dropping malformed broker message");
                    consumer.commit();
                    continue;
                }
            };

            let download = self.download_for(
                chunk.file_name(),
                chunk.subdir(),
                *chunk.file_hash(),
                chunk.filename_append(),
                chunk.n_total(),
            );

            match download.write(&chunk) {
                Ok(WriteOutcome::Success) => {
                    tracing::info!(worker_id, file = chunk.file_name(), "file reconstructed successfully");
                }
                Ok(WriteOutcome::HashMismatch) => {
                    tracing::error!(worker_id, file = chunk.file_name(), "reconstructed file hash mismatch, kept on disk for inspection");
                    self.had_hash_mismatch.store(true, Ordering::SeqCst);
                }
                Ok(WriteOutcome::PathMismatch) => {
                    tracing::warn!(worker_id, file = chunk.file_name(), "chunk addressed to the wrong download file, dropped");
                }
                Ok(WriteOutcome::AlreadyWritten | WriteOutcome::InProgress) => {}
                Err(e) => {
                    tracing::error!(worker_id, file = chunk.file_name(), error = %e, "failed to write chunk to disk");
                }
            }

            consumer.commit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBroker;
    use crate::wire;
    use std::sync::atomic::Ordering;
    use transfer_domain::Chunk;

    fn sha512(data: &[u8]) -> [u8; HASH_LEN] {
        use sha2::{Digest, Sha512};
        let mut hasher = Sha512::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        out
    }

    #[test]
    fn appended_file_name_splices_before_the_extension() {
        assert_eq!(appended_file_name("f.bin", "_copy"), "f_copy.bin");
        assert_eq!(appended_file_name("f", "_copy"), "f_copy");
        assert_eq!(appended_file_name("f.bin", ""), "f.bin");
    }

    #[test]
    fn reconstructs_a_two_chunk_file_from_the_broker() {
        let dir = tempfile::tempdir().unwrap();
        let broker = Arc::new(LocalBroker::new(8));
        let mut config = TransferConfig::default();
        config.topic_name = "files".to_string();
        config.n_threads = 1;

        let broker_for_factory = broker.clone();
        let daemon = DownloadDaemon::new(
            dir.path().to_path_buf(),
            &config,
            Box::new(move |topic| Box::new(broker_for_factory.consumer(topic))),
        );

        let file_hash = sha512(b"abcd");
        let c1 = Chunk::new("unused", "f.bin", file_hash, sha512(b"ab"), 0, 0, 2, 1, 2, vec![], "", Some(b"ab".to_vec()));
        let c2 = Chunk::new("unused", "f.bin", file_hash, sha512(b"cd"), 2, 2, 2, 2, 2, vec![], "", Some(b"cd".to_vec()));
        broker.produce("files", "f.bin", &wire::encode(&c1)).unwrap();
        broker.produce("files", "f.bin", &wire::encode(&c2)).unwrap();

        let alive = Arc::new(AtomicBool::new(true));
        let alive_for_worker = alive.clone();
        let daemon_for_worker = daemon.clone();
        let worker = std::thread::spawn(move || daemon_for_worker.worker_loop(0, &alive_for_worker));

        std::thread::sleep(Duration::from_millis(300));
        alive.store(false, Ordering::SeqCst);
        worker.join().unwrap();

        let contents = std::fs::read(dir.path().join("f.bin")).unwrap();
        assert_eq!(contents, b"abcd");
    }
}
