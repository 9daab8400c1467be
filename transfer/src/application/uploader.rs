// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Daemon
//!
//! Walks `upload_dir` once at startup, builds one [`UploadFile`] per
//! discovered file, and repeatedly calls `enqueue_chunks` on each until
//! every file is fully enqueued, while `n_threads` worker threads drain the
//! resulting queue into the broker. The scanning thread is separate from
//! the `n_threads` publish workers, matching the reference daemon's shape.

use super::controlled_process::{ControlledProcessCore, ControlledProcessHooks, MultiThreadHooks};
use super::upload_worker_pool::{upload_worker_loop, WorkItem};
use crate::broker::Producer;
use crate::config::TransferConfig;
use crate::error::TransferRuntimeError;
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use transfer_domain::{ChunkSize, UploadFile, UploadStatus};

const LEDGER_FILE_NAME: &str = ".transfer-uploaded.json";

/// Identifies a file for the `new_files_only` ledger from metadata alone
/// (size and modification time), so a file already on the ledger can be
/// skipped before it is ever opened - chunking, which is now deferred to a
/// file's first `enqueue_chunks` call, never has to run just to answer
/// "has this been uploaded before?".
fn ledger_key(file_name: &str, subdir: &[String], len: u64, modified: std::time::SystemTime) -> String {
    let modified_secs = modified.duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    format!("{}/{}/{}/{}", subdir.join("/"), file_name, len, modified_secs)
}

fn load_ledger(path: &Path) -> HashSet<String> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|contents| serde_json::from_str::<Vec<String>>(&contents).ok())
        .map(|entries| entries.into_iter().collect())
        .unwrap_or_default()
}

fn save_ledger(path: &Path, entries: &HashSet<String>) {
    let list: Vec<&String> = entries.iter().collect();
    match serde_json::to_string_pretty(&list) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                tracing::error!(error = %e, "failed to persist upload ledger");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize upload ledger"),
    }
}

/// Recursively collects every regular file under `dir`, paired with its
/// path components relative to `dir` (the `subdir` a `Chunk` carries so the
/// downloader can recreate the hierarchy). Skips the ledger sidecar file.
fn discover_files(dir: &Path) -> Vec<(PathBuf, Vec<String>)> {
    let mut out = Vec::new();
    let mut subdir = Vec::new();
    walk(dir, dir, &mut subdir, &mut out);
    out
}

fn walk(root: &Path, current: &Path, subdir: &mut Vec<String>, out: &mut Vec<(PathBuf, Vec<String>)>) {
    let Ok(entries) = std::fs::read_dir(current) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let Some(name) = path.file_name() else { continue };
            subdir.push(name.to_string_lossy().into_owned());
            walk(root, &path, subdir, out);
            subdir.pop();
        } else if path.is_file() {
            if path.file_name().and_then(|n| n.to_str()) == Some(LEDGER_FILE_NAME) {
                continue;
            }
            out.push((path, subdir.clone()));
        }
    }
}

/// Long-running daemon that chunks files under `upload_dir` and publishes
/// them to a broker topic. Constructed once, then driven by calling
/// [`UploadDaemon::run`].
pub struct UploadDaemon {
    upload_dir: PathBuf,
    topic: String,
    chunk_size: ChunkSize,
    chunks_per_enqueue_call: usize,
    new_files_only: bool,
    filename_append: String,
    n_threads: usize,
    producer: Arc<dyn Producer>,
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
    files: Mutex<HashMap<PathBuf, UploadFile>>,
    ledger_keys: Mutex<HashMap<PathBuf, String>>,
    ledger_path: PathBuf,
    completed: Mutex<HashSet<String>>,
}

impl UploadDaemon {
    pub fn new(
        upload_dir: PathBuf,
        config: &TransferConfig,
        new_files_only: bool,
        filename_append: String,
        producer: Arc<dyn Producer>,
    ) -> Result<Arc<Self>, TransferRuntimeError> {
        let chunk_size = ChunkSize::new(config.chunk_size).map_err(TransferRuntimeError::Domain)?;
        let (sender, receiver) = bounded(config.queue_max_size);
        let ledger_path = upload_dir.join(LEDGER_FILE_NAME);
        let completed = if new_files_only { load_ledger(&ledger_path) } else { HashSet::new() };

        Ok(Arc::new(UploadDaemon {
            upload_dir,
            topic: config.topic_name.clone(),
            chunk_size,
            chunks_per_enqueue_call: config.chunks_per_enqueue_call(),
            new_files_only,
            filename_append,
            n_threads: config.n_threads,
            producer,
            sender,
            receiver,
            files: Mutex::new(HashMap::new()),
            ledger_keys: Mutex::new(HashMap::new()),
            ledger_path,
            completed: Mutex::new(completed),
        }))
    }

    /// Runs the daemon until shutdown (control command `q`/`quit` or an OS
    /// signal). Blocks the calling thread.
    pub fn run(self: &Arc<Self>, update_seconds: i64) {
        let mut core = ControlledProcessCore::new(update_seconds);
        core.start();
        core.spawn_signal_watcher(self.clone() as Arc<dyn ControlledProcessHooks>);

        let alive = core.alive_flag();
        let scanner = {
            let daemon = self.clone();
            let alive = alive.clone();
            thread::spawn(move || daemon.scan_and_enqueue_loop(&alive))
        };

        let mut workers = Vec::with_capacity(self.n_threads);
        for worker_id in 0..self.n_threads {
            let daemon = self.clone();
            workers.push(thread::spawn(move || {
                upload_worker_loop(worker_id, &daemon.receiver, daemon.producer.as_ref(), &daemon.topic)
            }));
        }

        while core.is_alive() {
            core.print_still_alive();
            core.check_control_command_queue(self.as_ref());
            thread::sleep(Duration::from_millis(50));
        }

        for worker in workers {
            let _ = worker.join();
        }
        let _ = scanner.join();
    }

    fn scan_and_enqueue_loop(&self, alive: &AtomicBool) {
        self.discover_and_register();
        loop {
            if !alive.load(std::sync::atomic::Ordering::SeqCst) {
                return;
            }
            if !self.enqueue_pass() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }

    /// Registers every newly-discovered file as an [`UploadFile`]. Never
    /// reads a file's contents: chunking is deferred to that file's first
    /// [`UploadFile::enqueue_chunks`] call in [`Self::enqueue_pass`], so a
    /// directory of many files never loads more than the one currently being
    /// drained into memory. `new_files_only` is decided from filesystem
    /// metadata alone, for the same reason.
    fn discover_and_register(&self) {
        let discovered = discover_files(&self.upload_dir);
        let mut files = self.files.lock();
        for (path, subdir) in discovered {
            if files.contains_key(&path) {
                continue;
            }
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

            if self.new_files_only {
                match std::fs::metadata(&path) {
                    Ok(metadata) => {
                        let modified = metadata.modified().unwrap_or(std::time::UNIX_EPOCH);
                        let key = ledger_key(&file_name, &subdir, metadata.len(), modified);
                        if self.completed.lock().contains(&key) {
                            tracing::debug!(file = %file_name, "skipping already-uploaded file");
                            continue;
                        }
                        self.ledger_keys.lock().insert(path.clone(), key);
                    }
                    Err(e) => {
                        tracing::error!(file = %file_name, error = %e, "failed to stat file, will not upload");
                        files.insert(path.clone(), UploadFile::will_not_upload(path, file_name));
                        continue;
                    }
                }
            }

            files.insert(
                path.clone(),
                UploadFile::new(path, file_name, subdir, self.chunk_size, self.filename_append.clone()),
            );
        }
    }

    /// Drives every tracked `UploadFile` forward by one `enqueue_chunks`
    /// call. Returns `true` while at least one file is not yet
    /// `FullyEnqueued` or `WillNotUpload`.
    fn enqueue_pass(&self) -> bool {
        let mut files = self.files.lock();
        let mut still_pending = false;
        let mut newly_completed_paths = Vec::new();

        for (path, upload) in files.iter_mut() {
            if matches!(upload.status(), UploadStatus::FullyEnqueued | UploadStatus::WillNotUpload) {
                continue;
            }
            let sender = &self.sender;
            upload.enqueue_chunks(self.chunks_per_enqueue_call, |chunk| sender.try_send(WorkItem::Chunk(chunk.clone())).is_ok());
            if upload.status() == UploadStatus::FullyEnqueued {
                newly_completed_paths.push(path.clone());
            } else {
                still_pending = true;
            }
        }

        if self.new_files_only && !newly_completed_paths.is_empty() {
            let ledger_keys = self.ledger_keys.lock();
            let mut completed = self.completed.lock();
            for path in &newly_completed_paths {
                if let Some(key) = ledger_keys.get(path) {
                    completed.insert(key.clone());
                }
            }
        }

        still_pending
    }
}

impl ControlledProcessHooks for UploadDaemon {
    fn on_check(&self) {
        let files = self.files.lock();
        let total = files.len();
        let fully = files.values().filter(|u| u.status() == UploadStatus::FullyEnqueued).count();
        tracing::info!(total_files = total, fully_enqueued = fully, "upload status check");
    }

    fn on_shutdown(&self) {
        tracing::info!("upload daemon shutting down");
        for _ in 0..self.n_threads {
            let _ = self.sender.send(WorkItem::Shutdown);
        }
        if let Err(e) = self.producer.flush(Duration::from_secs(30)) {
            tracing::error!(error = %e, "flush on shutdown failed");
        }
        if self.new_files_only {
            save_ledger(&self.ledger_path, &self.completed.lock());
        }
    }
}

impl MultiThreadHooks for UploadDaemon {
    fn worker_loop(&self, worker_id: usize, _alive: &AtomicBool) {
        upload_worker_loop(worker_id, &self.receiver, self.producer.as_ref(), &self.topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::LocalBroker;

    #[test]
    fn discovers_nested_files_with_subdir_components() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("top.bin"), b"x").unwrap();
        std::fs::write(dir.path().join("a/b/nested.bin"), b"y").unwrap();

        let mut found = discover_files(dir.path());
        found.sort_by_key(|(p, _)| p.clone());

        assert_eq!(found.len(), 2);
        let (nested_path, nested_subdir) = found
            .iter()
            .find(|(p, _)| p.file_name().unwrap() == "nested.bin")
            .unwrap();
        assert!(nested_path.ends_with("a/b/nested.bin"));
        assert_eq!(nested_subdir, &vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn ignores_the_ledger_sidecar_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE_NAME), b"[]").unwrap();
        std::fs::write(dir.path().join("real.bin"), b"x").unwrap();

        let found = discover_files(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.file_name().unwrap(), "real.bin");
    }

    #[test]
    fn enqueue_pass_drains_a_small_file_into_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.bin"), vec![7u8; 10]).unwrap();

        let mut config = TransferConfig::default();
        config.chunk_size = 4;
        config.n_threads = 1;
        let broker = Arc::new(LocalBroker::new(32));
        let daemon = UploadDaemon::new(dir.path().to_path_buf(), &config, false, String::new(), broker.clone()).unwrap();

        daemon.discover_and_register();
        while daemon.enqueue_pass() {}

        let consumer = broker.consumer(&config.topic_name);
        let mut received = 0;
        while consumer.poll(Duration::from_millis(50)).is_some() {
            received += 1;
        }
        assert_eq!(received, 3); // 10 bytes / 4-byte chunks = ceil(10/4) = 3
    }

    #[test]
    fn discover_and_register_never_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.bin"), vec![7u8; 10]).unwrap();

        let config = TransferConfig::default();
        let broker = Arc::new(LocalBroker::new(32));
        let daemon = UploadDaemon::new(dir.path().to_path_buf(), &config, false, String::new(), broker).unwrap();

        daemon.discover_and_register();

        let files = daemon.files.lock();
        let upload = files.values().next().unwrap();
        assert!(!upload.chunks_built());
    }

    #[test]
    fn new_files_only_skips_a_file_already_on_the_ledger_without_chunking_it() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("f.bin");
        std::fs::write(&file_path, vec![7u8; 10]).unwrap();

        let mut config = TransferConfig::default();
        config.chunk_size = 4;
        config.n_threads = 1;
        let broker = Arc::new(LocalBroker::new(32));

        {
            let daemon = UploadDaemon::new(dir.path().to_path_buf(), &config, true, String::new(), broker.clone()).unwrap();
            daemon.discover_and_register();
            while daemon.enqueue_pass() {}
            daemon.on_shutdown();
        }
        assert!(dir.path().join(LEDGER_FILE_NAME).exists());

        let daemon = UploadDaemon::new(dir.path().to_path_buf(), &config, true, String::new(), broker.clone()).unwrap();
        daemon.discover_and_register();
        assert!(daemon.files.lock().is_empty());
    }
}
