// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `transfer-upload` - chunks files under a directory and publishes them to
//! a broker topic.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use transfer::application::UploadDaemon;
use transfer::{LocalBroker, TransferConfig};
use transfer_bootstrap::cli::{validate_existing_path, UploadArgs};
use transfer_bootstrap::{result_to_exit_code, ExitCode};

fn main() {
    tracing_subscriber::fmt::init();
    let args = UploadArgs::parse();
    std::process::exit(run(args).as_i32());
}

fn fail(e: impl Error) -> ExitCode {
    result_to_exit_code::<(), _>(Err(e))
}

fn run(args: UploadArgs) -> ExitCode {
    let upload_dir = match validate_existing_path(&args.upload_dir) {
        Ok(path) => path,
        Err(e) => return fail(e),
    };

    let mut config = match &args.config {
        Some(path) => match TransferConfig::load(path) {
            Ok(config) => config,
            Err(e) => return fail(e),
        },
        None => TransferConfig::default(),
    };

    if let Some(topic) = args.topic_name {
        config.topic_name = topic;
    }
    if let Some(n_threads) = args.n_threads {
        config.n_threads = n_threads;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(queue_max_size) = args.queue_max_size {
        config.queue_max_size = queue_max_size;
    }
    if let Some(update_seconds) = args.update_seconds {
        config.update_seconds = update_seconds as i64;
    }

    if let Err(e) = config.validate() {
        return fail(e);
    }

    let broker = Arc::new(LocalBroker::new(config.queue_max_size));
    let daemon = match UploadDaemon::new(upload_dir, &config, args.new_files_only, args.filename_append, broker) {
        Ok(daemon) => daemon,
        Err(e) => return fail(e),
    };

    tracing::info!(
        topic = %config.topic_name,
        n_threads = config.n_threads,
        chunk_size = config.chunk_size,
        "starting upload daemon"
    );
    daemon.run(config.update_seconds);
    ExitCode::Success
}
