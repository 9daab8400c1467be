// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `transfer-download` - consumes chunks from a broker topic and
//! reconstructs files under a directory.
//!
//! `LocalBroker` has no cross-process transport, so running this binary
//! against a separate `transfer-upload` process delivers nothing; it is
//! meant for demonstration and for tests that run both daemons in one
//! process. A real deployment swaps in a broker client behind the same
//! `Consumer` trait.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use transfer::application::DownloadDaemon;
use transfer::{LocalBroker, TransferConfig};
use transfer_bootstrap::cli::{validate_creatable_path, DownloadArgs};
use transfer_bootstrap::{result_to_exit_code, ExitCode};

fn main() {
    tracing_subscriber::fmt::init();
    let args = DownloadArgs::parse();
    std::process::exit(run(args).as_i32());
}

fn fail(e: impl Error) -> ExitCode {
    result_to_exit_code::<(), _>(Err(e))
}

fn run(args: DownloadArgs) -> ExitCode {
    let output_dir = match validate_creatable_path(&args.output_dir) {
        Ok(path) => path,
        Err(e) => return fail(e),
    };
    if let Err(e) = std::fs::create_dir_all(&output_dir) {
        tracing::error!(error = %e, "failed to create output_dir");
        return ExitCode::CantCreate;
    }

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
    if let Some(update_seconds) = args.update_seconds {
        config.update_seconds = update_seconds as i64;
    }
    if let Some(consumer_group_id) = args.consumer_group_id {
        config.consumer_group_id = consumer_group_id;
    }

    if let Err(e) = config.validate() {
        return fail(e);
    }

    let broker = Arc::new(LocalBroker::new(config.queue_max_size));
    let daemon = DownloadDaemon::new(output_dir, &config, Box::new(move |topic| Box::new(broker.consumer(topic))));

    tracing::info!(
        topic = %config.topic_name,
        n_threads = config.n_threads,
        consumer_group_id = %config.consumer_group_id,
        "starting download daemon"
    );
    if daemon.run(config.update_seconds) {
        ExitCode::Success
    } else {
        ExitCode::DataError
    }
}
