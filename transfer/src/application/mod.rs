// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Layer
//!
//! Orchestrates the domain layer and the broker port into two runnable
//! daemons, on top of the reusable [`controlled_process`] scaffolding.

pub mod controlled_process;
pub mod downloader;
pub mod upload_worker_pool;
pub mod uploader;

pub use controlled_process::{
    ControlCommand, ControlledProcessCore, ControlledProcessHooks, ControlledProcessMultiThreaded, ControlledProcessSingleThread,
    MultiThreadHooks, SingleThreadHooks,
};
pub use downloader::DownloadDaemon;
pub use uploader::UploadDaemon;
