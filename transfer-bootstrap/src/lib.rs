// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the domain and application layers
//! and provides everything the `transfer-upload` and `transfer-download`
//! binaries need before the first chunk moves:
//!
//! - **CLI parsing** - argument structs and path validation (`cli`)
//! - **Signal handling** - graceful shutdown on SIGTERM/SIGINT/SIGHUP (`signals`)
//! - **Exit codes** - mapping results to `sysexits.h`-style process exit codes (`exit_code`)
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use transfer_bootstrap::{create_signal_handler, SystemSignals};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let shutting_down = Arc::new(AtomicBool::new(false));
//!     let flag = shutting_down.clone();
//!
//!     let signal_handler = create_signal_handler();
//!     tokio::spawn(async move {
//!         signal_handler
//!             .wait_for_signal(Box::new(move || flag.store(true, Ordering::SeqCst)))
//!             .await;
//!     });
//!
//!     while !shutting_down.load(Ordering::SeqCst) {
//!         tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
//!     }
//! }
//! ```
//!
//! ## Module Structure
//!
//! - `cli` - CLI argument structs and path validation
//! - `exit_code` - Unix exit code enumeration
//! - `signals` - Signal handling (SIGTERM, SIGINT, SIGHUP)

pub mod cli;
pub mod exit_code;
pub mod signals;

pub use exit_code::{result_to_exit_code, ExitCode};
pub use signals::{create_signal_handler, SystemSignals};
