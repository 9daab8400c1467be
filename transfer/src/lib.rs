// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer
//!
//! Infrastructure and application layer for the chunked file transfer
//! engine: configuration, the broker port and its in-process reference
//! implementation, the binary wire format, the controlled-process
//! scaffolding, and the upload/download daemons built on top of
//! `transfer-domain`.

pub mod application;
pub mod broker;
pub mod config;
pub mod error;
pub mod wire;

pub use application::{DownloadDaemon, UploadDaemon};
pub use broker::{BrokerMessage, Consumer, LocalBroker, Producer};
pub use config::TransferConfig;
pub use error::TransferRuntimeError;
