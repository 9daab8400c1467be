// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime Error System
//!
//! Errors raised by the infrastructure this crate adds on top of
//! `transfer_domain`: configuration, the broker port, and the wire format.
//! Domain errors (`TransferError`) are folded in via [`From`] so callers in
//! `application` can use one error type end to end.

use thiserror::Error;
use transfer_domain::TransferError;

/// Errors raised outside the domain layer: configuration, broker, and wire
/// format concerns.
#[derive(Error, Debug)]
pub enum TransferRuntimeError {
    /// A CLI argument or config file value failed validation. Fatal,
    /// surfaced before the daemon starts its main loop.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The broker rejected or failed to accept a published message after
    /// exhausting retries. Logged per chunk; does not abort the worker.
    #[error("failed to produce message to topic {topic}: {reason}")]
    ProduceFailure { topic: String, reason: String },

    /// A broker message could not be decoded into a `Chunk`.
    #[error("malformed wire message: {0}")]
    Wire(String),

    /// The user (or an OS signal) requested shutdown; propagated up to stop
    /// the controlled-process loop cleanly, not logged as a failure.
    #[error("shutdown requested")]
    ControlQuit,

    /// A domain-level chunking or reconstruction error.
    #[error(transparent)]
    Domain(#[from] TransferError),
}
