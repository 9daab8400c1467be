// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Broker Port
//!
//! `Producer` and `Consumer` are the only contracts the worker pools
//! depend on. A real deployment plugs in a client for an actual
//! message broker behind these traits; this crate ships exactly one
//! implementation, [`local::LocalBroker`], good enough to run the
//! uploader against the downloader in a single process and in tests.

mod local;

pub use local::LocalBroker;

use crate::error::TransferRuntimeError;
use std::time::Duration;

/// One message as delivered by a [`Consumer`].
#[derive(Debug, Clone)]
pub struct BrokerMessage {
    pub key: String,
    pub value: Vec<u8>,
}

/// Publishes messages to a topic. Thread-safe: a single `Arc<dyn Producer>`
/// is shared by every upload worker.
pub trait Producer: Send + Sync {
    /// Publishes one message. Implementations retry transient failures
    /// internally up to their own bounded policy; exhausting retries
    /// surfaces `TransferRuntimeError::ProduceFailure`.
    fn produce(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), TransferRuntimeError>;

    /// Blocks until every message produced so far has been acknowledged,
    /// or `timeout` elapses.
    fn flush(&self, timeout: Duration) -> Result<(), TransferRuntimeError>;
}

/// Consumes messages from a topic. One instance is owned per download
/// worker (consumers are not required to be `Sync`).
pub trait Consumer: Send {
    /// Returns the next available message, or `None` if `timeout` elapses
    /// with nothing to deliver.
    fn poll(&self, timeout: Duration) -> Option<BrokerMessage>;

    /// Acknowledges the most recently polled message(s). A no-op for
    /// brokers (like [`LocalBroker`]) that don't track consumer offsets.
    fn commit(&self);
}
