// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LocalBroker
//!
//! An in-process, `Arc`-shared, topic-keyed set of bounded
//! `crossbeam_channel`s. It stands in for a real message broker well
//! enough to run the uploader against the downloader in the same process
//! and to exercise round-trip tests, but makes no partitioning or
//! cross-restart durability claims - a production deployment plugs a real
//! broker client in behind [`super::Producer`]/[`super::Consumer`].

use super::{BrokerMessage, Consumer, Producer};
use crate::error::TransferRuntimeError;
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type Channel = (Sender<BrokerMessage>, Receiver<BrokerMessage>);

#[derive(Clone)]
pub struct LocalBroker {
    topics: Arc<Mutex<HashMap<String, Channel>>>,
    capacity: usize,
}

impl LocalBroker {
    /// `capacity` bounds each topic's outstanding-message queue
    /// independently; topics are created lazily on first use.
    pub fn new(capacity: usize) -> Self {
        LocalBroker {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    fn channel_for(&self, topic: &str) -> Channel {
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| bounded(self.capacity))
            .clone()
    }

    /// Returns a consumer subscribed to `topic`. Every consumer created for
    /// the same topic shares that topic's single queue: a message is
    /// delivered to exactly one of them, matching a broker consumer group
    /// rather than a broadcast topic.
    pub fn consumer(&self, topic: &str) -> LocalConsumer {
        let (_, receiver) = self.channel_for(topic);
        LocalConsumer { receiver }
    }
}

impl Producer for LocalBroker {
    fn produce(&self, topic: &str, key: &str, value: &[u8]) -> Result<(), TransferRuntimeError> {
        let (sender, _) = self.channel_for(topic);
        sender
            .send(BrokerMessage {
                key: key.to_string(),
                value: value.to_vec(),
            })
            .map_err(|e| TransferRuntimeError::ProduceFailure {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    fn flush(&self, _timeout: Duration) -> Result<(), TransferRuntimeError> {
        // Sends are synchronous handoffs into the channel; there is
        // nothing buffered client-side left to drain.
        Ok(())
    }
}

/// A consumer handle over one topic's queue in a [`LocalBroker`].
pub struct LocalConsumer {
    receiver: Receiver<BrokerMessage>,
}

impl Consumer for LocalConsumer {
    fn poll(&self, timeout: Duration) -> Option<BrokerMessage> {
        self.receiver.recv_timeout(timeout).ok()
    }

    fn commit(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produced_message_is_delivered_to_consumer() {
        let broker = LocalBroker::new(8);
        let consumer = broker.consumer("topic-a");
        broker.produce("topic-a", "key", b"payload").unwrap();

        let message = consumer.poll(Duration::from_secs(1)).unwrap();
        assert_eq!(message.key, "key");
        assert_eq!(message.value, b"payload");
    }

    #[test]
    fn topics_do_not_cross_deliver() {
        let broker = LocalBroker::new(8);
        let consumer_a = broker.consumer("a");
        let consumer_b = broker.consumer("b");
        broker.produce("a", "k", b"only-a").unwrap();

        assert!(consumer_a.poll(Duration::from_millis(100)).is_some());
        assert!(consumer_b.poll(Duration::from_millis(100)).is_none());
    }

    #[test]
    fn poll_times_out_on_empty_topic() {
        let broker = LocalBroker::new(8);
        let consumer = broker.consumer("empty");
        assert!(consumer.poll(Duration::from_millis(50)).is_none());
    }
}
