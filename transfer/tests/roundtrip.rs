// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end round trips through the wire format and `LocalBroker`,
//! exercising the invariants and scenarios a full upload/download pass must
//! satisfy without driving the daemons' interactive control loop.

use std::time::Duration;
use transfer::{wire, LocalBroker, Producer};
use transfer_domain::{ByteRange, ChunkSize, DownloadFile, FileChunker, WriteOutcome};

fn publish_all(broker: &LocalBroker, topic: &str, chunks: &[transfer_domain::Chunk]) {
    for chunk in chunks {
        let message = wire::encode(chunk);
        broker.produce(topic, chunk.file_name(), &message).unwrap();
    }
}

fn drain_and_write(broker: &LocalBroker, topic: &str, download: &DownloadFile) -> WriteOutcome {
    let consumer = broker.consumer(topic);
    let mut outcome = WriteOutcome::InProgress;
    while let Some(message) = consumer.poll(Duration::from_millis(100)) {
        let chunk = wire::decode(&message.value).unwrap();
        outcome = download.write(&chunk).unwrap();
    }
    outcome
}

#[test]
fn s1_multi_chunk_file_round_trips_through_the_broker() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.bin");
    std::fs::write(&source, vec![0xABu8; 10]).unwrap();

    let chunk_size = ChunkSize::new(4).unwrap();
    let (file_hash, chunks) = FileChunker::build(&source, "source.bin", vec!["sub".into()], chunk_size, "", None).unwrap();
    assert_eq!(chunks.len(), 3);

    let broker = LocalBroker::new(16);
    publish_all(&broker, "topic", &chunks);

    let out_dir = dir.path().join("out");
    let download = DownloadFile::new(out_dir.join("sub").join("source.bin"), "source.bin".into(), vec!["sub".into()], file_hash, chunks.len() as u32);

    let outcome = drain_and_write(&broker, "topic", &download);
    assert_eq!(outcome, WriteOutcome::Success);

    let reconstructed = std::fs::read(out_dir.join("sub").join("source.bin")).unwrap();
    assert_eq!(reconstructed, vec![0xABu8; 10]);
}

#[test]
fn s2_file_of_exactly_one_chunk_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("one.bin");
    std::fs::write(&source, vec![7u8; 4]).unwrap();

    let chunk_size = ChunkSize::new(4).unwrap();
    let (file_hash, chunks) = FileChunker::build(&source, "one.bin", vec![], chunk_size, "", None).unwrap();
    assert_eq!(chunks.len(), 1);

    let broker = LocalBroker::new(4);
    publish_all(&broker, "t", &chunks);

    let out_path = dir.path().join("out").join("one.bin");
    let download = DownloadFile::new(out_path.clone(), "one.bin".into(), vec![], file_hash, 1);
    assert_eq!(drain_and_write(&broker, "t", &download), WriteOutcome::Success);
    assert_eq!(std::fs::read(out_path).unwrap(), vec![7u8; 4]);
}

#[test]
fn s3_empty_file_produces_no_chunks_and_nothing_to_reconstruct() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("empty.bin");
    std::fs::write(&source, []).unwrap();

    let chunk_size = ChunkSize::new(4).unwrap();
    let (_file_hash, chunks) = FileChunker::build(&source, "empty.bin", vec![], chunk_size, "", None).unwrap();
    assert!(chunks.is_empty());
}

#[test]
fn selected_byte_ranges_reconstruct_only_the_selected_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("ranges.bin");
    std::fs::write(&source, b"0123456789").unwrap();

    let ranges = vec![ByteRange::new(0, 2), ByteRange::new(5, 8)];
    let chunk_size = ChunkSize::new(4).unwrap();
    let (file_hash, chunks) = FileChunker::build(&source, "ranges.bin", vec![], chunk_size, "", Some(&ranges)).unwrap();

    let broker = LocalBroker::new(8);
    publish_all(&broker, "t", &chunks);

    let out_path = dir.path().join("out").join("ranges.bin");
    let download = DownloadFile::new(out_path.clone(), "ranges.bin".into(), vec![], file_hash, chunks.len() as u32);
    assert_eq!(drain_and_write(&broker, "t", &download), WriteOutcome::Success);

    // bytes [0,2) = "01", bytes [5,8) = "567" -> reconstructed as "01567"
    assert_eq!(std::fs::read(out_path).unwrap(), b"01567");
}

#[test]
fn redelivered_message_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("dup.bin");
    std::fs::write(&source, b"hello!!!").unwrap();

    let chunk_size = ChunkSize::new(4).unwrap();
    let (file_hash, chunks) = FileChunker::build(&source, "dup.bin", vec![], chunk_size, "", None).unwrap();

    let broker = LocalBroker::new(8);
    publish_all(&broker, "t", &chunks);
    // Redeliver the first chunk, simulating an at-least-once broker.
    broker.produce("t", "dup.bin", &wire::encode(&chunks[0])).unwrap();

    let out_path = dir.path().join("out").join("dup.bin");
    let download = DownloadFile::new(out_path.clone(), "dup.bin".into(), vec![], file_hash, chunks.len() as u32);
    let outcome = drain_and_write(&broker, "t", &download);
    assert_eq!(outcome, WriteOutcome::Success);
    assert_eq!(std::fs::read(out_path).unwrap(), b"hello!!!");
}

#[test]
fn hash_mismatch_is_reported_and_file_kept_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("bad.bin");
    std::fs::write(&source, b"abcd").unwrap();

    let chunk_size = ChunkSize::new(4).unwrap();
    let (_real_hash, chunks) = FileChunker::build(&source, "bad.bin", vec![], chunk_size, "", None).unwrap();

    let wrong_hash = [0xFFu8; transfer_domain::HASH_LEN];
    let out_path = dir.path().join("out").join("bad.bin");
    let download = DownloadFile::new(out_path.clone(), "bad.bin".into(), vec![], wrong_hash, chunks.len() as u32);

    let broker = LocalBroker::new(4);
    publish_all(&broker, "t", &chunks);
    assert_eq!(drain_and_write(&broker, "t", &download), WriteOutcome::HashMismatch);
    assert!(out_path.exists());
}

#[test]
fn filename_append_survives_the_wire_and_is_carried_on_every_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.csv");
    std::fs::write(&source, b"a,b,c").unwrap();

    let chunk_size = ChunkSize::new(4).unwrap();
    let (_file_hash, chunks) =
        FileChunker::build(&source, "report.csv", vec![], chunk_size, "_imported", None).unwrap();

    for chunk in &chunks {
        let encoded = wire::encode(chunk);
        let decoded = wire::decode(&encoded).unwrap();
        assert_eq!(decoded.filename_append(), "_imported");
    }
}
